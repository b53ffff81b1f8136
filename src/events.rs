use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::entities::{
    appointment, loyalty_point, loyalty_transaction, order,
};

/// Domain events emitted by the services after a state change commits.
///
/// Handlers run out-of-band on a dedicated task, so a slow side effect
/// never blocks the request that produced it.
#[derive(Debug, Clone)]
pub enum Event {
    AppointmentCreated {
        appointment_id: Uuid,
        staff_id: Uuid,
    },
    AppointmentStatusChanged {
        appointment_id: Uuid,
        old_status: String,
        new_status: String,
    },
    PaymentCompleted {
        transaction_id: Uuid,
        order_id: Option<Uuid>,
        appointment_id: Option<Uuid>,
        amount: Decimal,
    },
    PaymentFailed {
        transaction_id: Uuid,
        merchant_reference: String,
    },
}

pub type EventSender = mpsc::Sender<Event>;

pub fn event_channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    mpsc::channel(capacity)
}

/// Drains the event channel until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>, db: Arc<DatabaseConnection>) {
    while let Some(event) = rx.recv().await {
        match event {
            Event::AppointmentCreated {
                appointment_id,
                staff_id,
            } => {
                info!(%appointment_id, %staff_id, "appointment created");
            }
            Event::AppointmentStatusChanged {
                appointment_id,
                old_status,
                new_status,
            } => {
                info!(%appointment_id, %old_status, %new_status, "appointment status changed");
            }
            Event::PaymentCompleted {
                transaction_id,
                order_id,
                appointment_id,
                amount,
            } => {
                if let Err(err) =
                    apply_payment_completed(&db, transaction_id, order_id, appointment_id, amount)
                        .await
                {
                    error!(%transaction_id, error = %err, "failed to apply payment completion effects");
                }
            }
            Event::PaymentFailed {
                transaction_id,
                merchant_reference,
            } => {
                warn!(%transaction_id, %merchant_reference, "payment failed");
            }
        }
    }
    info!("event channel closed, processor exiting");
}

/// Marks the paid entity and accrues loyalty points for its client.
///
/// One point per 100 whole units of currency, floored. The paid flag and
/// the loyalty rows are deliberately applied after the transaction row is
/// already terminal, so a crash here loses side effects but never payment
/// state.
async fn apply_payment_completed(
    db: &DatabaseConnection,
    transaction_id: Uuid,
    order_id: Option<Uuid>,
    appointment_id: Option<Uuid>,
    amount: Decimal,
) -> Result<(), sea_orm::DbErr> {
    let now = Utc::now();
    let mut client_id: Option<Uuid> = None;

    if let Some(order_id) = order_id {
        if let Some(found) = order::Entity::find_by_id(order_id).one(db).await? {
            client_id = Some(found.client_id);
            let mut active: order::ActiveModel = found.into();
            active.payment_status = Set(order::PAYMENT_PAID.to_string());
            active.updated_at = Set(Some(now));
            active.update(db).await?;
        } else {
            warn!(%order_id, "paid order no longer exists");
        }
    }

    if let Some(appointment_id) = appointment_id {
        if let Some(found) = appointment::Entity::find_by_id(appointment_id).one(db).await? {
            client_id = Some(found.client_id);
            let mut active: appointment::ActiveModel = found.into();
            active.payment_status = Set(appointment::PAYMENT_PAID.to_string());
            active.updated_at = Set(Some(now));
            active.update(db).await?;
        } else {
            warn!(%appointment_id, "paid appointment no longer exists");
        }
    }

    let Some(client_id) = client_id else {
        warn!(%transaction_id, "completed transaction references no payable entity");
        return Ok(());
    };

    let points = (amount / Decimal::from(100))
        .floor()
        .to_i64()
        .unwrap_or(0);
    if points <= 0 {
        return Ok(());
    }

    let balance = loyalty_point::Entity::find_by_id(client_id).one(db).await?;
    match balance {
        Some(existing) => {
            let total = existing.points + points;
            let mut active: loyalty_point::ActiveModel = existing.into();
            active.points = Set(total);
            active.updated_at = Set(now);
            active.update(db).await?;
        }
        None => {
            loyalty_point::ActiveModel {
                user_id: Set(client_id),
                points: Set(points),
                updated_at: Set(now),
            }
            .insert(db)
            .await?;
        }
    }

    loyalty_transaction::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(client_id),
        points: Set(points),
        kind: Set(loyalty_transaction::KIND_EARNED.to_string()),
        description: Set(Some("Payment completed".to_string())),
        reference_id: Set(Some(transaction_id)),
        created_at: Set(now),
    }
    .insert(db)
    .await?;

    info!(%client_id, points, "loyalty points accrued");
    Ok(())
}
