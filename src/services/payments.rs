use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::PesapalConfig;
use crate::entities::{appointment, order, payment_transaction, user};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::gateway::{GatewayOrderRequest, PaymentGateway};

/// What a payment pays for. Exactly one of the two.
#[derive(Debug, Clone, Copy)]
pub enum PaymentReference {
    Order(Uuid),
    Appointment(Uuid),
}

/// How a reconciliation request identifies its transaction. Callbacks carry
/// the merchant reference, IPN notifications carry both, polls carry either.
#[derive(Debug, Clone)]
pub enum PaymentLookup {
    MerchantReference(String),
    TrackingId(String),
}

/// Internal payment state, mapped from gateway status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    /// Gateway code "1" is completed, "2" is failed, everything else
    /// (including unknown codes) stays pending.
    pub fn from_gateway_code(code: &str) -> Self {
        match code.trim() {
            "1" => Self::Completed,
            "2" => Self::Failed,
            _ => Self::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => payment_transaction::STATUS_PENDING,
            Self::Completed => payment_transaction::STATUS_COMPLETED,
            Self::Failed => payment_transaction::STATUS_FAILED,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Result of a successful initiation: the browser goes to `redirect_url`,
/// everything else is for correlation.
#[derive(Debug, Clone)]
pub struct InitiatedPayment {
    pub transaction_id: Uuid,
    pub merchant_reference: String,
    pub tracking_id: String,
    pub redirect_url: String,
}

fn is_unique_violation(err: &DbErr) -> bool {
    err.to_string().to_lowercase().contains("unique")
}

#[derive(Clone)]
pub struct PaymentService {
    db: Arc<DatabaseConnection>,
    gateway: Arc<dyn PaymentGateway>,
    config: PesapalConfig,
    event_sender: EventSender,
}

impl PaymentService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        gateway: Arc<dyn PaymentGateway>,
        config: PesapalConfig,
        event_sender: EventSender,
    ) -> Self {
        Self {
            db,
            gateway,
            config,
            event_sender,
        }
    }

    /// Starts collection for an order or appointment.
    ///
    /// The amount is read from the referenced entity, never from the
    /// caller, and must be positive before anything else happens. A pending
    /// transaction row is persisted before the gateway submission so a
    /// mid-flight failure leaves a recoverable record; there is no rollback,
    /// polling completes or fails it later.
    #[instrument(skip(self))]
    pub async fn initiate(
        &self,
        reference: PaymentReference,
        description: String,
    ) -> Result<InitiatedPayment, ServiceError> {
        let (order_id, appointment_id, amount, client_id) =
            self.resolve_reference(reference).await?;

        if amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Payment amount must be greater than zero".to_string(),
            ));
        }

        let payer = user::Entity::find_by_id(client_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", client_id)))?;

        let reference_id = order_id.or(appointment_id).unwrap_or(client_id);
        let merchant_reference =
            format!("{}-{}", reference_id, Utc::now().timestamp_millis());
        let callback_url = format!(
            "{}?merchant_reference={}",
            self.config.callback_url, merchant_reference
        );

        let ipn_id = self.gateway.register_ipn().await?;

        let transaction_id = Uuid::new_v4();
        let row = payment_transaction::ActiveModel {
            id: Set(transaction_id),
            order_id: Set(order_id),
            appointment_id: Set(appointment_id),
            merchant_reference: Set(merchant_reference.clone()),
            tracking_id: Set(None),
            amount: Set(amount),
            currency: Set(self.config.currency.clone()),
            payment_status: Set(payment_transaction::STATUS_PENDING.to_string()),
            payment_method: Set(None),
            ipn_id: Set(Some(ipn_id)),
            callback_url: Set(Some(callback_url.clone())),
            gateway_response: Set(None),
            completed_at: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };
        let row = row.insert(&*self.db).await.map_err(|err| {
            if is_unique_violation(&err) {
                ServiceError::Conflict("Duplicate merchant reference".to_string())
            } else {
                ServiceError::DatabaseError(err)
            }
        })?;

        let submit = self
            .gateway
            .submit_order(&GatewayOrderRequest {
                merchant_reference: merchant_reference.clone(),
                amount,
                currency: self.config.currency.clone(),
                description,
                callback_url,
                billing_email: payer.email.clone(),
                billing_phone: payer.phone.clone(),
                billing_name: Some(payer.full_name.clone()),
            })
            .await?;

        let mut active: payment_transaction::ActiveModel = row.into();
        active.tracking_id = Set(Some(submit.order_tracking_id.clone()));
        active.gateway_response = Set(Some(json!({
            "order_tracking_id": submit.order_tracking_id,
            "redirect_url": submit.redirect_url,
        })));
        active.updated_at = Set(Some(Utc::now()));
        active.update(&*self.db).await?;

        info!(%merchant_reference, tracking_id = %submit.order_tracking_id, "payment initiated");
        Ok(InitiatedPayment {
            transaction_id,
            merchant_reference,
            tracking_id: submit.order_tracking_id,
            redirect_url: submit.redirect_url,
        })
    }

    /// Brings the stored transaction in line with the gateway.
    ///
    /// Callback, IPN and poll all converge here. A terminal stored status
    /// short-circuits without any gateway traffic, which makes redelivered
    /// notifications free. The row is only written when the mapped status
    /// actually changed.
    #[instrument(skip(self))]
    pub async fn reconcile(
        &self,
        lookup: PaymentLookup,
    ) -> Result<payment_transaction::Model, ServiceError> {
        let row = self.find_by_lookup(&lookup).await?;

        if row.is_terminal() {
            return Ok(row);
        }

        let tracking_id = match (&row.tracking_id, &lookup) {
            (Some(id), _) => id.clone(),
            (None, PaymentLookup::TrackingId(id)) => id.clone(),
            (None, _) => {
                return Err(ServiceError::ValidationError(
                    "Transaction was never submitted to the gateway".to_string(),
                ))
            }
        };

        let snapshot = self.gateway.transaction_status(&tracking_id).await?;
        let mapped = PaymentStatus::from_gateway_code(&snapshot.payment_status_code);

        if mapped.as_str() == row.payment_status && row.tracking_id.is_some() {
            return Ok(row);
        }

        let transaction_id = row.id;
        let order_id = row.order_id;
        let appointment_id = row.appointment_id;
        let amount = row.amount;
        let merchant_reference = row.merchant_reference.clone();

        let now = Utc::now();
        let mut active: payment_transaction::ActiveModel = row.into();
        active.tracking_id = Set(Some(tracking_id));
        active.payment_status = Set(mapped.as_str().to_string());
        active.payment_method = Set(snapshot.payment_method.clone());
        active.gateway_response = Set(Some(snapshot.raw.clone()));
        active.updated_at = Set(Some(now));
        if mapped.is_terminal() {
            active.completed_at = Set(Some(now));
        }
        let updated = active.update(&*self.db).await?;

        match mapped {
            PaymentStatus::Completed => {
                if let Err(err) = self
                    .event_sender
                    .send(Event::PaymentCompleted {
                        transaction_id,
                        order_id,
                        appointment_id,
                        amount,
                    })
                    .await
                {
                    warn!(error = %err, "failed to emit payment completed event");
                }
            }
            PaymentStatus::Failed => {
                if let Err(err) = self
                    .event_sender
                    .send(Event::PaymentFailed {
                        transaction_id,
                        merchant_reference,
                    })
                    .await
                {
                    warn!(error = %err, "failed to emit payment failed event");
                }
            }
            PaymentStatus::Pending => {}
        }

        Ok(updated)
    }

    pub async fn get(&self, id: Uuid) -> Result<payment_transaction::Model, ServiceError> {
        payment_transaction::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Payment transaction {} not found", id)))
    }

    async fn find_by_lookup(
        &self,
        lookup: &PaymentLookup,
    ) -> Result<payment_transaction::Model, ServiceError> {
        let found = match lookup {
            PaymentLookup::MerchantReference(reference) => {
                payment_transaction::Entity::find()
                    .filter(payment_transaction::Column::MerchantReference.eq(reference.clone()))
                    .one(&*self.db)
                    .await?
            }
            PaymentLookup::TrackingId(tracking_id) => {
                payment_transaction::Entity::find()
                    .filter(payment_transaction::Column::TrackingId.eq(tracking_id.clone()))
                    .one(&*self.db)
                    .await?
            }
        };
        found.ok_or_else(|| ServiceError::NotFound("Payment transaction not found".to_string()))
    }

    async fn resolve_reference(
        &self,
        reference: PaymentReference,
    ) -> Result<(Option<Uuid>, Option<Uuid>, Decimal, Uuid), ServiceError> {
        match reference {
            PaymentReference::Order(id) => {
                let found = order::Entity::find_by_id(id)
                    .one(&*self.db)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", id)))?;
                Ok((Some(id), None, found.total_amount, found.client_id))
            }
            PaymentReference::Appointment(id) => {
                let found = appointment::Entity::find_by_id(id)
                    .one(&*self.db)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Appointment {} not found", id))
                    })?;
                Ok((None, Some(id), found.total_price, found.client_id))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_code_mapping() {
        assert_eq!(
            PaymentStatus::from_gateway_code("1"),
            PaymentStatus::Completed
        );
        assert_eq!(PaymentStatus::from_gateway_code("2"), PaymentStatus::Failed);
        assert_eq!(PaymentStatus::from_gateway_code("0"), PaymentStatus::Pending);
        assert_eq!(PaymentStatus::from_gateway_code("3"), PaymentStatus::Pending);
        assert_eq!(
            PaymentStatus::from_gateway_code("INVALID"),
            PaymentStatus::Pending
        );
        assert_eq!(PaymentStatus::from_gateway_code(""), PaymentStatus::Pending);
        assert_eq!(
            PaymentStatus::from_gateway_code(" 1 "),
            PaymentStatus::Completed
        );
    }

    #[test]
    fn terminal_statuses() {
        assert!(PaymentStatus::Completed.is_terminal());
        assert!(PaymentStatus::Failed.is_terminal());
        assert!(!PaymentStatus::Pending.is_terminal());
    }
}
