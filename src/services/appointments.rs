use chrono::{NaiveDate, NaiveTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, Order, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::entities::{appointment, service, staff, staff_service};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::availability::{slot_grid, SLOT_MINUTES};

/// Input for booking a slot. The client id comes from the authenticated
/// caller, never from the request body.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub branch_id: Uuid,
    pub client_id: Uuid,
    pub staff_id: Uuid,
    pub service_id: Uuid,
    pub appointment_date: NaiveDate,
    pub start_time: NaiveTime,
    pub notes: Option<String>,
}

/// Optional listing filters, all ANDed together.
#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub branch_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub staff_id: Option<Uuid>,
    pub status: Option<String>,
    pub date: Option<NaiveDate>,
}

/// Status machine: pending and confirmed are live, the rest are terminal.
pub fn is_valid_transition(from: &str, to: &str) -> bool {
    matches!(
        (from, to),
        (appointment::STATUS_PENDING, appointment::STATUS_CONFIRMED)
            | (appointment::STATUS_PENDING, appointment::STATUS_CANCELLED)
            | (appointment::STATUS_CONFIRMED, appointment::STATUS_COMPLETED)
            | (appointment::STATUS_CONFIRMED, appointment::STATUS_CANCELLED)
            | (appointment::STATUS_CONFIRMED, appointment::STATUS_NO_SHOW)
    )
}

fn is_known_status(status: &str) -> bool {
    matches!(
        status,
        appointment::STATUS_PENDING
            | appointment::STATUS_CONFIRMED
            | appointment::STATUS_COMPLETED
            | appointment::STATUS_CANCELLED
            | appointment::STATUS_NO_SHOW
    )
}

/// End of a booking given its start and duration, as minutes past midnight.
/// `None` when the interval would spill past midnight.
fn end_of(start: NaiveTime, duration_minutes: i32) -> Option<NaiveTime> {
    use chrono::Timelike;
    let start_minutes = (start.hour() * 60 + start.minute()) as i64;
    let end_minutes = start_minutes + duration_minutes as i64;
    if end_minutes >= 24 * 60 {
        return None;
    }
    NaiveTime::from_hms_opt((end_minutes / 60) as u32, (end_minutes % 60) as u32, 0)
}

fn is_unique_violation(err: &DbErr) -> bool {
    err.to_string().to_lowercase().contains("unique")
}

#[derive(Clone)]
pub struct AppointmentService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl AppointmentService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Books a slot: validates the catalog references, snapshots the price,
    /// and rejects overlapping bookings for the same staff member.
    ///
    /// The overlap check is best effort; the partial unique index on
    /// `(staff_id, appointment_date, start_time)` catches the race between
    /// two concurrent inserts and is surfaced as a conflict as well.
    #[instrument(skip(self, input), fields(staff_id = %input.staff_id, date = %input.appointment_date))]
    pub async fn create(&self, input: NewAppointment) -> Result<appointment::Model, ServiceError> {
        let svc = service::Entity::find_by_id(input.service_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Service {} not found", input.service_id))
            })?;
        if !svc.is_active {
            return Err(ServiceError::ValidationError(
                "Service is no longer offered".to_string(),
            ));
        }
        if svc.branch_id != input.branch_id {
            return Err(ServiceError::ValidationError(
                "Service does not belong to this branch".to_string(),
            ));
        }

        let member = staff::Entity::find_by_id(input.staff_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Staff {} not found", input.staff_id)))?;
        if member.branch_id != input.branch_id {
            return Err(ServiceError::ValidationError(
                "Staff member does not work at this branch".to_string(),
            ));
        }
        if !member.is_available {
            return Err(ServiceError::ValidationError(
                "Staff member is not taking bookings".to_string(),
            ));
        }

        let offers = staff_service::Entity::find_by_id((input.staff_id, input.service_id))
            .one(&*self.db)
            .await?;
        if offers.is_none() {
            return Err(ServiceError::ValidationError(
                "Staff member does not offer this service".to_string(),
            ));
        }

        if !slot_grid().contains(&input.start_time) {
            return Err(ServiceError::ValidationError(format!(
                "Start time must fall on a {}-minute slot within opening hours",
                SLOT_MINUTES
            )));
        }

        let end_time = end_of(input.start_time, svc.duration_minutes).ok_or_else(|| {
            ServiceError::ValidationError("Appointment would extend past midnight".to_string())
        })?;

        // Full-interval overlap against live bookings: [start, end) intersects
        // [a, b) iff a < end && b > start.
        let clash = appointment::Entity::find()
            .filter(appointment::Column::StaffId.eq(input.staff_id))
            .filter(appointment::Column::AppointmentDate.eq(input.appointment_date))
            .filter(appointment::Column::Status.is_in(appointment::ACTIVE_STATUSES.iter().copied()))
            .filter(appointment::Column::StartTime.lt(end_time))
            .filter(appointment::Column::EndTime.gt(input.start_time))
            .one(&*self.db)
            .await?;
        if clash.is_some() {
            return Err(ServiceError::Conflict(
                "The selected time is no longer available".to_string(),
            ));
        }

        let model = appointment::ActiveModel {
            id: Set(Uuid::new_v4()),
            branch_id: Set(input.branch_id),
            client_id: Set(input.client_id),
            staff_id: Set(input.staff_id),
            service_id: Set(input.service_id),
            appointment_date: Set(input.appointment_date),
            start_time: Set(input.start_time),
            end_time: Set(end_time),
            status: Set(appointment::STATUS_PENDING.to_string()),
            total_price: Set(svc.price),
            payment_status: Set(appointment::PAYMENT_PENDING.to_string()),
            notes: Set(input.notes),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };

        let created = model.insert(&*self.db).await.map_err(|err| {
            if is_unique_violation(&err) {
                ServiceError::Conflict("The selected time is no longer available".to_string())
            } else {
                ServiceError::DatabaseError(err)
            }
        })?;

        if let Err(err) = self
            .event_sender
            .send(Event::AppointmentCreated {
                appointment_id: created.id,
                staff_id: created.staff_id,
            })
            .await
        {
            warn!(error = %err, "failed to emit appointment created event");
        }

        Ok(created)
    }

    pub async fn get(&self, id: Uuid) -> Result<appointment::Model, ServiceError> {
        appointment::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Appointment {} not found", id)))
    }

    pub async fn list(
        &self,
        filter: AppointmentFilter,
    ) -> Result<Vec<appointment::Model>, ServiceError> {
        let mut query = appointment::Entity::find();
        if let Some(branch_id) = filter.branch_id {
            query = query.filter(appointment::Column::BranchId.eq(branch_id));
        }
        if let Some(client_id) = filter.client_id {
            query = query.filter(appointment::Column::ClientId.eq(client_id));
        }
        if let Some(staff_id) = filter.staff_id {
            query = query.filter(appointment::Column::StaffId.eq(staff_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(appointment::Column::Status.eq(status));
        }
        if let Some(date) = filter.date {
            query = query.filter(appointment::Column::AppointmentDate.eq(date));
        }
        Ok(query
            .order_by(appointment::Column::AppointmentDate, Order::Desc)
            .order_by(appointment::Column::StartTime, Order::Asc)
            .all(&*self.db)
            .await?)
    }

    /// Applies a status transition, rejecting anything outside the machine.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: Uuid,
        new_status: &str,
    ) -> Result<appointment::Model, ServiceError> {
        if !is_known_status(new_status) {
            return Err(ServiceError::ValidationError(format!(
                "Unknown appointment status '{}'",
                new_status
            )));
        }

        let existing = self.get(id).await?;
        if !is_valid_transition(&existing.status, new_status) {
            return Err(ServiceError::InvalidTransition(format!(
                "cannot move appointment from '{}' to '{}'",
                existing.status, new_status
            )));
        }

        let old_status = existing.status.clone();
        let mut active: appointment::ActiveModel = existing.into();
        active.status = Set(new_status.to_string());
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&*self.db).await?;

        if let Err(err) = self
            .event_sender
            .send(Event::AppointmentStatusChanged {
                appointment_id: updated.id,
                old_status,
                new_status: new_status.to_string(),
            })
            .await
        {
            warn!(error = %err, "failed to emit appointment status event");
        }

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn transition_table() {
        assert!(is_valid_transition("pending", "confirmed"));
        assert!(is_valid_transition("pending", "cancelled"));
        assert!(is_valid_transition("confirmed", "completed"));
        assert!(is_valid_transition("confirmed", "cancelled"));
        assert!(is_valid_transition("confirmed", "no-show"));

        assert!(!is_valid_transition("pending", "completed"));
        assert!(!is_valid_transition("completed", "cancelled"));
        assert!(!is_valid_transition("cancelled", "pending"));
        assert!(!is_valid_transition("no-show", "confirmed"));
        assert!(!is_valid_transition("pending", "pending"));
    }

    #[test]
    fn end_time_rolls_over_the_hour() {
        assert_eq!(end_of(t(9, 30), 60), Some(t(10, 30)));
        assert_eq!(end_of(t(17, 30), 60), Some(t(18, 30)));
        assert_eq!(end_of(t(9, 0), 45), Some(t(9, 45)));
    }

    #[test]
    fn end_time_past_midnight_is_rejected() {
        assert_eq!(end_of(t(23, 30), 45), None);
        assert_eq!(end_of(t(17, 30), 24 * 60), None);
    }
}
