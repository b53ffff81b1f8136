use chrono::{Duration, NaiveDate, NaiveTime};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::entities::{appointment, staff};
use crate::errors::ServiceError;

/// Opening hour of every branch.
pub const OPENING_TIME: (u32, u32) = (9, 0);
/// Closing hour; the last bookable slot starts half an hour before it.
pub const CLOSING_TIME: (u32, u32) = (18, 0);
/// Slot granularity in minutes.
pub const SLOT_MINUTES: i64 = 30;

fn opening() -> NaiveTime {
    // Safe constants, checked by the slot_grid test.
    NaiveTime::from_hms_opt(OPENING_TIME.0, OPENING_TIME.1, 0).unwrap_or_default()
}

fn closing() -> NaiveTime {
    NaiveTime::from_hms_opt(CLOSING_TIME.0, CLOSING_TIME.1, 0).unwrap_or_default()
}

/// All candidate slot starts for one working day, in order.
pub fn slot_grid() -> Vec<NaiveTime> {
    let mut slots = Vec::new();
    let mut cursor = opening();
    while cursor < closing() {
        slots.push(cursor);
        cursor += Duration::minutes(SLOT_MINUTES);
    }
    slots
}

/// Filters the slot grid against booked intervals.
///
/// A slot `s` is taken when some appointment `[a, b)` contains its start
/// instant, i.e. `a <= s < b`. A 60-minute appointment therefore blocks
/// two grid slots.
pub fn free_slots(booked: &[(NaiveTime, NaiveTime)]) -> Vec<NaiveTime> {
    slot_grid()
        .into_iter()
        .filter(|slot| !booked.iter().any(|(a, b)| a <= slot && slot < b))
        .collect()
}

/// Read-side availability queries.
#[derive(Clone)]
pub struct AvailabilityService {
    db: Arc<DatabaseConnection>,
}

impl AvailabilityService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Free slot starts for a staff member on a given date.
    ///
    /// Only pending and confirmed appointments occupy the calendar;
    /// cancelled and completed ones release their slots.
    #[instrument(skip(self))]
    pub async fn available_slots(
        &self,
        staff_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<NaiveTime>, ServiceError> {
        let member = staff::Entity::find_by_id(staff_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Staff {} not found", staff_id)))?;

        if !member.is_available {
            return Ok(Vec::new());
        }

        let booked: Vec<(NaiveTime, NaiveTime)> = appointment::Entity::find()
            .select_only()
            .column(appointment::Column::StartTime)
            .column(appointment::Column::EndTime)
            .filter(appointment::Column::StaffId.eq(staff_id))
            .filter(appointment::Column::AppointmentDate.eq(date))
            .filter(appointment::Column::Status.is_in(appointment::ACTIVE_STATUSES.iter().copied()))
            .into_tuple()
            .all(&*self.db)
            .await?;

        Ok(free_slots(&booked))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn grid_has_eighteen_slots() {
        let grid = slot_grid();
        assert_eq!(grid.len(), 18);
        assert_eq!(grid[0], t(9, 0));
        assert_eq!(grid[17], t(17, 30));
    }

    #[test]
    fn empty_calendar_is_fully_free() {
        assert_eq!(free_slots(&[]), slot_grid());
    }

    #[test]
    fn hour_long_booking_blocks_two_slots() {
        let free = free_slots(&[(t(9, 0), t(10, 0))]);
        assert!(!free.contains(&t(9, 0)));
        assert!(!free.contains(&t(9, 30)));
        assert!(free.contains(&t(10, 0)));
        assert_eq!(free.len(), 16);
    }

    #[test]
    fn interval_is_half_open_at_end() {
        let free = free_slots(&[(t(14, 0), t(14, 30))]);
        assert!(!free.contains(&t(14, 0)));
        assert!(free.contains(&t(14, 30)));
    }

    #[test]
    fn overlapping_bookings_union() {
        let free = free_slots(&[(t(9, 0), t(10, 0)), (t(9, 30), t(11, 0))]);
        assert_eq!(
            free.first().copied(),
            Some(t(11, 0)),
            "everything before 11:00 is taken"
        );
        assert_eq!(free.len(), 14);
    }

    #[test]
    fn last_slot_blocked_by_closing_booking() {
        let free = free_slots(&[(t(17, 30), t(18, 0))]);
        assert!(!free.contains(&t(17, 30)));
        assert_eq!(free.len(), 17);
    }
}
