use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, Order, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::entities::{appointment, review};
use crate::errors::ServiceError;

#[derive(Debug, Clone)]
pub struct NewReview {
    pub client_id: Uuid,
    pub appointment_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
}

fn is_unique_violation(err: &DbErr) -> bool {
    err.to_string().to_lowercase().contains("unique")
}

#[derive(Clone)]
pub struct ReviewService {
    db: Arc<DatabaseConnection>,
}

impl ReviewService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Records a review. Only the client who attended a completed
    /// appointment may review it, once.
    #[instrument(skip(self, input), fields(appointment_id = %input.appointment_id))]
    pub async fn create(&self, input: NewReview) -> Result<review::Model, ServiceError> {
        if !(1..=5).contains(&input.rating) {
            return Err(ServiceError::ValidationError(
                "Rating must be between 1 and 5".to_string(),
            ));
        }

        let appt = appointment::Entity::find_by_id(input.appointment_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Appointment {} not found", input.appointment_id))
            })?;

        if appt.client_id != input.client_id {
            return Err(ServiceError::Forbidden(
                "You can only review your own appointments".to_string(),
            ));
        }
        if appt.status != appointment::STATUS_COMPLETED {
            return Err(ServiceError::ValidationError(
                "Only completed appointments can be reviewed".to_string(),
            ));
        }

        review::ActiveModel {
            id: Set(Uuid::new_v4()),
            client_id: Set(input.client_id),
            branch_id: Set(appt.branch_id),
            staff_id: Set(Some(appt.staff_id)),
            appointment_id: Set(input.appointment_id),
            rating: Set(input.rating),
            comment: Set(input.comment),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                ServiceError::Conflict("This appointment has already been reviewed".to_string())
            } else {
                ServiceError::DatabaseError(err)
            }
        })
    }

    pub async fn list_for_branch(
        &self,
        branch_id: Uuid,
    ) -> Result<Vec<review::Model>, ServiceError> {
        Ok(review::Entity::find()
            .filter(review::Column::BranchId.eq(branch_id))
            .order_by(review::Column::CreatedAt, Order::Desc)
            .all(&*self.db)
            .await?)
    }

    pub async fn list_for_staff(
        &self,
        staff_id: Uuid,
    ) -> Result<Vec<review::Model>, ServiceError> {
        Ok(review::Entity::find()
            .filter(review::Column::StaffId.eq(staff_id))
            .order_by(review::Column::CreatedAt, Order::Desc)
            .all(&*self.db)
            .await?)
    }
}
