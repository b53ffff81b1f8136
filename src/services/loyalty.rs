use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, Order, QueryFilter, QueryOrder};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::{loyalty_point, loyalty_transaction};
use crate::errors::ServiceError;

/// Read side of the loyalty ledger. Accrual happens in the event processor
/// when a payment completes.
#[derive(Clone)]
pub struct LoyaltyService {
    db: Arc<DatabaseConnection>,
}

impl LoyaltyService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Current balance; users with no ledger entry have zero points.
    pub async fn balance(&self, user_id: Uuid) -> Result<i64, ServiceError> {
        Ok(loyalty_point::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .map(|row| row.points)
            .unwrap_or(0))
    }

    pub async fn history(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<loyalty_transaction::Model>, ServiceError> {
        Ok(loyalty_transaction::Entity::find()
            .filter(loyalty_transaction::Column::UserId.eq(user_id))
            .order_by(loyalty_transaction::Column::CreatedAt, Order::Desc)
            .all(&*self.db)
            .await?)
    }
}
