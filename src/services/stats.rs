use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

use crate::entities::{appointment, payment_transaction, user};
use crate::errors::ServiceError;

/// Aggregate counters for the admin dashboard.
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminStats {
    pub appointments_by_status: BTreeMap<String, i64>,
    pub total_appointments: i64,
    /// Sum of completed payment amounts.
    pub total_revenue: Decimal,
    pub total_clients: u64,
}

#[derive(Clone)]
pub struct StatsService {
    db: Arc<DatabaseConnection>,
}

impl StatsService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn admin_stats(&self) -> Result<AdminStats, ServiceError> {
        let by_status: Vec<(String, i64)> = appointment::Entity::find()
            .select_only()
            .column(appointment::Column::Status)
            .column_as(appointment::Column::Id.count(), "count")
            .group_by(appointment::Column::Status)
            .into_tuple()
            .all(&*self.db)
            .await?;

        let total_appointments = by_status.iter().map(|(_, n)| n).sum();
        let appointments_by_status = by_status.into_iter().collect();

        let total_revenue: Option<Decimal> = payment_transaction::Entity::find()
            .select_only()
            .column_as(payment_transaction::Column::Amount.sum(), "revenue")
            .filter(
                payment_transaction::Column::PaymentStatus
                    .eq(payment_transaction::STATUS_COMPLETED),
            )
            .into_tuple()
            .one(&*self.db)
            .await?
            .flatten();

        let total_clients = user::Entity::find()
            .filter(user::Column::Role.eq(user::ROLE_CLIENT))
            .count(&*self.db)
            .await?;

        Ok(AdminStats {
            appointments_by_status,
            total_appointments,
            total_revenue: total_revenue.unwrap_or_default(),
            total_clients,
        })
    }
}
