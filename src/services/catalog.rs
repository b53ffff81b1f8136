use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, Order, QueryFilter, QueryOrder};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::entities::{branch, service, staff, staff_service};
use crate::errors::ServiceError;

/// Read-only catalog: branches, services and the staff who perform them.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn list_branches(&self) -> Result<Vec<branch::Model>, ServiceError> {
        Ok(branch::Entity::find()
            .filter(branch::Column::IsActive.eq(true))
            .order_by(branch::Column::Name, Order::Asc)
            .all(&*self.db)
            .await?)
    }

    pub async fn get_branch(&self, id: Uuid) -> Result<branch::Model, ServiceError> {
        branch::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Branch {} not found", id)))
    }

    /// Active services offered at a branch.
    pub async fn list_services(&self, branch_id: Uuid) -> Result<Vec<service::Model>, ServiceError> {
        self.get_branch(branch_id).await?;
        Ok(service::Entity::find()
            .filter(service::Column::BranchId.eq(branch_id))
            .filter(service::Column::IsActive.eq(true))
            .order_by(service::Column::Name, Order::Asc)
            .all(&*self.db)
            .await?)
    }

    pub async fn get_service(&self, id: Uuid) -> Result<service::Model, ServiceError> {
        service::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Service {} not found", id)))
    }

    /// Bookable staff at a branch, optionally narrowed to those who offer a
    /// particular service.
    #[instrument(skip(self))]
    pub async fn list_staff(
        &self,
        branch_id: Uuid,
        service_id: Option<Uuid>,
    ) -> Result<Vec<staff::Model>, ServiceError> {
        self.get_branch(branch_id).await?;

        let mut query = staff::Entity::find()
            .filter(staff::Column::BranchId.eq(branch_id))
            .filter(staff::Column::IsAvailable.eq(true));

        if let Some(service_id) = service_id {
            let capable: Vec<Uuid> = staff_service::Entity::find()
                .filter(staff_service::Column::ServiceId.eq(service_id))
                .all(&*self.db)
                .await?
                .into_iter()
                .map(|link| link.staff_id)
                .collect();
            query = query.filter(staff::Column::Id.is_in(capable));
        }

        Ok(query.all(&*self.db).await?)
    }
}
