use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order as SortOrder,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::entities::{order, order_item};
use crate::errors::ServiceError;

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub item_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub client_id: Uuid,
    pub items: Vec<NewOrderItem>,
    pub total_amount: Decimal,
    pub currency: String,
    pub notes: Option<String>,
}

#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Creates an order with its line items in one transaction.
    ///
    /// The total is caller-supplied; it must be positive and cover at least
    /// one line item. Product price lookups happen upstream.
    #[instrument(skip(self, input), fields(client_id = %input.client_id))]
    pub async fn create(&self, input: NewOrder) -> Result<order::Model, ServiceError> {
        if input.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "Order must contain at least one item".to_string(),
            ));
        }
        if input.total_amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Order total must be greater than zero".to_string(),
            ));
        }
        for item in &input.items {
            if item.quantity <= 0 {
                return Err(ServiceError::ValidationError(format!(
                    "Quantity for '{}' must be positive",
                    item.item_name
                )));
            }
            if item.unit_price < Decimal::ZERO {
                return Err(ServiceError::ValidationError(format!(
                    "Unit price for '{}' cannot be negative",
                    item.item_name
                )));
            }
        }

        let txn = self.db.begin().await?;

        let created = order::ActiveModel {
            id: Set(Uuid::new_v4()),
            client_id: Set(input.client_id),
            total_amount: Set(input.total_amount),
            currency: Set(input.currency),
            status: Set(order::STATUS_PENDING.to_string()),
            payment_status: Set(order::PAYMENT_PENDING.to_string()),
            notes: Set(input.notes),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&txn)
        .await?;

        for item in input.items {
            order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(created.id),
                item_name: Set(item.item_name),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price),
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;
        Ok(created)
    }

    pub async fn get(&self, id: Uuid) -> Result<order::Model, ServiceError> {
        order::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", id)))
    }

    pub async fn items(&self, order_id: Uuid) -> Result<Vec<order_item::Model>, ServiceError> {
        Ok(order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&*self.db)
            .await?)
    }

    pub async fn list_for_client(
        &self,
        client_id: Uuid,
    ) -> Result<Vec<order::Model>, ServiceError> {
        Ok(order::Entity::find()
            .filter(order::Column::ClientId.eq(client_id))
            .order_by(order::Column::CreatedAt, SortOrder::Desc)
            .all(&*self.db)
            .await?)
    }
}
