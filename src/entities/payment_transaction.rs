use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_FAILED: &str = "failed";
pub const STATUS_CANCELLED: &str = "cancelled";

/// One attempt to collect payment for exactly one of {order, appointment}.
///
/// `merchant_reference` correlates the attempt with the gateway and is
/// unique; `tracking_id` is assigned by the gateway once submission
/// succeeds. `completed` and `failed` are terminal: once stored, the row is
/// never re-queried against the gateway.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_id: Option<Uuid>,
    pub appointment_id: Option<Uuid>,
    #[sea_orm(unique)]
    pub merchant_reference: String,
    pub tracking_id: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub payment_status: String,
    pub payment_method: Option<String>,
    pub ipn_id: Option<String>,
    pub callback_url: Option<String>,
    #[sea_orm(column_type = "Json", nullable)]
    pub gateway_response: Option<Json>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn is_terminal(&self) -> bool {
        self.payment_status == STATUS_COMPLETED || self.payment_status == STATUS_FAILED
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
    #[sea_orm(
        belongs_to = "super::appointment::Entity",
        from = "Column::AppointmentId",
        to = "super::appointment::Column::Id"
    )]
    Appointment,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl Related<super::appointment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Appointment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
