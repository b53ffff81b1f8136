use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

pub mod pesapal;

pub use pesapal::PesapalClient;

/// Order submission payload, gateway-agnostic.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayOrderRequest {
    pub merchant_reference: String,
    pub amount: Decimal,
    pub currency: String,
    pub description: String,
    pub callback_url: String,
    pub billing_email: String,
    pub billing_phone: Option<String>,
    pub billing_name: Option<String>,
}

/// Successful submission: where to send the customer, and the gateway's
/// handle for later status queries.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySubmitResponse {
    pub order_tracking_id: String,
    pub redirect_url: String,
}

/// Raw status snapshot for one tracked transaction.
#[derive(Debug, Clone)]
pub struct GatewayTransactionStatus {
    /// Gateway status code: "1" completed, "2" failed, anything else pending.
    pub payment_status_code: String,
    pub payment_method: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    /// Full response body, persisted for audit.
    pub raw: serde_json::Value,
}

/// Outbound payment gateway operations.
///
/// The production implementation is [`PesapalClient`]; tests substitute a
/// scripted fake to exercise reconciliation without network access.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Returns the notification id to attach to order submissions.
    async fn register_ipn(&self) -> Result<String, ServiceError>;

    async fn submit_order(
        &self,
        request: &GatewayOrderRequest,
    ) -> Result<GatewaySubmitResponse, ServiceError>;

    async fn transaction_status(
        &self,
        tracking_id: &str,
    ) -> Result<GatewayTransactionStatus, ServiceError>;
}
