use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::entities::payment_transaction;
use crate::errors::ServiceError;
use crate::services::payments::{PaymentLookup, PaymentReference};
use crate::{ApiResponse, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/payments/initiate", post(initiate))
        .route("/payments/callback", get(callback))
        .route("/payments/ipn", get(ipn))
        .route("/payments/status", get(status))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct InitiatePaymentRequest {
    /// Exactly one of `order_id` and `appointment_id` must be set.
    pub order_id: Option<Uuid>,
    pub appointment_id: Option<Uuid>,
    #[validate(length(max = 200))]
    pub description: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InitiatePaymentResponse {
    pub transaction_id: Uuid,
    pub merchant_reference: String,
    pub tracking_id: String,
    /// Send the customer's browser here to complete payment.
    pub redirect_url: String,
}

/// Start payment collection for an order or appointment the caller owns.
#[utoipa::path(
    post,
    path = "/api/v1/payments/initiate",
    tag = "payments",
    request_body = InitiatePaymentRequest,
    responses(
        (status = 200, description = "Payment initiated", body = InitiatePaymentResponse),
        (status = 400, description = "Invalid or zero-amount request"),
        (status = 502, description = "Gateway rejected the submission")
    ),
    security(("bearer_auth" = []))
)]
pub async fn initiate(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<InitiatePaymentRequest>,
) -> Result<Json<ApiResponse<InitiatePaymentResponse>>, ServiceError> {
    payload.validate()?;

    let (reference, owner, default_description) = match (payload.order_id, payload.appointment_id)
    {
        (Some(order_id), None) => {
            let order = state.orders.get(order_id).await?;
            (
                PaymentReference::Order(order_id),
                order.client_id,
                format!("Order {}", order_id),
            )
        }
        (None, Some(appointment_id)) => {
            let appt = state.appointments.get(appointment_id).await?;
            (
                PaymentReference::Appointment(appointment_id),
                appt.client_id,
                format!("Appointment {}", appointment_id),
            )
        }
        _ => {
            return Err(ServiceError::ValidationError(
                "Provide exactly one of order_id or appointment_id".to_string(),
            ))
        }
    };

    if !auth.is_staff() && owner != auth.user_id {
        return Err(ServiceError::Forbidden(
            "You can only pay for your own bookings".to_string(),
        ));
    }

    let description = payload.description.unwrap_or(default_description);
    let initiated = state.payments.initiate(reference, description).await?;

    Ok(Json(ApiResponse::success(InitiatePaymentResponse {
        transaction_id: initiated.transaction_id,
        merchant_reference: initiated.merchant_reference,
        tracking_id: initiated.tracking_id,
        redirect_url: initiated.redirect_url,
    })))
}

/// Identifiers the gateway (or our own callback URL parameterization)
/// attaches to inbound requests.
#[derive(Debug, Deserialize)]
struct GatewayNotificationQuery {
    #[serde(rename = "OrderTrackingId")]
    order_tracking_id: Option<String>,
    #[serde(rename = "OrderMerchantReference")]
    order_merchant_reference: Option<String>,
    merchant_reference: Option<String>,
}

impl GatewayNotificationQuery {
    fn lookup(&self) -> Result<PaymentLookup, ServiceError> {
        if let Some(reference) = self
            .merchant_reference
            .clone()
            .or_else(|| self.order_merchant_reference.clone())
        {
            return Ok(PaymentLookup::MerchantReference(reference));
        }
        if let Some(tracking_id) = self.order_tracking_id.clone() {
            return Ok(PaymentLookup::TrackingId(tracking_id));
        }
        Err(ServiceError::ValidationError(
            "Missing transaction identifier".to_string(),
        ))
    }
}

/// Browser redirect target after checkout. Reconciles and reports where the
/// transaction landed.
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<GatewayNotificationQuery>,
) -> Result<Json<ApiResponse<payment_transaction::Model>>, ServiceError> {
    let row = state.payments.reconcile(query.lookup()?).await?;
    Ok(Json(ApiResponse::success(row)))
}

/// Server-to-server IPN notification. The response echo is the shape the
/// gateway expects for an acknowledged notification.
pub async fn ipn(
    State(state): State<AppState>,
    Query(query): Query<GatewayNotificationQuery>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let row = state.payments.reconcile(query.lookup()?).await?;
    Ok(Json(json!({
        "orderNotificationType": "IPNCHANGE",
        "orderTrackingId": row.tracking_id,
        "orderMerchantReference": row.merchant_reference,
        "status": 200,
    })))
}

/// Authenticated status poll by either identifier.
#[utoipa::path(
    get,
    path = "/api/v1/payments/status",
    tag = "payments",
    params(
        ("merchant_reference" = Option<String>, Query, description = "Merchant reference"),
        ("OrderTrackingId" = Option<String>, Query, description = "Gateway tracking id")
    ),
    responses(
        (status = 200, description = "Current transaction state"),
        (status = 404, description = "Unknown transaction")
    ),
    security(("bearer_auth" = []))
)]
pub async fn status(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<GatewayNotificationQuery>,
) -> Result<Json<ApiResponse<payment_transaction::Model>>, ServiceError> {
    let row = state.payments.reconcile(query.lookup()?).await?;

    if !auth.is_staff() {
        let owns = match (row.order_id, row.appointment_id) {
            (Some(order_id), _) => state.orders.get(order_id).await?.client_id == auth.user_id,
            (_, Some(appointment_id)) => {
                state.appointments.get(appointment_id).await?.client_id == auth.user_id
            }
            _ => false,
        };
        if !owns {
            return Err(ServiceError::Forbidden(
                "You can only view your own payments".to_string(),
            ));
        }
    }

    Ok(Json(ApiResponse::success(row)))
}
