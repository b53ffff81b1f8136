use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::entities::{order, order_item};
use crate::errors::ServiceError;
use crate::services::orders::{NewOrder, NewOrderItem};
use crate::{ApiResponse, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", post(create_order).get(list_orders))
        .route("/orders/:id", get(get_order))
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct OrderItemRequest {
    #[validate(length(min = 1, max = 200))]
    pub item_name: String,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1))]
    pub items: Vec<OrderItemRequest>,
    pub total_amount: Decimal,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
}

/// Create a retail order for the authenticated client.
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    tag = "orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created"),
        (status = 400, description = "Invalid order")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_order(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<(axum::http::StatusCode, Json<ApiResponse<order::Model>>), ServiceError> {
    payload.validate()?;

    let created = state
        .orders
        .create(NewOrder {
            client_id: auth.user_id,
            items: payload
                .items
                .into_iter()
                .map(|item| NewOrderItem {
                    item_name: item.item_name,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                })
                .collect(),
            total_amount: payload.total_amount,
            currency: state.config.pesapal.currency.clone(),
            notes: payload.notes,
        })
        .await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(ApiResponse::success(created)),
    ))
}

pub async fn list_orders(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<order::Model>>>, ServiceError> {
    let rows = state.orders.list_for_client(auth.user_id).await?;
    Ok(Json(ApiResponse::success(rows)))
}

pub async fn get_order(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderWithItems>>, ServiceError> {
    let order = state.orders.get(id).await?;
    if !auth.is_admin() && order.client_id != auth.user_id {
        return Err(ServiceError::Forbidden(
            "You can only view your own orders".to_string(),
        ));
    }
    let items = state.orders.items(id).await?;
    Ok(Json(ApiResponse::success(OrderWithItems { order, items })))
}
