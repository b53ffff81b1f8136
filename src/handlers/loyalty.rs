use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::AuthUser;
use crate::entities::loyalty_transaction;
use crate::errors::ServiceError;
use crate::{ApiResponse, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/loyalty", get(balance))
        .route("/loyalty/history", get(history))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoyaltyBalance {
    pub points: i64,
}

pub async fn balance(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<LoyaltyBalance>>, ServiceError> {
    let points = state.loyalty.balance(auth.user_id).await?;
    Ok(Json(ApiResponse::success(LoyaltyBalance { points })))
}

pub async fn history(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<loyalty_transaction::Model>>>, ServiceError> {
    let rows = state.loyalty.history(auth.user_id).await?;
    Ok(Json(ApiResponse::success(rows)))
}
