use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::{ApiResponse, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/branches", get(list_branches))
        .route("/branches/:id", get(get_branch))
        .route("/branches/:id/services", get(list_services))
        .route("/branches/:id/staff", get(list_staff))
}

/// List active branches.
#[utoipa::path(
    get,
    path = "/api/v1/branches",
    tag = "catalog",
    responses((status = 200, description = "Active branches"))
)]
pub async fn list_branches(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<crate::entities::branch::Model>>>, ServiceError> {
    let branches = state.catalog.list_branches().await?;
    Ok(Json(ApiResponse::success(branches)))
}

pub async fn get_branch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<crate::entities::branch::Model>>, ServiceError> {
    let branch = state.catalog.get_branch(id).await?;
    Ok(Json(ApiResponse::success(branch)))
}

pub async fn list_services(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<crate::entities::service::Model>>>, ServiceError> {
    let services = state.catalog.list_services(id).await?;
    Ok(Json(ApiResponse::success(services)))
}

#[derive(Debug, Deserialize)]
struct StaffQuery {
    service_id: Option<Uuid>,
}

pub async fn list_staff(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<StaffQuery>,
) -> Result<Json<ApiResponse<Vec<crate::entities::staff::Model>>>, ServiceError> {
    let staff = state.catalog.list_staff(id, query.service_id).await?;
    Ok(Json(ApiResponse::success(staff)))
}
