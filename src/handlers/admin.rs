use axum::{extract::State, routing::get, Json, Router};

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::services::stats::AdminStats;
use crate::{ApiResponse, AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/admin/stats", get(stats))
}

/// Dashboard aggregates. Admin only.
#[utoipa::path(
    get,
    path = "/api/v1/admin/stats",
    tag = "admin",
    responses(
        (status = 200, description = "Aggregate statistics", body = AdminStats),
        (status = 403, description = "Admin role required")
    ),
    security(("bearer_auth" = []))
)]
pub async fn stats(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<AdminStats>>, ServiceError> {
    if !auth.is_admin() {
        return Err(ServiceError::Forbidden("Admin role required".to_string()));
    }
    let stats = state.stats.admin_stats().await?;
    Ok(Json(ApiResponse::success(stats)))
}
