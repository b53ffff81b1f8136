use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::entities::review;
use crate::errors::ServiceError;
use crate::services::reviews::NewReview;
use crate::{ApiResponse, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reviews", post(create_review))
        .route("/branches/:id/reviews", get(branch_reviews))
        .route("/staff/:id/reviews", get(staff_reviews))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReviewRequest {
    pub appointment_id: Uuid,
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
    #[validate(length(max = 2000))]
    pub comment: Option<String>,
}

/// Review a completed appointment.
#[utoipa::path(
    post,
    path = "/api/v1/reviews",
    tag = "reviews",
    request_body = CreateReviewRequest,
    responses(
        (status = 201, description = "Review recorded"),
        (status = 400, description = "Appointment not completed or rating out of range"),
        (status = 409, description = "Already reviewed")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_review(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateReviewRequest>,
) -> Result<(axum::http::StatusCode, Json<ApiResponse<review::Model>>), ServiceError> {
    payload.validate()?;
    let created = state
        .reviews
        .create(NewReview {
            client_id: auth.user_id,
            appointment_id: payload.appointment_id,
            rating: payload.rating,
            comment: payload.comment,
        })
        .await?;
    Ok((
        axum::http::StatusCode::CREATED,
        Json(ApiResponse::success(created)),
    ))
}

pub async fn branch_reviews(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<review::Model>>>, ServiceError> {
    let rows = state.reviews.list_for_branch(id).await?;
    Ok(Json(ApiResponse::success(rows)))
}

pub async fn staff_reviews(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<review::Model>>>, ServiceError> {
    let rows = state.reviews.list_for_staff(id).await?;
    Ok(Json(ApiResponse::success(rows)))
}
