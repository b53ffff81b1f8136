use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::entities::appointment;
use crate::errors::ServiceError;
use crate::services::appointments::{AppointmentFilter, NewAppointment};
use crate::{ApiResponse, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/appointments", post(create_appointment).get(list_appointments))
        .route("/appointments/:id", get(get_appointment))
        .route("/appointments/:id/status", put(update_status))
        .route("/staff/:id/availability", get(availability))
}

#[derive(Debug, Deserialize)]
struct AvailabilityQuery {
    date: NaiveDate,
}

/// Free 30-minute slot starts for a staff member on a date.
#[utoipa::path(
    get,
    path = "/api/v1/staff/{id}/availability",
    tag = "appointments",
    params(
        ("id" = Uuid, Path, description = "Staff id"),
        ("date" = String, Query, description = "Date, YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "Available slot start times"),
        (status = 404, description = "Staff member not found")
    )
)]
pub async fn availability(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<ApiResponse<Vec<NaiveTime>>>, ServiceError> {
    let slots = state.availability.available_slots(id, query.date).await?;
    Ok(Json(ApiResponse::success(slots)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAppointmentRequest {
    pub branch_id: Uuid,
    pub staff_id: Uuid,
    pub service_id: Uuid,
    /// YYYY-MM-DD
    pub appointment_date: NaiveDate,
    /// HH:MM:SS, must fall on the half-hour grid
    pub start_time: NaiveTime,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

/// Book a slot. The caller becomes the client.
#[utoipa::path(
    post,
    path = "/api/v1/appointments",
    tag = "appointments",
    request_body = CreateAppointmentRequest,
    responses(
        (status = 201, description = "Appointment booked"),
        (status = 400, description = "Invalid booking request"),
        (status = 409, description = "Slot no longer available")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_appointment(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateAppointmentRequest>,
) -> Result<(axum::http::StatusCode, Json<ApiResponse<appointment::Model>>), ServiceError> {
    payload.validate()?;
    let created = state
        .appointments
        .create(NewAppointment {
            branch_id: payload.branch_id,
            client_id: auth.user_id,
            staff_id: payload.staff_id,
            service_id: payload.service_id,
            appointment_date: payload.appointment_date,
            start_time: payload.start_time,
            notes: payload.notes,
        })
        .await?;
    Ok((
        axum::http::StatusCode::CREATED,
        Json(ApiResponse::success(created)),
    ))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    branch_id: Option<Uuid>,
    staff_id: Option<Uuid>,
    status: Option<String>,
    date: Option<NaiveDate>,
}

/// Clients see their own appointments; staff and admins see everything
/// matching the filters.
pub async fn list_appointments(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<appointment::Model>>>, ServiceError> {
    let client_id = if auth.is_staff() { None } else { Some(auth.user_id) };
    let rows = state
        .appointments
        .list(AppointmentFilter {
            branch_id: query.branch_id,
            client_id,
            staff_id: query.staff_id,
            status: query.status,
            date: query.date,
        })
        .await?;
    Ok(Json(ApiResponse::success(rows)))
}

pub async fn get_appointment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<appointment::Model>>, ServiceError> {
    let appt = state.appointments.get(id).await?;
    if !auth.is_staff() && appt.client_id != auth.user_id {
        return Err(ServiceError::Forbidden(
            "You can only view your own appointments".to_string(),
        ));
    }
    Ok(Json(ApiResponse::success(appt)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateStatusRequest {
    #[validate(length(min = 1, max = 20))]
    pub status: String,
}

/// Staff move appointments through the status machine; clients may only
/// cancel their own.
#[utoipa::path(
    put,
    path = "/api/v1/appointments/{id}/status",
    tag = "appointments",
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated"),
        (status = 400, description = "Transition not allowed"),
        (status = 403, description = "Not permitted")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<appointment::Model>>, ServiceError> {
    payload.validate()?;

    if !auth.is_staff() {
        let appt = state.appointments.get(id).await?;
        if appt.client_id != auth.user_id {
            return Err(ServiceError::Forbidden(
                "You can only modify your own appointments".to_string(),
            ));
        }
        if payload.status != appointment::STATUS_CANCELLED {
            return Err(ServiceError::Forbidden(
                "Clients may only cancel appointments".to_string(),
            ));
        }
    }

    let updated = state.appointments.update_status(id, &payload.status).await?;
    Ok(Json(ApiResponse::success(updated)))
}
