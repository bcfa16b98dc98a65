//! Attendance routes

use crate::{
    app_state::AppState,
    error::{AppError, AppResult},
    extract::{Caller, Json},
    setups::ServerSetup,
    store::Store,
};
use axum::{
    self,
    extract::{Path, State},
    http::StatusCode,
};
use ekilisync_core::common::{
    AttendanceCorrectionRequest, AttendanceResponse, CheckInRequest, CheckOutRequest,
};
use uuid::Uuid;
use validator::Validate;

/// POST handler for checking the caller in
#[utoipa::path(
    post,
    path = "/api/v0/attendances/check-in",
    request_body = CheckInRequest,
    security(
        ("bearer" = []),
    ),
    responses(
        (status = 201, description = "Checked in", body = AttendanceResponse),
        (status = 400, description = "Outside of the office geofence, or the office has no location"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Not found"),
    )
)]
pub async fn check_in<S: ServerSetup>(
    State(state): State<AppState<S>>,
    caller: Caller,
    Json(request): Json<CheckInRequest>,
) -> AppResult<(StatusCode, Json<AttendanceResponse>)> {
    request.validate()?;

    let attendance = state.attendance().check_in(caller.id(), request).await?;

    Ok((StatusCode::CREATED, Json(attendance)))
}

/// POST handler for checking out of one of the caller's own records
#[utoipa::path(
    post,
    path = "/api/v0/attendances/{id}/check-out",
    request_body = CheckOutRequest,
    security(
        ("bearer" = []),
    ),
    responses(
        (status = 200, description = "Checked out", body = AttendanceResponse),
        (status = 400, description = "Already checked out"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Not found"),
    )
)]
pub async fn check_out<S: ServerSetup>(
    State(state): State<AppState<S>>,
    Path(attendance_id): Path<Uuid>,
    caller: Caller,
    Json(request): Json<CheckOutRequest>,
) -> AppResult<(StatusCode, Json<AttendanceResponse>)> {
    request.validate()?;

    let attendance = state
        .attendance()
        .check_out(caller.id(), attendance_id, request)
        .await?;

    Ok((StatusCode::OK, Json(attendance)))
}

/// PATCH handler for correcting the times of an attendance record
#[utoipa::path(
    patch,
    path = "/api/v0/attendances/{id}",
    request_body = AttendanceCorrectionRequest,
    security(
        ("bearer" = []),
    ),
    responses(
        (status = 200, description = "Corrected", body = AttendanceResponse),
        (status = 400, description = "Bad Request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not found"),
    )
)]
pub async fn correct<S: ServerSetup>(
    State(state): State<AppState<S>>,
    Path(attendance_id): Path<Uuid>,
    caller: Caller,
    Json(request): Json<AttendanceCorrectionRequest>,
) -> AppResult<(StatusCode, Json<AttendanceResponse>)> {
    caller.require_admin()?;

    let attendance = state
        .store
        .find_attendance(attendance_id)
        .await?
        .ok_or_else(|| AppError::not_found(attendance_id))?;

    caller.require_admin_of(attendance.office_id)?;

    let attendance = state.attendance().correct(attendance_id, request).await?;

    Ok((StatusCode::OK, Json(attendance)))
}
