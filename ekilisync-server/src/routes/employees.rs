//! Employee onboarding routes

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
use ekilisync_core::common::{EmployeeRequest, NotifiedResponse};
use uuid::Uuid;
use validator::Validate;

/// POST handler for inviting an employee by one-time code
#[utoipa::path(
    post,
    path = "/api/v0/employees/invite",
    request_body = EmployeeRequest,
    security(
        ("bearer" = []),
    ),
    responses(
        (status = 201, description = "Invitation created", body = NotifiedResponse),
        (status = 400, description = "Bad Request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Email already in use"),
    )
)]
pub async fn invite<S: ServerSetup>(
    State(state): State<AppState<S>>,
    caller: Caller,
    Json(request): Json<EmployeeRequest>,
) -> AppResult<(StatusCode, Json<NotifiedResponse>)> {
    caller.require_admin_of(request.office_id)?;
    request.validate()?;

    let response = state.onboarding().invite(request).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// POST handler for creating a verified employee with a generated credential
#[utoipa::path(
    post,
    path = "/api/v0/employees",
    request_body = EmployeeRequest,
    security(
        ("bearer" = []),
    ),
    responses(
        (status = 201, description = "Employee created", body = NotifiedResponse),
        (status = 400, description = "Bad Request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Email already in use"),
    )
)]
pub async fn create<S: ServerSetup>(
    State(state): State<AppState<S>>,
    caller: Caller,
    Json(request): Json<EmployeeRequest>,
) -> AppResult<(StatusCode, Json<NotifiedResponse>)> {
    caller.require_admin_of(request.office_id)?;
    request.validate()?;

    let response = state.onboarding().direct_create(request).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// POST handler for sending a fresh one-time code to a pending employee
#[utoipa::path(
    post,
    path = "/api/v0/employees/{identity_id}/reinvite",
    security(
        ("bearer" = []),
    ),
    responses(
        (status = 200, description = "Code sent", body = NotifiedResponse),
        (status = 400, description = "Already verified"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not found"),
    )
)]
pub async fn reinvite<S: ServerSetup>(
    State(state): State<AppState<S>>,
    Path(identity_id): Path<Uuid>,
    caller: Caller,
) -> AppResult<(StatusCode, Json<NotifiedResponse>)> {
    caller.require_admin()?;

    let identity = state
        .store
        .find_identity(identity_id)
        .await?
        .ok_or_else(|| AppError::not_found(identity_id))?;

    caller.require_admin_of(identity.office_id)?;

    let response = state.onboarding().re_invite(identity_id).await?;

    Ok((StatusCode::OK, Json(response)))
}
