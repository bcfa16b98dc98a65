//! Identity routes

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
use ekilisync_core::common::SuccessResponse;
use uuid::Uuid;

/// DELETE handler for removing an identity and everything that hangs off it
#[utoipa::path(
    delete,
    path = "/api/v0/identities/{id}",
    security(
        ("bearer" = []),
    ),
    responses(
        (status = 200, description = "Identity removed", body = SuccessResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not found"),
    )
)]
pub async fn delete<S: ServerSetup>(
    State(state): State<AppState<S>>,
    Path(identity_id): Path<Uuid>,
    caller: Caller,
) -> AppResult<(StatusCode, Json<SuccessResponse>)> {
    caller.require_admin()?;

    let identity = state
        .store
        .find_identity(identity_id)
        .await?
        .ok_or_else(|| AppError::not_found(identity_id))?;

    caller.require_admin_of(identity.office_id)?;

    state.onboarding().remove(identity_id).await?;

    Ok((StatusCode::OK, Json(SuccessResponse { success: true })))
}
