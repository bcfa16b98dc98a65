//! Authentication routes

use crate::{
    app_state::AppState,
    error::AppResult,
    extract::{Caller, Json},
    setups::ServerSetup,
};
use axum::{self, extract::State, http::StatusCode};
use ekilisync_core::common::{
    LoginRequest, RefreshTokenRequest, SetPasswordRequest, SuccessResponse, TokenPair,
    VerifiedIdentityResponse, VerifyOtpRequest,
};
use validator::Validate;

/// POST handler for verifying an invited identity with its one-time code
#[utoipa::path(
    post,
    path = "/api/v0/auth/otp/verify",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Identity verified", body = VerifiedIdentityResponse),
        (status = 400, description = "Invalid, expired or already used code"),
        (status = 404, description = "Unknown email"),
    )
)]
pub async fn verify_otp<S: ServerSetup>(
    State(state): State<AppState<S>>,
    Json(request): Json<VerifyOtpRequest>,
) -> AppResult<(StatusCode, Json<VerifiedIdentityResponse>)> {
    request.validate()?;

    let response = state
        .onboarding()
        .verify_otp(&request.email, &request.code)
        .await?;

    Ok((StatusCode::OK, Json(response)))
}

/// POST handler for exchanging email and password for a token pair
#[utoipa::path(
    post,
    path = "/api/v0/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = TokenPair),
        (status = 401, description = "Invalid credentials"),
    )
)]
pub async fn login<S: ServerSetup>(
    State(state): State<AppState<S>>,
    Json(request): Json<LoginRequest>,
) -> AppResult<(StatusCode, Json<TokenPair>)> {
    let tokens = state
        .auth()
        .login(&request.email, &request.password)
        .await?;

    Ok((StatusCode::OK, Json(tokens)))
}

/// POST handler for rotating a refresh token
#[utoipa::path(
    post,
    path = "/api/v0/auth/refresh",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Invalid refresh token"),
    )
)]
pub async fn refresh<S: ServerSetup>(
    State(state): State<AppState<S>>,
    Json(request): Json<RefreshTokenRequest>,
) -> AppResult<(StatusCode, Json<TokenPair>)> {
    let tokens = state.auth().refresh(&request.refresh_token).await?;

    Ok((StatusCode::OK, Json(tokens)))
}

/// POST handler for revoking a refresh token
#[utoipa::path(
    post,
    path = "/api/v0/auth/revoke",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "Token revoked", body = SuccessResponse),
    )
)]
pub async fn revoke<S: ServerSetup>(
    State(state): State<AppState<S>>,
    Json(request): Json<RefreshTokenRequest>,
) -> AppResult<(StatusCode, Json<SuccessResponse>)> {
    state.auth().revoke(&request.refresh_token).await?;

    Ok((StatusCode::OK, Json(SuccessResponse { success: true })))
}

/// PUT handler for setting the caller's own password
#[utoipa::path(
    put,
    path = "/api/v0/auth/password",
    request_body = SetPasswordRequest,
    security(
        ("bearer" = []),
    ),
    responses(
        (status = 200, description = "Password set", body = SuccessResponse),
        (status = 400, description = "Bad Request"),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn set_password<S: ServerSetup>(
    State(state): State<AppState<S>>,
    caller: Caller,
    Json(request): Json<SetPasswordRequest>,
) -> AppResult<(StatusCode, Json<SuccessResponse>)> {
    request.validate()?;

    state
        .auth()
        .set_password(caller.id(), &request.password)
        .await?;

    Ok((StatusCode::OK, Json(SuccessResponse { success: true })))
}
