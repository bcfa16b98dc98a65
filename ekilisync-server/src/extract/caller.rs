//! Caller extractor

use axum::{
    async_trait,
    extract::{FromRequestParts, TypedHeader},
    headers::{authorization::Bearer, Authorization},
    http::request::Parts,
    RequestPartsExt,
};
use ekilisync_core::identity::Role;
use http::StatusCode;
use uuid::Uuid;

use crate::{
    app_state::AppState, crypto::AccessClaims, error::AppError, models::Identity,
    setups::ServerSetup, store::Store,
};

/// The identity behind a valid bearer access token.
///
/// Tokens of deleted identities are rejected.
#[derive(Debug, Clone)]
pub struct Caller {
    /// Verified token claims
    pub claims: AccessClaims,
    /// The identity as currently stored
    pub identity: Identity,
}

impl Caller {
    /// The caller's identity id
    pub fn id(&self) -> Uuid {
        self.identity.id
    }

    /// Fails with 403 unless the caller belongs to `office_id`
    pub fn require_member_of(&self, office_id: Uuid) -> Result<(), AppError> {
        if self.identity.office_id != office_id {
            return Err(AppError::forbidden("not a member of this office"));
        }
        Ok(())
    }

    /// Fails with 403 unless the caller is an admin
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.identity.role() != Role::Admin {
            return Err(AppError::forbidden("admin role required"));
        }
        Ok(())
    }

    /// Fails with 403 unless the caller is an admin of `office_id`
    pub fn require_admin_of(&self, office_id: Uuid) -> Result<(), AppError> {
        self.require_admin()?;
        self.require_member_of(office_id)
    }
}

#[async_trait]
impl<S: ServerSetup> FromRequestParts<AppState<S>> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        // Extract the token from the authorization header
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::new(StatusCode::UNAUTHORIZED, Some("Missing credentials")))?;

        let claims = state.auth().authenticate(bearer.token())?;

        let identity = state
            .store
            .find_identity(claims.sub)
            .await?
            .ok_or_else(|| AppError::new(StatusCode::UNAUTHORIZED, Some("Unknown identity")))?;

        Ok(Self { claims, identity })
    }
}
