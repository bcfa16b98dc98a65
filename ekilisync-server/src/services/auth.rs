//! Login, token rotation and credential changes

use super::{hash_password, normalize_email, verify_password};
use crate::{
    app_state::AppState,
    crypto::{tokens::generate_refresh_token, AccessClaims},
    error::{ServiceError, ServiceResult},
    models::{Identity, NewRefreshToken},
    setups::{Clock, ServerSetup},
    store::Store,
};
use ekilisync_core::common::TokenPair;
use uuid::Uuid;

const INVALID_CREDENTIALS: &str = "invalid credentials";
const INVALID_REFRESH_TOKEN: &str = "invalid refresh token";

/// Issues access and refresh token pairs
pub struct AuthIssuer<'a, S: ServerSetup> {
    state: &'a AppState<S>,
}

impl<S: ServerSetup> std::fmt::Debug for AuthIssuer<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthIssuer").finish_non_exhaustive()
    }
}

impl<'a, S: ServerSetup> AuthIssuer<'a, S> {
    /// Issuer on top of `state`
    pub fn new(state: &'a AppState<S>) -> Self {
        Self { state }
    }

    /// Exchange email and password for a token pair.
    ///
    /// Unknown emails and wrong passwords fail the same way.
    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<TokenPair> {
        let identity = self
            .state
            .store
            .find_identity_by_email(&normalize_email(email))
            .await?;

        let Some((identity, stored)) = identity.and_then(|identity| {
            let stored = identity.password_hash.clone()?;
            Some((identity, stored))
        }) else {
            return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        };

        if !verify_password(self.state.passwords, password.to_string(), stored).await? {
            tracing::info!(identity_id = %identity.id, "Rejected login");
            return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        self.issue_pair(&identity).await
    }

    /// Trade a refresh token for a new pair. The old token is revoked and
    /// can't be used again.
    pub async fn refresh(&self, refresh_token: &str) -> ServiceResult<TokenPair> {
        let now = self.state.clock.now();
        let store = &self.state.store;
        let unauthorized = || ServiceError::Unauthorized(INVALID_REFRESH_TOKEN.to_string());

        let token = store
            .find_refresh_token(refresh_token)
            .await?
            .filter(|token| token.is_active_at(now))
            .ok_or_else(unauthorized)?;

        let identity = store
            .find_identity(token.identity_id)
            .await?
            .ok_or_else(unauthorized)?;

        let (access_token, next) = self.mint(&identity)?;
        let Some(next) = store.rotate_refresh_token(&token.token, next).await? else {
            tracing::warn!(identity_id = %identity.id, "Refresh token was rotated concurrently");
            return Err(unauthorized());
        };

        Ok(self.pair(access_token, next.token))
    }

    /// Revoke a refresh token. Unknown and already revoked tokens are fine.
    pub async fn revoke(&self, refresh_token: &str) -> ServiceResult<()> {
        if self.state.store.revoke_refresh_token(refresh_token).await? {
            tracing::info!("Revoked refresh token");
        }
        Ok(())
    }

    /// Set the credential of a verified identity
    pub async fn set_password(&self, identity_id: Uuid, password: &str) -> ServiceResult<()> {
        let now = self.state.clock.now();

        let identity = self
            .state
            .store
            .find_identity(identity_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Identity", identity_id))?;

        if !identity.verified {
            return Err(ServiceError::InvalidInput(
                "identity is not verified".to_string(),
            ));
        }

        let password_hash = hash_password(self.state.passwords, password.to_string()).await?;
        if !self
            .state
            .store
            .set_password_hash(identity.id, password_hash, now)
            .await?
        {
            return Err(ServiceError::not_found("Identity", identity_id));
        }

        tracing::info!(%identity_id, "Password changed");
        Ok(())
    }

    /// Check an access token
    pub fn authenticate(&self, access_token: &str) -> ServiceResult<AccessClaims> {
        self.state
            .tokens
            .verify(access_token, self.state.clock.now())
            .map_err(|err| {
                tracing::debug!(?err, "Rejected access token");
                ServiceError::Unauthorized("invalid access token".to_string())
            })
    }

    async fn issue_pair(&self, identity: &Identity) -> ServiceResult<TokenPair> {
        let (access_token, refresh_token) = self.mint(identity)?;
        let refresh_token = self
            .state
            .store
            .insert_refresh_token(refresh_token)
            .await?;

        Ok(self.pair(access_token, refresh_token.token))
    }

    /// A fresh access token and the refresh token bound to it, not stored yet
    fn mint(&self, identity: &Identity) -> ServiceResult<(String, NewRefreshToken)> {
        let now = self.state.clock.now();
        let access_token = self.state.tokens.issue(identity, now)?;

        let refresh_token = NewRefreshToken {
            id: Uuid::new_v4(),
            identity_id: identity.id,
            token: generate_refresh_token(),
            access_token: access_token.clone(),
            expires_at: now + self.state.refresh_token_ttl,
            revoked: false,
            inserted_at: now,
        };

        Ok((access_token, refresh_token))
    }

    fn pair(&self, access_token: String, refresh_token: String) -> TokenPair {
        TokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.state.tokens.ttl().num_seconds(),
        }
    }
}
