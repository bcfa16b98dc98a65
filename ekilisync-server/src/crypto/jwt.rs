//! HS256 access tokens

use crate::models::Identity;
use anyhow::{bail, Result};
use chrono::{Duration, NaiveDateTime};
use ekilisync_core::identity::Role;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Claims carried by an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Identity id
    pub sub: Uuid,
    /// Identity email
    pub email: String,
    /// Identity role
    pub role: Role,
    /// Issued at, seconds since the epoch
    pub iat: i64,
    /// Expiry, seconds since the epoch
    pub exp: i64,
}

/// Signs and verifies access tokens
#[derive(Clone)]
pub struct TokenSigner {
    keys: Arc<(EncodingKey, DecodingKey)>,
    ttl: Duration,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenSigner {
    /// Create a signer from a shared secret and access token lifetime
    pub fn new(secret: &[u8], ttl: Duration) -> Result<Self> {
        if secret.is_empty() {
            bail!("the access token secret must not be empty");
        }

        Ok(Self {
            keys: Arc::new((
                EncodingKey::from_secret(secret),
                DecodingKey::from_secret(secret),
            )),
            ttl,
        })
    }

    /// Access token lifetime
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Mint an access token for `identity`, issued at `now`
    pub fn issue(&self, identity: &Identity, now: NaiveDateTime) -> Result<String> {
        let iat = now.and_utc().timestamp();
        let claims = AccessClaims {
            sub: identity.id,
            email: identity.email.clone(),
            role: identity.role(),
            iat,
            exp: iat + self.ttl.num_seconds(),
        };

        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.keys.0,
        )?)
    }

    /// Check signature and expiry of an access token.
    ///
    /// Expiry is checked against `now` rather than the system clock.
    pub fn verify(&self, token: &str, now: NaiveDateTime) -> Result<AccessClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = jsonwebtoken::decode::<AccessClaims>(token, &self.keys.1, &validation)?.claims;

        if now.and_utc().timestamp() > claims.exp {
            bail!("access token expired");
        }

        Ok(claims)
    }
}
