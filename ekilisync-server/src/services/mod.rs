//! Onboarding, attendance and auth workflows on top of [AppState].
//!
//! Services borrow the state for the duration of one request. They
//! return [ServiceError](crate::error::ServiceError)s and never raw
//! persisted records.

use crate::{app_state::AppState, crypto::PasswordHasher, error::ServiceResult, setups::ServerSetup};

pub mod attendance;
pub mod auth;
pub mod notify;
pub mod offices;
pub mod onboarding;

pub use attendance::AttendanceRecorder;
pub use auth::AuthIssuer;
pub use notify::Dispatcher;
pub use offices::Offices;
pub use onboarding::Onboarding;

impl<S: ServerSetup> AppState<S> {
    /// Employee invitation and verification
    pub fn onboarding(&self) -> Onboarding<'_, S> {
        Onboarding::new(self)
    }

    /// Check-ins, check-outs and attendance reports
    pub fn attendance(&self) -> AttendanceRecorder<'_, S> {
        AttendanceRecorder::new(self)
    }

    /// Logins and token rotation
    pub fn auth(&self) -> AuthIssuer<'_, S> {
        AuthIssuer::new(self)
    }

    /// Office registration and updates
    pub fn offices(&self) -> Offices<'_, S> {
        Offices::new(self)
    }

    /// Email and SMS fan-out
    pub fn notifications(&self) -> Dispatcher<'_, S> {
        Dispatcher::new(self)
    }
}

/// Emails are compared case-insensitively
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Hash a credential on the blocking thread pool
pub(crate) async fn hash_password(hasher: PasswordHasher, plaintext: String) -> ServiceResult<String> {
    let hash = tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
        .await
        .map_err(anyhow::Error::from)??;
    Ok(hash)
}

/// Check a credential on the blocking thread pool
pub(crate) async fn verify_password(
    hasher: PasswordHasher,
    plaintext: String,
    stored: String,
) -> ServiceResult<bool> {
    let matches = tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &stored))
        .await
        .map_err(anyhow::Error::from)?;
    Ok(matches)
}
