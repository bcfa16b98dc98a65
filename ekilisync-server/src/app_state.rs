//! The Axum Application State

use crate::{
    crypto::{PasswordHasher, TokenSigner},
    settings::{self, Settings},
    setups::ServerSetup,
};
use anyhow::{anyhow, Result};
use chrono::Duration;
use std::sync::Arc;

#[derive(Clone)]
/// Global application route state.
pub struct AppState<S: ServerSetup> {
    /// Persistence for all records
    pub store: S::Store,
    /// The service that sends emails and text messages
    pub notifier: S::Notifier,
    /// Source of the current time
    pub clock: S::Clock,
    /// Signs and verifies access tokens
    pub tokens: TokenSigner,
    /// Hashes and verifies credentials
    pub passwords: PasswordHasher,
    /// Refresh token lifetime
    pub refresh_token_ttl: Duration,
    /// OTP and temporary credential settings
    pub onboarding_settings: Arc<settings::Onboarding>,
    /// Geofence and lateness settings
    pub attendance_settings: Arc<settings::Attendance>,
    /// Notification dispatch settings
    pub notification_settings: Arc<settings::Notifications>,
}

/// Builder for [`AppState`]
#[derive(Debug)]
pub struct AppStateBuilder<S: ServerSetup> {
    store: Option<S::Store>,
    notifier: Option<S::Notifier>,
    clock: Option<S::Clock>,
    auth: Option<settings::Auth>,
    onboarding: settings::Onboarding,
    attendance: settings::Attendance,
    notifications: settings::Notifications,
}

impl<S: ServerSetup> Default for AppStateBuilder<S> {
    fn default() -> Self {
        Self {
            store: None,
            notifier: None,
            clock: None,
            auth: None,
            onboarding: Default::default(),
            attendance: Default::default(),
            notifications: Default::default(),
        }
    }
}

impl<S: ServerSetup> AppStateBuilder<S> {
    /// Finalize the builder and return the [`AppState`]
    pub fn finalize(self) -> Result<AppState<S>> {
        let store = self.store.ok_or_else(|| anyhow!("store is required"))?;

        let notifier = self
            .notifier
            .ok_or_else(|| anyhow!("notifier is required"))?;

        let clock = self.clock.ok_or_else(|| anyhow!("clock is required"))?;

        let auth = self
            .auth
            .ok_or_else(|| anyhow!("auth settings are required"))?;

        let tokens = TokenSigner::new(
            auth.jwt_secret.as_bytes(),
            Duration::seconds(auth.access_token_ttl_secs),
        )?;
        let passwords = PasswordHasher::new(auth.password_iterations)?;

        Ok(AppState {
            store,
            notifier,
            clock,
            tokens,
            passwords,
            refresh_token_ttl: Duration::days(auth.refresh_token_ttl_days),
            onboarding_settings: Arc::new(self.onboarding),
            attendance_settings: Arc::new(self.attendance),
            notification_settings: Arc::new(self.notifications),
        })
    }

    /// Take auth, onboarding, attendance and notification settings
    pub fn with_settings(self, settings: &Settings) -> Self {
        self.with_auth_settings(settings.auth.clone())
            .with_onboarding_settings(settings.onboarding.clone())
            .with_attendance_settings(settings.attendance.clone())
            .with_notification_settings(settings.notifications.clone())
    }

    /// Set the store
    pub fn with_store(mut self, store: S::Store) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the service that sends emails and text messages
    pub fn with_notifier(mut self, notifier: S::Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Set the clock
    pub fn with_clock(mut self, clock: S::Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set token and credential settings
    pub fn with_auth_settings(mut self, auth: settings::Auth) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Set onboarding settings
    pub fn with_onboarding_settings(mut self, onboarding: settings::Onboarding) -> Self {
        self.onboarding = onboarding;
        self
    }

    /// Set attendance settings
    pub fn with_attendance_settings(mut self, attendance: settings::Attendance) -> Self {
        self.attendance = attendance;
        self
    }

    /// Set notification settings
    pub fn with_notification_settings(mut self, notifications: settings::Notifications) -> Self {
        self.notifications = notifications;
        self
    }
}

impl<S> std::fmt::Debug for AppState<S>
where
    S: ServerSetup,
    S::Store: std::fmt::Debug,
    S::Notifier: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("store", &self.store)
            .field("notifier", &self.notifier)
            .field("tokens", &self.tokens)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("onboarding_settings", &self.onboarding_settings)
            .field("attendance_settings", &self.attendance_settings)
            .field("notification_settings", &self.notification_settings)
            .finish()
    }
}
