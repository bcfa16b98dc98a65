//! Helpers for running isolated webserver instances
use crate::{
    app_state::{AppState, AppStateBuilder},
    router::setup_app_router,
    settings::Auth,
    setups::test::{TestClock, TestNotifier, TestSetup},
    test_utils::memory_store::MemoryStore,
};
use anyhow::{anyhow, Result};
use axum::Router;
use ekilisync_core::{
    common::{EmployeeRequest, OfficeAdminRequest, OfficeRegistrationRequest, OfficeRegistrationResponse},
    geo::Coordinates,
};
use uuid::Uuid;

/// Email of the admin created by [TestContext::register_office]
pub(crate) const ADMIN_EMAIL: &str = "amina@x.com";

/// Password of every admin created by the [TestContext]
pub(crate) const ADMIN_PASSWORD: &str = "correct horse battery";

/// An isolated ekiliSync server backed by an in-memory store
#[derive(Debug)]
pub struct TestContext {
    app: Router,
    app_state: AppState<TestSetup>,
}

impl TestContext {
    /// Create a new test context
    pub fn new() -> Self {
        Self::new_with_state(|builder| builder)
    }

    pub fn new_with_state<F>(f: F) -> Self
    where
        F: FnOnce(AppStateBuilder<TestSetup>) -> AppStateBuilder<TestSetup>,
    {
        let auth = Auth {
            jwt_secret: "test-secret".to_string(),
            access_token_ttl_secs: 3600,
            refresh_token_ttl_days: 7,
            password_iterations: 1_000,
        };

        let builder = AppStateBuilder::default()
            .with_store(MemoryStore::new())
            .with_notifier(TestNotifier::default())
            .with_clock(TestClock::default())
            .with_auth_settings(auth);

        let app_state = f(builder).finalize().unwrap();

        let app = setup_app_router(app_state.clone());

        Self { app, app_state }
    }

    pub fn app(&self) -> Router {
        self.app.clone()
    }

    pub fn app_state(&self) -> &AppState<TestSetup> {
        &self.app_state
    }

    pub fn store(&self) -> &MemoryStore {
        &self.app_state.store
    }

    pub fn notifier(&self) -> &TestNotifier {
        &self.app_state.notifier
    }

    pub fn clock(&self) -> &TestClock {
        &self.app_state.clock
    }

    /// Register an office in UTC whose admin is [ADMIN_EMAIL]
    pub async fn register_office(
        &self,
        location: Option<Coordinates>,
    ) -> Result<OfficeRegistrationResponse> {
        self.register_office_as(ADMIN_EMAIL, location).await
    }

    /// Register an office in UTC with an admin of the given email
    pub async fn register_office_as(
        &self,
        admin_email: &str,
        location: Option<Coordinates>,
    ) -> Result<OfficeRegistrationResponse> {
        let request = OfficeRegistrationRequest {
            name: "HQ".to_string(),
            phone_number: "+255700000000".to_string(),
            location,
            timezone: None,
            admin: OfficeAdminRequest {
                name: "Amina".to_string(),
                email: admin_email.to_string(),
                password: ADMIN_PASSWORD.to_string(),
                phone_number: None,
            },
        };

        Ok(self.app_state.offices().register(request).await?)
    }

    /// An access token for the [ADMIN_EMAIL] admin
    pub async fn admin_token(&self) -> Result<String> {
        let tokens = self
            .app_state
            .auth()
            .login(ADMIN_EMAIL, ADMIN_PASSWORD)
            .await?;

        Ok(tokens.access_token)
    }

    /// The one-time code in the last email sent to `email`
    pub fn last_code_sent_to(&self, email: &str) -> Option<String> {
        let body = self.notifier().last_email_to(email)?;
        let (_, rest) = body.split_once("code is ")?;
        let (code, _) = rest.split_once('.')?;
        Some(code.to_string())
    }

    /// Invite an employee, returning its identity id and one-time code
    pub async fn invite(&self, office_id: Uuid, email: &str) -> Result<(Uuid, String)> {
        let name = email.split('@').next().unwrap_or(email).to_string();
        let request = EmployeeRequest {
            name,
            email: email.to_string(),
            office_id,
            phone_number: None,
        };

        let response = self.app_state.onboarding().invite(request).await?;
        let code = self
            .last_code_sent_to(email)
            .ok_or_else(|| anyhow!("no code was sent to {email}"))?;

        Ok((response.identity_id, code))
    }

    /// Invite and verify an employee, returning its identity id and access token
    pub async fn verified_employee(&self, office_id: Uuid, email: &str) -> Result<(Uuid, String)> {
        let (identity_id, code) = self.invite(office_id, email).await?;

        let verified = self
            .app_state
            .onboarding()
            .verify_otp(email, &code)
            .await?;

        Ok((identity_id, verified.access_token))
    }
}
