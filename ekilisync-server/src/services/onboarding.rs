//! Employee onboarding.
//!
//! An invited identity starts out pending, gets one or more time-boxed
//! passcodes and becomes verified exactly once. Directly created
//! identities skip the passcode and are verified from the start.

use super::{hash_password, normalize_email, Dispatcher};
use crate::{
    app_state::AppState,
    crypto::tokens::{generate_otp, generate_temporary_password},
    error::{ServiceError, ServiceResult},
    models::{Identity, NewEmployee, NewIdentity, NewPasscode, Office},
    setups::{Clock, ServerSetup},
    store::{NewMember, Store},
};
use chrono::{Duration, NaiveDateTime};
use ekilisync_core::{
    common::{DeliveryReport, EmployeeRequest, NotifiedResponse, VerifiedIdentityResponse},
    identity::Role,
};
use uuid::Uuid;

/// Drives identities from invited to verified
pub struct Onboarding<'a, S: ServerSetup> {
    state: &'a AppState<S>,
}

impl<S: ServerSetup> std::fmt::Debug for Onboarding<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Onboarding").finish_non_exhaustive()
    }
}

impl<'a, S: ServerSetup> Onboarding<'a, S> {
    /// Onboarding on top of `state`
    pub fn new(state: &'a AppState<S>) -> Self {
        Self { state }
    }

    /// Create a pending identity in an existing office and send it a passcode.
    ///
    /// The identity, its employee record and the passcode are stored before
    /// anything is sent. Delivery failures show up in the returned report.
    pub async fn invite(&self, request: EmployeeRequest) -> ServiceResult<NotifiedResponse> {
        let now = self.state.clock.now();
        let email = normalize_email(&request.email);

        let office = self.existing_office(request.office_id).await?;
        self.ensure_email_available(&email).await?;

        let identity = NewIdentity::new(
            office.id,
            request.name,
            email,
            request.phone_number.clone(),
            Role::Employee,
            now,
        );
        let code = generate_otp(self.state.onboarding_settings.otp_digits);
        let member = NewMember {
            employee: NewEmployee::new(identity.id, office.id, request.phone_number, now),
            passcode: Some(self.new_passcode(identity.id, code.clone(), now)),
            identity,
        };

        let identity = self.state.store.create_member(member).await?;
        tracing::info!(identity_id = %identity.id, office_id = %office.id, "Invited employee");

        let delivery = self.send_code(&identity, &code).await;

        Ok(NotifiedResponse {
            message: format!("Verification code sent to {}", identity.email),
            identity_id: identity.id,
            delivery,
        })
    }

    /// Issue a fresh passcode to a pending identity. Earlier passcodes stay valid
    /// until they expire.
    pub async fn re_invite(&self, identity_id: Uuid) -> ServiceResult<NotifiedResponse> {
        let now = self.state.clock.now();

        let identity = self
            .state
            .store
            .find_identity(identity_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Identity", identity_id))?;

        if identity.verified {
            return Err(ServiceError::AlreadyInTerminalState(
                "already verified".to_string(),
            ));
        }

        let code = generate_otp(self.state.onboarding_settings.otp_digits);
        self.state
            .store
            .insert_passcode(self.new_passcode(identity.id, code.clone(), now))
            .await?;
        tracing::info!(identity_id = %identity.id, "Re-invited employee");

        let delivery = self.send_code(&identity, &code).await;

        Ok(NotifiedResponse {
            message: format!("Verification code sent to {}", identity.email),
            identity_id: identity.id,
            delivery,
        })
    }

    /// Check a passcode and verify its identity.
    ///
    /// Only an access token is returned on this path, no refresh token.
    pub async fn verify_otp(
        &self,
        email: &str,
        code: &str,
    ) -> ServiceResult<VerifiedIdentityResponse> {
        let now = self.state.clock.now();
        let store = &self.state.store;

        let identity = store
            .find_identity_by_email(&normalize_email(email))
            .await?
            .ok_or_else(|| ServiceError::NotFound("no identity with this email".to_string()))?;

        if identity.verified {
            return Err(ServiceError::AlreadyInTerminalState(
                "already verified".to_string(),
            ));
        }

        if identity.failed_otp_attempts >= self.state.onboarding_settings.max_otp_attempts {
            tracing::warn!(identity_id = %identity.id, "Passcode attempts exhausted");
            return Err(ServiceError::InvalidInput(
                "too many failed attempts, ask for a new OTP".to_string(),
            ));
        }

        let Some(passcode) = store.latest_passcode(identity.id, code.trim()).await? else {
            store.record_failed_otp(identity.id).await?;
            return Err(ServiceError::InvalidInput("invalid OTP".to_string()));
        };

        if !passcode.is_live_at(now) {
            return Err(ServiceError::InvalidInput("OTP expired".to_string()));
        }

        if !store.mark_verified(identity.id, now).await? {
            return Err(ServiceError::AlreadyInTerminalState(
                "already verified".to_string(),
            ));
        }

        let identity = Identity {
            verified: true,
            updated_at: now,
            ..identity
        };
        tracing::info!(identity_id = %identity.id, "Verified identity");

        let access_token = self.state.tokens.issue(&identity, now)?;
        let office = store
            .find_office(identity.office_id)
            .await?
            .map(|office| office.summary());

        Ok(VerifiedIdentityResponse {
            access_token,
            user: identity.summary(),
            office,
        })
    }

    /// Create a verified identity with a generated credential and send that
    /// credential to it.
    pub async fn direct_create(&self, request: EmployeeRequest) -> ServiceResult<NotifiedResponse> {
        let now = self.state.clock.now();
        let email = normalize_email(&request.email);

        let office = self.existing_office(request.office_id).await?;
        self.ensure_email_available(&email).await?;

        let password =
            generate_temporary_password(self.state.onboarding_settings.temporary_password_length);
        let password_hash = hash_password(self.state.passwords, password.clone()).await?;

        let identity = NewIdentity::new(
            office.id,
            request.name,
            email,
            request.phone_number.clone(),
            Role::Employee,
            now,
        )
        .verified_with(password_hash);
        let member = NewMember {
            employee: NewEmployee::new(identity.id, office.id, request.phone_number, now),
            passcode: None,
            identity,
        };

        let identity = self.state.store.create_member(member).await?;
        tracing::info!(identity_id = %identity.id, office_id = %office.id, "Created employee");

        let product = &self.state.onboarding_settings.product_name;
        let delivery = self
            .dispatcher()
            .deliver(
                &identity,
                &format!("Your {product} account"),
                &format!(
                    "Hello {}, an account was created for you. Sign in with {} and the temporary password {password}.",
                    identity.name, identity.email
                ),
            )
            .await;

        Ok(NotifiedResponse {
            message: format!("Credentials sent to {}", identity.email),
            identity_id: identity.id,
            delivery,
        })
    }

    /// Delete an identity together with its passcodes, tokens, employee
    /// record and attendance records.
    pub async fn remove(&self, identity_id: Uuid) -> ServiceResult<()> {
        if !self.state.store.delete_identity(identity_id).await? {
            return Err(ServiceError::not_found("Identity", identity_id));
        }

        tracing::info!(%identity_id, "Removed identity");
        Ok(())
    }

    async fn existing_office(&self, office_id: Uuid) -> ServiceResult<Office> {
        self.state
            .store
            .find_office(office_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Office", office_id))
    }

    // The unique index is what actually guarantees this, see `StoreError::UniqueViolation`.
    async fn ensure_email_available(&self, email: &str) -> ServiceResult<()> {
        match self.state.store.find_identity_by_email(email).await? {
            Some(_) => Err(ServiceError::Conflict("email already in use".to_string())),
            None => Ok(()),
        }
    }

    fn new_passcode(&self, identity_id: Uuid, code: String, now: NaiveDateTime) -> NewPasscode {
        let ttl = Duration::seconds(self.state.onboarding_settings.otp_ttl_secs);
        NewPasscode::new(identity_id, code, now, ttl)
    }

    async fn send_code(&self, identity: &Identity, code: &str) -> DeliveryReport {
        let settings = &self.state.onboarding_settings;
        let minutes = settings.otp_ttl_secs / 60;

        self.dispatcher()
            .deliver(
                identity,
                &format!("Your {} verification code", settings.product_name),
                &format!(
                    "Hello {}, your {} verification code is {code}. It expires in {minutes} minutes.",
                    identity.name, settings.product_name
                ),
            )
            .await
    }

    fn dispatcher(&self) -> Dispatcher<'a, S> {
        Dispatcher::new(self.state)
    }
}
