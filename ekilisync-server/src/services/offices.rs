//! Office registration and updates

use super::{hash_password, normalize_email};
use crate::{
    app_state::AppState,
    error::{ServiceError, ServiceResult},
    models::{NewIdentity, NewOffice, OfficeChangeset},
    setups::{Clock, ServerSetup},
    store::Store,
};
use chrono_tz::Tz;
use ekilisync_core::{
    common::{OfficePatchRequest, OfficeRegistrationRequest, OfficeRegistrationResponse, OfficeSummary},
    identity::Role,
};
use uuid::Uuid;

/// Registers offices together with their first admin
pub struct Offices<'a, S: ServerSetup> {
    state: &'a AppState<S>,
}

impl<S: ServerSetup> std::fmt::Debug for Offices<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Offices").finish_non_exhaustive()
    }
}

impl<'a, S: ServerSetup> Offices<'a, S> {
    /// Offices on top of `state`
    pub fn new(state: &'a AppState<S>) -> Self {
        Self { state }
    }

    /// Register an office and its verified admin in one go
    pub async fn register(
        &self,
        request: OfficeRegistrationRequest,
    ) -> ServiceResult<OfficeRegistrationResponse> {
        let now = self.state.clock.now();
        let timezone = request.timezone.as_deref().unwrap_or("UTC");
        parse_timezone(timezone)?;

        let admin = request.admin;
        let email = normalize_email(&admin.email);
        if self.state.store.find_identity_by_email(&email).await?.is_some() {
            return Err(ServiceError::Conflict("email already in use".to_string()));
        }

        let password_hash = hash_password(self.state.passwords, admin.password).await?;

        let office = NewOffice {
            id: Uuid::new_v4(),
            name: request.name,
            phone_number: request.phone_number,
            latitude: request.location.map(|l| l.latitude),
            longitude: request.location.map(|l| l.longitude),
            timezone: timezone.to_string(),
            inserted_at: now,
            updated_at: now,
        };
        let admin = NewIdentity::new(
            office.id,
            admin.name,
            email,
            admin.phone_number,
            Role::Admin,
            now,
        )
        .verified_with(password_hash);

        let (office, admin) = self.state.store.create_office(office, admin).await?;
        tracing::info!(office_id = %office.id, admin_id = %admin.id, "Registered office");

        Ok(OfficeRegistrationResponse {
            office: office.summary(),
            admin: admin.summary(),
        })
    }

    /// Look up an office
    pub async fn get(&self, office_id: Uuid) -> ServiceResult<OfficeSummary> {
        self.state
            .store
            .find_office(office_id)
            .await?
            .map(|office| office.summary())
            .ok_or_else(|| ServiceError::not_found("Office", office_id))
    }

    /// Change name, phone number, location or time zone of an office
    pub async fn patch(
        &self,
        office_id: Uuid,
        request: OfficePatchRequest,
    ) -> ServiceResult<OfficeSummary> {
        if let Some(timezone) = &request.timezone {
            parse_timezone(timezone)?;
        }

        let changes = OfficeChangeset {
            name: request.name,
            phone_number: request.phone_number,
            latitude: request.location.map(|l| l.latitude),
            longitude: request.location.map(|l| l.longitude),
            timezone: request.timezone,
            updated_at: self.state.clock.now(),
        };

        let office = self
            .state
            .store
            .update_office(office_id, changes)
            .await?
            .ok_or_else(|| ServiceError::not_found("Office", office_id))?;

        tracing::info!(%office_id, "Updated office");
        Ok(office.summary())
    }
}

fn parse_timezone(name: &str) -> ServiceResult<Tz> {
    name.parse::<Tz>()
        .map_err(|_| ServiceError::InvalidInput(format!("unknown time zone {name}")))
}
