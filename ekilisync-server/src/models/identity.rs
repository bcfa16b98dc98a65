//! Identity model
use crate::db::schema::identities;
use chrono::NaiveDateTime;
use diesel::{
    pg::Pg, ExpressionMethods, Identifiable, Insertable, OptionalExtension, QueryDsl, Queryable,
    Selectable, SelectableHelper,
};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use ekilisync_core::{
    common::{Attendee, IdentitySummary},
    identity::{Role, VerificationState},
};
use uuid::Uuid;

/// A new identity, ready to be inserted
#[derive(Clone, Insertable)]
#[diesel(table_name = identities)]
pub struct NewIdentity {
    /// Identity id, generated by the caller
    pub id: Uuid,
    /// The office this identity belongs to
    pub office_id: Uuid,
    /// Display name
    pub name: String,
    /// Email address, unique across identities
    pub email: String,
    /// Phone number
    pub phone_number: Option<String>,
    /// Role name, see [Role::as_str]
    pub role: String,
    /// Verification flag
    pub verified: bool,
    /// Hashed credential
    pub password_hash: Option<String>,
    /// Inserted at timestamp
    pub inserted_at: NaiveDateTime,
    /// Updated at timestamp
    pub updated_at: NaiveDateTime,
}

/// Identity Record
#[derive(Clone, PartialEq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = identities)]
#[diesel(check_for_backend(Pg))]
pub struct Identity {
    /// Identity id
    pub id: Uuid,
    /// The office this identity belongs to
    pub office_id: Uuid,
    /// Display name
    pub name: String,
    /// Email address, unique across identities
    pub email: String,
    /// Phone number
    pub phone_number: Option<String>,
    /// Role name, see [Role::as_str]
    pub role: String,
    /// Verification flag. Only ever goes from `false` to `true`.
    pub verified: bool,
    /// Hashed credential
    pub password_hash: Option<String>,
    /// Inserted at timestamp
    pub inserted_at: NaiveDateTime,
    /// Updated at timestamp
    pub updated_at: NaiveDateTime,
    /// Wrong passcodes entered since the last one was issued
    pub failed_otp_attempts: i32,
}

impl std::fmt::Debug for NewIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewIdentity")
            .field("id", &self.id)
            .field("office_id", &self.office_id)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("verified", &self.verified)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("office_id", &self.office_id)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("verified", &self.verified)
            .finish_non_exhaustive()
    }
}

impl NewIdentity {
    /// Prepare a new identity. `id` is generated here.
    pub fn new(
        office_id: Uuid,
        name: String,
        email: String,
        phone_number: Option<String>,
        role: Role,
        at: NaiveDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            office_id,
            name,
            email,
            phone_number,
            role: role.as_str().to_string(),
            verified: false,
            password_hash: None,
            inserted_at: at,
            updated_at: at,
        }
    }

    /// Mark as verified with the given credential
    pub fn verified_with(mut self, password_hash: String) -> Self {
        self.verified = true;
        self.password_hash = Some(password_hash);
        self
    }

    #[cfg(test)]
    /// Turn into the stored record
    pub fn into_identity(self) -> Identity {
        Identity {
            id: self.id,
            office_id: self.office_id,
            name: self.name,
            email: self.email,
            phone_number: self.phone_number,
            role: self.role,
            verified: self.verified,
            password_hash: self.password_hash,
            inserted_at: self.inserted_at,
            updated_at: self.updated_at,
            failed_otp_attempts: 0,
        }
    }
}

impl Identity {
    /// The identity's role.
    ///
    /// The column is constrained to known names; anything else is treated
    /// as the least privileged role.
    pub fn role(&self) -> Role {
        self.role.parse().unwrap_or(Role::Employee)
    }

    /// Onboarding state
    pub fn verification(&self) -> VerificationState {
        self.verified.into()
    }

    /// Public projection, without credentials
    pub fn summary(&self) -> IdentitySummary {
        IdentitySummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            phone_number: self.phone_number.clone(),
            role: self.role(),
            verification: self.verification(),
            office_id: self.office_id,
        }
    }

    /// Projection used in attendance records
    pub fn attendee(&self) -> Attendee {
        Attendee {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role(),
        }
    }

    /// Insert a new identity
    pub async fn insert(
        conn: &mut AsyncPgConnection,
        identity: &NewIdentity,
    ) -> Result<Self, diesel::result::Error> {
        tracing::debug!(identity_id = %identity.id, office_id = %identity.office_id, "Inserting identity");

        diesel::insert_into(identities::table)
            .values(identity)
            .returning(Identity::as_select())
            .get_result(conn)
            .await
    }

    /// Find an identity by id
    pub async fn find(
        conn: &mut AsyncPgConnection,
        id: Uuid,
    ) -> Result<Option<Self>, diesel::result::Error> {
        identities::table
            .find(id)
            .select(Identity::as_select())
            .first(conn)
            .await
            .optional()
    }

    /// Find an identity by its email address
    pub async fn find_by_email(
        conn: &mut AsyncPgConnection,
        email: &str,
    ) -> Result<Option<Self>, diesel::result::Error> {
        identities::table
            .filter(identities::email.eq(email))
            .select(Identity::as_select())
            .first(conn)
            .await
            .optional()
    }

    /// Flip `verified` from `false` to `true`.
    ///
    /// Returns whether this call performed the transition.
    pub async fn mark_verified(
        conn: &mut AsyncPgConnection,
        id: Uuid,
        at: NaiveDateTime,
    ) -> Result<bool, diesel::result::Error> {
        let updated = diesel::update(
            identities::table
                .filter(identities::id.eq(id))
                .filter(identities::verified.eq(false)),
        )
        .set((
            identities::verified.eq(true),
            identities::updated_at.eq(at),
        ))
        .execute(conn)
        .await?;

        Ok(updated == 1)
    }

    /// Replace the stored credential hash
    pub async fn set_password_hash(
        conn: &mut AsyncPgConnection,
        id: Uuid,
        password_hash: &str,
        at: NaiveDateTime,
    ) -> Result<bool, diesel::result::Error> {
        let updated = diesel::update(identities::table.find(id))
            .set((
                identities::password_hash.eq(password_hash),
                identities::updated_at.eq(at),
            ))
            .execute(conn)
            .await?;

        Ok(updated == 1)
    }

    /// Count a wrong passcode, returning the new number of failed attempts
    pub async fn record_failed_otp(
        conn: &mut AsyncPgConnection,
        id: Uuid,
    ) -> Result<Option<i32>, diesel::result::Error> {
        diesel::update(identities::table.find(id))
            .set(identities::failed_otp_attempts.eq(identities::failed_otp_attempts + 1))
            .returning(identities::failed_otp_attempts)
            .get_result(conn)
            .await
            .optional()
    }

    /// Forget earlier wrong passcodes
    pub async fn reset_failed_otps(
        conn: &mut AsyncPgConnection,
        id: Uuid,
    ) -> Result<(), diesel::result::Error> {
        diesel::update(identities::table.find(id))
            .set(identities::failed_otp_attempts.eq(0))
            .execute(conn)
            .await?;

        Ok(())
    }

    /// Delete an identity. Owned rows go with it through `ON DELETE CASCADE`.
    pub async fn delete(
        conn: &mut AsyncPgConnection,
        id: Uuid,
    ) -> Result<bool, diesel::result::Error> {
        let deleted = diesel::delete(identities::table.find(id))
            .execute(conn)
            .await?;

        Ok(deleted == 1)
    }

    /// Number of identities attached to an office
    pub async fn count_in_office(
        conn: &mut AsyncPgConnection,
        office_id: Uuid,
    ) -> Result<i64, diesel::result::Error> {
        identities::table
            .filter(identities::office_id.eq(office_id))
            .count()
            .get_result(conn)
            .await
    }
}
