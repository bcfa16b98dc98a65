//! Persistence.
//!
//! Services talk to a [Store]. [PgStore] is backed by Postgres through diesel.
//! Tests run against an in-process store that enforces the same uniqueness
//! and cascade rules.

use crate::models::{
    Attendance, AttendanceCorrection, AttendanceEntry, CheckOut, Employee, Identity,
    NewAttendance, NewEmployee, NewIdentity, NewOffice, NewPasscode, NewRefreshToken, Office,
    OfficeChangeset, Passcode, RefreshToken,
};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use uuid::Uuid;

pub mod postgres;

pub use postgres::PgStore;

/// Errors reported by [Store] implementations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint was violated. Carries the constraint name.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    /// Anything else
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl From<diesel::result::Error> for StoreError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                info,
            ) => Self::UniqueViolation(
                info.constraint_name()
                    .unwrap_or_else(|| info.message())
                    .to_string(),
            ),
            err => Self::Backend(err.into()),
        }
    }
}

/// Standard return type of [Store] operations
pub type StoreResult<T> = Result<T, StoreError>;

/// A new employee identity with everything that is created along with it
#[derive(Debug, Clone)]
pub struct NewMember {
    /// The identity
    pub identity: NewIdentity,
    /// Its employee record
    pub employee: NewEmployee,
    /// The first passcode, for invited identities
    pub passcode: Option<NewPasscode>,
}

/// Persistence operations needed by the services.
///
/// Operations that touch several rows are atomic. Conditional updates
/// return whether they changed anything.
#[async_trait]
pub trait Store: Clone + Send + Sync + 'static {
    /// Check that the backend is reachable
    async fn ping(&self) -> StoreResult<()>;

    /// Insert an office and its first admin, then link the two
    async fn create_office(
        &self,
        office: NewOffice,
        admin: NewIdentity,
    ) -> StoreResult<(Office, Identity)>;

    /// Find an office by id
    async fn find_office(&self, id: Uuid) -> StoreResult<Option<Office>>;

    /// Apply whitelisted changes to an office
    async fn update_office(&self, id: Uuid, changes: OfficeChangeset)
        -> StoreResult<Option<Office>>;

    /// Insert an employee identity, its employee record and optionally its
    /// first passcode
    async fn create_member(&self, member: NewMember) -> StoreResult<Identity>;

    /// Find an identity by id
    async fn find_identity(&self, id: Uuid) -> StoreResult<Option<Identity>>;

    /// Find an identity by email
    async fn find_identity_by_email(&self, email: &str) -> StoreResult<Option<Identity>>;

    /// Flip `verified` from `false` to `true`, returning whether this call did it
    async fn mark_verified(&self, id: Uuid, at: NaiveDateTime) -> StoreResult<bool>;

    /// Replace an identity's credential hash, returning whether the identity exists
    async fn set_password_hash(
        &self,
        id: Uuid,
        password_hash: String,
        at: NaiveDateTime,
    ) -> StoreResult<bool>;

    /// Delete an identity and everything it owns, returning whether it existed
    async fn delete_identity(&self, id: Uuid) -> StoreResult<bool>;

    /// Number of identities attached to an office
    async fn count_office_identities(&self, office_id: Uuid) -> StoreResult<i64>;

    /// The employee record of an identity
    async fn find_employee(&self, identity_id: Uuid) -> StoreResult<Option<Employee>>;

    /// Store an additional passcode and clear the identity's failed attempts
    async fn insert_passcode(&self, passcode: NewPasscode) -> StoreResult<Passcode>;

    /// Count a wrong passcode for an identity, returning the new total.
    /// Returns `None` for unknown identities.
    async fn record_failed_otp(&self, identity_id: Uuid) -> StoreResult<Option<i32>>;

    /// Most recently issued passcode of `identity_id` with exactly `code`
    async fn latest_passcode(&self, identity_id: Uuid, code: &str)
        -> StoreResult<Option<Passcode>>;

    /// Store a check-in
    async fn insert_attendance(&self, attendance: NewAttendance) -> StoreResult<Attendance>;

    /// Find an attendance record by id
    async fn find_attendance(&self, id: Uuid) -> StoreResult<Option<Attendance>>;

    /// Records of an office with `from <= checkin_time < until`, oldest first
    async fn list_attendance(
        &self,
        office_id: Uuid,
        from: Option<NaiveDateTime>,
        until: Option<NaiveDateTime>,
    ) -> StoreResult<Vec<AttendanceEntry>>;

    /// Set the check-out fields if they are not set yet
    async fn check_out(&self, id: Uuid, check_out: CheckOut) -> StoreResult<Option<Attendance>>;

    /// Apply an administrative correction
    async fn correct_attendance(
        &self,
        id: Uuid,
        correction: AttendanceCorrection,
    ) -> StoreResult<Option<Attendance>>;

    /// Store a refresh token
    async fn insert_refresh_token(&self, token: NewRefreshToken) -> StoreResult<RefreshToken>;

    /// Look a refresh token up by value
    async fn find_refresh_token(&self, token: &str) -> StoreResult<Option<RefreshToken>>;

    /// Flip `revoked` from `false` to `true`, returning whether this call did it
    async fn revoke_refresh_token(&self, token: &str) -> StoreResult<bool>;

    /// Revoke `old` and store `new` in one step.
    ///
    /// Returns `None`, and stores nothing, when `old` was already revoked.
    async fn rotate_refresh_token(
        &self,
        old: &str,
        new: NewRefreshToken,
    ) -> StoreResult<Option<RefreshToken>>;
}
