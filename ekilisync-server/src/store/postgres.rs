//! Postgres backed [Store]

use super::{NewMember, Store, StoreError, StoreResult};
use crate::{
    db::{self, Conn, Pool},
    models::{
        Attendance, AttendanceCorrection, AttendanceEntry, CheckOut, Employee, Identity,
        NewAttendance, NewIdentity, NewOffice, NewPasscode, NewRefreshToken, Office,
        OfficeChangeset, Passcode, RefreshToken,
    },
};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use diesel_async::{scoped_futures::ScopedFutureExt, AsyncConnection};
use uuid::Uuid;

/// [Store] on top of a diesel-async connection pool
#[derive(Clone)]
pub struct PgStore {
    pool: Pool,
}

impl std::fmt::Debug for PgStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgStore")
            .field("pool", &self.pool.state())
            .finish()
    }
}

impl PgStore {
    /// Wrap a connection pool
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// The underlying pool
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    async fn conn(&self) -> StoreResult<Conn<'_>> {
        Ok(db::connect(&self.pool).await?)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        db::schema_version(&mut conn).await?;
        Ok(())
    }

    async fn create_office(
        &self,
        office: NewOffice,
        admin: NewIdentity,
    ) -> StoreResult<(Office, Identity)> {
        let mut conn = self.conn().await?;

        conn.transaction::<_, StoreError, _>(|conn| {
            async move {
                let office = Office::insert(conn, &office).await?;
                let admin = Identity::insert(conn, &admin).await?;
                let office = Office::set_admin(conn, office.id, admin.id, admin.inserted_at).await?;
                Ok((office, admin))
            }
            .scope_boxed()
        })
        .await
    }

    async fn find_office(&self, id: Uuid) -> StoreResult<Option<Office>> {
        let mut conn = self.conn().await?;
        Ok(Office::find(&mut conn, id).await?)
    }

    async fn update_office(
        &self,
        id: Uuid,
        changes: OfficeChangeset,
    ) -> StoreResult<Option<Office>> {
        let mut conn = self.conn().await?;
        Ok(Office::update(&mut conn, id, &changes).await?)
    }

    async fn create_member(&self, member: NewMember) -> StoreResult<Identity> {
        let mut conn = self.conn().await?;

        conn.transaction::<_, StoreError, _>(|conn| {
            async move {
                let identity = Identity::insert(conn, &member.identity).await?;
                Employee::insert(conn, &member.employee).await?;
                if let Some(passcode) = &member.passcode {
                    Passcode::insert(conn, passcode).await?;
                }
                Ok(identity)
            }
            .scope_boxed()
        })
        .await
    }

    async fn find_identity(&self, id: Uuid) -> StoreResult<Option<Identity>> {
        let mut conn = self.conn().await?;
        Ok(Identity::find(&mut conn, id).await?)
    }

    async fn find_identity_by_email(&self, email: &str) -> StoreResult<Option<Identity>> {
        let mut conn = self.conn().await?;
        Ok(Identity::find_by_email(&mut conn, email).await?)
    }

    async fn mark_verified(&self, id: Uuid, at: NaiveDateTime) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        Ok(Identity::mark_verified(&mut conn, id, at).await?)
    }

    async fn set_password_hash(
        &self,
        id: Uuid,
        password_hash: String,
        at: NaiveDateTime,
    ) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        Ok(Identity::set_password_hash(&mut conn, id, &password_hash, at).await?)
    }

    async fn delete_identity(&self, id: Uuid) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        Ok(Identity::delete(&mut conn, id).await?)
    }

    async fn count_office_identities(&self, office_id: Uuid) -> StoreResult<i64> {
        let mut conn = self.conn().await?;
        Ok(Identity::count_in_office(&mut conn, office_id).await?)
    }

    async fn find_employee(&self, identity_id: Uuid) -> StoreResult<Option<Employee>> {
        let mut conn = self.conn().await?;
        Ok(Employee::find_by_identity(&mut conn, identity_id).await?)
    }

    async fn insert_passcode(&self, passcode: NewPasscode) -> StoreResult<Passcode> {
        let mut conn = self.conn().await?;

        conn.transaction::<_, StoreError, _>(|conn| {
            async move {
                let passcode = Passcode::insert(conn, &passcode).await?;
                Identity::reset_failed_otps(conn, passcode.identity_id).await?;
                Ok(passcode)
            }
            .scope_boxed()
        })
        .await
    }

    async fn record_failed_otp(&self, identity_id: Uuid) -> StoreResult<Option<i32>> {
        let mut conn = self.conn().await?;
        Ok(Identity::record_failed_otp(&mut conn, identity_id).await?)
    }

    async fn latest_passcode(
        &self,
        identity_id: Uuid,
        code: &str,
    ) -> StoreResult<Option<Passcode>> {
        let mut conn = self.conn().await?;
        Ok(Passcode::latest_matching(&mut conn, identity_id, code).await?)
    }

    async fn insert_attendance(&self, attendance: NewAttendance) -> StoreResult<Attendance> {
        let mut conn = self.conn().await?;
        Ok(Attendance::insert(&mut conn, &attendance).await?)
    }

    async fn find_attendance(&self, id: Uuid) -> StoreResult<Option<Attendance>> {
        let mut conn = self.conn().await?;
        Ok(Attendance::find(&mut conn, id).await?)
    }

    async fn list_attendance(
        &self,
        office_id: Uuid,
        from: Option<NaiveDateTime>,
        until: Option<NaiveDateTime>,
    ) -> StoreResult<Vec<AttendanceEntry>> {
        let mut conn = self.conn().await?;
        Ok(Attendance::list_for_office(&mut conn, office_id, from, until).await?)
    }

    async fn check_out(&self, id: Uuid, check_out: CheckOut) -> StoreResult<Option<Attendance>> {
        let mut conn = self.conn().await?;
        Ok(Attendance::check_out(&mut conn, id, &check_out).await?)
    }

    async fn correct_attendance(
        &self,
        id: Uuid,
        correction: AttendanceCorrection,
    ) -> StoreResult<Option<Attendance>> {
        let mut conn = self.conn().await?;
        Ok(Attendance::correct(&mut conn, id, &correction).await?)
    }

    async fn insert_refresh_token(&self, token: NewRefreshToken) -> StoreResult<RefreshToken> {
        let mut conn = self.conn().await?;
        Ok(RefreshToken::insert(&mut conn, &token).await?)
    }

    async fn find_refresh_token(&self, token: &str) -> StoreResult<Option<RefreshToken>> {
        let mut conn = self.conn().await?;
        Ok(RefreshToken::find_by_token(&mut conn, token).await?)
    }

    async fn revoke_refresh_token(&self, token: &str) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        Ok(RefreshToken::revoke(&mut conn, token).await?)
    }

    async fn rotate_refresh_token(
        &self,
        old: &str,
        new: NewRefreshToken,
    ) -> StoreResult<Option<RefreshToken>> {
        let mut conn = self.conn().await?;

        conn.transaction::<_, StoreError, _>(|conn| {
            async move {
                if !RefreshToken::revoke(conn, old).await? {
                    return Ok(None);
                }
                Ok(Some(RefreshToken::insert(conn, &new).await?))
            }
            .scope_boxed()
        })
        .await
    }
}
