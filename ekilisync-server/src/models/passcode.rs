//! One-time passcode model
use crate::db::schema::one_time_passcodes;
use chrono::{Duration, NaiveDateTime};
use diesel::{
    pg::Pg, ExpressionMethods, Insertable, OptionalExtension, QueryDsl, Queryable, Selectable,
    SelectableHelper,
};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

/// A freshly issued passcode
#[derive(Clone, Insertable)]
#[diesel(table_name = one_time_passcodes)]
pub struct NewPasscode {
    /// Passcode id
    pub id: Uuid,
    /// The identity the code was issued to
    pub identity_id: Uuid,
    /// The numeric code
    pub code: String,
    /// Issued at timestamp
    pub issued_at: NaiveDateTime,
    /// Last moment at which the code is still accepted
    pub expires_at: NaiveDateTime,
}

/// One-time passcode Record
#[derive(Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = one_time_passcodes)]
#[diesel(check_for_backend(Pg))]
pub struct Passcode {
    /// Passcode id
    pub id: Uuid,
    /// The identity the code was issued to
    pub identity_id: Uuid,
    /// The numeric code
    pub code: String,
    /// Issued at timestamp
    pub issued_at: NaiveDateTime,
    /// Last moment at which the code is still accepted
    pub expires_at: NaiveDateTime,
}

impl std::fmt::Debug for NewPasscode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewPasscode")
            .field("id", &self.id)
            .field("identity_id", &self.identity_id)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for Passcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Passcode")
            .field("id", &self.id)
            .field("identity_id", &self.identity_id)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

impl NewPasscode {
    /// Issue `code` to an identity at `issued_at`, valid for `ttl`
    pub fn new(identity_id: Uuid, code: String, issued_at: NaiveDateTime, ttl: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            identity_id,
            code,
            issued_at,
            expires_at: issued_at + ttl,
        }
    }

    #[cfg(test)]
    /// Turn into the stored record
    pub fn into_passcode(self) -> Passcode {
        Passcode {
            id: self.id,
            identity_id: self.identity_id,
            code: self.code,
            issued_at: self.issued_at,
            expires_at: self.expires_at,
        }
    }
}

impl Passcode {
    /// Whether the code is still accepted at `now`. The expiry instant itself is included.
    pub fn is_live_at(&self, now: NaiveDateTime) -> bool {
        now <= self.expires_at
    }

    /// Insert a new passcode
    pub async fn insert(
        conn: &mut AsyncPgConnection,
        passcode: &NewPasscode,
    ) -> Result<Self, diesel::result::Error> {
        tracing::debug!(identity_id = %passcode.identity_id, "Inserting one-time passcode");

        diesel::insert_into(one_time_passcodes::table)
            .values(passcode)
            .returning(Passcode::as_select())
            .get_result(conn)
            .await
    }

    /// The most recently issued passcode of an identity with exactly this code
    pub async fn latest_matching(
        conn: &mut AsyncPgConnection,
        identity_id: Uuid,
        code: &str,
    ) -> Result<Option<Self>, diesel::result::Error> {
        one_time_passcodes::table
            .filter(one_time_passcodes::identity_id.eq(identity_id))
            .filter(one_time_passcodes::code.eq(code))
            .order(one_time_passcodes::issued_at.desc())
            .select(Passcode::as_select())
            .first(conn)
            .await
            .optional()
    }
}
