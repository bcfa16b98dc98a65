//! Refresh token model
use crate::db::schema::refresh_tokens;
use chrono::NaiveDateTime;
use diesel::{
    pg::Pg, ExpressionMethods, Insertable, OptionalExtension, QueryDsl, Queryable, Selectable,
    SelectableHelper,
};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

/// A freshly minted refresh token
#[derive(Clone, Insertable)]
#[diesel(table_name = refresh_tokens)]
pub struct NewRefreshToken {
    /// Record id
    pub id: Uuid,
    /// Owner
    pub identity_id: Uuid,
    /// The opaque token value
    pub token: String,
    /// The access token minted together with this one
    pub access_token: String,
    /// Expiry
    pub expires_at: NaiveDateTime,
    /// Revocation flag
    pub revoked: bool,
    /// Inserted at timestamp
    pub inserted_at: NaiveDateTime,
}

/// Refresh Token Record
#[derive(Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = refresh_tokens)]
#[diesel(check_for_backend(Pg))]
pub struct RefreshToken {
    /// Record id
    pub id: Uuid,
    /// Owner
    pub identity_id: Uuid,
    /// The opaque token value
    pub token: String,
    /// The access token minted together with this one
    pub access_token: String,
    /// Expiry
    pub expires_at: NaiveDateTime,
    /// Revocation flag. Only ever goes from `false` to `true`.
    pub revoked: bool,
    /// Inserted at timestamp
    pub inserted_at: NaiveDateTime,
}

impl std::fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshToken")
            .field("id", &self.id)
            .field("identity_id", &self.identity_id)
            .field("expires_at", &self.expires_at)
            .field("revoked", &self.revoked)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for NewRefreshToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewRefreshToken")
            .field("id", &self.id)
            .field("identity_id", &self.identity_id)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

impl NewRefreshToken {
    #[cfg(test)]
    /// Turn into the stored record
    pub fn into_refresh_token(self) -> RefreshToken {
        RefreshToken {
            id: self.id,
            identity_id: self.identity_id,
            token: self.token,
            access_token: self.access_token,
            expires_at: self.expires_at,
            revoked: self.revoked,
            inserted_at: self.inserted_at,
        }
    }
}

impl RefreshToken {
    /// Neither revoked nor expired at `now`
    pub fn is_active_at(&self, now: NaiveDateTime) -> bool {
        !self.revoked && now <= self.expires_at
    }

    /// Insert a new refresh token
    pub async fn insert(
        conn: &mut AsyncPgConnection,
        token: &NewRefreshToken,
    ) -> Result<Self, diesel::result::Error> {
        tracing::debug!(identity_id = %token.identity_id, "Inserting refresh token");

        diesel::insert_into(refresh_tokens::table)
            .values(token)
            .returning(RefreshToken::as_select())
            .get_result(conn)
            .await
    }

    /// Look a token up by its value
    pub async fn find_by_token(
        conn: &mut AsyncPgConnection,
        token: &str,
    ) -> Result<Option<Self>, diesel::result::Error> {
        refresh_tokens::table
            .filter(refresh_tokens::token.eq(token))
            .select(RefreshToken::as_select())
            .first(conn)
            .await
            .optional()
    }

    /// Flip `revoked` from `false` to `true`.
    ///
    /// Returns whether this call performed the transition.
    pub async fn revoke(
        conn: &mut AsyncPgConnection,
        token: &str,
    ) -> Result<bool, diesel::result::Error> {
        let updated = diesel::update(
            refresh_tokens::table
                .filter(refresh_tokens::token.eq(token))
                .filter(refresh_tokens::revoked.eq(false)),
        )
        .set(refresh_tokens::revoked.eq(true))
        .execute(conn)
        .await?;

        Ok(updated == 1)
    }
}
