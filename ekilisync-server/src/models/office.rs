//! Office model
use crate::db::schema::offices;
use chrono::NaiveDateTime;
use chrono_tz::Tz;
use diesel::{
    pg::Pg, AsChangeset, ExpressionMethods, Identifiable, Insertable, OptionalExtension, QueryDsl,
    Queryable, Selectable, SelectableHelper,
};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use ekilisync_core::{
    common::{AttendedOffice, OfficeSummary},
    geo::Coordinates,
};
use uuid::Uuid;

/// New office, before its admin exists
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = offices)]
pub struct NewOffice {
    /// Office id, generated by the caller
    pub id: Uuid,
    /// Office name
    pub name: String,
    /// Office phone number
    pub phone_number: String,
    /// Geofence center latitude
    pub latitude: Option<f64>,
    /// Geofence center longitude
    pub longitude: Option<f64>,
    /// IANA time zone name
    pub timezone: String,
    /// Inserted at timestamp
    pub inserted_at: NaiveDateTime,
    /// Updated at timestamp
    pub updated_at: NaiveDateTime,
}

/// Office Record
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = offices)]
#[diesel(check_for_backend(Pg))]
pub struct Office {
    /// Office id
    pub id: Uuid,
    /// Office name
    pub name: String,
    /// Office phone number
    pub phone_number: String,
    /// Geofence center latitude
    pub latitude: Option<f64>,
    /// Geofence center longitude
    pub longitude: Option<f64>,
    /// IANA time zone name
    pub timezone: String,
    /// The admin created together with the office
    pub admin_id: Option<Uuid>,
    /// Inserted at timestamp
    pub inserted_at: NaiveDateTime,
    /// Updated at timestamp
    pub updated_at: NaiveDateTime,
}

/// The whitelisted set of office fields that can be changed after registration.
///
/// `None` fields are left untouched.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = offices)]
pub struct OfficeChangeset {
    /// New name
    pub name: Option<String>,
    /// New phone number
    pub phone_number: Option<String>,
    /// New geofence center latitude
    pub latitude: Option<f64>,
    /// New geofence center longitude
    pub longitude: Option<f64>,
    /// New IANA time zone name
    pub timezone: Option<String>,
    /// Updated at timestamp
    pub updated_at: NaiveDateTime,
}

impl NewOffice {
    #[cfg(test)]
    /// Turn into the stored record, before an admin has been linked
    pub fn into_office(self) -> Office {
        Office {
            id: self.id,
            name: self.name,
            phone_number: self.phone_number,
            latitude: self.latitude,
            longitude: self.longitude,
            timezone: self.timezone,
            admin_id: None,
            inserted_at: self.inserted_at,
            updated_at: self.updated_at,
        }
    }
}

impl OfficeChangeset {
    #[cfg(test)]
    /// Apply the changes to an in-memory record
    pub fn apply_to(&self, office: &mut Office) {
        if let Some(name) = &self.name {
            office.name = name.clone();
        }
        if let Some(phone_number) = &self.phone_number {
            office.phone_number = phone_number.clone();
        }
        if let Some(latitude) = self.latitude {
            office.latitude = Some(latitude);
        }
        if let Some(longitude) = self.longitude {
            office.longitude = Some(longitude);
        }
        if let Some(timezone) = &self.timezone {
            office.timezone = timezone.clone();
        }
        office.updated_at = self.updated_at;
    }
}

impl Office {
    /// The geofence center, if both coordinates are registered
    pub fn location(&self) -> Option<Coordinates> {
        Coordinates::from_parts(self.latitude, self.longitude)
    }

    /// The office time zone. Unknown names fall back to UTC.
    pub fn tz(&self) -> Tz {
        self.timezone.parse().unwrap_or(Tz::UTC)
    }

    /// Public projection
    pub fn summary(&self) -> OfficeSummary {
        OfficeSummary {
            id: self.id,
            name: self.name.clone(),
            phone_number: self.phone_number.clone(),
            location: self.location(),
            timezone: self.timezone.clone(),
            admin_id: self.admin_id,
            created_at: self.inserted_at,
        }
    }

    /// Projection used in attendance records
    pub fn attended(&self) -> AttendedOffice {
        AttendedOffice {
            id: self.id,
            name: self.name.clone(),
            location: self.location(),
        }
    }

    /// Insert a new office
    pub async fn insert(
        conn: &mut AsyncPgConnection,
        office: &NewOffice,
    ) -> Result<Self, diesel::result::Error> {
        tracing::debug!(office_id = %office.id, "Inserting office");

        diesel::insert_into(offices::table)
            .values(office)
            .returning(Office::as_select())
            .get_result(conn)
            .await
    }

    /// Find an office by id
    pub async fn find(
        conn: &mut AsyncPgConnection,
        id: Uuid,
    ) -> Result<Option<Self>, diesel::result::Error> {
        offices::table
            .find(id)
            .select(Office::as_select())
            .first(conn)
            .await
            .optional()
    }

    /// Link the office to its admin
    pub async fn set_admin(
        conn: &mut AsyncPgConnection,
        id: Uuid,
        admin_id: Uuid,
        at: NaiveDateTime,
    ) -> Result<Self, diesel::result::Error> {
        diesel::update(offices::table.find(id))
            .set((offices::admin_id.eq(admin_id), offices::updated_at.eq(at)))
            .returning(Office::as_select())
            .get_result(conn)
            .await
    }

    /// Apply a changeset, returning the updated office if it exists
    pub async fn update(
        conn: &mut AsyncPgConnection,
        id: Uuid,
        changes: &OfficeChangeset,
    ) -> Result<Option<Self>, diesel::result::Error> {
        diesel::update(offices::table.find(id))
            .set(changes)
            .returning(Office::as_select())
            .get_result(conn)
            .await
            .optional()
    }
}
