//! Attendance model
use crate::{
    db::schema::{attendances, employees, identities},
    models::{Identity, Office},
};
use chrono::NaiveDateTime;
use diesel::{
    pg::Pg, AsChangeset, ExpressionMethods, Insertable, JoinOnDsl, NullableExpressionMethods,
    OptionalExtension, QueryDsl, Queryable, Selectable, SelectableHelper,
};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use ekilisync_core::{common::AttendanceResponse, geo::Coordinates};
use uuid::Uuid;

/// A new check-in
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = attendances)]
pub struct NewAttendance {
    /// Record id
    pub id: Uuid,
    /// Who checked in
    pub identity_id: Uuid,
    /// Where
    pub office_id: Uuid,
    /// Check-in latitude
    pub checkin_latitude: f64,
    /// Check-in longitude
    pub checkin_longitude: f64,
    /// Check-in time (UTC)
    pub checkin_time: NaiveDateTime,
    /// Inserted at timestamp
    pub inserted_at: NaiveDateTime,
    /// Updated at timestamp
    pub updated_at: NaiveDateTime,
}

/// Attendance Record
#[derive(Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = attendances)]
#[diesel(check_for_backend(Pg))]
pub struct Attendance {
    /// Record id
    pub id: Uuid,
    /// Who checked in
    pub identity_id: Uuid,
    /// Where
    pub office_id: Uuid,
    /// Check-in latitude
    pub checkin_latitude: f64,
    /// Check-in longitude
    pub checkin_longitude: f64,
    /// Check-in time (UTC)
    pub checkin_time: NaiveDateTime,
    /// Check-out latitude
    pub checkout_latitude: Option<f64>,
    /// Check-out longitude
    pub checkout_longitude: Option<f64>,
    /// Check-out time (UTC)
    pub checkout_time: Option<NaiveDateTime>,
    /// Inserted at timestamp
    pub inserted_at: NaiveDateTime,
    /// Updated at timestamp
    pub updated_at: NaiveDateTime,
}

/// Check-out fields, set once
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = attendances)]
pub struct CheckOut {
    /// Check-out latitude
    pub checkout_latitude: f64,
    /// Check-out longitude
    pub checkout_longitude: f64,
    /// Check-out time (UTC)
    pub checkout_time: NaiveDateTime,
    /// Updated at timestamp
    pub updated_at: NaiveDateTime,
}

/// Administrative correction. `None` fields are left untouched.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = attendances)]
pub struct AttendanceCorrection {
    /// Corrected check-in time
    pub checkin_time: Option<NaiveDateTime>,
    /// Corrected check-out time
    pub checkout_time: Option<NaiveDateTime>,
    /// Updated at timestamp
    pub updated_at: NaiveDateTime,
}

/// An attendance record together with who it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceEntry {
    /// The record
    pub attendance: Attendance,
    /// Its identity
    pub identity: Identity,
    /// The identity's employee record, if any
    pub employee_id: Option<Uuid>,
}

impl NewAttendance {
    /// Prepare a check-in at `at`
    pub fn new(identity_id: Uuid, office_id: Uuid, position: Coordinates, at: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            identity_id,
            office_id,
            checkin_latitude: position.latitude,
            checkin_longitude: position.longitude,
            checkin_time: at,
            inserted_at: at,
            updated_at: at,
        }
    }

    #[cfg(test)]
    /// Turn into the stored record
    pub fn into_attendance(self) -> Attendance {
        Attendance {
            id: self.id,
            identity_id: self.identity_id,
            office_id: self.office_id,
            checkin_latitude: self.checkin_latitude,
            checkin_longitude: self.checkin_longitude,
            checkin_time: self.checkin_time,
            checkout_latitude: None,
            checkout_longitude: None,
            checkout_time: None,
            inserted_at: self.inserted_at,
            updated_at: self.updated_at,
        }
    }
}

impl CheckOut {
    #[cfg(test)]
    /// Apply to an in-memory record
    pub fn apply_to(&self, attendance: &mut Attendance) {
        attendance.checkout_latitude = Some(self.checkout_latitude);
        attendance.checkout_longitude = Some(self.checkout_longitude);
        attendance.checkout_time = Some(self.checkout_time);
        attendance.updated_at = self.updated_at;
    }
}

impl AttendanceCorrection {
    #[cfg(test)]
    /// Apply to an in-memory record
    pub fn apply_to(&self, attendance: &mut Attendance) {
        if let Some(checkin_time) = self.checkin_time {
            attendance.checkin_time = checkin_time;
        }
        if let Some(checkout_time) = self.checkout_time {
            attendance.checkout_time = Some(checkout_time);
        }
        attendance.updated_at = self.updated_at;
    }
}

impl Attendance {
    /// Where the check-in happened
    pub fn checkin(&self) -> Coordinates {
        Coordinates::new(self.checkin_latitude, self.checkin_longitude)
    }

    /// Where the check-out happened, once it did
    pub fn checkout(&self) -> Option<Coordinates> {
        Coordinates::from_parts(self.checkout_latitude, self.checkout_longitude)
    }

    /// Sanitized projection
    pub fn response(
        &self,
        identity: &Identity,
        office: &Office,
        employee_id: Option<Uuid>,
    ) -> AttendanceResponse {
        AttendanceResponse {
            id: self.id,
            user: identity.attendee(),
            office: office.attended(),
            employee_id,
            checkin: self.checkin(),
            checkin_time: self.checkin_time,
            checkout: self.checkout(),
            checkout_time: self.checkout_time,
        }
    }

    /// Insert a new check-in
    pub async fn insert(
        conn: &mut AsyncPgConnection,
        attendance: &NewAttendance,
    ) -> Result<Self, diesel::result::Error> {
        diesel::insert_into(attendances::table)
            .values(attendance)
            .returning(Attendance::as_select())
            .get_result(conn)
            .await
    }

    /// Find a record by id
    pub async fn find(
        conn: &mut AsyncPgConnection,
        id: Uuid,
    ) -> Result<Option<Self>, diesel::result::Error> {
        attendances::table
            .find(id)
            .select(Attendance::as_select())
            .first(conn)
            .await
            .optional()
    }

    /// Records of an office with `from <= checkin_time < until`, oldest first
    pub async fn list_for_office(
        conn: &mut AsyncPgConnection,
        office_id: Uuid,
        from: Option<NaiveDateTime>,
        until: Option<NaiveDateTime>,
    ) -> Result<Vec<AttendanceEntry>, diesel::result::Error> {
        let mut query = attendances::table
            .inner_join(identities::table)
            .left_join(employees::table.on(employees::identity_id.eq(attendances::identity_id)))
            .filter(attendances::office_id.eq(office_id))
            .select((
                Attendance::as_select(),
                Identity::as_select(),
                employees::id.nullable(),
            ))
            .order(attendances::checkin_time.asc())
            .into_boxed();

        if let Some(from) = from {
            query = query.filter(attendances::checkin_time.ge(from));
        }

        if let Some(until) = until {
            query = query.filter(attendances::checkin_time.lt(until));
        }

        let rows = query
            .load::<(Attendance, Identity, Option<Uuid>)>(conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(attendance, identity, employee_id)| AttendanceEntry {
                attendance,
                identity,
                employee_id,
            })
            .collect())
    }

    /// Set the check-out fields unless they are already set.
    ///
    /// Returns `None` if the record doesn't exist or was already checked out.
    pub async fn check_out(
        conn: &mut AsyncPgConnection,
        id: Uuid,
        check_out: &CheckOut,
    ) -> Result<Option<Self>, diesel::result::Error> {
        diesel::update(
            attendances::table
                .filter(attendances::id.eq(id))
                .filter(attendances::checkout_time.is_null()),
        )
        .set(check_out)
        .returning(Attendance::as_select())
        .get_result(conn)
        .await
        .optional()
    }

    /// Apply an administrative correction
    pub async fn correct(
        conn: &mut AsyncPgConnection,
        id: Uuid,
        correction: &AttendanceCorrection,
    ) -> Result<Option<Self>, diesel::result::Error> {
        diesel::update(attendances::table.find(id))
            .set(correction)
            .returning(Attendance::as_select())
            .get_result(conn)
            .await
            .optional()
    }
}
