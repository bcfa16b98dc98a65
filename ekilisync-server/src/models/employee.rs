//! Employee record model.
//!
//! Created alongside invited or directly created identities. Admins have none.
use crate::db::schema::employees;
use chrono::NaiveDateTime;
use diesel::{
    pg::Pg, ExpressionMethods, Insertable, OptionalExtension, QueryDsl, Queryable, Selectable,
    SelectableHelper,
};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

/// A new employee record
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = employees)]
pub struct NewEmployee {
    /// Record id
    pub id: Uuid,
    /// The identity this record belongs to
    pub identity_id: Uuid,
    /// The identity's office
    pub office_id: Uuid,
    /// Phone number at the time of creation
    pub phone_number: Option<String>,
    /// Inserted at timestamp
    pub inserted_at: NaiveDateTime,
}

/// Employee Record
#[derive(Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = employees)]
#[diesel(check_for_backend(Pg))]
pub struct Employee {
    /// Record id
    pub id: Uuid,
    /// The identity this record belongs to
    pub identity_id: Uuid,
    /// The identity's office
    pub office_id: Uuid,
    /// Phone number at the time of creation
    pub phone_number: Option<String>,
    /// Inserted at timestamp
    pub inserted_at: NaiveDateTime,
}

impl NewEmployee {
    /// Prepare an employee record for a new identity
    pub fn new(
        identity_id: Uuid,
        office_id: Uuid,
        phone_number: Option<String>,
        at: NaiveDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            identity_id,
            office_id,
            phone_number,
            inserted_at: at,
        }
    }

    #[cfg(test)]
    /// Turn into the stored record
    pub fn into_employee(self) -> Employee {
        Employee {
            id: self.id,
            identity_id: self.identity_id,
            office_id: self.office_id,
            phone_number: self.phone_number,
            inserted_at: self.inserted_at,
        }
    }
}

impl Employee {
    /// Insert a new employee record
    pub async fn insert(
        conn: &mut AsyncPgConnection,
        employee: &NewEmployee,
    ) -> Result<Self, diesel::result::Error> {
        diesel::insert_into(employees::table)
            .values(employee)
            .returning(Employee::as_select())
            .get_result(conn)
            .await
    }

    /// Find the employee record of an identity
    pub async fn find_by_identity(
        conn: &mut AsyncPgConnection,
        identity_id: Uuid,
    ) -> Result<Option<Self>, diesel::result::Error> {
        employees::table
            .filter(employees::identity_id.eq(identity_id))
            .select(Employee::as_select())
            .first(conn)
            .await
            .optional()
    }
}
