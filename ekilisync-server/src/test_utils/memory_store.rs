//! In-process [Store] for tests

use crate::{
    models::{
        Attendance, AttendanceCorrection, AttendanceEntry, CheckOut, Employee, Identity,
        NewAttendance, NewIdentity, NewOffice, NewPasscode, NewRefreshToken, Office,
        OfficeChangeset, Passcode, RefreshToken,
    },
    store::{NewMember, Store, StoreError, StoreResult},
};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use parking_lot::RwLock;
use std::{collections::HashMap, sync::Arc};
use uuid::Uuid;

/// A [Store] that keeps all rows in memory.
///
/// Every operation holds a single lock for its whole duration, which makes
/// multi-row operations atomic and conditional updates race free.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

#[derive(Debug, Default)]
struct Tables {
    offices: HashMap<Uuid, Office>,
    identities: HashMap<Uuid, Identity>,
    employees: HashMap<Uuid, Employee>,
    passcodes: Vec<Passcode>,
    attendances: HashMap<Uuid, Attendance>,
    refresh_tokens: HashMap<String, RefreshToken>,
}

impl Tables {
    fn check_email_available(&self, email: &str) -> StoreResult<()> {
        if self.identities.values().any(|i| i.email == email) {
            return Err(StoreError::UniqueViolation(
                "identities_email_key".to_string(),
            ));
        }
        Ok(())
    }

    fn employee_of(&self, identity_id: Uuid) -> Option<&Employee> {
        self.employees
            .values()
            .find(|e| e.identity_id == identity_id)
    }

    fn revoke_refresh_token(&mut self, token: &str) -> bool {
        match self.refresh_tokens.get_mut(token) {
            Some(token) if !token.revoked => {
                token.revoked = true;
                true
            }
            _ => false,
        }
    }
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored passcodes of an identity
    pub fn passcode_count(&self, identity_id: Uuid) -> usize {
        self.tables
            .read()
            .passcodes
            .iter()
            .filter(|p| p.identity_id == identity_id)
            .count()
    }

    /// Number of stored refresh tokens of an identity
    pub fn refresh_token_count(&self, identity_id: Uuid) -> usize {
        self.tables
            .read()
            .refresh_tokens
            .values()
            .filter(|t| t.identity_id == identity_id)
            .count()
    }

    /// Number of stored identities
    pub fn identity_count(&self) -> usize {
        self.tables.read().identities.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_office(
        &self,
        office: NewOffice,
        admin: NewIdentity,
    ) -> StoreResult<(Office, Identity)> {
        let mut tables = self.tables.write();
        tables.check_email_available(&admin.email)?;

        let mut office = office.into_office();
        let admin = admin.into_identity();
        office.admin_id = Some(admin.id);

        tables.offices.insert(office.id, office.clone());
        tables.identities.insert(admin.id, admin.clone());

        Ok((office, admin))
    }

    async fn find_office(&self, id: Uuid) -> StoreResult<Option<Office>> {
        Ok(self.tables.read().offices.get(&id).cloned())
    }

    async fn update_office(
        &self,
        id: Uuid,
        changes: OfficeChangeset,
    ) -> StoreResult<Option<Office>> {
        let mut tables = self.tables.write();
        Ok(tables.offices.get_mut(&id).map(|office| {
            changes.apply_to(office);
            office.clone()
        }))
    }

    async fn create_member(&self, member: NewMember) -> StoreResult<Identity> {
        let mut tables = self.tables.write();
        tables.check_email_available(&member.identity.email)?;

        if !tables.offices.contains_key(&member.identity.office_id) {
            return Err(anyhow::anyhow!(
                "office {} does not exist",
                member.identity.office_id
            )
            .into());
        }

        let identity = member.identity.into_identity();
        let employee = member.employee.into_employee();

        tables.identities.insert(identity.id, identity.clone());
        tables.employees.insert(employee.id, employee);
        if let Some(passcode) = member.passcode {
            tables.passcodes.push(passcode.into_passcode());
        }

        Ok(identity)
    }

    async fn find_identity(&self, id: Uuid) -> StoreResult<Option<Identity>> {
        Ok(self.tables.read().identities.get(&id).cloned())
    }

    async fn find_identity_by_email(&self, email: &str) -> StoreResult<Option<Identity>> {
        Ok(self
            .tables
            .read()
            .identities
            .values()
            .find(|i| i.email == email)
            .cloned())
    }

    async fn mark_verified(&self, id: Uuid, at: NaiveDateTime) -> StoreResult<bool> {
        let mut tables = self.tables.write();
        match tables.identities.get_mut(&id) {
            Some(identity) if !identity.verified => {
                identity.verified = true;
                identity.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_password_hash(
        &self,
        id: Uuid,
        password_hash: String,
        at: NaiveDateTime,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.write();
        match tables.identities.get_mut(&id) {
            Some(identity) => {
                identity.password_hash = Some(password_hash);
                identity.updated_at = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_identity(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write();
        if tables.identities.remove(&id).is_none() {
            return Ok(false);
        }

        tables.employees.retain(|_, e| e.identity_id != id);
        tables.passcodes.retain(|p| p.identity_id != id);
        tables.attendances.retain(|_, a| a.identity_id != id);
        tables.refresh_tokens.retain(|_, t| t.identity_id != id);
        for office in tables.offices.values_mut() {
            if office.admin_id == Some(id) {
                office.admin_id = None;
            }
        }

        Ok(true)
    }

    async fn count_office_identities(&self, office_id: Uuid) -> StoreResult<i64> {
        let count = self
            .tables
            .read()
            .identities
            .values()
            .filter(|i| i.office_id == office_id)
            .count();
        Ok(count as i64)
    }

    async fn find_employee(&self, identity_id: Uuid) -> StoreResult<Option<Employee>> {
        Ok(self.tables.read().employee_of(identity_id).cloned())
    }

    async fn insert_passcode(&self, passcode: NewPasscode) -> StoreResult<Passcode> {
        let mut tables = self.tables.write();
        if !tables.identities.contains_key(&passcode.identity_id) {
            return Err(anyhow::anyhow!("identity {} does not exist", passcode.identity_id).into());
        }

        let passcode = passcode.into_passcode();
        tables.passcodes.push(passcode.clone());
        if let Some(identity) = tables.identities.get_mut(&passcode.identity_id) {
            identity.failed_otp_attempts = 0;
        }
        Ok(passcode)
    }

    async fn record_failed_otp(&self, identity_id: Uuid) -> StoreResult<Option<i32>> {
        let mut tables = self.tables.write();
        Ok(tables.identities.get_mut(&identity_id).map(|identity| {
            identity.failed_otp_attempts += 1;
            identity.failed_otp_attempts
        }))
    }

    async fn latest_passcode(
        &self,
        identity_id: Uuid,
        code: &str,
    ) -> StoreResult<Option<Passcode>> {
        Ok(self
            .tables
            .read()
            .passcodes
            .iter()
            .filter(|p| p.identity_id == identity_id && p.code == code)
            // max_by_key keeps the last maximum, so later insertions win ties
            .max_by_key(|p| p.issued_at)
            .cloned())
    }

    async fn insert_attendance(&self, attendance: NewAttendance) -> StoreResult<Attendance> {
        let mut tables = self.tables.write();
        let attendance = attendance.into_attendance();
        tables.attendances.insert(attendance.id, attendance.clone());
        Ok(attendance)
    }

    async fn find_attendance(&self, id: Uuid) -> StoreResult<Option<Attendance>> {
        Ok(self.tables.read().attendances.get(&id).cloned())
    }

    async fn list_attendance(
        &self,
        office_id: Uuid,
        from: Option<NaiveDateTime>,
        until: Option<NaiveDateTime>,
    ) -> StoreResult<Vec<AttendanceEntry>> {
        let tables = self.tables.read();
        let mut entries: Vec<AttendanceEntry> = tables
            .attendances
            .values()
            .filter(|a| a.office_id == office_id)
            .filter(|a| from.map_or(true, |from| a.checkin_time >= from))
            .filter(|a| until.map_or(true, |until| a.checkin_time < until))
            .filter_map(|a| {
                let identity = tables.identities.get(&a.identity_id)?;
                Some(AttendanceEntry {
                    attendance: a.clone(),
                    identity: identity.clone(),
                    employee_id: tables.employee_of(a.identity_id).map(|e| e.id),
                })
            })
            .collect();

        entries.sort_by_key(|e| e.attendance.checkin_time);
        Ok(entries)
    }

    async fn check_out(&self, id: Uuid, check_out: CheckOut) -> StoreResult<Option<Attendance>> {
        let mut tables = self.tables.write();
        Ok(match tables.attendances.get_mut(&id) {
            Some(attendance) if attendance.checkout_time.is_none() => {
                check_out.apply_to(attendance);
                Some(attendance.clone())
            }
            _ => None,
        })
    }

    async fn correct_attendance(
        &self,
        id: Uuid,
        correction: AttendanceCorrection,
    ) -> StoreResult<Option<Attendance>> {
        let mut tables = self.tables.write();
        Ok(tables.attendances.get_mut(&id).map(|attendance| {
            correction.apply_to(attendance);
            attendance.clone()
        }))
    }

    async fn insert_refresh_token(&self, token: NewRefreshToken) -> StoreResult<RefreshToken> {
        let mut tables = self.tables.write();
        if tables.refresh_tokens.contains_key(&token.token) {
            return Err(StoreError::UniqueViolation(
                "refresh_tokens_token_key".to_string(),
            ));
        }

        let token = token.into_refresh_token();
        tables
            .refresh_tokens
            .insert(token.token.clone(), token.clone());
        Ok(token)
    }

    async fn find_refresh_token(&self, token: &str) -> StoreResult<Option<RefreshToken>> {
        Ok(self.tables.read().refresh_tokens.get(token).cloned())
    }

    async fn revoke_refresh_token(&self, token: &str) -> StoreResult<bool> {
        Ok(self.tables.write().revoke_refresh_token(token))
    }

    async fn rotate_refresh_token(
        &self,
        old: &str,
        new: NewRefreshToken,
    ) -> StoreResult<Option<RefreshToken>> {
        let mut tables = self.tables.write();
        if tables.refresh_tokens.contains_key(&new.token) {
            return Err(StoreError::UniqueViolation(
                "refresh_tokens_token_key".to_string(),
            ));
        }
        if !tables.revoke_refresh_token(old) {
            return Ok(None);
        }

        let token = new.into_refresh_token();
        tables
            .refresh_tokens
            .insert(token.token.clone(), token.clone());
        Ok(Some(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewEmployee;
    use assert_matches::assert_matches;
    use chrono::{Duration, NaiveDate};
    use ekilisync_core::{geo::Coordinates, identity::Role};
    use testresult::TestResult;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(8, 0, 0))
            .unwrap()
    }

    async fn office_with_admin(store: &MemoryStore, email: &str) -> StoreResult<(Office, Identity)> {
        let office = NewOffice {
            id: Uuid::new_v4(),
            name: "HQ".to_string(),
            phone_number: "+1555000000".to_string(),
            latitude: Some(40.7128),
            longitude: Some(-74.0060),
            timezone: "UTC".to_string(),
            inserted_at: at(),
            updated_at: at(),
        };
        let admin = NewIdentity::new(
            office.id,
            "Admin".to_string(),
            email.to_string(),
            None,
            Role::Admin,
            at(),
        )
        .verified_with("hash".to_string());

        store.create_office(office, admin).await
    }

    fn member(office_id: Uuid, email: &str, code: Option<&str>) -> NewMember {
        let identity = NewIdentity::new(
            office_id,
            "Jane".to_string(),
            email.to_string(),
            None,
            Role::Employee,
            at(),
        );
        NewMember {
            employee: NewEmployee::new(identity.id, office_id, None, at()),
            passcode: code.map(|code| {
                NewPasscode::new(identity.id, code.to_string(), at(), Duration::minutes(10))
            }),
            identity,
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_email_is_unique() -> TestResult {
        let store = MemoryStore::new();
        let (office, _) = office_with_admin(&store, "admin@x.com").await?;

        store
            .create_member(member(office.id, "jane@x.com", Some("1234")))
            .await?;
        let result = store
            .create_member(member(office.id, "jane@x.com", Some("5678")))
            .await;

        assert_matches!(result, Err(StoreError::UniqueViolation(_)));
        assert_eq!(store.identity_count(), 2);

        let result = office_with_admin(&store, "jane@x.com").await;
        assert_matches!(result, Err(StoreError::UniqueViolation(_)));
        assert_eq!(store.identity_count(), 2);

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_mark_verified_only_once() -> TestResult {
        let store = MemoryStore::new();
        let (office, _) = office_with_admin(&store, "admin@x.com").await?;
        let identity = store
            .create_member(member(office.id, "jane@x.com", None))
            .await?;

        assert!(store.mark_verified(identity.id, at()).await?);
        assert!(!store.mark_verified(identity.id, at()).await?);
        assert!(!store.mark_verified(Uuid::new_v4(), at()).await?);

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_latest_passcode_prefers_newest() -> TestResult {
        let store = MemoryStore::new();
        let (office, _) = office_with_admin(&store, "admin@x.com").await?;
        let identity = store
            .create_member(member(office.id, "jane@x.com", Some("1234")))
            .await?;

        let later = at() + Duration::minutes(5);
        store
            .insert_passcode(NewPasscode::new(
                identity.id,
                "1234".to_string(),
                later,
                Duration::minutes(10),
            ))
            .await?;

        let latest = store.latest_passcode(identity.id, "1234").await?;
        assert_eq!(latest.map(|p| p.issued_at), Some(later));
        assert!(store.latest_passcode(identity.id, "9999").await?.is_none());

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_delete_identity_cascades() -> TestResult {
        let store = MemoryStore::new();
        let (office, _) = office_with_admin(&store, "admin@x.com").await?;
        let identity = store
            .create_member(member(office.id, "jane@x.com", Some("1234")))
            .await?;
        store
            .insert_attendance(NewAttendance::new(
                identity.id,
                office.id,
                Coordinates::new(40.7128, -74.0060),
                at(),
            ))
            .await?;
        store
            .insert_refresh_token(NewRefreshToken {
                id: Uuid::new_v4(),
                identity_id: identity.id,
                token: "a.b".to_string(),
                access_token: "jwt".to_string(),
                expires_at: at() + Duration::days(7),
                revoked: false,
                inserted_at: at(),
            })
            .await?;

        assert!(store.delete_identity(identity.id).await?);

        assert_eq!(store.passcode_count(identity.id), 0);
        assert_eq!(store.refresh_token_count(identity.id), 0);
        assert!(store.find_employee(identity.id).await?.is_none());
        assert!(store
            .list_attendance(office.id, None, None)
            .await?
            .is_empty());
        assert!(!store.delete_identity(identity.id).await?);

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_check_out_happens_once() -> TestResult {
        let store = MemoryStore::new();
        let (office, admin) = office_with_admin(&store, "admin@x.com").await?;
        let attendance = store
            .insert_attendance(NewAttendance::new(
                admin.id,
                office.id,
                Coordinates::new(40.7128, -74.0060),
                at(),
            ))
            .await?;

        let check_out = CheckOut {
            checkout_latitude: 40.7128,
            checkout_longitude: -74.0060,
            checkout_time: at() + Duration::hours(8),
            updated_at: at() + Duration::hours(8),
        };

        assert!(store
            .check_out(attendance.id, check_out.clone())
            .await?
            .is_some());
        assert!(store.check_out(attendance.id, check_out).await?.is_none());

        Ok(())
    }

    fn refresh_token(identity_id: Uuid, token: &str) -> NewRefreshToken {
        NewRefreshToken {
            id: Uuid::new_v4(),
            identity_id,
            token: token.to_string(),
            access_token: "jwt".to_string(),
            expires_at: at() + Duration::days(7),
            revoked: false,
            inserted_at: at(),
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_rotate_refresh_token_is_all_or_nothing() -> TestResult {
        let store = MemoryStore::new();
        let (_, admin) = office_with_admin(&store, "admin@x.com").await?;
        store
            .insert_refresh_token(refresh_token(admin.id, "old.token"))
            .await?;

        let rotated = store
            .rotate_refresh_token("old.token", refresh_token(admin.id, "new.token"))
            .await?;
        assert_matches!(rotated, Some(token) if token.token == "new.token");
        assert_matches!(
            store.find_refresh_token("old.token").await?,
            Some(token) if token.revoked
        );

        // The old token is spent, nothing new gets stored
        let again = store
            .rotate_refresh_token("old.token", refresh_token(admin.id, "other.token"))
            .await?;
        assert!(again.is_none());
        assert!(store.find_refresh_token("other.token").await?.is_none());

        // A clashing new token leaves the old one active
        let clash = store
            .rotate_refresh_token("new.token", refresh_token(admin.id, "old.token"))
            .await;
        assert_matches!(clash, Err(StoreError::UniqueViolation(_)));
        assert_matches!(
            store.find_refresh_token("new.token").await?,
            Some(token) if !token.revoked
        );
        assert_eq!(store.refresh_token_count(admin.id), 2);

        Ok(())
    }
}
