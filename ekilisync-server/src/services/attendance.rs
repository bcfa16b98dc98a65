//! Geofenced check-ins and per-office attendance reports

use crate::{
    app_state::AppState,
    error::{ServiceError, ServiceResult},
    metrics::CHECK_INS_TOTAL,
    models::{Attendance, AttendanceCorrection, CheckOut, Identity, NewAttendance, Office},
    setups::{Clock, ServerSetup},
    store::Store,
};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use ekilisync_core::{
    common::{
        AttendanceCorrectionRequest, AttendanceRangeQuery, AttendanceResponse, CheckInRequest,
        CheckOutRequest, DailyCounts,
    },
    geo::{is_within_radius, Coordinates},
};
use std::collections::BTreeMap;
use uuid::Uuid;

const OUT_OF_RANGE: &str = "not within the allowed range to mark attendance";

/// Records check-ins against the office geofence and summarizes them
pub struct AttendanceRecorder<'a, S: ServerSetup> {
    state: &'a AppState<S>,
}

impl<S: ServerSetup> std::fmt::Debug for AttendanceRecorder<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttendanceRecorder").finish_non_exhaustive()
    }
}

impl<'a, S: ServerSetup> AttendanceRecorder<'a, S> {
    /// Recorder on top of `state`
    pub fn new(state: &'a AppState<S>) -> Self {
        Self { state }
    }

    /// Check an identity in at its office.
    ///
    /// Offices without a registered location reject every check-in.
    pub async fn check_in(
        &self,
        identity_id: Uuid,
        request: CheckInRequest,
    ) -> ServiceResult<AttendanceResponse> {
        let now = self.state.clock.now();
        let store = &self.state.store;

        let identity = self.identity(identity_id).await?;

        let office_id = request.office_id.unwrap_or(identity.office_id);
        if office_id != identity.office_id {
            return Err(ServiceError::InvalidInput(
                "identity does not belong to this office".to_string(),
            ));
        }

        let office = self.office(office_id).await?;
        let position = Coordinates::new(request.latitude, request.longitude);
        let radius = self.state.attendance_settings.geofence_radius_meters;

        let Some(center) = office.location() else {
            tracing::info!(%office_id, "Rejected check-in, office has no location");
            metrics::increment_counter!(CHECK_INS_TOTAL, "outcome" => "no_location");
            return Err(ServiceError::PolicyViolation(OUT_OF_RANGE.to_string()));
        };

        if !is_within_radius(
            position.latitude,
            position.longitude,
            center.latitude,
            center.longitude,
            radius,
        ) {
            tracing::info!(
                %identity_id,
                %office_id,
                distance = position.distance_to(&center),
                "Rejected check-in outside geofence"
            );
            metrics::increment_counter!(CHECK_INS_TOTAL, "outcome" => "out_of_range");
            return Err(ServiceError::PolicyViolation(OUT_OF_RANGE.to_string()));
        }

        let attendance = store
            .insert_attendance(NewAttendance::new(identity.id, office.id, position, now))
            .await?;
        let employee_id = store.find_employee(identity.id).await?.map(|e| e.id);

        tracing::info!(%identity_id, attendance_id = %attendance.id, "Checked in");
        metrics::increment_counter!(CHECK_INS_TOTAL, "outcome" => "accepted");

        Ok(attendance.response(&identity, &office, employee_id))
    }

    /// Set the check-out of one's own attendance record. Only possible once.
    pub async fn check_out(
        &self,
        identity_id: Uuid,
        attendance_id: Uuid,
        request: CheckOutRequest,
    ) -> ServiceResult<AttendanceResponse> {
        let now = self.state.clock.now();

        let attendance = self
            .state
            .store
            .find_attendance(attendance_id)
            .await?
            .filter(|attendance| attendance.identity_id == identity_id)
            .ok_or_else(|| ServiceError::not_found("Attendance", attendance_id))?;

        if attendance.checkout_time.is_some() {
            return Err(ServiceError::InvalidInput("already checked out".to_string()));
        }

        let check_out = CheckOut {
            checkout_latitude: request.latitude,
            checkout_longitude: request.longitude,
            checkout_time: now,
            updated_at: now,
        };

        let attendance = self
            .state
            .store
            .check_out(attendance.id, check_out)
            .await?
            .ok_or_else(|| ServiceError::InvalidInput("already checked out".to_string()))?;

        tracing::info!(%identity_id, %attendance_id, "Checked out");

        self.respond(attendance).await
    }

    /// Administrative correction of check-in and check-out times
    pub async fn correct(
        &self,
        attendance_id: Uuid,
        request: AttendanceCorrectionRequest,
    ) -> ServiceResult<AttendanceResponse> {
        if request.checkin_time.is_none() && request.checkout_time.is_none() {
            return Err(ServiceError::InvalidInput("nothing to correct".to_string()));
        }

        let attendance = self
            .state
            .store
            .find_attendance(attendance_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Attendance", attendance_id))?;

        let checkin_time = request.checkin_time.unwrap_or(attendance.checkin_time);
        let checkout_time = request.checkout_time.or(attendance.checkout_time);
        if matches!(checkout_time, Some(checkout_time) if checkout_time < checkin_time) {
            return Err(ServiceError::InvalidInput(
                "check-out must not precede check-in".to_string(),
            ));
        }

        let correction = AttendanceCorrection {
            checkin_time: request.checkin_time,
            checkout_time: request.checkout_time,
            updated_at: self.state.clock.now(),
        };

        let attendance = self
            .state
            .store
            .correct_attendance(attendance_id, correction)
            .await?
            .ok_or_else(|| ServiceError::not_found("Attendance", attendance_id))?;

        tracing::info!(%attendance_id, "Corrected attendance");

        self.respond(attendance).await
    }

    /// Attendance of an office, optionally limited to an inclusive range of
    /// days in office local time
    pub async fn list_by_office(
        &self,
        office_id: Uuid,
        range: AttendanceRangeQuery,
    ) -> ServiceResult<Vec<AttendanceResponse>> {
        let office = self.office(office_id).await?;
        let tz = office.tz();

        if let (Some(start), Some(end)) = (range.start_date, range.end_date) {
            if start > end {
                return Err(ServiceError::InvalidInput(
                    "start_date must not be after end_date".to_string(),
                ));
            }
        }

        let from = range.start_date.map(|start| day_start(tz, start));
        let until = range
            .end_date
            .map(|end| next_day_start(tz, end))
            .transpose()?;

        let entries = self
            .state
            .store
            .list_attendance(office.id, from, until)
            .await?;

        Ok(entries
            .iter()
            .map(|entry| {
                entry
                    .attendance
                    .response(&entry.identity, &office, entry.employee_id)
            })
            .collect())
    }

    /// Attendance counts of an office for one local day, today by default
    pub async fn daily_counts(
        &self,
        office_id: Uuid,
        date: Option<NaiveDate>,
    ) -> ServiceResult<DailyCounts> {
        let office = self.office(office_id).await?;
        let tz = office.tz();
        let date = date.unwrap_or_else(|| tz.from_utc_datetime(&self.state.clock.now()).date_naive());
        let late_after = self.state.attendance_settings.late_after;

        let store = &self.state.store;
        let employee_count = store.count_office_identities(office.id).await?;
        let entries = store
            .list_attendance(
                office.id,
                Some(day_start(tz, date)),
                Some(next_day_start(tz, date)?),
            )
            .await?;

        let mut first_checkins = BTreeMap::<Uuid, NaiveDateTime>::new();
        for entry in &entries {
            let checkin_time = entry.attendance.checkin_time;
            first_checkins
                .entry(entry.identity.id)
                .and_modify(|first| *first = (*first).min(checkin_time))
                .or_insert(checkin_time);
        }

        // Lateness is judged by an identity's first check-in of the day only
        let late_checked_in_count = first_checkins
            .values()
            .filter(|first| tz.from_utc_datetime(first).time() >= late_after)
            .count();

        Ok(DailyCounts {
            office_id: office.id,
            date,
            employee_count,
            checked_in_count: first_checkins.len() as i64,
            late_checked_in_count: late_checked_in_count as i64,
        })
    }

    async fn respond(&self, attendance: Attendance) -> ServiceResult<AttendanceResponse> {
        let identity = self.identity(attendance.identity_id).await?;
        let office = self.office(attendance.office_id).await?;
        let employee_id = self
            .state
            .store
            .find_employee(identity.id)
            .await?
            .map(|e| e.id);

        Ok(attendance.response(&identity, &office, employee_id))
    }

    async fn identity(&self, identity_id: Uuid) -> ServiceResult<Identity> {
        self.state
            .store
            .find_identity(identity_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Identity", identity_id))
    }

    async fn office(&self, office_id: Uuid) -> ServiceResult<Office> {
        self.state
            .store
            .find_office(office_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Office", office_id))
    }
}

/// UTC instant at which `date` begins in `tz`.
///
/// Midnight doesn't exist on some DST transition days, the first existing
/// hour is used then.
fn day_start(tz: Tz, date: NaiveDate) -> NaiveDateTime {
    (0..=2)
        .find_map(|hour| {
            let local = date.and_hms_opt(hour, 0, 0)?;
            tz.from_local_datetime(&local).earliest()
        })
        .map(|start| start.naive_utc())
        .unwrap_or_else(|| date.and_time(NaiveTime::default()))
}

fn next_day_start(tz: Tz, date: NaiveDate) -> ServiceResult<NaiveDateTime> {
    let next = date
        .succ_opt()
        .ok_or_else(|| ServiceError::InvalidInput("date out of range".to_string()))?;
    Ok(day_start(tz, next))
}
