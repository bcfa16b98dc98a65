//! Request and response data types that are common and useful between clients of and the ekiliSync server

use crate::{
    geo::Coordinates,
    identity::{Role, VerificationState},
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// The first admin of a newly registered office
#[derive(Deserialize, Serialize, Validate, Clone, Debug, ToSchema)]
pub struct OfficeAdminRequest {
    /// Display name of the admin
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Email address used to log in
    #[validate(email)]
    pub email: String,
    /// Initial password
    #[validate(length(min = 8))]
    pub password: String,
    /// Phone number, if any
    pub phone_number: Option<String>,
}

/// Office registration request
#[derive(Deserialize, Serialize, Validate, Clone, Debug, ToSchema)]
pub struct OfficeRegistrationRequest {
    /// Name of the office
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Office phone number
    pub phone_number: String,
    /// Where the office is. Without it, nobody can check in.
    #[validate]
    pub location: Option<Coordinates>,
    /// IANA time zone name, defaults to `UTC`
    pub timezone: Option<String>,
    /// The office's first admin
    #[validate]
    pub admin: OfficeAdminRequest,
}

/// Partial office update. Only these fields can ever be changed.
#[derive(Deserialize, Serialize, Validate, Clone, Debug, Default, ToSchema)]
pub struct OfficePatchRequest {
    /// New name
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    /// New phone number
    pub phone_number: Option<String>,
    /// New location
    #[validate]
    pub location: Option<Coordinates>,
    /// New IANA time zone name
    pub timezone: Option<String>,
}

/// Invite or directly create an employee
#[derive(Deserialize, Serialize, Validate, Clone, Debug, ToSchema)]
pub struct EmployeeRequest {
    /// Display name
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Email address, unique across all identities
    #[validate(email)]
    pub email: String,
    /// Office the employee joins
    pub office_id: Uuid,
    /// Phone number for SMS delivery, if any
    pub phone_number: Option<String>,
}

/// OTP verification request
#[derive(Deserialize, Serialize, Validate, Clone, Debug, ToSchema)]
pub struct VerifyOtpRequest {
    /// Email address of the invited identity
    #[validate(email)]
    pub email: String,
    /// The code that was sent out
    #[validate(length(min = 1, max = 16))]
    pub code: String,
}

/// Login request
#[derive(Deserialize, Serialize, Validate, Clone, Debug, ToSchema)]
pub struct LoginRequest {
    /// Email address
    pub email: String,
    /// Password
    pub password: String,
}

/// Refresh token rotation or revocation request
#[derive(Deserialize, Serialize, Clone, Debug, ToSchema)]
pub struct RefreshTokenRequest {
    /// The opaque refresh token
    pub refresh_token: String,
}

/// Request to set one's own password
#[derive(Deserialize, Serialize, Validate, Clone, Debug, ToSchema)]
pub struct SetPasswordRequest {
    /// The new password
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

/// Check-in request. The identity is taken from the access token.
#[derive(Deserialize, Serialize, Validate, Clone, Debug, ToSchema)]
pub struct CheckInRequest {
    /// Office to check in to. Defaults to the identity's office.
    pub office_id: Option<Uuid>,
    /// Latitude in decimal degrees
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    /// Longitude in decimal degrees
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

/// Check-out request
#[derive(Deserialize, Serialize, Validate, Clone, Debug, ToSchema)]
pub struct CheckOutRequest {
    /// Latitude in decimal degrees
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    /// Longitude in decimal degrees
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

/// Administrative correction of an attendance record
#[derive(Deserialize, Serialize, Clone, Debug, Default, ToSchema)]
pub struct AttendanceCorrectionRequest {
    /// Corrected check-in time (UTC)
    pub checkin_time: Option<NaiveDateTime>,
    /// Corrected check-out time (UTC)
    pub checkout_time: Option<NaiveDateTime>,
}

/// Date range filter for attendance listings. Both ends are inclusive.
#[derive(Deserialize, Serialize, Clone, Debug, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AttendanceRangeQuery {
    /// First day, in office local time
    pub start_date: Option<NaiveDate>,
    /// Last day, in office local time
    pub end_date: Option<NaiveDate>,
}

/// Reference day for daily counts
#[derive(Deserialize, Serialize, Clone, Debug, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DailyCountsQuery {
    /// Day in office local time, defaults to today
    pub date: Option<NaiveDate>,
}

/// Response type indiciating success
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct SuccessResponse {
    /// Whether the response was successful
    pub success: bool,
}

/// What happened to a single notification
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// Handed to the provider
    Sent,
    /// The provider failed or timed out
    Failed,
    /// Nothing to send to
    Skipped,
}

/// Delivery outcome for both notification channels
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, ToSchema)]
pub struct DeliveryReport {
    /// Email channel
    pub email: DeliveryStatus,
    /// SMS channel
    pub sms: DeliveryStatus,
}

/// Confirmation for operations that notify someone
#[derive(Serialize, Deserialize, Clone, Debug, ToSchema)]
pub struct NotifiedResponse {
    /// Human readable confirmation
    pub message: String,
    /// The identity the message is about
    pub identity_id: Uuid,
    /// Whether the notifications went out
    pub delivery: DeliveryReport,
}

/// An access and refresh token pair
#[derive(Serialize, Deserialize, Clone, Debug, ToSchema)]
pub struct TokenPair {
    /// Signed, short-lived access token
    pub access_token: String,
    /// Opaque, single-use refresh token
    pub refresh_token: String,
    /// Always `Bearer`
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Public information about an office
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, ToSchema)]
pub struct OfficeSummary {
    /// Office id
    pub id: Uuid,
    /// Office name
    pub name: String,
    /// Office phone number
    pub phone_number: String,
    /// Geofence center, if registered
    pub location: Option<Coordinates>,
    /// IANA time zone name
    pub timezone: String,
    /// The admin identity, once set
    pub admin_id: Option<Uuid>,
    /// When the office was registered
    pub created_at: NaiveDateTime,
}

/// Public information about an identity. Never contains credentials.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, ToSchema)]
pub struct IdentitySummary {
    /// Identity id
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Email address
    pub email: String,
    /// Phone number
    pub phone_number: Option<String>,
    /// Role within the office
    pub role: Role,
    /// Onboarding state
    pub verification: VerificationState,
    /// The office the identity belongs to
    pub office_id: Uuid,
}

/// Response to office registration
#[derive(Serialize, Deserialize, Clone, Debug, ToSchema)]
pub struct OfficeRegistrationResponse {
    /// The new office
    pub office: OfficeSummary,
    /// Its first admin
    pub admin: IdentitySummary,
}

/// Response to a successful OTP verification
#[derive(Serialize, Deserialize, Clone, Debug, ToSchema)]
pub struct VerifiedIdentityResponse {
    /// Signed access token. No refresh token is issued on this path.
    pub access_token: String,
    /// The now verified identity
    pub user: IdentitySummary,
    /// The identity's office
    pub office: Option<OfficeSummary>,
}

/// The identity part of an attendance record
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, ToSchema)]
pub struct Attendee {
    /// Identity id
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Email address
    pub email: String,
    /// Role within the office
    pub role: Role,
}

/// The office part of an attendance record
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, ToSchema)]
pub struct AttendedOffice {
    /// Office id
    pub id: Uuid,
    /// Office name
    pub name: String,
    /// Geofence center
    pub location: Option<Coordinates>,
}

/// Sanitized attendance record
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, ToSchema)]
pub struct AttendanceResponse {
    /// Record id
    pub id: Uuid,
    /// Who checked in
    pub user: Attendee,
    /// Where
    pub office: AttendedOffice,
    /// Employee record of the attendee, if there is one
    pub employee_id: Option<Uuid>,
    /// Check-in position
    pub checkin: Coordinates,
    /// Check-in time (UTC)
    pub checkin_time: NaiveDateTime,
    /// Check-out position, once checked out
    pub checkout: Option<Coordinates>,
    /// Check-out time (UTC), once checked out
    pub checkout_time: Option<NaiveDateTime>,
}

/// Per-office attendance counts for one day
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, ToSchema)]
pub struct DailyCounts {
    /// Office id
    pub office_id: Uuid,
    /// The day, in office local time
    pub date: NaiveDate,
    /// Identities attached to the office
    pub employee_count: i64,
    /// Distinct identities that checked in on `date`
    pub checked_in_count: i64,
    /// Distinct identities whose first check-in on `date` was late
    pub late_checked_in_count: i64,
}
