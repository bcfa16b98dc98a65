//! OpenAPI doc generation.

use crate::{
    error::AppError,
    routes::{attendances, auth, employees, health, identities, offices, ping},
};
use ekilisync_core::{
    common::{
        AttendanceCorrectionRequest, AttendanceResponse, AttendedOffice, Attendee, CheckInRequest,
        CheckOutRequest, DailyCounts, DeliveryReport, DeliveryStatus, EmployeeRequest,
        IdentitySummary, LoginRequest, NotifiedResponse, OfficeAdminRequest, OfficePatchRequest,
        OfficeRegistrationRequest, OfficeRegistrationResponse, OfficeSummary,
        RefreshTokenRequest, SetPasswordRequest, SuccessResponse, TokenPair,
        VerifiedIdentityResponse, VerifyOtpRequest,
    },
    geo::Coordinates,
    identity::{Role, VerificationState},
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

/// API documentation generator.
#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthcheck,
        ping::get,
        offices::register,
        offices::get,
        offices::patch,
        offices::daily_counts,
        offices::attendances,
        employees::invite,
        employees::create,
        employees::reinvite,
        auth::verify_otp,
        auth::login,
        auth::refresh,
        auth::revoke,
        auth::set_password,
        attendances::check_in,
        attendances::check_out,
        attendances::correct,
        identities::delete,
    ),
    components(
        schemas(
            AppError,
            health::HealthcheckResponse,
            Coordinates,
            Role,
            VerificationState,
            OfficeAdminRequest,
            OfficeRegistrationRequest,
            OfficeRegistrationResponse,
            OfficePatchRequest,
            OfficeSummary,
            IdentitySummary,
            EmployeeRequest,
            NotifiedResponse,
            DeliveryReport,
            DeliveryStatus,
            VerifyOtpRequest,
            VerifiedIdentityResponse,
            LoginRequest,
            RefreshTokenRequest,
            SetPasswordRequest,
            TokenPair,
            SuccessResponse,
            CheckInRequest,
            CheckOutRequest,
            AttendanceCorrectionRequest,
            AttendanceResponse,
            Attendee,
            AttendedOffice,
            DailyCounts,
        )
    ),
    modifiers(&BearerAddon),
)]

/// Tied to OpenAPI documentation.
#[derive(Debug)]
pub struct ApiDoc;

/// Utoipa addon for the bearer access token security scheme.
#[derive(Debug)]
pub struct BearerAddon;

impl Modify for BearerAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}
