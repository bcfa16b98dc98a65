//! Office Routes

use crate::{
    app_state::AppState,
    error::AppResult,
    extract::{Caller, Json},
    setups::ServerSetup,
};
use axum::{
    self,
    extract::{Path, Query, State},
    http::StatusCode,
};
use ekilisync_core::common::{
    AttendanceRangeQuery, AttendanceResponse, DailyCounts, DailyCountsQuery, OfficePatchRequest,
    OfficeRegistrationRequest, OfficeRegistrationResponse, OfficeSummary,
};
use uuid::Uuid;
use validator::Validate;

/// POST handler for registering an office with its first admin
#[utoipa::path(
    post,
    path = "/api/v0/offices",
    request_body = OfficeRegistrationRequest,
    responses(
        (status = 201, description = "Successfully registered office", body = OfficeRegistrationResponse),
        (status = 400, description = "Bad Request"),
        (status = 409, description = "Admin email already in use"),
    )
)]
pub async fn register<S: ServerSetup>(
    State(state): State<AppState<S>>,
    Json(request): Json<OfficeRegistrationRequest>,
) -> AppResult<(StatusCode, Json<OfficeRegistrationResponse>)> {
    request.validate()?;

    let response = state.offices().register(request).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// GET handler for an office summary
#[utoipa::path(
    get,
    path = "/api/v0/offices/{id}",
    security(
        ("bearer" = []),
    ),
    responses(
        (status = 200, description = "Found office", body = OfficeSummary),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not found"),
    )
)]
pub async fn get<S: ServerSetup>(
    State(state): State<AppState<S>>,
    Path(office_id): Path<Uuid>,
    caller: Caller,
) -> AppResult<(StatusCode, Json<OfficeSummary>)> {
    caller.require_member_of(office_id)?;

    let office = state.offices().get(office_id).await?;

    Ok((StatusCode::OK, Json(office)))
}

/// PATCH handler for changing an office
#[utoipa::path(
    patch,
    path = "/api/v0/offices/{id}",
    request_body = OfficePatchRequest,
    security(
        ("bearer" = []),
    ),
    responses(
        (status = 200, description = "Updated office", body = OfficeSummary),
        (status = 400, description = "Bad Request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not found"),
    )
)]
pub async fn patch<S: ServerSetup>(
    State(state): State<AppState<S>>,
    Path(office_id): Path<Uuid>,
    caller: Caller,
    Json(request): Json<OfficePatchRequest>,
) -> AppResult<(StatusCode, Json<OfficeSummary>)> {
    caller.require_admin_of(office_id)?;
    request.validate()?;

    let office = state.offices().patch(office_id, request).await?;

    Ok((StatusCode::OK, Json(office)))
}

/// GET handler for daily attendance counts of an office
#[utoipa::path(
    get,
    path = "/api/v0/offices/{id}/counts",
    params(DailyCountsQuery),
    security(
        ("bearer" = []),
    ),
    responses(
        (status = 200, description = "Attendance counts", body = DailyCounts),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not found"),
    )
)]
pub async fn daily_counts<S: ServerSetup>(
    State(state): State<AppState<S>>,
    Path(office_id): Path<Uuid>,
    Query(query): Query<DailyCountsQuery>,
    caller: Caller,
) -> AppResult<(StatusCode, Json<DailyCounts>)> {
    caller.require_admin_of(office_id)?;

    let counts = state
        .attendance()
        .daily_counts(office_id, query.date)
        .await?;

    Ok((StatusCode::OK, Json(counts)))
}

/// GET handler for the attendance records of an office
#[utoipa::path(
    get,
    path = "/api/v0/offices/{id}/attendances",
    params(AttendanceRangeQuery),
    security(
        ("bearer" = []),
    ),
    responses(
        (status = 200, description = "Attendance records", body = [AttendanceResponse]),
        (status = 400, description = "Bad Request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not found"),
    )
)]
pub async fn attendances<S: ServerSetup>(
    State(state): State<AppState<S>>,
    Path(office_id): Path<Uuid>,
    Query(range): Query<AttendanceRangeQuery>,
    caller: Caller,
) -> AppResult<(StatusCode, Json<Vec<AttendanceResponse>>)> {
    caller.require_admin_of(office_id)?;

    let records = state.attendance().list_by_office(office_id, range).await?;

    Ok((StatusCode::OK, Json(records)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ErrorResponse,
        test_utils::{route_builder::RouteBuilder, test_context::TestContext},
    };
    use ekilisync_core::{
        common::OfficeAdminRequest,
        geo::Coordinates,
        identity::Role,
    };
    use http::Method;
    use testresult::TestResult;

    #[test_log::test(tokio::test)]
    async fn test_register_office() -> TestResult {
        let ctx = TestContext::new();
        let request = OfficeRegistrationRequest {
            name: "HQ".to_string(),
            phone_number: "+15550000".to_string(),
            location: Some(Coordinates::new(40.7128, -74.0060)),
            timezone: None,
            admin: OfficeAdminRequest {
                name: "Amina".to_string(),
                email: "amina@x.com".to_string(),
                password: "correct horse battery".to_string(),
                phone_number: None,
            },
        };

        let (status, body) = RouteBuilder::new(ctx.app(), Method::POST, "/api/v0/offices")
            .with_json_body(&request)?
            .into_json_response::<OfficeRegistrationResponse>()
            .await?;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body.office.timezone, "UTC");
        assert_eq!(body.admin.role, Role::Admin);

        let (status, _) = RouteBuilder::new(ctx.app(), Method::POST, "/api/v0/offices")
            .with_json_body(&request)?
            .into_json_response::<ErrorResponse>()
            .await?;

        assert_eq!(status, StatusCode::CONFLICT);

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_register_office_invalid_body() -> TestResult {
        let ctx = TestContext::new();

        let (status, _) = RouteBuilder::new(ctx.app(), Method::POST, "/api/v0/offices")
            .with_json_body(serde_json::json!({ "name": "HQ" }))?
            .into_json_response::<ErrorResponse>()
            .await?;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_office_requires_membership() -> TestResult {
        let ctx = TestContext::new();
        let office = ctx.register_office(None).await?;
        let other = ctx.register_office_as("other@x.com", None).await?;
        let token = ctx.admin_token().await?;

        let (status, body) = RouteBuilder::new(
            ctx.app(),
            Method::GET,
            format!("/api/v0/offices/{}", office.office.id),
        )
        .with_bearer(&token)
        .into_json_response::<OfficeSummary>()
        .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.id, office.office.id);

        let (status, _) = RouteBuilder::new(
            ctx.app(),
            Method::GET,
            format!("/api/v0/offices/{}", other.office.id),
        )
        .with_bearer(&token)
        .into_json_response::<ErrorResponse>()
        .await?;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = RouteBuilder::new(
            ctx.app(),
            Method::GET,
            format!("/api/v0/offices/{}", office.office.id),
        )
        .into_json_response::<ErrorResponse>()
        .await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_counts_require_admin() -> TestResult {
        let ctx = TestContext::new();
        let office = ctx.register_office(None).await?;
        let (_, employee_token) = ctx
            .verified_employee(office.office.id, "jane@x.com")
            .await?;
        let admin_token = ctx.admin_token().await?;
        let path = format!("/api/v0/offices/{}/counts?date=2024-03-04", office.office.id);

        let (status, _) = RouteBuilder::new(ctx.app(), Method::GET, path.as_str())
            .with_bearer(&employee_token)
            .into_json_response::<ErrorResponse>()
            .await?;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, counts) = RouteBuilder::new(ctx.app(), Method::GET, path.as_str())
            .with_bearer(&admin_token)
            .into_json_response::<DailyCounts>()
            .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(counts.employee_count, 2);
        assert_eq!(counts.checked_in_count, 0);

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_patch_office() -> TestResult {
        let ctx = TestContext::new();
        let office = ctx.register_office(None).await?;
        let token = ctx.admin_token().await?;

        let (status, body) = RouteBuilder::new(
            ctx.app(),
            Method::PATCH,
            format!("/api/v0/offices/{}", office.office.id),
        )
        .with_bearer(&token)
        .with_json_body(serde_json::json!({ "timezone": "Africa/Dar_es_Salaam" }))?
        .into_json_response::<OfficeSummary>()
        .await?;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.timezone, "Africa/Dar_es_Salaam");
        assert_eq!(body.name, office.office.name);

        Ok(())
    }
}
