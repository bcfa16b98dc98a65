//! Generic result/error resprentation(s).

use std::{convert::Infallible, fmt::Debug};

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::ValidationErrors;

use crate::store::StoreError;

/// Standard return type out of routes / handlers
pub type AppResult<T> = std::result::Result<T, AppError>;

/// Standard return type out of the onboarding, attendance and auth services
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// What went wrong in a service operation.
///
/// These are transport independent; [AppError] decides on status codes.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// A referenced office, identity, attendance record or token does not exist
    #[error("{0}")]
    NotFound(String),
    /// A uniqueness rule was violated, e.g. a duplicate email
    #[error("{0}")]
    Conflict(String),
    /// The request was well-formed but its content is not acceptable
    #[error("{0}")]
    InvalidInput(String),
    /// Credentials or tokens didn't check out
    #[error("{0}")]
    Unauthorized(String),
    /// A business rule rejected the request, e.g. a check-in outside the geofence
    #[error("{0}")]
    PolicyViolation(String),
    /// The identity is already verified
    #[error("{0}")]
    AlreadyInTerminalState(String),
    /// Storage or other infrastructure failure
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    pub(crate) fn not_found(what: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{what} with id {id} not found"))
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(constraint) if constraint.contains("email") => {
                Self::Conflict("email already in use".to_string())
            }
            StoreError::UniqueViolation(constraint) => {
                tracing::debug!(%constraint, "Unique constraint violated");
                Self::Conflict("resource already exists".to_string())
            }
            StoreError::Backend(err) => Self::Internal(err),
        }
    }
}

/// Encodes [JSONAPI error object responses](https://jsonapi.org/examples/#error-objects).
///
/// JSONAPI error object -  ALL Fields are technically optional.
///
/// This struct uses the following guidelines:
///
/// 1. Always encode the StatusCode of the response
/// 2. Set the title to the `canonical_reason` of the status code.
///    According to spec, this should NOT change over time.
/// 3. For unrecoverable errors, never leak the underlying error text
///
/// Other fields not currently captured (but can be added)
///
/// - id - a unique identifier for the problem
/// - links - a link object with further information about the problem
/// - source - a JSON pointer indicating a problem in the request json OR
///   a parameter specifying a problematic query parameter
/// - meta - a meta object containing arbitrary information about the error
#[derive(ToSchema, thiserror::Error, Eq, PartialEq, Debug, Deserialize, Serialize)]
pub struct AppError {
    #[schema(value_type = u16, example = 404)]
    #[serde(with = "crate::error::serde_status_code")]
    pub(crate) status: StatusCode,
    #[schema(example = "Not Found")]
    pub(crate) detail: Option<String>,
    #[schema(example = "Office with id 123 not found")]
    pub(crate) title: Option<String>,
}

impl AppError {
    /// New instance of [AppError].
    pub fn new<M: ToString>(status_code: StatusCode, message: Option<M>) -> AppError {
        Self {
            status: status_code,
            title: Self::canonical_reason_to_string(&status_code),
            detail: message.map(|m| m.to_string()),
        }
    }

    /// [AppError] for [StatusCode::NOT_FOUND].
    pub fn not_found(id: Uuid) -> AppError {
        Self::new(
            StatusCode::NOT_FOUND,
            Some(format!("Entity with id {id} not found")),
        )
    }

    /// [AppError] for [StatusCode::FORBIDDEN].
    pub fn forbidden<M: ToString>(message: M) -> AppError {
        Self::new(StatusCode::FORBIDDEN, Some(message))
    }

    /// The status code of this error
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The human readable detail, if any
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    fn canonical_reason_to_string(status_code: &StatusCode) -> Option<String> {
        status_code.canonical_reason().map(|r| r.to_string())
    }
}

#[derive(Debug, Deserialize, Serialize)]
/// Error in JSON API response format.
pub struct ErrorResponse {
    pub(crate) errors: Vec<AppError>,
}

impl From<AppError> for ErrorResponse {
    fn from(e: AppError) -> Self {
        Self { errors: vec![e] }
    }
}

impl From<AppError> for (StatusCode, Json<ErrorResponse>) {
    fn from(app_error: AppError) -> Self {
        (app_error.status, Json(app_error.into()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_response: (StatusCode, Json<ErrorResponse>) = self.into();
        error_response.into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(message) => Self::new(StatusCode::NOT_FOUND, Some(message)),
            ServiceError::Conflict(message) => Self::new(StatusCode::CONFLICT, Some(message)),
            ServiceError::InvalidInput(message)
            | ServiceError::PolicyViolation(message)
            | ServiceError::AlreadyInTerminalState(message) => {
                Self::new(StatusCode::BAD_REQUEST, Some(message))
            }
            ServiceError::Unauthorized(message) => {
                Self::new(StatusCode::UNAUTHORIZED, Some(message))
            }
            ServiceError::Internal(err) => err.into(),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        let err = match err.downcast::<ValidationErrors>() {
            Ok(err) => return Self::from(err),
            Err(e) => e,
        };

        let err = match err.downcast::<QueryRejection>() {
            Ok(err) => return Self::from(err),
            Err(e) => e,
        };

        tracing::error!(?err, "Internal server error");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            Some("Internal server error"),
        )
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        ServiceError::from(err).into()
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        Self::new(StatusCode::BAD_REQUEST, Some(err))
    }
}

impl From<QueryRejection> for AppError {
    fn from(value: QueryRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, Some(value))
    }
}

impl From<PathRejection> for AppError {
    fn from(value: PathRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, Some(value))
    }
}

impl From<JsonRejection> for AppError {
    fn from(value: JsonRejection) -> Self {
        Self::new(value.status(), Some(value.body_text()))
    }
}

impl From<Infallible> for AppError {
    fn from(the_impossible: Infallible) -> Self {
        match the_impossible {}
    }
}

/// Serialize/Deserializer for status codes.
///
/// This is needed because status code according to JSON API spec must
/// be the status code as a STRING.
///
/// We could have used http_serde, but it encodes the status code as a NUMBER.
pub mod serde_status_code {
    use http::StatusCode;
    use serde::{de::Unexpected, Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize [StatusCode]s.
    pub fn serialize<S: Serializer>(status: &StatusCode, ser: S) -> Result<S::Ok, S::Error> {
        String::serialize(&status.as_u16().to_string(), ser)
    }

    /// Deserialize [StatusCode]s.
    pub fn deserialize<'de, D>(de: D) -> Result<StatusCode, D::Error>
    where
        D: Deserializer<'de>,
    {
        let str = String::deserialize(de)?;
        StatusCode::from_bytes(str.as_bytes()).map_err(|_| {
            serde::de::Error::invalid_value(
                Unexpected::Str(str.as_str()),
                &"A valid http status code",
            )
        })
    }
}

// Needed to support thiserror::Error, outputs debug for AppError
impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(test)]
/// Parse the app error out of the json body
pub async fn parse_error(response: Response) -> AppError {
    let body_bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let mut err_response: ErrorResponse = serde_json::from_slice(&body_bytes).unwrap();
    err_response.errors.remove(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use testresult::TestResult;

    #[test]
    fn test_from_anyhow_error_hides_details() {
        let err: AppError = anyhow::anyhow!("connection refused at 10.0.0.3").into();
        assert_eq!(err.detail.unwrap(), "Internal server error".to_string());
        assert_eq!(
            err.title,
            StatusCode::INTERNAL_SERVER_ERROR
                .canonical_reason()
                .map(|r| r.to_string())
        );

        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_not_found() {
        let id = Uuid::new_v4();
        let err = AppError::not_found(id);

        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(
            err.title,
            StatusCode::NOT_FOUND
                .canonical_reason()
                .map(|r| r.to_string())
        );
        assert_eq!(
            err.detail.unwrap(),
            format!("Entity with id {id} not found")
        );
    }

    #[test]
    fn test_service_error_status_codes() {
        let cases = [
            (ServiceError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ServiceError::Conflict("x".into()), StatusCode::CONFLICT),
            (ServiceError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (
                ServiceError::Unauthorized("x".into()),
                StatusCode::UNAUTHORIZED,
            ),
            (
                ServiceError::PolicyViolation("x".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServiceError::AlreadyInTerminalState("x".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServiceError::Internal(anyhow::anyhow!("x")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (service_error, status) in cases {
            assert_eq!(AppError::from(service_error).status, status);
        }
    }

    #[test]
    fn test_unique_violation_becomes_conflict() {
        let err = ServiceError::from(StoreError::UniqueViolation(
            "identities_email_key".to_string(),
        ));
        let err = AppError::from(err);

        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.detail.as_deref(), Some("email already in use"));
    }

    #[test_log::test(tokio::test)]
    async fn test_json_api_error_response() -> TestResult {
        // verify that our json api response complies with the standard
        let id = Uuid::new_v4();
        let err = AppError::not_found(id);
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let err = parse_error(response).await;

        // Check that the result is all good
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(
            err.title,
            StatusCode::NOT_FOUND
                .canonical_reason()
                .map(|r| r.to_string())
        );
        assert_eq!(
            err.detail.unwrap(),
            format!("Entity with id {id} not found")
        );

        Ok(())
    }
}
