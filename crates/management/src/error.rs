//! Mapping of domain errors onto HTTP responses.

use crate::models::ErrorResponse;
use crate::store::RepositoryError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use crm_core::CrmError;
use tracing::{error, warn};
use uuid::Uuid;

/// Handler error. Renders as `{error, message}` with the status of the
/// wrapped [`CrmError`].
#[derive(Debug)]
pub struct ApiError(pub CrmError);

impl From<CrmError> for ApiError {
    fn from(err: CrmError) -> Self {
        Self(err)
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        Self(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(CrmError::Validation(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if err.is_internal() {
            error!(error = %err, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %err, "Request rejected");
        }
        let body = ErrorResponse {
            error: err.code().to_string(),
            message: err.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

/// Parse an id taken from a path or body. Unparseable ids cannot exist in
/// any repository, so they surface as not-found.
pub fn parse_id(raw: &str, what: &str) -> Result<Uuid, CrmError> {
    Uuid::parse_str(raw).map_err(|_| CrmError::NotFound(format!("{} not found", what)))
}
