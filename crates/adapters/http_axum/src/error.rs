//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use homecore_domain::error::HubError;
use homecore_domain::message::Response as ComponentResponse;

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps [`HubError`] to an HTTP response with appropriate status code.
#[derive(Debug)]
pub enum ApiError {
    Hub(HubError),
    /// A key requested by path does not exist.
    KeyNotFound(String),
    /// The request is malformed in a way the domain never sees.
    BadRequest(String),
}

impl From<HubError> for ApiError {
    fn from(err: HubError) -> Self {
        Self::Hub(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = match self {
            Self::KeyNotFound(key) => {
                return error(StatusCode::NOT_FOUND, format!("`{key}` not found"));
            }
            Self::BadRequest(message) => return error(StatusCode::BAD_REQUEST, message),
            Self::Hub(err) => err,
        };

        match &err {
            HubError::Validation(err) => error(StatusCode::BAD_REQUEST, err.to_string()),
            HubError::ComponentNotFound(err) => (
                StatusCode::NOT_FOUND,
                Json(ComponentResponse::component_not_found(&err.uid).into_value()),
            )
                .into_response(),
            HubError::Pipeline(inner) => {
                tracing::warn!(uid = %inner.uid, stage = %inner.stage, error = %inner.source, "pipeline failed");
                error(StatusCode::BAD_GATEWAY, inner.to_string())
            }
            HubError::Cancelled(inner) => error(StatusCode::SERVICE_UNAVAILABLE, inner.to_string()),
            HubError::Initialization(_) | HubError::Dispatch(_) | HubError::Storage(_) => {
                tracing::error!(
                    error = %err,
                    cause = ?std::error::Error::source(&err),
                    "internal error"
                );
                error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        }
    }
}

fn error(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorBody { error: message })).into_response()
}
