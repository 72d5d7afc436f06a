use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::ServiceError;

/// HTTP wrapper around the core error taxonomy. The core returns typed
/// values; this is the single place they become status codes and a body.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            ServiceError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ServiceError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ServiceError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            ServiceError::UpstreamTimeout(_)
            | ServiceError::UpstreamTransient(_)
            | ServiceError::UpstreamInvalid(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Upstream provider error".to_string(),
            ),
            ServiceError::Storage(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Storage error occurred".to_string(),
            ),
            ServiceError::Cache(_) | ServiceError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
