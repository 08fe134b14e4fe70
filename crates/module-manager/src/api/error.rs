use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};

use crate::error::ManagerError;

/// Status code answered for each error.
pub fn error_to_status(err: &ManagerError) -> StatusCode {
    match err {
        ManagerError::Validation(_) => StatusCode::BAD_REQUEST,
        ManagerError::Conflict(_) => StatusCode::CONFLICT,
        ManagerError::NotFound(_) => StatusCode::NOT_FOUND,
        ManagerError::Busy(_) => StatusCode::LOCKED,
        ManagerError::Downstream { .. }
        | ManagerError::Store(_)
        | ManagerError::Serialisation(_)
        | ManagerError::Config(_)
        | ManagerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// An error answered to an API caller.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl From<ManagerError> for ApiError {
    fn from(err: ManagerError) -> Self {
        Self {
            status: error_to_status(&err),
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let status = match &rejection {
            JsonRejection::MissingJsonContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            _ => StatusCode::BAD_REQUEST,
        };
        Self {
            status,
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = self.status.as_u16(), error = %self.message, "request failed");
        } else {
            warn!(status = self.status.as_u16(), error = %self.message, "request rejected");
        }
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}
