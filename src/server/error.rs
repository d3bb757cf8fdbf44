//! HTTP mapping of [`DriverError`]
//!
//! Every error becomes a JSON body `{"error": "<message>"}`.

use crate::driver::error::DriverError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl DriverError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            DriverError::MalformedBody(_) => StatusCode::UNPROCESSABLE_ENTITY,
            DriverError::Validation(_)
            | DriverError::Codec { .. }
            | DriverError::MissingHeader(_)
            | DriverError::ConflictingHeaders(..) => StatusCode::BAD_REQUEST,
            DriverError::NotFound(_) => StatusCode::NOT_FOUND,
            DriverError::Auth(_) => StatusCode::UNAUTHORIZED,
            DriverError::Provision(_) => StatusCode::BAD_GATEWAY,
            DriverError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for DriverError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();
        if status.is_server_error() {
            error!(status = status.as_u16(), class = self.class(), "{message}");
        } else {
            warn!(status = status.as_u16(), class = self.class(), "{message}");
        }
        (status, Json(ErrorBody { error: message })).into_response()
    }
}
