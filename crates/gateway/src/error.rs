//! Maps failures onto `{error}` JSON responses.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use generation::{BackendKind, GenerationError};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// A failed `POST /generate`.
#[derive(Debug)]
pub enum ApiError {
    /// The body was not a usable JSON request.
    BadRequest(String),
    Generation(GenerationError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Generation(err) => status_for(err),
        }
    }
}

/// HTTP status for a generation failure.
///
/// A missing key is a server misconfiguration for the chat backend but an
/// authentication problem for the task backends.
pub fn status_for(err: &GenerationError) -> StatusCode {
    match err {
        GenerationError::Validation { .. } => StatusCode::BAD_REQUEST,
        GenerationError::MissingCredential { backend } => match backend {
            BackendKind::OpenRouter => StatusCode::INTERNAL_SERVER_ERROR,
            BackendKind::ModelScope | BackendKind::Volcengine => StatusCode::UNAUTHORIZED,
        },
        GenerationError::Upstream { .. }
        | GenerationError::Transport { .. }
        | GenerationError::Protocol { .. }
        | GenerationError::TaskFailed { .. }
        | GenerationError::TaskTimeout { .. }
        | GenerationError::Signing { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        Self::Generation(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest(message) => f.write_str(message),
            Self::Generation(err) => write!(f, "{err}"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}
