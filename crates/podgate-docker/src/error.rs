//! Error types for Docker API.
//!
//! Every backend failure passes through [`classify`] exactly once, at the
//! point it is first observed, and comes out as a [`DockerError`] whose
//! variant fixes the HTTP status.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use podgate_core::{BackendError, BackendErrorKind};
use serde::Serialize;
use thiserror::Error;

/// Result type alias for Docker API operations.
pub type Result<T> = std::result::Result<T, DockerError>;

/// Docker-facing error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Client input rejected before any backend call.
    BadRequest,
    /// The backend confirmed the named resource is missing.
    NotFound,
    /// Recognized but unsupported operation.
    NotImplemented,
    /// Decode, transport and unexpected backend failures.
    Internal,
}

/// Errors that can occur in Docker API operations.
///
/// The display text is the message sent to the client verbatim.
#[derive(Debug, Error)]
pub enum DockerError {
    /// Image not found.
    #[error("{0}")]
    ImageNotFound(String),

    /// Invalid request input.
    #[error("{0}")]
    BadRequest(String),

    /// Not implemented.
    #[error("{0}")]
    NotImplemented(String),

    /// Server error.
    #[error("{0}")]
    Server(String),
}

impl DockerError {
    /// Returns the error category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ImageNotFound(_) => ErrorKind::NotFound,
            Self::BadRequest(_) => ErrorKind::BadRequest,
            Self::NotImplemented(_) => ErrorKind::NotImplemented,
            Self::Server(_) => ErrorKind::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Creates a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Creates a not implemented error.
    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::NotImplemented(message.into())
    }

    /// Creates a server error.
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server(message.into())
    }
}

/// Maps a backend error onto the Docker error model.
///
/// The message is the backend's reason when it sent one, otherwise the
/// error's own text.
#[must_use]
pub fn classify(err: &BackendError) -> DockerError {
    let message = err
        .reason()
        .map_or_else(|| err.to_string(), str::to_owned);

    match err.kind() {
        BackendErrorKind::NotFound => DockerError::ImageNotFound(message),
        BackendErrorKind::Failed | BackendErrorKind::Transport | BackendErrorKind::Decode => {
            DockerError::Server(message)
        }
    }
}

/// Classifies a backend error and logs it with the request context.
#[must_use]
pub fn classify_logged(operation: &'static str, subject: &str, err: &BackendError) -> DockerError {
    let classified = classify(err);
    match classified.kind() {
        ErrorKind::NotFound => {
            tracing::warn!(operation, subject, error = %err, "backend reported missing resource");
        }
        _ => {
            tracing::error!(
                operation,
                subject,
                kind = ?err.kind(),
                error = %err,
                "backend call failed"
            );
        }
    }
    classified
}

/// Docker API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message.
    pub message: String,
}

impl IntoResponse for DockerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            message: self.to_string(),
        };

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use podgate_core::transport::TransportError;
    use serde_json::json;

    #[test]
    fn not_found_maps_to_404_with_reason() {
        let err = BackendError::from_reply(
            "io.podman.ImageNotFound".to_string(),
            &json!({"id": "ghost:latest", "reason": "ghost:latest: image not known"}),
        );
        let classified = classify(&err);
        assert_eq!(classified.kind(), ErrorKind::NotFound);
        assert_eq!(classified.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(classified.to_string(), "ghost:latest: image not known");
    }

    #[test]
    fn remote_failure_is_internal() {
        let err = BackendError::from_reply(
            "io.podman.ErrorOccurred".to_string(),
            &json!({"reason": "image is in use by a container"}),
        );
        let classified = classify(&err);
        assert_eq!(classified.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(classified.to_string(), "image is in use by a container");
    }

    #[test]
    fn transport_failure_uses_error_text() {
        let err = BackendError::from(TransportError::ConnectionReset);
        let classified = classify(&err);
        assert_eq!(classified.kind(), ErrorKind::Internal);
        assert_eq!(classified.to_string(), err.to_string());
    }

    #[test]
    fn decode_failure_is_internal() {
        let err = BackendError::decode("io.podman.ListImages", "missing field");
        assert_eq!(classify(&err).kind(), ErrorKind::Internal);
    }

    #[test]
    fn local_errors_have_fixed_statuses() {
        assert_eq!(
            DockerError::bad_request("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            DockerError::not_implemented("x").status_code(),
            StatusCode::NOT_IMPLEMENTED
        );
    }
}
