//! Errors raised by the Podman backend client.

use podgate_transport::TransportError;
use serde_json::Value;
use thiserror::Error;

/// Result type alias for backend operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Varlink errors that mean "the named resource does not exist".
const NOT_FOUND_ERRORS: &[&str] = &[
    "io.podman.ImageNotFound",
    "io.podman.ContainerNotFound",
    "io.podman.PodNotFound",
    "io.podman.VolumeNotFound",
];

/// Discriminant of a [`BackendError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    /// The backend reported a named resource as missing.
    NotFound,
    /// The backend rejected or failed the call.
    Failed,
    /// The connection to the backend failed.
    Transport,
    /// The reply did not have the documented shape.
    Decode,
}

/// Errors that can occur while calling the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// A named resource does not exist.
    #[error("{reason}")]
    NotFound {
        /// Fully-qualified varlink error name.
        error: String,
        /// Human-readable reason.
        reason: String,
    },

    /// Any other error reply.
    #[error("{}", remote_message(.error, .reason.as_deref()))]
    Remote {
        /// Fully-qualified varlink error name.
        error: String,
        /// Human-readable reason, when the error carries one.
        reason: Option<String>,
    },

    /// Connection-level failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Reply parameters could not be decoded.
    #[error("failed to decode {method} reply: {message}")]
    Decode {
        /// Method whose reply was malformed.
        method: String,
        /// Decoder message.
        message: String,
    },
}

fn remote_message(error: &str, reason: Option<&str>) -> String {
    reason.map_or_else(|| format!("backend call failed: {error}"), str::to_owned)
}

impl BackendError {
    /// Builds an error from a varlink error reply.
    #[must_use]
    pub fn from_reply(error: String, parameters: &Value) -> Self {
        let reason = parameters
            .get("reason")
            .and_then(Value::as_str)
            .filter(|r| !r.is_empty())
            .map(str::to_owned);

        if NOT_FOUND_ERRORS.contains(&error.as_str()) {
            let reason = reason.unwrap_or_else(|| {
                let id = parameters.get("id").and_then(Value::as_str).unwrap_or("");
                format!("no such object: {id}")
            });
            return Self::NotFound { error, reason };
        }

        Self::Remote { error, reason }
    }

    /// Creates a decode error.
    #[must_use]
    pub fn decode(method: impl Into<String>, message: impl ToString) -> Self {
        Self::Decode {
            method: method.into(),
            message: message.to_string(),
        }
    }

    /// Returns the error discriminant.
    #[must_use]
    pub const fn kind(&self) -> BackendErrorKind {
        match self {
            Self::NotFound { .. } => BackendErrorKind::NotFound,
            Self::Remote { .. } => BackendErrorKind::Failed,
            Self::Transport(_) => BackendErrorKind::Transport,
            Self::Decode { .. } => BackendErrorKind::Decode,
        }
    }

    /// Returns the backend's human-readable reason, if it sent one.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::NotFound { reason, .. } => Some(reason),
            Self::Remote { reason, .. } => reason.as_deref(),
            Self::Transport(_) | Self::Decode { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn image_not_found_is_not_found() {
        let err = BackendError::from_reply(
            "io.podman.ImageNotFound".to_string(),
            &json!({"id": "ghost:latest", "reason": "no such image ghost:latest"}),
        );
        assert_eq!(err.kind(), BackendErrorKind::NotFound);
        assert_eq!(err.reason(), Some("no such image ghost:latest"));
        assert_eq!(err.to_string(), "no such image ghost:latest");
    }

    #[test]
    fn not_found_without_reason_names_the_id() {
        let err = BackendError::from_reply(
            "io.podman.ImageNotFound".to_string(),
            &json!({"id": "ghost"}),
        );
        assert_eq!(err.to_string(), "no such object: ghost");
    }

    #[test]
    fn error_occurred_carries_reason() {
        let err = BackendError::from_reply(
            "io.podman.ErrorOccurred".to_string(),
            &json!({"reason": "image is in use"}),
        );
        assert_eq!(err.kind(), BackendErrorKind::Failed);
        assert_eq!(err.reason(), Some("image is in use"));
    }

    #[test]
    fn remote_without_reason_uses_generic_text() {
        let err = BackendError::from_reply(
            "org.varlink.service.MethodNotFound".to_string(),
            &json!({"method": "io.podman.Nope"}),
        );
        assert_eq!(err.reason(), None);
        assert_eq!(
            err.to_string(),
            "backend call failed: org.varlink.service.MethodNotFound"
        );
    }

    #[test]
    fn transport_error_kind() {
        let err = BackendError::from(TransportError::ConnectionReset);
        assert_eq!(err.kind(), BackendErrorKind::Transport);
        assert_eq!(err.reason(), None);
        assert_eq!(err.to_string(), "connection reset");
    }
}
