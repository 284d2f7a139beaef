//! API version negotiation.
//!
//! Docker clients prefix paths with `/v{major}.{minor}`. Prefixes outside
//! the supported window are rejected with Docker's own wording, and every
//! response advertises the server's API version.

use crate::error::DockerError;
use crate::{API_VERSION, MIN_API_VERSION};
use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

/// Header advertising the server API version.
pub const API_VERSION_HEADER: &str = "Api-Version";

/// Parses `major.minor`.
#[must_use]
pub fn parse(version: &str) -> Option<(u32, u32)> {
    let (major, minor) = version.split_once('.')?;
    Some((major.parse().ok()?, minor.parse().ok()?))
}

/// Returns the `X.Y` of a `/vX.Y/...` path, if it has one.
#[must_use]
pub fn requested(path: &str) -> Option<&str> {
    let rest = path.strip_prefix("/v")?;
    let version = rest.split('/').next()?;
    parse(version).map(|_| version)
}

/// Minor versions served under a `/v1.N` prefix.
#[must_use]
pub fn supported_minors() -> std::ops::RangeInclusive<u32> {
    let (_, min) = parse(MIN_API_VERSION).unwrap_or((1, 12));
    let (_, max) = parse(API_VERSION).unwrap_or((1, 26));
    min..=max
}

/// Checks a requested version against the supported window.
///
/// # Errors
///
/// Returns `BadRequest` when the version is too new or too old.
pub fn check(version: &str) -> Result<(), DockerError> {
    let Some(requested) = parse(version) else {
        return Ok(());
    };
    let max = parse(API_VERSION).unwrap_or((1, 26));
    let min = parse(MIN_API_VERSION).unwrap_or((1, 12));

    if requested > max {
        return Err(DockerError::bad_request(format!(
            "client version {version} is too new. Maximum supported API version is {API_VERSION}"
        )));
    }
    if requested < min {
        return Err(DockerError::bad_request(format!(
            "client version {version} is too old. Minimum supported API version is {MIN_API_VERSION}, please upgrade your client to a newer version"
        )));
    }
    Ok(())
}

/// Axum middleware that enforces the version window and sets
/// [`API_VERSION_HEADER`].
pub async fn api_version_middleware(request: Request, next: Next) -> Response {
    let rejected = requested(request.uri().path()).and_then(|v| check(v).err());

    let mut response = match rejected {
        Some(err) => {
            tracing::debug!(uri = %request.uri(), error = %err, "api version rejected");
            err.into_response()
        }
        None => next.run(request).await,
    };

    response
        .headers_mut()
        .insert(API_VERSION_HEADER, HeaderValue::from_static(API_VERSION));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn extracts_version_prefix() {
        assert_eq!(requested("/v1.26/images/json"), Some("1.26"));
        assert_eq!(requested("/v1.40/info"), Some("1.40"));
        assert_eq!(requested("/images/json"), None);
        assert_eq!(requested("/volumes"), None);
    }

    #[test]
    fn window_is_inclusive() {
        assert!(check("1.26").is_ok());
        assert!(check("1.12").is_ok());
        assert!(check("1.19").is_ok());
    }

    #[test]
    fn too_new_and_too_old_are_rejected() {
        let err = check("1.27").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert!(err.to_string().contains("is too new. Maximum supported API version is 1.26"));

        let err = check("1.11").unwrap_err();
        assert!(err.to_string().contains("is too old. Minimum supported API version is 1.12"));
    }

    #[test]
    fn minor_range_matches_constants() {
        assert_eq!(supported_minors(), 12..=26);
    }

    #[test]
    fn numeric_comparison_not_lexical() {
        assert!(check("1.9").is_err());
        assert!(check("1.100").is_err());
    }
}
