//! Docker API request handlers.
//!
//! One handler per endpoint. Each validates its input before touching the
//! backend, and classifies any backend failure where it is observed.

pub mod build;
pub mod image;
pub mod system;

use crate::error::{DockerError, Result};
use axum::extract::Request;
use serde::Deserialize;

pub use build::build_image;
pub use image::{
    export_images, image_get, image_post, list_images, pull_image, remove_image, search_images,
};
pub use system::{get_info, get_version, ping};

/// Raw query string pairs, in order, repeats preserved.
///
/// Docker repeats keys (`t=a&t=b`), which a struct extractor would reject.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    /// Returns the first value of `key`.
    #[must_use]
    pub fn first(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns every value of `key`, in request order.
    pub fn all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the first non-empty value of `key`.
    #[must_use]
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.first(key).filter(|v| !v.is_empty())
    }

    /// Reads `key` as a Docker boolean.
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        self.first(key).is_some_and(docker_bool)
    }

    /// Reads `key` as an integer. Absent and empty values are `None`.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` if the value is not an integer.
    pub fn integer(&self, key: &str) -> Result<Option<i64>> {
        self.non_empty(key)
            .map(|v| {
                v.parse().map_err(|_| {
                    DockerError::bad_request(format!("invalid value for {key}: {v:?} is not an integer"))
                })
            })
            .transpose()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Docker's boolean rule: `""`, `0`, `no`, `false` and `none` are false,
/// anything else is true.
#[must_use]
pub fn docker_bool(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "" | "0" | "no" | "false" | "none"
    )
}

/// Error for a request no handler serves.
#[must_use]
pub fn unsupported(method: &axum::http::Method, path: &str) -> DockerError {
    DockerError::not_implemented(format!("not implemented: {method} {path}"))
}

/// Fallback for every unrouted request.
pub async fn not_implemented(request: Request) -> DockerError {
    let path = request.uri().path();
    tracing::warn!(method = %request.method(), uri = %request.uri(), "not implemented");
    unsupported(request.method(), path)
}
