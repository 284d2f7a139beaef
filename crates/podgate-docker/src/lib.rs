//! # podgate-docker
//!
//! Docker Engine REST API served on top of Podman's varlink interface.
//!
//! Docker clients (the `docker` CLI, compose, SDKs) talk to this crate over a
//! Unix socket; every supported call is translated into an `io.podman`
//! method and the reply is reshaped into the record Docker clients expect.
//!
//! ## Architecture
//!
//! ```text
//! docker CLI ──► Unix Socket ──► podgate-docker ──► podgate-core ──► podman
//!                                     │               (varlink)
//!                                     ▼
//!                       handlers ─► mapper / stream ─► error
//! ```
//!
//! - [`handlers`] holds one handler per endpoint.
//! - [`mapper`] converts Podman records into Docker records and evaluates
//!   Docker filters.
//! - [`stream`] turns multi-reply varlink calls (pull, build) into a Docker
//!   JSON message stream.
//! - [`error`] classifies backend failures into Docker status codes.
//!
//! ## Compatibility
//!
//! Implements the image and system subset of Docker Engine API v1.26, served
//! unversioned and under every `/v1.N` prefix from v1.12 to v1.26. Any other
//! endpoint answers 501.

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod error;
pub mod handlers;
pub mod mapper;
pub mod server;
pub mod stream;
pub mod trace;
pub mod types;
pub mod version;

pub use api::{create_router, AppState};
pub use error::{classify, DockerError, ErrorKind, Result};
pub use server::{DockerApiServer, ServerConfig};

/// Docker API version.
pub const API_VERSION: &str = "1.26";

/// Minimum supported API version.
pub const MIN_API_VERSION: &str = "1.12";
