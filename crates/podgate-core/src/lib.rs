//! # podgate-core
//!
//! Backend side of podgate: the Podman varlink client, its record types,
//! and process configuration.
//!
//! The Docker-facing layer only sees the [`PodmanBackend`] trait, so the
//! client is constructed once by the daemon and injected into the router.

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod error;
pub mod podman;
pub mod trace;

pub use podgate_transport as transport;

pub use client::VarlinkBackend;
pub use config::Config;
pub use error::{BackendError, BackendErrorKind, Result};
pub use podman::{BatchStream, PodmanBackend, ReplyBatch};
