//! # podgate-transport
//!
//! Transport layer for talking to Podman's varlink interface.
//!
//! - [`UnixTransport`]: NUL-delimited frames over a Unix domain socket
//! - [`VarlinkConnection`]: varlink call/reply messages on top of a [`Transport`]
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              podgate-transport              │
//! │                                             │
//! │  ┌───────────────────┐                      │
//! │  │ VarlinkConnection │  {"method": ...}\0   │
//! │  └─────────┬─────────┘                      │
//! │            ▼                                │
//! │  ┌───────────────────┐   ┌───────────────┐  │
//! │  │   UnixTransport   │──►│ /run/podman/  │  │
//! │  └───────────────────┘   │   io.podman   │  │
//! │                          └───────────────┘  │
//! └─────────────────────────────────────────────┘
//! ```

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod unix;
pub mod varlink;

pub use error::{Result, TransportError};
pub use unix::UnixTransport;
pub use varlink::{parse_address, Call, Reply, VarlinkConnection};

use async_trait::async_trait;
use bytes::Bytes;

/// Transport trait for sending and receiving framed messages.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connects to the remote endpoint.
    async fn connect(&mut self) -> Result<()>;

    /// Sends one frame.
    async fn send(&mut self, data: Bytes) -> Result<()>;

    /// Receives one frame, without its delimiter.
    async fn recv(&mut self) -> Result<Bytes>;
}
