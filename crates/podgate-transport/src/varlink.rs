//! Varlink call/reply messages.
//!
//! A varlink call is a JSON object naming a fully-qualified method. When the
//! call sets `more`, the service answers with a sequence of replies, each
//! flagged `continues` except the last one.

use crate::error::{Result, TransportError};
use crate::unix::UnixTransport;
use crate::Transport;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// A varlink method call.
#[derive(Debug, Clone, Serialize)]
pub struct Call {
    /// Fully-qualified method name, e.g. `io.podman.ListImages`.
    pub method: String,
    /// Input parameters (always an object).
    pub parameters: Value,
    /// Request a multi-reply answer.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub more: bool,
}

impl Call {
    /// Creates a single-reply call.
    #[must_use]
    pub fn new(method: impl Into<String>, parameters: Value) -> Self {
        Self {
            method: method.into(),
            parameters,
            more: false,
        }
    }

    /// Creates a call that asks for continuation replies.
    #[must_use]
    pub fn more(method: impl Into<String>, parameters: Value) -> Self {
        Self {
            more: true,
            ..Self::new(method, parameters)
        }
    }
}

/// A varlink reply.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Reply {
    /// Output parameters, or error parameters when `error` is set.
    #[serde(default)]
    pub parameters: Value,
    /// More replies follow this one.
    #[serde(default)]
    pub continues: bool,
    /// Fully-qualified error name.
    #[serde(default)]
    pub error: Option<String>,
}

/// A varlink connection on top of a framed transport.
pub struct VarlinkConnection<T = UnixTransport> {
    transport: T,
}

impl VarlinkConnection<UnixTransport> {
    /// Connects to a varlink service address such as `unix:/run/podman/io.podman`.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is malformed or the socket cannot be reached.
    pub async fn connect(address: &str) -> Result<Self> {
        let mut transport = UnixTransport::new(parse_address(address)?);
        transport.connect().await?;
        tracing::debug!(address, "varlink connected");
        Ok(Self { transport })
    }
}

impl<T: Transport> VarlinkConnection<T> {
    /// Wraps an already-connected transport.
    pub const fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Sends a call.
    ///
    /// # Errors
    ///
    /// Returns an error if the call cannot be encoded or written.
    pub async fn send(&mut self, call: &Call) -> Result<()> {
        let payload =
            serde_json::to_vec(call).map_err(|e| TransportError::Protocol(e.to_string()))?;
        tracing::trace!(method = %call.method, more = call.more, "varlink call");
        self.transport.send(Bytes::from(payload)).await
    }

    /// Receives the next reply.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails or the frame is not a reply object.
    pub async fn recv(&mut self) -> Result<Reply> {
        let frame = self.transport.recv().await?;
        serde_json::from_slice(&frame).map_err(|e| TransportError::Protocol(e.to_string()))
    }

    /// Sends a single-reply call and waits for its answer.
    ///
    /// # Errors
    ///
    /// Returns an error if sending or receiving fails.
    pub async fn call(&mut self, call: &Call) -> Result<Reply> {
        self.send(call).await?;
        self.recv().await
    }
}

/// Parses a varlink address into a socket path.
///
/// Accepts `unix:/path`, `unix:///path` and bare absolute paths. Address
/// parameters after `;` are ignored.
///
/// # Errors
///
/// Returns [`TransportError::InvalidAddress`] for other schemes or relative paths.
pub fn parse_address(address: &str) -> Result<PathBuf> {
    let address = address.split(';').next().unwrap_or_default();

    let path = if let Some(rest) = address.strip_prefix("unix:") {
        // unix:///run/x and unix:/run/x name the same socket.
        rest.strip_prefix("//").unwrap_or(rest)
    } else if address.contains(':') {
        return Err(TransportError::InvalidAddress(address.to_string()));
    } else {
        address
    };

    if !path.starts_with('/') {
        return Err(TransportError::InvalidAddress(address.to_string()));
    }

    Ok(PathBuf::from(path))
}
