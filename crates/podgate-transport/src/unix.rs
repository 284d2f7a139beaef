//! Unix domain socket transport with NUL-delimited frames.

use crate::error::{Result, TransportError};
use crate::Transport;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

/// Frame delimiter used by varlink.
const FRAME_DELIMITER: u8 = 0;

/// Unix socket transport.
pub struct UnixTransport {
    path: PathBuf,
    stream: Option<BufReader<UnixStream>>,
}

impl UnixTransport {
    /// Creates a new Unix transport for the given path.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            stream: None,
        }
    }

    /// Creates a transport from an existing stream.
    #[must_use]
    pub fn from_stream(stream: UnixStream) -> Self {
        Self {
            path: PathBuf::new(),
            stream: Some(BufReader::new(stream)),
        }
    }
}

#[async_trait]
impl Transport for UnixTransport {
    async fn connect(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Err(TransportError::AlreadyConnected);
        }

        let stream = UnixStream::connect(&self.path).await.map_err(|e| {
            TransportError::ConnectionRefused(format!("{}: {e}", self.path.display()))
        })?;

        self.stream = Some(BufReader::new(stream));
        Ok(())
    }

    async fn send(&mut self, data: Bytes) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;

        stream.write_all(&data).await?;
        stream.write_all(&[FRAME_DELIMITER]).await?;
        stream.flush().await?;

        Ok(())
    }

    async fn recv(&mut self) -> Result<Bytes> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;

        let mut buf = Vec::new();
        stream.read_until(FRAME_DELIMITER, &mut buf).await?;

        // EOF before the delimiter: either a clean close or a truncated frame.
        if buf.pop() != Some(FRAME_DELIMITER) {
            return Err(TransportError::ConnectionReset);
        }

        Ok(Bytes::from(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn send_appends_delimiter() {
        let (local, mut peer) = UnixStream::pair().unwrap();
        let mut transport = UnixTransport::from_stream(local);

        transport.send(Bytes::from_static(b"{}")).await.unwrap();

        let mut buf = [0u8; 3];
        peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"{}\0");
    }

    #[tokio::test]
    async fn recv_splits_frames() {
        let (local, mut peer) = UnixStream::pair().unwrap();
        let mut transport = UnixTransport::from_stream(local);

        peer.write_all(b"{\"a\":1}\0{\"b\":2}\0").await.unwrap();

        assert_eq!(transport.recv().await.unwrap(), Bytes::from_static(b"{\"a\":1}"));
        assert_eq!(transport.recv().await.unwrap(), Bytes::from_static(b"{\"b\":2}"));
    }

    #[tokio::test]
    async fn recv_reports_truncated_frame() {
        let (local, mut peer) = UnixStream::pair().unwrap();
        let mut transport = UnixTransport::from_stream(local);

        peer.write_all(b"{\"partial\"").await.unwrap();
        drop(peer);

        assert!(matches!(
            transport.recv().await,
            Err(TransportError::ConnectionReset)
        ));
    }

    #[tokio::test]
    async fn send_without_connection_fails() {
        let mut transport = UnixTransport::new("/nonexistent/podgate.sock");
        assert!(matches!(
            transport.send(Bytes::from_static(b"{}")).await,
            Err(TransportError::NotConnected)
        ));
    }
}
