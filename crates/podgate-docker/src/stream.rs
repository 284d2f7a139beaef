//! Bridge from multi-reply varlink calls to a Docker JSON message stream.
//!
//! A pull or build returns a [`BatchStream`]. The bridge runs it on its own
//! task and writes one newline-terminated [`JsonMessage`] per log line into
//! the HTTP response body, one body chunk per batch so each batch reaches
//! the client as soon as it arrives.
//!
//! ```text
//! AwaitingBatch ──batch──► Emitting ──continues──► AwaitingBatch
//!       │                      └──────last──────► Done
//!       └──error──► (error message) ──► Failed
//! ```
//!
//! Errors after the response has started are reported in-band with code
//! [`STREAM_ERROR_CODE`]; lines already sent stay sent.

use crate::error::{classify_logged, DockerError};
use crate::types::{ErrorDetail, JsonMessage};
use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use podgate_core::BatchStream;
use std::convert::Infallible;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Code carried by in-band stream errors.
pub const STREAM_ERROR_CODE: i64 = 0xDEAD;

/// Batches buffered between the bridge task and the response body.
const CHANNEL_CAPACITY: usize = 16;

type Chunk = Result<Bytes, Infallible>;

/// How a bridged stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The last batch was delivered.
    Completed,
    /// The backend failed; an error message was emitted.
    Failed,
    /// The client went away before the stream finished.
    Disconnected,
}

impl JsonMessage {
    /// A log line attributed to `id`.
    #[must_use]
    pub fn log(line: &str, id: &str) -> Self {
        Self {
            stream: Some(line.to_string()),
            id: (!id.is_empty()).then(|| id.to_string()),
            ..Default::default()
        }
    }

    /// An in-band error.
    #[must_use]
    pub fn failure(err: &DockerError) -> Self {
        let message = err.to_string();
        Self {
            error_detail: Some(ErrorDetail {
                code: STREAM_ERROR_CODE,
                message: message.clone(),
            }),
            error: Some(message),
            ..Default::default()
        }
    }
}

fn encode_into(buf: &mut BytesMut, message: &JsonMessage) {
    // Serializing a struct of strings cannot fail.
    if let Ok(encoded) = serde_json::to_vec(message) {
        buf.extend_from_slice(&encoded);
        buf.extend_from_slice(b"\n");
    }
}

/// Streams `batches` into an HTTP 200 response.
///
/// `guard` is dropped when the stream ends, whatever the outcome; callers
/// use it to keep request-scoped resources (a staged build context) alive
/// for exactly as long as the backend call.
pub fn respond<G>(batches: BatchStream, operation: &'static str, subject: String, guard: G) -> Response
where
    G: Send + 'static,
{
    let (tx, rx) = mpsc::channel::<Chunk>(CHANNEL_CAPACITY);

    tokio::spawn(async move {
        let outcome = pump(batches, &tx, operation, &subject).await;
        drop(guard);
        tracing::debug!(operation, subject = %subject, ?outcome, "stream finished");
    });

    (
        [(CONTENT_TYPE, "application/json")],
        Body::from_stream(ReceiverStream::new(rx)),
    )
        .into_response()
}

/// Copies batches into `tx` until the last batch, an error, or the
/// receiver closing.
pub async fn pump(
    mut batches: BatchStream,
    tx: &mpsc::Sender<Chunk>,
    operation: &'static str,
    subject: &str,
) -> Outcome {
    loop {
        let next = tokio::select! {
            biased;
            () = tx.closed() => return disconnected(operation, subject),
            next = batches.next() => next,
        };

        let batch = match next {
            None => return Outcome::Completed,
            Some(Ok(batch)) => batch,
            Some(Err(e)) => {
                let classified = classify_logged(operation, subject, &e);
                let mut buf = BytesMut::new();
                encode_into(&mut buf, &JsonMessage::failure(&classified));
                // The client may already be gone; nothing else to report to.
                let _ = tx.send(Ok(buf.freeze())).await;
                return Outcome::Failed;
            }
        };

        let mut buf = BytesMut::new();
        for line in &batch.reply.logs {
            encode_into(&mut buf, &JsonMessage::log(line, &batch.reply.id));
        }
        if !buf.is_empty() && tx.send(Ok(buf.freeze())).await.is_err() {
            return disconnected(operation, subject);
        }

        if !batch.continues {
            return Outcome::Completed;
        }
    }
}

fn disconnected(operation: &'static str, subject: &str) -> Outcome {
    let err = DockerError::server("client disconnected before the stream finished");
    tracing::warn!(operation, subject, kind = ?err.kind(), error = %err, "stream aborted");
    Outcome::Disconnected
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use podgate_core::podman::MoreResponse;
    use podgate_core::{BackendError, ReplyBatch};
    use serde_json::Value;

    fn batch(logs: &[&str], continues: bool) -> podgate_core::Result<ReplyBatch> {
        Ok(ReplyBatch {
            reply: MoreResponse {
                logs: logs.iter().map(ToString::to_string).collect(),
                id: "abc".to_string(),
            },
            continues,
        })
    }

    async fn drain(mut rx: mpsc::Receiver<Chunk>) -> (usize, Vec<Value>) {
        let mut chunks = 0;
        let mut messages = Vec::new();
        while let Some(Ok(chunk)) = rx.recv().await {
            chunks += 1;
            for line in chunk.split(|b| *b == b'\n').filter(|l| !l.is_empty()) {
                messages.push(serde_json::from_slice(line).unwrap());
            }
        }
        (chunks, messages)
    }

    #[tokio::test]
    async fn emits_every_line_once_per_batch() {
        let batches = stream::iter(vec![
            batch(&["Trying to pull", "Copying blob"], true),
            batch(&[], true),
            batch(&["Writing manifest"], false),
        ])
        .boxed();
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        let outcome = pump(batches, &tx, "pull", "alpine").await;
        drop(tx);
        let (chunks, messages) = drain(rx).await;

        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(chunks, 2);
        let lines: Vec<&str> = messages.iter().map(|m| m["stream"].as_str().unwrap()).collect();
        assert_eq!(lines, vec!["Trying to pull", "Copying blob", "Writing manifest"]);
        assert!(messages.iter().all(|m| m["id"] == "abc" && m.get("error").is_none()));
    }

    #[tokio::test]
    async fn stops_after_last_batch() {
        let batches = stream::iter(vec![batch(&["done"], false), batch(&["never"], false)]).boxed();
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        assert_eq!(pump(batches, &tx, "build", "app").await, Outcome::Completed);
        drop(tx);
        let (_, messages) = drain(rx).await;
        assert_eq!(messages.len(), 1);
    }

    #[tokio::test]
    async fn mid_stream_error_is_reported_in_band() {
        let batches = stream::iter(vec![
            batch(&["step 1"], true),
            Err(BackendError::from_reply(
                "io.podman.ErrorOccurred".to_string(),
                &serde_json::json!({"reason": "manifest unknown"}),
            )),
        ])
        .boxed();
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        let outcome = pump(batches, &tx, "pull", "ghost").await;
        drop(tx);
        let (_, messages) = drain(rx).await;

        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["stream"], "step 1");
        assert_eq!(messages[1]["errorDetail"]["code"], 57005);
        assert_eq!(messages[1]["errorDetail"]["message"], "manifest unknown");
        assert_eq!(messages[1]["error"], "manifest unknown");
    }

    #[tokio::test]
    async fn closed_receiver_aborts() {
        let batches = stream::pending().boxed();
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        drop(rx);

        assert_eq!(pump(batches, &tx, "pull", "alpine").await, Outcome::Disconnected);
    }

    #[test]
    fn empty_id_is_omitted() {
        let value = serde_json::to_value(JsonMessage::log("Step 1/2", "")).unwrap();
        assert_eq!(value, serde_json::json!({"stream": "Step 1/2"}));
    }
}
