//! Varlink client for the Podman service.
//!
//! One connection is shared by the whole process. It is opened on first use
//! and guarded by a mutex, because a varlink connection carries a single call
//! at a time. Streaming calls keep the guard until their last reply, so
//! concurrent requests queue behind a running pull or build.

use crate::error::{BackendError, Result};
use crate::podman::{
    BatchStream, BuildInfo, Image, ImageHistory, ImageSearchFilter, ImageSearchResult,
    MoreResponse, PodmanBackend, PodmanInfo, ReplyBatch,
};
use crate::trace::current_trace_id;
use async_trait::async_trait;
use podgate_transport::{Call, Reply, TransportError, VarlinkConnection};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::Instrument;

/// Default address of the Podman varlink socket.
pub const DEFAULT_PODMAN_ADDRESS: &str = "unix:/run/podman/io.podman";

type ConnectionSlot = Option<VarlinkConnection>;

/// Podman backend reached over varlink.
pub struct VarlinkBackend {
    address: String,
    connection: Arc<Mutex<ConnectionSlot>>,
}

impl VarlinkBackend {
    /// Creates a client for `address`. No connection is made until the first call.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            connection: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns the backend address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Performs a single-reply call and decodes the `key` output parameter.
    ///
    /// The connection is taken out of the slot for the exchange and only
    /// returned after a complete reply. A call that fails or is cancelled
    /// between send and receive leaves the slot empty, so the next caller
    /// reconnects instead of reading this call's reply.
    async fn call<T>(&self, method: &str, parameters: Value, key: &str) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        let span = tracing::debug_span!("varlink_call", method, trace_id = %current_trace_id());
        async {
            let mut slot = self.connection.lock().await;
            let mut connection = checkout(&mut *slot, &self.address).await?;

            let reply = connection.call(&Call::new(method, parameters)).await?;
            *slot = Some(connection);

            decode_reply(method, reply, key)
        }
        .instrument(span)
        .await
    }

    /// Starts a multi-reply call. The returned stream owns the connection
    /// until it yields its last batch or is dropped.
    async fn call_more(
        &self,
        method: &'static str,
        parameters: Value,
        key: &'static str,
    ) -> Result<BatchStream> {
        tracing::debug!(trace_id = %current_trace_id(), method, "varlink streaming call");

        let mut slot = Arc::clone(&self.connection).lock_owned().await;
        let mut connection = checkout(&mut *slot, &self.address).await?;
        connection.send(&Call::more(method, parameters)).await?;
        *slot = Some(connection);

        let call = MoreCall {
            slot,
            method,
            key,
            state: MoreState::Open,
        };

        Ok(Box::pin(futures::stream::unfold(call, |mut call| async move {
            if call.state != MoreState::Open {
                return None;
            }
            let batch = call.next_batch().await;
            Some((batch, call))
        })))
    }
}

/// Takes the idle connection out of `slot`, or opens a new one.
async fn checkout(slot: &mut ConnectionSlot, address: &str) -> Result<VarlinkConnection> {
    if let Some(connection) = slot.take() {
        return Ok(connection);
    }
    let connection = VarlinkConnection::connect(address).await?;
    tracing::info!(address, "podman connected");
    Ok(connection)
}

fn decode_reply<T>(method: &str, reply: Reply, key: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if let Some(error) = reply.error {
        return Err(BackendError::from_reply(error, &reply.parameters));
    }
    decode_parameter(method, reply.parameters, key)
}

fn decode_parameter<T>(method: &str, mut parameters: Value, key: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    // An explicit null is an empty value; an absent key is a broken reply.
    let value = parameters
        .get_mut(key)
        .map(Value::take)
        .ok_or_else(|| BackendError::decode(method, format!("missing parameter {key}")))?;
    let decoded: Option<T> =
        serde_json::from_value(value).map_err(|e| BackendError::decode(method, e))?;
    Ok(decoded.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MoreState {
    /// Waiting for more replies.
    Open,
    /// The final reply (or an error reply) was received.
    Complete,
    /// The exchange broke; the connection must not be reused.
    Broken,
}

/// In-flight multi-reply call.
struct MoreCall {
    slot: OwnedMutexGuard<ConnectionSlot>,
    method: &'static str,
    key: &'static str,
    state: MoreState,
}

impl MoreCall {
    async fn next_batch(&mut self) -> Result<ReplyBatch> {
        let Some(connection) = self.slot.as_mut() else {
            self.state = MoreState::Broken;
            return Err(TransportError::NotConnected.into());
        };

        let reply = match connection.recv().await {
            Ok(reply) => reply,
            Err(e) => {
                self.state = MoreState::Broken;
                return Err(e.into());
            }
        };

        if let Some(error) = reply.error {
            self.state = MoreState::Complete;
            return Err(BackendError::from_reply(error, &reply.parameters));
        }

        let continues = reply.continues;
        match decode_parameter::<MoreResponse>(self.method, reply.parameters, self.key) {
            Ok(response) => {
                if !continues {
                    self.state = MoreState::Complete;
                }
                Ok(ReplyBatch {
                    reply: response,
                    continues,
                })
            }
            Err(e) => {
                self.state = MoreState::Broken;
                Err(e)
            }
        }
    }
}

impl Drop for MoreCall {
    fn drop(&mut self) {
        if self.state != MoreState::Complete {
            // Replies may still be in flight; start the next call on a fresh connection.
            tracing::debug!(method = self.method, "discarding connection of unfinished call");
            self.slot.take();
        }
    }
}

#[async_trait]
impl PodmanBackend for VarlinkBackend {
    async fn list_images(&self) -> Result<Vec<Image>> {
        self.call("io.podman.ListImages", json!({}), "images").await
    }

    async fn inspect_image(&self, name: &str) -> Result<String> {
        self.call("io.podman.InspectImage", json!({ "name": name }), "image")
            .await
    }

    async fn remove_image(&self, name: &str, force: bool) -> Result<String> {
        self.call(
            "io.podman.RemoveImage",
            json!({ "name": name, "force": force }),
            "image",
        )
        .await
    }

    async fn tag_image(&self, name: &str, tagged: &str) -> Result<String> {
        self.call(
            "io.podman.TagImage",
            json!({ "name": name, "tagged": tagged }),
            "image",
        )
        .await
    }

    async fn history_image(&self, name: &str) -> Result<Vec<ImageHistory>> {
        self.call("io.podman.HistoryImage", json!({ "name": name }), "history")
            .await
    }

    async fn search_images(
        &self,
        query: &str,
        limit: Option<i64>,
        filter: ImageSearchFilter,
    ) -> Result<Vec<ImageSearchResult>> {
        let mut parameters = json!({ "query": query, "filter": filter });
        if let Some(limit) = limit {
            parameters["limit"] = json!(limit);
        }
        self.call("io.podman.SearchImages", parameters, "results")
            .await
    }

    async fn export_image(
        &self,
        name: &str,
        destination: &str,
        compress: bool,
        tags: Vec<String>,
    ) -> Result<String> {
        self.call(
            "io.podman.ExportImage",
            json!({
                "name": name,
                "destination": destination,
                "compress": compress,
                "tags": tags,
            }),
            "image",
        )
        .await
    }

    async fn pull_image(&self, name: &str) -> Result<BatchStream> {
        self.call_more("io.podman.PullImage", json!({ "name": name }), "reply")
            .await
    }

    async fn build_image(&self, build: BuildInfo) -> Result<BatchStream> {
        self.call_more("io.podman.BuildImage", json!({ "build": build }), "image")
            .await
    }

    async fn get_info(&self) -> Result<PodmanInfo> {
        self.call("io.podman.GetInfo", json!({}), "info").await
    }
}
