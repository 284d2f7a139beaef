//! Podman `io.podman` varlink interface: record types and the backend trait.
//!
//! Field names follow the varlink interface definition, which mixes
//! camelCase (image records, build options) and snake_case (search and
//! system info records).

use crate::error::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Deserializes `null` as the type's default value.
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// Image records
// ============================================================================

/// Image as returned by `ListImages`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Image {
    pub id: String,
    pub digest: String,
    #[serde(deserialize_with = "nullable")]
    pub digests: Vec<String>,
    pub parent_id: String,
    #[serde(deserialize_with = "nullable")]
    pub repo_tags: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub repo_digests: Vec<String>,
    /// RFC 3339 timestamp.
    pub created: String,
    pub size: i64,
    pub virtual_size: i64,
    pub containers: i64,
    #[serde(deserialize_with = "nullable")]
    pub labels: HashMap<String, String>,
    pub is_parent: bool,
    pub top_layer: String,
    pub read_only: bool,
}

/// One layer entry returned by `HistoryImage`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageHistory {
    pub id: String,
    /// RFC 3339 timestamp.
    pub created: String,
    pub created_by: String,
    #[serde(deserialize_with = "nullable")]
    pub tags: Vec<String>,
    pub size: i64,
    pub comment: String,
}

/// Filter passed to `SearchImages`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSearchFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_official: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_automated: Option<bool>,
    pub star_count: i64,
}

/// One result of `SearchImages`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSearchResult {
    pub description: String,
    pub is_official: bool,
    pub is_automated: bool,
    pub registry: String,
    pub name: String,
    pub star_count: i64,
}

// ============================================================================
// Continuation replies
// ============================================================================

/// Progress payload of `PullImage` and `BuildImage` replies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoreResponse {
    #[serde(deserialize_with = "nullable")]
    pub logs: Vec<String>,
    pub id: String,
}

/// One reply of a multi-reply call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplyBatch {
    pub reply: MoreResponse,
    /// More batches follow.
    pub continues: bool,
}

/// Finite sequence of reply batches for one streaming call.
///
/// The stream ends after the batch whose `continues` flag is false, or after
/// the first error.
pub type BatchStream = BoxStream<'static, Result<ReplyBatch>>;

// ============================================================================
// Build
// ============================================================================

/// Resource options of `BuildImage`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildOptions {
    pub add_hosts: Vec<String>,
    pub cgroup_parent: String,
    pub cpu_period: i64,
    pub cpu_quota: i64,
    pub cpu_shares: i64,
    pub cpuset_cpus: String,
    pub cpuset_mems: String,
    pub memory: i64,
    pub memory_swap: i64,
    pub shm_size: String,
    pub ulimit: Vec<String>,
    pub volume: Vec<String>,
}

/// Parameters of `BuildImage`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildInfo {
    pub additional_tags: Vec<String>,
    pub build_args: HashMap<String, String>,
    pub build_options: BuildOptions,
    /// Path of the staged context tarball.
    pub context_dir: String,
    pub dockerfiles: Vec<String>,
    pub force_rm_intermediate_ctrs: bool,
    pub label: Vec<String>,
    pub nocache: bool,
    /// Primary output tag.
    pub output: String,
    pub pull_policy: String,
    pub squash: bool,
}

// ============================================================================
// System info
// ============================================================================

/// Result of `GetInfo`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PodmanInfo {
    pub host: InfoHost,
    #[serde(deserialize_with = "nullable")]
    pub registries: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub insecure_registries: Vec<String>,
    pub store: InfoStore,
    pub podman: InfoPodmanBinary,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfoHost {
    pub buildah_version: String,
    pub distribution: InfoDistribution,
    pub mem_free: i64,
    pub mem_total: i64,
    pub swap_free: i64,
    pub swap_total: i64,
    pub arch: String,
    pub cpus: i64,
    pub hostname: String,
    pub kernel: String,
    pub os: String,
    pub uptime: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfoDistribution {
    pub distribution: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfoStore {
    pub containers: i64,
    pub images: i64,
    pub graph_driver_name: String,
    pub graph_driver_options: String,
    pub graph_root: String,
    pub graph_status: InfoGraphStatus,
    pub run_root: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfoGraphStatus {
    pub backing_filesystem: String,
    pub native_overlay_diff: String,
    pub supports_d_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfoPodmanBinary {
    pub compiler: String,
    pub go_version: String,
    pub podman_version: String,
    pub git_commit: String,
}

// ============================================================================
// Backend trait
// ============================================================================

/// Calls exposed by the Podman backend.
///
/// Implementations must be safe to share between concurrent requests.
#[async_trait]
pub trait PodmanBackend: Send + Sync {
    /// Lists local images.
    async fn list_images(&self) -> Result<Vec<Image>>;

    /// Returns the inspect document of an image, serialized as a JSON string.
    async fn inspect_image(&self, name: &str) -> Result<String>;

    /// Removes an image and returns the deleted ID.
    async fn remove_image(&self, name: &str, force: bool) -> Result<String>;

    /// Adds a tag to an image.
    async fn tag_image(&self, name: &str, tagged: &str) -> Result<String>;

    /// Returns the layer history of an image, newest first.
    async fn history_image(&self, name: &str) -> Result<Vec<ImageHistory>>;

    /// Searches registries for images.
    async fn search_images(
        &self,
        query: &str,
        limit: Option<i64>,
        filter: ImageSearchFilter,
    ) -> Result<Vec<ImageSearchResult>>;

    /// Exports an image (plus extra tags of the same repository) to `destination`.
    async fn export_image(
        &self,
        name: &str,
        destination: &str,
        compress: bool,
        tags: Vec<String>,
    ) -> Result<String>;

    /// Pulls an image, streaming progress.
    async fn pull_image(&self, name: &str) -> Result<BatchStream>;

    /// Builds an image, streaming progress.
    async fn build_image(&self, build: BuildInfo) -> Result<BatchStream>;

    /// Returns host and storage information.
    async fn get_info(&self) -> Result<PodmanInfo>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn image_tolerates_null_collections() {
        let image: Image = serde_json::from_value(json!({
            "id": "abc",
            "repoTags": null,
            "labels": null,
            "created": "2019-05-01T10:00:00Z",
            "size": 10
        }))
        .unwrap();

        assert_eq!(image.id, "abc");
        assert!(image.repo_tags.is_empty());
        assert!(image.labels.is_empty());
        assert_eq!(image.size, 10);
    }

    #[test]
    fn search_filter_omits_unset_flags() {
        let filter = ImageSearchFilter {
            is_official: Some(true),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!({"is_official": true, "star_count": 0})
        );
    }

    #[test]
    fn build_info_uses_interface_names() {
        let info = BuildInfo {
            output: "app:1".to_string(),
            additional_tags: vec!["app:latest".to_string()],
            ..Default::default()
        };
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["output"], "app:1");
        assert_eq!(value["additionalTags"], json!(["app:latest"]));
        assert!(value["buildOptions"].get("cpuShares").is_some());
        assert!(value.get("forceRmIntermediateCtrs").is_some());
    }

    #[test]
    fn info_parses_snake_case_fields() {
        let info: PodmanInfo = serde_json::from_value(json!({
            "host": {"arch": "amd64", "cpus": 4, "mem_total": 1024,
                     "distribution": {"distribution": "fedora", "version": "30"}},
            "store": {"graph_driver_name": "overlay", "images": 3},
            "insecure_registries": ["10.0.0.0/8"]
        }))
        .unwrap();

        assert_eq!(info.host.cpus, 4);
        assert_eq!(info.host.distribution.distribution, "fedora");
        assert_eq!(info.store.graph_driver_name, "overlay");
        assert_eq!(info.insecure_registries, vec!["10.0.0.0/8"]);
    }
}
