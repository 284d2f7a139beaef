//! Docker API types.
//!
//! Record shapes of Docker Engine API v1.26.
//! See: <https://docs.docker.com/engine/api/v1.26/>

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// ============================================================================
// Image Types
// ============================================================================

/// Image summary (for list).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageSummary {
    /// Image ID.
    pub id: String,
    /// Parent image ID.
    pub parent_id: String,
    /// Repository tags, never empty.
    pub repo_tags: Vec<String>,
    /// Repository digests, never empty.
    pub repo_digests: Vec<String>,
    /// Creation time in Unix seconds, 0 when unknown.
    pub created: i64,
    /// Size.
    pub size: i64,
    /// Shared size.
    pub shared_size: i64,
    /// Virtual size.
    pub virtual_size: i64,
    /// Labels.
    pub labels: HashMap<String, String>,
    /// Number of containers using this image.
    pub containers: i64,
}

/// Marker serialized as `{}`, the member type of Docker's set-like maps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmptyObject {}

/// Image inspect response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageInspect {
    /// Image ID.
    pub id: String,
    /// Repository tags.
    pub repo_tags: Vec<String>,
    /// Repository digests.
    pub repo_digests: Vec<String>,
    /// Parent image ID.
    pub parent: String,
    /// Comment.
    pub comment: String,
    /// Creation time (RFC 3339).
    pub created: String,
    /// Container the image was committed from.
    pub container: String,
    /// Container config used for the commit.
    pub container_config: ContainerConfig,
    /// Version of the engine that built the image.
    pub docker_version: String,
    /// Author.
    pub author: String,
    /// Image config.
    pub config: ContainerConfig,
    /// Architecture.
    pub architecture: String,
    /// Operating system.
    pub os: String,
    /// Size.
    pub size: i64,
    /// Virtual size.
    pub virtual_size: i64,
    /// Storage driver data.
    pub graph_driver: GraphDriver,
    /// Root filesystem.
    #[serde(rename = "RootFS")]
    pub root_fs: RootFs,
}

/// Container configuration embedded in image inspect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerConfig {
    /// Hostname.
    pub hostname: String,
    /// Domain name.
    pub domainname: String,
    /// User.
    pub user: String,
    /// Attach stdin.
    pub attach_stdin: bool,
    /// Attach stdout.
    pub attach_stdout: bool,
    /// Attach stderr.
    pub attach_stderr: bool,
    /// Exposed ports, as a set.
    pub exposed_ports: Option<BTreeMap<String, EmptyObject>>,
    /// Allocate a TTY.
    pub tty: bool,
    /// Keep stdin open.
    pub open_stdin: bool,
    /// Close stdin after one attach.
    pub stdin_once: bool,
    /// Environment variables.
    pub env: Option<Vec<String>>,
    /// Command.
    pub cmd: Option<Vec<String>>,
    /// Command is already escaped.
    pub args_escaped: bool,
    /// Image reference.
    pub image: String,
    /// Volumes, as a set.
    pub volumes: Option<BTreeMap<String, EmptyObject>>,
    /// Working directory.
    pub working_dir: String,
    /// Entrypoint.
    pub entrypoint: Option<Vec<String>>,
    /// Labels.
    pub labels: Option<HashMap<String, String>>,
    /// Stop signal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_signal: Option<String>,
}

/// Storage driver description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GraphDriver {
    /// Driver name.
    pub name: String,
    /// Driver-specific data.
    pub data: HashMap<String, String>,
}

/// Root filesystem description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RootFs {
    /// Filesystem type (`layers`).
    #[serde(rename = "Type")]
    pub fs_type: String,
    /// Layer digests, base first.
    pub layers: Vec<String>,
}

/// One entry of image history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HistoryResponseItem {
    /// Layer ID.
    pub id: String,
    /// Creation time in Unix seconds, 0 when unknown.
    pub created: i64,
    /// Command that created the layer.
    pub created_by: String,
    /// Tags pointing at this layer.
    pub tags: Vec<String>,
    /// Size.
    pub size: i64,
    /// Comment.
    pub comment: String,
}

/// Image delete response item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteResponseItem {
    /// Deleted image ID.
    pub deleted: String,
}

/// One registry search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Repository name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Official image.
    pub is_official: bool,
    /// Automated build.
    pub is_automated: bool,
    /// Star count.
    pub star_count: i64,
}

// ============================================================================
// Streaming Types
// ============================================================================

/// One message of a Docker JSON progress stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonMessage {
    /// Log text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<String>,
    /// ID the message refers to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Structured error.
    #[serde(rename = "errorDetail", skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<ErrorDetail>,
    /// Error text (legacy clients read this one).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Error payload of a [`JsonMessage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Error code.
    pub code: i64,
    /// Error message.
    pub message: String,
}

// ============================================================================
// System Types
// ============================================================================

/// Version response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VersionResponse {
    /// Proxy version.
    pub version: String,
    /// Maximum API version.
    pub api_version: String,
    /// Minimum API version.
    #[serde(rename = "MinAPIVersion")]
    pub min_api_version: String,
    /// Git commit.
    pub git_commit: String,
    /// Toolchain version.
    pub go_version: String,
    /// Operating system.
    pub os: String,
    /// Architecture.
    pub arch: String,
    /// Kernel version.
    pub kernel_version: String,
    /// Build time.
    pub build_time: String,
    /// Experimental features enabled.
    pub experimental: bool,
}

/// System info response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SystemInfoResponse {
    /// Engine ID.
    #[serde(rename = "ID")]
    pub id: String,
    /// Total containers.
    pub containers: i64,
    /// Total images.
    pub images: i64,
    /// Storage driver.
    pub driver: String,
    /// Storage driver status as `[name, value]` pairs.
    pub driver_status: Vec<[String; 2]>,
    /// Root directory.
    pub docker_root_dir: String,
    /// Memory limit support.
    pub memory_limit: bool,
    /// Swap limit support.
    pub swap_limit: bool,
    /// Kernel memory limit support.
    pub kernel_memory: bool,
    /// CFS period support.
    #[serde(rename = "CPUCfsPeriod")]
    pub cpu_cfs_period: bool,
    /// CFS quota support.
    #[serde(rename = "CPUCfsQuota")]
    pub cpu_cfs_quota: bool,
    /// CPU shares support.
    #[serde(rename = "CPUShares")]
    pub cpu_shares: bool,
    /// Cpuset support.
    #[serde(rename = "CPUSet")]
    pub cpu_set: bool,
    /// OOM kill disable support.
    pub oom_kill_disable: bool,
    /// IPv4 forwarding enabled.
    #[serde(rename = "IPv4Forwarding")]
    pub ipv4_forwarding: bool,
    /// Bridge iptables.
    pub bridge_nf_iptables: bool,
    /// Bridge ip6tables.
    #[serde(rename = "BridgeNfIp6tables")]
    pub bridge_nf_ip6tables: bool,
    /// Debug mode.
    pub debug: bool,
    /// Current time (RFC 3339, nanoseconds).
    pub system_time: String,
    /// Cgroup driver.
    pub cgroup_driver: String,
    /// Kernel version.
    pub kernel_version: String,
    /// Operating system description.
    pub operating_system: String,
    /// OS type.
    #[serde(rename = "OSType")]
    pub os_type: String,
    /// Architecture.
    pub architecture: String,
    /// Number of CPUs.
    #[serde(rename = "NCPU")]
    pub ncpu: i64,
    /// Total memory in bytes.
    pub mem_total: i64,
    /// Host name.
    pub name: String,
    /// Server version.
    pub server_version: String,
    /// Registry configuration.
    pub registry_config: RegistryConfig,
}

/// Registry service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RegistryConfig {
    /// Insecure registry networks in CIDR notation.
    #[serde(rename = "InsecureRegistryCIDRs")]
    pub insecure_registry_cidrs: Vec<String>,
    /// Per-registry index configuration.
    pub index_configs: HashMap<String, serde_json::Value>,
    /// Registry mirrors.
    pub mirrors: Vec<String>,
}
