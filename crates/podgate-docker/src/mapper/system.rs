//! System info record.

use crate::types::{RegistryConfig, SystemInfoResponse};
use chrono::{SecondsFormat, Utc};
use ipnetwork::IpNetwork;
use podgate_core::podman::PodmanInfo;

/// Engine ID reported to clients. Fixed so it is stable across restarts.
pub const ENGINE_ID: &str = "5H6A:ME4Z:MBS5:AEUT:BDYB:MBHM:Y6UI:Y7CZ:DOGT:2CXX:D5RG:BKCP";

/// Parses insecure registry networks, normalizing each to its network
/// address. Unparsable entries are dropped with a warning.
#[must_use]
pub fn insecure_registry_cidrs(raw: &[String]) -> Vec<String> {
    raw.iter()
        .filter_map(|cidr| match cidr.parse::<IpNetwork>() {
            Ok(net) => Some(
                IpNetwork::new(net.network(), net.prefix())
                    .unwrap_or(net)
                    .to_string(),
            ),
            Err(e) => {
                tracing::warn!(cidr = %cidr, error = %e, "cidr parse fail");
                None
            }
        })
        .collect()
}

/// Builds Docker system info from Podman's host and store report.
///
/// Capability flags are fixed to true; Podman does not report them.
#[must_use]
pub fn system_info(info: PodmanInfo) -> SystemInfoResponse {
    let store = info.store;
    let host = info.host;

    let driver_status = vec![
        ["Root Dir".to_string(), store.graph_root],
        ["Options".to_string(), store.graph_driver_options],
        ["Backing Filesystem".to_string(), store.graph_status.backing_filesystem],
        ["Supports d_type".to_string(), store.graph_status.supports_d_type],
        ["Native Overlay Diff".to_string(), store.graph_status.native_overlay_diff],
    ];

    SystemInfoResponse {
        id: ENGINE_ID.to_string(),
        containers: store.containers,
        images: store.images,
        driver: store.graph_driver_name,
        driver_status,
        docker_root_dir: store.run_root,
        memory_limit: true,
        swap_limit: true,
        kernel_memory: true,
        cpu_cfs_period: true,
        cpu_cfs_quota: true,
        cpu_shares: true,
        cpu_set: true,
        oom_kill_disable: true,
        ipv4_forwarding: true,
        bridge_nf_iptables: true,
        bridge_nf_ip6tables: true,
        debug: false,
        system_time: Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true),
        cgroup_driver: "podman".to_string(),
        kernel_version: host.kernel,
        operating_system: format!(
            "{} {}",
            host.distribution.distribution, host.distribution.version
        ),
        os_type: host.os,
        architecture: host.arch,
        ncpu: host.cpus,
        mem_total: host.mem_total,
        name: host.hostname,
        server_version: info.podman.podman_version,
        registry_config: RegistryConfig {
            insecure_registry_cidrs: insecure_registry_cidrs(&info.insecure_registries),
            ..Default::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use podgate_core::podman::{InfoDistribution, InfoGraphStatus, InfoHost, InfoPodmanBinary, InfoStore};

    fn podman_info() -> PodmanInfo {
        PodmanInfo {
            host: InfoHost {
                arch: "amd64".to_string(),
                cpus: 8,
                mem_total: 16_000_000_000,
                hostname: "builder".to_string(),
                kernel: "5.1.0".to_string(),
                os: "linux".to_string(),
                distribution: InfoDistribution {
                    distribution: "fedora".to_string(),
                    version: "30".to_string(),
                },
                ..Default::default()
            },
            store: InfoStore {
                containers: 2,
                images: 5,
                graph_driver_name: "overlay".to_string(),
                graph_driver_options: "overlay.mountopt=nodev".to_string(),
                graph_root: "/var/lib/containers/storage".to_string(),
                run_root: "/var/run/containers/storage".to_string(),
                graph_status: InfoGraphStatus {
                    backing_filesystem: "xfs".to_string(),
                    native_overlay_diff: "true".to_string(),
                    supports_d_type: "true".to_string(),
                },
            },
            podman: InfoPodmanBinary {
                podman_version: "1.3.1".to_string(),
                ..Default::default()
            },
            insecure_registries: vec!["10.1.2.3/8".to_string(), "bogus".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn maps_host_and_store() {
        let info = system_info(podman_info());
        assert_eq!(info.id, ENGINE_ID);
        assert_eq!(info.ncpu, 8);
        assert_eq!(info.operating_system, "fedora 30");
        assert_eq!(info.driver, "overlay");
        assert_eq!(info.docker_root_dir, "/var/run/containers/storage");
        assert_eq!(info.server_version, "1.3.1");
        assert_eq!(info.cgroup_driver, "podman");
        assert!(info.cpu_set && info.oom_kill_disable && info.ipv4_forwarding);
    }

    #[test]
    fn driver_status_pairs_in_order() {
        let info = system_info(podman_info());
        let names: Vec<&str> = info.driver_status.iter().map(|[k, _]| k.as_str()).collect();
        assert_eq!(
            names,
            vec!["Root Dir", "Options", "Backing Filesystem", "Supports d_type", "Native Overlay Diff"]
        );
        assert_eq!(info.driver_status[0][1], "/var/lib/containers/storage");
    }

    #[test]
    fn bad_cidrs_are_dropped() {
        let info = system_info(podman_info());
        assert_eq!(info.registry_config.insecure_registry_cidrs, vec!["10.0.0.0/8"]);
    }

    #[test]
    fn serializes_docker_field_names() {
        let value = serde_json::to_value(system_info(podman_info())).unwrap();
        assert_eq!(value["ID"], ENGINE_ID);
        assert_eq!(value["NCPU"], 8);
        assert_eq!(value["OSType"], "linux");
        assert_eq!(value["CPUCfsQuota"], true);
        assert_eq!(value["RegistryConfig"]["InsecureRegistryCIDRs"][0], "10.0.0.0/8");
        assert_eq!(value["DriverStatus"][2][0], "Backing Filesystem");
    }
}
