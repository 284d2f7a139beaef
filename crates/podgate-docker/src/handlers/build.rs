//! Image build handler (`POST /build`).

use super::QueryParams;
use crate::api::AppState;
use crate::error::{classify_logged, DockerError, Result};
use crate::stream;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::response::Response;
use futures::StreamExt;
use podgate_core::podman::{BuildInfo, BuildOptions};
use serde::Deserialize;
use std::collections::BTreeMap;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

/// Pull policy sent when the client asks to always pull base images.
const PULL_ALWAYS: &str = "PullAlways";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Ulimit {
    name: String,
    soft: i64,
    hard: i64,
}

fn json_param<T: serde::de::DeserializeOwned>(query: &QueryParams, key: &str) -> Result<Option<T>> {
    query
        .non_empty(key)
        .map(|raw| {
            serde_json::from_str(raw)
                .map_err(|e| DockerError::bad_request(format!("invalid {key} parameter: {e}")))
        })
        .transpose()
}

/// Translates build query parameters into Podman build parameters.
///
/// The first `t` is the output image; further `t` values become additional
/// tags. `context_dir` is left empty for the caller to fill in.
///
/// # Errors
///
/// Returns `BadRequest` when no tag is given or any parameter is malformed.
pub fn build_info(query: &QueryParams) -> Result<BuildInfo> {
    let mut tags = query.all("t").filter(|t| !t.is_empty()).map(str::to_owned);
    let output = tags
        .next()
        .ok_or_else(|| DockerError::bad_request("cannot build an image without a tag (t)"))?;
    let additional_tags = tags.collect();

    let build_args = json_param::<BTreeMap<String, Option<String>>>(query, "buildargs")?
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
        .collect();

    let label = json_param::<BTreeMap<String, String>>(query, "labels")?
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect();

    let ulimit = json_param::<Vec<Ulimit>>(query, "ulimits")?
        .unwrap_or_default()
        .into_iter()
        .map(|u| format!("{}={}:{}", u.name, u.soft, u.hard))
        .collect();

    let build_options = BuildOptions {
        add_hosts: query.all("extrahosts").filter(|h| !h.is_empty()).map(str::to_owned).collect(),
        cgroup_parent: query.first("cgroupparent").unwrap_or_default().to_string(),
        cpu_period: query.integer("cpuperiod")?.unwrap_or_default(),
        cpu_quota: query.integer("cpuquota")?.unwrap_or_default(),
        cpu_shares: query.integer("cpushares")?.unwrap_or_default(),
        cpuset_cpus: query.first("cpusetcpus").unwrap_or_default().to_string(),
        cpuset_mems: query.first("cpusetmems").unwrap_or_default().to_string(),
        memory: query.integer("memory")?.unwrap_or_default(),
        memory_swap: query.integer("memswap")?.unwrap_or_default(),
        shm_size: query
            .integer("shmsize")?
            .filter(|size| *size > 0)
            .map(|size| size.to_string())
            .unwrap_or_default(),
        ulimit,
        ..Default::default()
    };

    Ok(BuildInfo {
        additional_tags,
        build_args,
        build_options,
        context_dir: String::new(),
        dockerfiles: vec![query.non_empty("dockerfile").unwrap_or("Dockerfile").to_string()],
        force_rm_intermediate_ctrs: query.flag("forcerm"),
        label,
        nocache: query.flag("nocache"),
        output,
        pull_policy: if query.flag("pull") {
            PULL_ALWAYS.to_string()
        } else {
            String::new()
        },
        squash: query.flag("squash"),
    })
}

/// Writes the request body (the build context tarball) to a temporary file.
async fn stage_context(body: Body) -> Result<NamedTempFile> {
    let staged = tempfile::Builder::new()
        .prefix("podgate-build")
        .suffix(".tar")
        .tempfile()
        .map_err(|e| DockerError::server(format!("failed to stage build context: {e}")))?;
    let handle = staged
        .reopen()
        .map_err(|e| DockerError::server(format!("failed to stage build context: {e}")))?;
    let mut file = tokio::fs::File::from_std(handle);

    let mut chunks = body.into_data_stream();
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.map_err(|e| DockerError::bad_request(format!("failed to read build context: {e}")))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| DockerError::server(format!("failed to stage build context: {e}")))?;
    }
    file.flush()
        .await
        .map_err(|e| DockerError::server(format!("failed to stage build context: {e}")))?;

    Ok(staged)
}

/// Build an image.
///
/// # Errors
///
/// Returns `BadRequest` before staging anything if the parameters are
/// invalid, or the classified error of starting the build. Failures after
/// the stream starts are reported in-band.
pub async fn build_image(
    State(state): State<AppState>,
    Query(query): Query<QueryParams>,
    body: Body,
) -> Result<Response> {
    let mut info = build_info(&query)?;

    let context = stage_context(body).await?;
    info.context_dir = context.path().display().to_string();
    let output = info.output.clone();
    tracing::info!(image = %output, dockerfile = ?info.dockerfiles, "building image");

    let batches = state
        .backend
        .build_image(info)
        .await
        .map_err(|e| classify_logged("build_image", &output, &e))?;

    // The staged context is removed when the stream task finishes.
    Ok(stream::respond(batches, "build_image", output, context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn query(pairs: &[(&str, &str)]) -> QueryParams {
        pairs.iter().copied().collect()
    }

    #[test]
    fn first_tag_is_output() {
        let info = build_info(&query(&[("t", "app:1"), ("t", "app:latest"), ("t", "reg/app:1")])).unwrap();
        assert_eq!(info.output, "app:1");
        assert_eq!(info.additional_tags, vec!["app:latest", "reg/app:1"]);
        assert_eq!(info.dockerfiles, vec!["Dockerfile"]);
        assert!(info.pull_policy.is_empty());
    }

    #[test]
    fn missing_tag_is_bad_request() {
        let err = build_info(&query(&[("dockerfile", "Containerfile")])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[test]
    fn translates_options() {
        let info = build_info(&query(&[
            ("t", "app"),
            ("dockerfile", "build/Dockerfile.prod"),
            ("buildargs", r#"{"VERSION":"1.2","UNSET":null}"#),
            ("labels", r#"{"team":"infra","tier":"web"}"#),
            ("ulimits", r#"[{"Name":"nofile","Soft":1024,"Hard":2048}]"#),
            ("cpushares", "512"),
            ("memory", "1073741824"),
            ("memswap", "-1"),
            ("cpusetcpus", "0-3"),
            ("extrahosts", "db:10.0.0.2"),
            ("extrahosts", "cache:10.0.0.3"),
            ("nocache", "1"),
            ("pull", "true"),
            ("forcerm", "1"),
            ("squash", "0"),
        ]))
        .unwrap();

        assert_eq!(info.dockerfiles, vec!["build/Dockerfile.prod"]);
        assert_eq!(info.build_args.len(), 1);
        assert_eq!(info.build_args["VERSION"], "1.2");
        assert_eq!(info.label, vec!["team=infra", "tier=web"]);
        assert_eq!(info.build_options.ulimit, vec!["nofile=1024:2048"]);
        assert_eq!(info.build_options.cpu_shares, 512);
        assert_eq!(info.build_options.memory, 1_073_741_824);
        assert_eq!(info.build_options.memory_swap, -1);
        assert_eq!(info.build_options.cpuset_cpus, "0-3");
        assert_eq!(info.build_options.add_hosts, vec!["db:10.0.0.2", "cache:10.0.0.3"]);
        assert!(info.nocache && info.force_rm_intermediate_ctrs && !info.squash);
        assert_eq!(info.pull_policy, "PullAlways");
    }

    #[test]
    fn malformed_numbers_and_json_are_bad_request() {
        for pairs in [
            [("t", "app"), ("memory", "lots")],
            [("t", "app"), ("buildargs", "{")],
            [("t", "app"), ("ulimits", r#"{"Name":"x"}"#)],
        ] {
            let err = build_info(&query(&pairs)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::BadRequest);
        }
    }

    #[tokio::test]
    async fn staged_context_holds_body_and_is_removed_on_drop() {
        let staged = stage_context(Body::from("context-bytes")).await.unwrap();
        let path = staged.path().to_path_buf();
        assert_eq!(std::fs::read(&path).unwrap(), b"context-bytes");

        drop(staged);
        assert!(!path.exists());
    }
}
