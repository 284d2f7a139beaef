//! Decoding of the inspect document Podman returns as a JSON string.
//!
//! The document is read as an untyped tree, field by field. `Id` and
//! `Config` are required. Every other field may be absent or `null`, but a
//! present field of the wrong type fails the request.

use crate::error::{DockerError, Result};
use crate::types::{ContainerConfig, EmptyObject, GraphDriver, ImageInspect, RootFs};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

type Object = Map<String, Value>;

fn decode_error(field: &str, problem: &str) -> DockerError {
    DockerError::server(format!("image inspect decode: {field} {problem}"))
}

/// One level of the document, with its path for error messages.
struct Node<'a> {
    path: &'a str,
    object: &'a Object,
}

impl<'a> Node<'a> {
    fn field(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{key}", self.path)
        }
    }

    /// Returns the value under `key`, treating `null` as absent.
    fn get(&self, key: &str) -> Option<&'a Value> {
        self.object.get(key).filter(|v| !v.is_null())
    }

    fn required<T>(&self, key: &str, read: impl FnOnce(&Self, &str) -> Result<Option<T>>) -> Result<T> {
        read(self, key)?.ok_or_else(|| decode_error(&self.field(key), "is missing"))
    }

    fn string(&self, key: &str) -> Result<Option<String>> {
        self.get(key)
            .map(|v| {
                v.as_str()
                    .map(str::to_owned)
                    .ok_or_else(|| decode_error(&self.field(key), "is not a string"))
            })
            .transpose()
    }

    fn integer(&self, key: &str) -> Result<Option<i64>> {
        self.get(key)
            .map(|v| {
                v.as_i64()
                    .or_else(|| v.as_f64().map(|f| f as i64))
                    .ok_or_else(|| decode_error(&self.field(key), "is not a number"))
            })
            .transpose()
    }

    fn strings(&self, key: &str) -> Result<Option<Vec<String>>> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        let items = value
            .as_array()
            .ok_or_else(|| decode_error(&self.field(key), "is not an array"))?;
        items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_owned)
                    .ok_or_else(|| decode_error(&self.field(key), "has a non-string element"))
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    fn object(&self, key: &str) -> Result<Option<&'a Object>> {
        self.get(key)
            .map(|v| {
                v.as_object()
                    .ok_or_else(|| decode_error(&self.field(key), "is not an object"))
            })
            .transpose()
    }

    /// Reads an object used as a set: only its keys matter.
    fn set(&self, key: &str) -> Result<Option<BTreeMap<String, EmptyObject>>> {
        Ok(self.object(key)?.map(|object| {
            object
                .keys()
                .map(|k| (k.clone(), EmptyObject::default()))
                .collect()
        }))
    }

    fn string_map(&self, key: &str) -> Result<Option<HashMap<String, String>>> {
        let Some(object) = self.object(key)? else {
            return Ok(None);
        };
        object
            .iter()
            .map(|(k, v)| {
                v.as_str()
                    .map(|s| (k.clone(), s.to_owned()))
                    .ok_or_else(|| decode_error(&format!("{}.{k}", self.field(key)), "is not a string"))
            })
            .collect::<Result<HashMap<_, _>>>()
            .map(Some)
    }
}

/// Decodes Podman's inspect payload into a Docker inspect record.
///
/// # Errors
///
/// Returns a server error if the payload is not a JSON object, a required
/// field is missing, or a present field has the wrong type.
pub fn decode_inspect(payload: &str) -> Result<ImageInspect> {
    let document: Value = serde_json::from_str(payload)
        .map_err(|e| DockerError::server(format!("image inspect decode: {e}")))?;
    let object = document
        .as_object()
        .ok_or_else(|| decode_error("document", "is not an object"))?;
    let root = Node { path: "", object };

    let id = root.required("Id", Node::string)?;
    let digest = root.string("Digest")?.unwrap_or_default();
    let digest = digest.strip_prefix("sha256:").unwrap_or(&digest).to_string();

    let config_object = root.required("Config", Node::object)?;
    let config = decode_config(
        &Node {
            path: "Config",
            object: config_object,
        },
        &digest,
    )?;

    let graph_driver = match root.object("GraphDriver")? {
        Some(object) => {
            let node = Node {
                path: "GraphDriver",
                object,
            };
            GraphDriver {
                name: node.string("Name")?.unwrap_or_default(),
                data: node.string_map("Data")?.unwrap_or_default(),
            }
        }
        None => GraphDriver::default(),
    };

    let root_fs = match root.object("RootFS")? {
        Some(object) => {
            let node = Node {
                path: "RootFS",
                object,
            };
            RootFs {
                fs_type: node.string("Type")?.unwrap_or_default(),
                layers: node.strings("Layers")?.unwrap_or_default(),
            }
        }
        None => RootFs::default(),
    };

    Ok(ImageInspect {
        id,
        repo_tags: root.strings("RepoTags")?.unwrap_or_default(),
        repo_digests: root.strings("RepoDigests")?.unwrap_or_default(),
        parent: root.string("Parent")?.unwrap_or_default(),
        comment: root.string("Comment")?.unwrap_or_default(),
        created: root.string("Created")?.unwrap_or_default(),
        container: digest,
        container_config: config.clone(),
        docker_version: root.string("Version")?.unwrap_or_default(),
        author: root.string("Author")?.unwrap_or_default(),
        config,
        architecture: root.string("Architecture")?.unwrap_or_default(),
        os: root.string("Os")?.unwrap_or_default(),
        size: root.integer("Size")?.unwrap_or_default(),
        virtual_size: root.integer("VirtualSize")?.unwrap_or_default(),
        graph_driver,
        root_fs,
    })
}

fn decode_config(node: &Node<'_>, digest: &str) -> Result<ContainerConfig> {
    Ok(ContainerConfig {
        user: node.string("User")?.unwrap_or_default(),
        exposed_ports: node.set("ExposedPorts")?,
        env: node.strings("Env")?,
        cmd: node.strings("Cmd")?,
        args_escaped: true,
        image: digest.to_string(),
        volumes: node.set("Volumes")?,
        working_dir: node.string("WorkingDir")?.unwrap_or_default(),
        entrypoint: node.strings("Entrypoint")?,
        labels: node.string_map("Labels")?,
        stop_signal: node.string("StopSignal")?,
        ..Default::default()
    })
}
