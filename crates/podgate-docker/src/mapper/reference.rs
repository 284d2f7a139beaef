//! Image reference handling: `name[:tag][@digest]`.

use crate::error::{DockerError, Result};

/// Registry and namespace prepended to bare Docker Hub names.
pub const DEFAULT_NAMESPACE: &str = "docker.io/library/";

/// A reference split into its parts. Nothing is normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference<'a> {
    /// Repository name, including any registry host and port.
    pub name: &'a str,
    /// Tag, if present.
    pub tag: Option<&'a str>,
    /// Digest, if present.
    pub digest: Option<&'a str>,
}

impl<'a> Reference<'a> {
    /// Splits a reference string.
    ///
    /// A `:` only starts a tag when it follows the last `/`, so a registry
    /// port is never mistaken for one.
    #[must_use]
    pub fn split(raw: &'a str) -> Self {
        let (rest, digest) = match raw.split_once('@') {
            Some((rest, digest)) => (rest, Some(digest)),
            None => (raw, None),
        };

        let path_start = rest.rfind('/').map_or(0, |i| i + 1);
        match rest[path_start..].rfind(':') {
            Some(i) => {
                let colon = path_start + i;
                Self {
                    name: &rest[..colon],
                    tag: Some(&rest[colon + 1..]),
                    digest,
                }
            }
            None => Self {
                name: rest,
                tag: None,
                digest,
            },
        }
    }
}

/// Builds the name Podman pulls for a `fromImage`/`tag` pair.
///
/// An empty tag means `latest` unless `fromImage` already pins a tag or
/// digest. A `tag` that looks like a digest (`sha256:...`) is joined with
/// `@`. Names without a `/` are Docker Hub library images, which the Docker
/// CLI sends with the `docker.io/` prefix stripped; they are expanded to
/// `docker.io/library/<name>`.
#[must_use]
pub fn pull_name(from_image: &str, tag: &str) -> String {
    let parsed = Reference::split(from_image);
    let mut name = from_image.to_string();

    if parsed.tag.is_none() && parsed.digest.is_none() {
        if tag.is_empty() {
            name.push_str(":latest");
        } else if tag.contains(':') {
            name.push('@');
            name.push_str(tag);
        } else {
            name.push(':');
            name.push_str(tag);
        }
    }

    if name.contains('/') {
        name
    } else {
        format!("{DEFAULT_NAMESPACE}{name}")
    }
}

/// Splits an export request into the image to export and the extra tags of
/// the same repository to include.
///
/// # Errors
///
/// - `BadRequest` when no name is given or a secondary name has no tag.
/// - `NotImplemented` when secondary names belong to another repository;
///   Podman exports one repository per archive.
pub fn export_names(names: &[String]) -> Result<(String, Vec<String>)> {
    let Some((primary, secondary)) = names.split_first() else {
        return Err(DockerError::bad_request("no image names given for export"));
    };
    let repository = Reference::split(primary).name;

    let mut tags = Vec::with_capacity(secondary.len());
    for name in secondary {
        let parsed = Reference::split(name);
        let tag = match (parsed.tag, parsed.digest) {
            (Some(tag), None) if !tag.is_empty() && !parsed.name.is_empty() => tag,
            _ => {
                return Err(DockerError::bad_request(format!(
                    "{name}: additional export names must be name:tag"
                )));
            }
        };
        if parsed.name != repository {
            return Err(DockerError::not_implemented(
                "exporting images from multiple repositories is not supported",
            ));
        }
        tags.push(tag.to_string());
    }

    Ok((primary.clone(), tags))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn split_name_tag_digest() {
        let r = Reference::split("alpine:3.18");
        assert_eq!((r.name, r.tag, r.digest), ("alpine", Some("3.18"), None));

        let r = Reference::split("localhost:5000/app");
        assert_eq!((r.name, r.tag), ("localhost:5000/app", None));

        let r = Reference::split("localhost:5000/app:v1@sha256:abc");
        assert_eq!(
            (r.name, r.tag, r.digest),
            ("localhost:5000/app", Some("v1"), Some("sha256:abc"))
        );
    }

    #[test]
    fn bare_name_gets_library_namespace() {
        assert_eq!(pull_name("alpine", "3.18"), "docker.io/library/alpine:3.18");
        assert_eq!(pull_name("alpine", ""), "docker.io/library/alpine:latest");
    }

    #[test]
    fn qualified_name_is_kept() {
        assert_eq!(pull_name("quay.io/podman/stable", "v1"), "quay.io/podman/stable:v1");
        assert_eq!(pull_name("user/app", ""), "user/app:latest");
    }

    #[test]
    fn tag_in_from_image_wins() {
        assert_eq!(pull_name("alpine:edge", ""), "docker.io/library/alpine:edge");
    }

    #[test]
    fn digest_tag_is_joined_with_at() {
        assert_eq!(
            pull_name("user/app", "sha256:abc"),
            "user/app@sha256:abc"
        );
    }

    #[test]
    fn export_single_name() {
        let (primary, tags) = export_names(&names(&["foo:latest"])).unwrap();
        assert_eq!(primary, "foo:latest");
        assert!(tags.is_empty());
    }

    #[test]
    fn export_same_repository_tags() {
        let (primary, tags) = export_names(&names(&["foo:latest", "foo:1.0", "foo:2.0"])).unwrap();
        assert_eq!(primary, "foo:latest");
        assert_eq!(tags, vec!["1.0", "2.0"]);
    }

    #[test]
    fn export_mixed_repositories_is_not_implemented() {
        let err = export_names(&names(&["foo:latest", "bar:latest"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotImplemented);
    }

    #[test]
    fn export_untagged_secondary_is_bad_request() {
        let err = export_names(&names(&["foo:latest", "foo"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[test]
    fn export_without_names_is_bad_request() {
        assert_eq!(export_names(&[]).unwrap_err().kind(), ErrorKind::BadRequest);
    }
}
