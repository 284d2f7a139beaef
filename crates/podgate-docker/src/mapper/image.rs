//! Image list, history and search records.

use crate::types::{HistoryResponseItem, ImageSummary, SearchResult};
use chrono::DateTime;
use podgate_core::podman::{Image, ImageHistory, ImageSearchResult};

/// Placeholder for an image without tags.
pub const NONE_TAG: &str = "<none>:<none>";

/// Placeholder for an image without digests.
pub const NONE_DIGEST: &str = "<none>@<none>";

/// Parses an RFC 3339 timestamp into Unix seconds.
///
/// Unparsable input yields 0 and a warning; a bad timestamp never fails
/// the request.
#[must_use]
pub fn parse_created(raw: &str) -> i64 {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(created) => created.timestamp(),
        Err(e) => {
            tracing::warn!(created = raw, error = %e, "created parse fail");
            0
        }
    }
}

fn or_sentinel(values: Vec<String>, sentinel: &str) -> Vec<String> {
    if values.is_empty() {
        vec![sentinel.to_string()]
    } else {
        values
    }
}

/// Projects a listed image into a Docker image summary.
#[must_use]
pub fn image_summary(src: Image) -> ImageSummary {
    ImageSummary {
        created: parse_created(&src.created),
        id: src.id,
        parent_id: src.parent_id,
        repo_tags: or_sentinel(src.repo_tags, NONE_TAG),
        repo_digests: or_sentinel(src.repo_digests, NONE_DIGEST),
        size: src.size,
        shared_size: 0,
        virtual_size: src.virtual_size,
        labels: src.labels,
        containers: src.containers,
    }
}

/// Projects one history layer.
#[must_use]
pub fn history_item(src: ImageHistory) -> HistoryResponseItem {
    HistoryResponseItem {
        created: parse_created(&src.created),
        id: src.id,
        created_by: src.created_by,
        tags: src.tags,
        size: src.size,
        comment: src.comment,
    }
}

/// Projects one registry search hit.
#[must_use]
pub fn search_result(src: ImageSearchResult) -> SearchResult {
    SearchResult {
        name: src.name,
        description: src.description,
        is_official: src.is_official,
        is_automated: src.is_automated,
        star_count: src.star_count,
    }
}
