//! Image handlers.

use super::{unsupported, QueryParams};
use crate::api::AppState;
use crate::error::{classify_logged, DockerError, Result};
use crate::mapper::{self, reference, Filters};
use crate::stream;
use crate::types::{DeleteResponseItem, HistoryResponseItem, ImageInspect, ImageSummary, SearchResult};
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tokio_util::io::ReaderStream;

/// Default number of search results.
const DEFAULT_SEARCH_LIMIT: i64 = 25;

/// List images.
///
/// # Errors
///
/// Returns `NotImplemented` for `all=true`, `BadRequest` for malformed
/// filters, or the classified backend error.
pub async fn list_images(
    State(state): State<AppState>,
    Query(query): Query<QueryParams>,
) -> Result<Json<Vec<ImageSummary>>> {
    if query.flag("all") {
        return Err(DockerError::not_implemented(
            "listing intermediate images (all=true) is not supported",
        ));
    }
    let mut filters = Filters::parse(query.first("filters"))?;
    // Pre-1.25 clients send a bare reference as `filter`.
    if let Some(reference) = query.non_empty("filter") {
        filters.add("reference", reference);
    }

    let images = state
        .backend
        .list_images()
        .await
        .map_err(|e| classify_logged("list_images", "", &e))?;

    let summaries = images
        .into_iter()
        .filter(|image| filters.matches_image(image))
        .map(mapper::image_summary)
        .collect();

    Ok(Json(summaries))
}

/// Dispatches `GET /images/{name}/json|history|get`.
///
/// Image names may contain `/`, so the whole tail is captured and the
/// action is read from its last segment.
///
/// # Errors
///
/// Returns the action's error, or `NotImplemented` for unknown actions.
pub async fn image_get(
    State(state): State<AppState>,
    Path(tail): Path<String>,
) -> Result<Response> {
    match split_action(&tail) {
        Some((name, "json")) => Ok(inspect_image(&state, name).await?.into_response()),
        Some((name, "history")) => Ok(image_history(&state, name).await?.into_response()),
        Some((name, "get")) => export(&state, vec![name.to_string()]).await,
        _ => Err(unsupported(&Method::GET, &format!("/images/{tail}"))),
    }
}

/// Dispatches `POST /images/{name}/tag`.
///
/// # Errors
///
/// Returns the tag error, or `NotImplemented` for other actions (push).
pub async fn image_post(
    State(state): State<AppState>,
    Path(tail): Path<String>,
    Query(query): Query<QueryParams>,
) -> Result<Response> {
    match split_action(&tail) {
        Some((name, "tag")) => Ok(tag_image(&state, name, &query).await?.into_response()),
        _ => Err(unsupported(&Method::POST, &format!("/images/{tail}"))),
    }
}

fn split_action(tail: &str) -> Option<(&str, &str)> {
    tail.rsplit_once('/').filter(|(name, _)| !name.is_empty())
}

async fn inspect_image(state: &AppState, name: &str) -> Result<Json<ImageInspect>> {
    let payload = state
        .backend
        .inspect_image(name)
        .await
        .map_err(|e| classify_logged("inspect_image", name, &e))?;

    let inspect = mapper::decode_inspect(&payload).inspect_err(|e| {
        tracing::error!(image = %name, error = %e, "image inspect decode failed");
    })?;
    Ok(Json(inspect))
}

async fn image_history(state: &AppState, name: &str) -> Result<Json<Vec<HistoryResponseItem>>> {
    let history = state
        .backend
        .history_image(name)
        .await
        .map_err(|e| classify_logged("history_image", name, &e))?;

    Ok(Json(history.into_iter().map(mapper::history_item).collect()))
}

async fn tag_image(state: &AppState, name: &str, query: &QueryParams) -> Result<StatusCode> {
    let mut target = query.first("repo").unwrap_or_default().to_string();
    if let Some(tag) = query.non_empty("tag") {
        target.push(':');
        target.push_str(tag);
    }
    if target.is_empty() {
        return Err(DockerError::bad_request("tag target is empty; repo is required"));
    }
    tracing::debug!(source = %name, target = %target, "image tag");

    state
        .backend
        .tag_image(name, &target)
        .await
        .map_err(|e| classify_logged("tag_image", name, &e))?;

    Ok(StatusCode::CREATED)
}

/// Remove an image.
///
/// # Errors
///
/// Returns the classified backend error.
pub async fn remove_image(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<QueryParams>,
) -> Result<Json<Vec<DeleteResponseItem>>> {
    let deleted = state
        .backend
        .remove_image(&name, query.flag("force"))
        .await
        .map_err(|e| classify_logged("remove_image", &name, &e))?;

    Ok(Json(vec![DeleteResponseItem { deleted }]))
}

/// Search registries.
///
/// # Errors
///
/// Returns `BadRequest` for a malformed `limit` or filters, or the
/// classified backend error.
pub async fn search_images(
    State(state): State<AppState>,
    Query(query): Query<QueryParams>,
) -> Result<Json<Vec<SearchResult>>> {
    let term = query.first("term").unwrap_or_default();
    let limit = query.integer("limit")?.unwrap_or(DEFAULT_SEARCH_LIMIT);
    let filter = Filters::parse(query.first("filters"))?.search_filter()?;

    let results = state
        .backend
        .search_images(term, Some(limit), filter)
        .await
        .map_err(|e| classify_logged("search_images", term, &e))?;

    Ok(Json(results.into_iter().map(mapper::search_result).collect()))
}

/// Export several tags of one repository (`GET /images/get?names=...`).
///
/// `GET /images/{name}/get` goes through the same routine with one name.
///
/// # Errors
///
/// Returns `BadRequest` for no names or an untagged secondary name,
/// `NotImplemented` for names from different repositories, or the
/// classified backend error.
pub async fn export_images(
    State(state): State<AppState>,
    Query(query): Query<QueryParams>,
) -> Result<Response> {
    let names = query.all("names").map(str::to_owned).collect();
    export(&state, names).await
}

async fn export(state: &AppState, names: Vec<String>) -> Result<Response> {
    let (primary, tags) = reference::export_names(&names)?;

    let archive = tempfile::Builder::new()
        .prefix("podgate-export")
        .suffix(".tar")
        .tempfile()
        .map_err(|e| DockerError::server(format!("failed to create export file: {e}")))?;
    let destination = format!("docker-archive:{}", archive.path().display());

    state
        .backend
        .export_image(&primary, &destination, false, tags)
        .await
        .map_err(|e| classify_logged("export_image", &primary, &e))?;

    let file = tokio::fs::File::open(archive.path())
        .await
        .map_err(|e| DockerError::server(format!("failed to open exported archive: {e}")))?;
    // The open handle keeps the data readable after the path is unlinked.
    drop(archive);

    Ok((
        [(CONTENT_TYPE, "application/x-tar")],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}

/// Pull an image (`POST /images/create?fromImage=&tag=`).
///
/// # Errors
///
/// Returns `BadRequest` without `fromImage`, `NotImplemented` for imports
/// (`fromSrc`), or the classified error of starting the pull. Failures
/// after the stream starts are reported in-band.
pub async fn pull_image(
    State(state): State<AppState>,
    Query(query): Query<QueryParams>,
) -> Result<Response> {
    let Some(from_image) = query.non_empty("fromImage") else {
        if query.non_empty("fromSrc").is_some() {
            return Err(DockerError::not_implemented("importing images is not supported"));
        }
        return Err(DockerError::bad_request("fromImage is required"));
    };
    let name = reference::pull_name(from_image, query.first("tag").unwrap_or_default());
    tracing::info!(image = %name, "pulling image");

    let batches = state
        .backend
        .pull_image(&name)
        .await
        .map_err(|e| classify_logged("pull_image", &name, &e))?;

    Ok(stream::respond(batches, "pull_image", name, ()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_is_last_segment() {
        assert_eq!(split_action("alpine/json"), Some(("alpine", "json")));
        assert_eq!(
            split_action("quay.io/podman/stable:v1/history"),
            Some(("quay.io/podman/stable:v1", "history"))
        );
        assert_eq!(split_action("alpine"), None);
        assert_eq!(split_action("/json"), None);
    }
}
