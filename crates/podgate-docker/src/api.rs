//! Docker API router.
//!
//! Implements the image and system endpoints of Docker Engine API v1.26.
//! See: <https://docs.docker.com/engine/api/v1.26/>

use crate::handlers;
use crate::trace::trace_id_middleware;
use crate::version::{api_version_middleware, supported_minors};
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use podgate_core::PodmanBackend;
use std::sync::Arc;

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Podman backend.
    pub backend: Arc<dyn PodmanBackend>,
}

/// Creates the Docker API router with all endpoints.
///
/// Every route is served unversioned and under each supported `/v1.N`
/// prefix. Anything else falls through to a 501.
#[must_use]
pub fn create_router(backend: Arc<dyn PodmanBackend>) -> Router {
    let state = AppState { backend };

    let mut router = routes();
    for minor in supported_minors() {
        router = router.nest(&format!("/v1.{minor}"), routes());
    }

    router
        .fallback(handlers::not_implemented)
        .layer(middleware::from_fn(api_version_middleware))
        .layer(middleware::from_fn(trace_id_middleware))
        .with_state(state)
}

fn routes() -> Router<AppState> {
    Router::new()
        // System
        .route("/_ping", get(handlers::ping).head(handlers::ping))
        .route("/version", get(handlers::get_version))
        .route("/info", get(handlers::get_info))
        // Images
        .route("/build", post(handlers::build_image))
        .route("/images/json", get(handlers::list_images))
        .route("/images/create", post(handlers::pull_image))
        .route("/images/search", get(handlers::search_images))
        .route("/images/get", get(handlers::export_images))
        // `{name}` may contain `/`; the handlers split off the action.
        .route(
            "/images/{*name}",
            get(handlers::image_get)
                .post(handlers::image_post)
                .delete(handlers::remove_image),
        )
}
