use crate::api::AppState;
use crate::error::{classify_logged, Result};
use crate::mapper;
use crate::types::{SystemInfoResponse, VersionResponse};
use axum::extract::State;
use axum::Json;

/// Get version.
pub async fn get_version() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: format!("{}-podgate", env!("CARGO_PKG_VERSION")),
        api_version: crate::API_VERSION.to_string(),
        min_api_version: crate::MIN_API_VERSION.to_string(),
        git_commit: option_env!("GIT_COMMIT").unwrap_or_default().to_string(),
        go_version: "N/A (Rust)".to_string(),
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        kernel_version: "n/a".to_string(),
        build_time: String::new(),
        experimental: false,
    })
}

/// Get system info.
///
/// # Errors
///
/// Returns the classified backend error.
pub async fn get_info(State(state): State<AppState>) -> Result<Json<SystemInfoResponse>> {
    let info = state
        .backend
        .get_info()
        .await
        .map_err(|e| classify_logged("get_info", "", &e))?;

    Ok(Json(mapper::system_info(info)))
}

/// Ping handler.
pub async fn ping() -> &'static str {
    "OK"
}
