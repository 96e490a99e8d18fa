//! Catch-all for unknown mock paths

use axum::{
    extract::OriginalUri,
    http::{Method, StatusCode},
    response::IntoResponse,
    Json,
};
use chordline_common::time;
use serde_json::json;
use tracing::warn;

/// 404 with the method and full original path (query included)
pub async fn not_found(method: Method, OriginalUri(uri): OriginalUri) -> impl IntoResponse {
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());
    warn!("404: {} {}", method, path);

    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Mock endpoint not found",
            "method": method.as_str(),
            "path": path,
            "timestamp": time::iso_now(),
        })),
    )
}
