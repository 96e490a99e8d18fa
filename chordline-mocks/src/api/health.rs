//! Health check endpoints
//!
//! The combined server reports every provider; each provider router also
//! answers `/health` for itself (reachable as `/<slug>/health` when nested).

use axum::{routing::get, Json, Router};
use chordline_common::{time, Provider};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct CombinedHealth {
    pub status: &'static str,
    pub services: BTreeMap<&'static str, &'static str>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct ServiceHealth {
    pub status: &'static str,
    pub service: String,
    pub timestamp: String,
}

/// GET /health on the combined server
pub async fn combined_health() -> Json<CombinedHealth> {
    Json(CombinedHealth {
        status: "healthy",
        services: Provider::ALL.iter().map(|p| (p.slug(), "running")).collect(),
        timestamp: time::iso_now(),
    })
}

fn service_health(provider: Provider) -> Json<ServiceHealth> {
    Json(ServiceHealth {
        status: "healthy",
        service: format!("{}-mock", provider.slug()),
        timestamp: time::iso_now(),
    })
}

/// `/health` for a single provider router
pub fn provider_health_routes(provider: Provider) -> Router<AppState> {
    Router::new().route("/health", get(move || async move { service_health(provider) }))
}
