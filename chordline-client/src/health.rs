//! Provider health probing

use chordline_common::Provider;
use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::ServiceConfig;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Healthy,
    Unhealthy,
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceStatus::Healthy => write!(f, "healthy"),
            ServiceStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceHealth {
    pub status: ServiceStatus,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServiceHealth {
    pub fn is_healthy(&self) -> bool {
        self.status == ServiceStatus::Healthy
    }
}

async fn probe(config: &ServiceConfig, provider: Provider) -> ServiceHealth {
    let url = config.url(provider, "/health");
    let start = Instant::now();
    let result = config.http().get(&url).timeout(PROBE_TIMEOUT).send().await;
    let latency_ms = start.elapsed().as_millis() as u64;

    let health = match result {
        Ok(response) if response.status().is_success() => ServiceHealth {
            status: ServiceStatus::Healthy,
            latency_ms,
            error: None,
        },
        Ok(response) => ServiceHealth {
            status: ServiceStatus::Unhealthy,
            latency_ms,
            error: Some(format!("HTTP {}", response.status().as_u16())),
        },
        Err(e) => ServiceHealth {
            status: ServiceStatus::Unhealthy,
            latency_ms,
            error: Some(e.to_string()),
        },
    };
    debug!("Health probe {} -> {} ({} ms)", url, health.status, latency_ms);
    health
}

/// Probe `<base>/health` of every provider concurrently
pub async fn health_check(config: &ServiceConfig) -> BTreeMap<Provider, ServiceHealth> {
    let probes = Provider::ALL
        .into_iter()
        .map(|provider| async move { (provider, probe(config, provider).await) });
    join_all(probes).await.into_iter().collect()
}
