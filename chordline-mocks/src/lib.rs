//! chordline-mocks library - local stand-ins for third-party APIs
//!
//! Serves Google Calendar, Spotify, OpenWeatherMap, Mapbox and OpenRouter
//! look-alike endpoints so the app and its clients run without live
//! credentials. One combined router nests every provider under `/<slug>`;
//! per-provider routers mount a single provider at `/`.

use axum::{routing::get, Router};
use chordline_common::config::MockServerConfig;
use chordline_common::Provider;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod auth;
pub mod error;
pub mod providers;

use providers::google_calendar::CalendarStore;

/// Application state shared across HTTP handlers and listeners
#[derive(Clone)]
pub struct AppState {
    /// Resolved mock configuration (ports, accepted credential prefixes)
    pub config: Arc<MockServerConfig>,
    /// Calendar events; one store shared by the combined and dedicated listeners
    pub calendar: CalendarStore,
}

impl AppState {
    pub fn new(config: MockServerConfig) -> Self {
        Self {
            config: Arc::new(config),
            calendar: providers::google_calendar::seeded_store(),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(MockServerConfig::default())
    }
}

/// Routes for one provider, including its own `/health`
fn provider_routes(provider: Provider, state: &AppState) -> Router<AppState> {
    let routes = match provider {
        Provider::OpenWeather => providers::openweather::routes(state),
        Provider::Spotify => providers::spotify::routes(state),
        Provider::GoogleCalendar => providers::google_calendar::routes(state),
        Provider::OpenRouter => providers::openrouter::routes(state),
        Provider::Mapbox => providers::mapbox::routes(state),
    };
    routes.merge(api::provider_health_routes(provider))
}

/// Combined server: `/health`, `/buildinfo` and every provider under `/<slug>`
pub fn build_combined_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(api::combined_health))
        .route("/buildinfo", get(api::get_build_info));

    for provider in Provider::ALL {
        router = router.nest(&format!("/{}", provider.slug()), provider_routes(provider, &state));
    }

    router
        .fallback(api::not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Dedicated listener for one provider, mounted at `/`
pub fn build_provider_router(provider: Provider, state: AppState) -> Router {
    let routes = provider_routes(provider, &state);
    // Spotify answers unknown paths in its own envelope
    let routes = match provider {
        Provider::Spotify => routes,
        _ => routes.fallback(api::not_found),
    };

    routes
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
