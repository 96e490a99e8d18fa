//! Client tests against the combined mock router on an ephemeral port

use chordline_client::{
    health_check, CaptionClient, ClientError, GoogleCalendarClient, OAuthToken, ServiceConfig,
    SpotifyClient, WeatherClient,
};
use chordline_common::captions::{CaptionOptions, CaptionVenue, Platform, ShowDetails, Tone};
use chordline_common::config::{AppMode, Endpoint, MockServerConfig, ServiceEndpoints};
use chordline_common::weather::mock_weather;
use chordline_common::{time, Provider};
use chordline_mocks::providers::openrouter::Category;
use chordline_mocks::{build_combined_router, AppState};
use chrono::{Duration, NaiveDate};
use reqwest::Method;
use serde_json::Value;
use std::net::SocketAddr;

// ========================================
// Test Helpers
// ========================================

/// Serve the combined mocks on 127.0.0.1:0
async fn spawn_mocks(mock_config: MockServerConfig) -> SocketAddr {
    let app = build_combined_router(AppState::new(mock_config));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Local-mode endpoints pointing at the combined server's `/<slug>` mounts
fn endpoints_for(addr: SocketAddr) -> ServiceEndpoints {
    let mut endpoints = ServiceEndpoints::defaults(AppMode::Local);
    for provider in Provider::ALL {
        endpoints.set(
            provider,
            Endpoint {
                base_url: format!("http://{}/{}", addr, provider.slug()),
                credential: provider.local_credential().map(str::to_string),
                client_id: Some("test-client".to_string()),
                client_secret: Some("test-secret".to_string()),
            },
        );
    }
    endpoints
}

async fn client_config() -> ServiceConfig {
    let addr = spawn_mocks(MockServerConfig::default()).await;
    ServiceConfig::new(endpoints_for(addr)).unwrap()
}

fn show(title: &str, date: NaiveDate) -> ShowDetails {
    ShowDetails {
        title: title.to_string(),
        date,
        time: Some("21:00".to_string()),
        venue: Some(CaptionVenue {
            name: "The Bluebird Cafe".to_string(),
            city: "Nashville".to_string(),
        }),
        setlist: vec!["Whispers in the Dark".to_string()],
    }
}

fn caption_options() -> CaptionOptions {
    CaptionOptions {
        platform: Platform::Instagram,
        tone: Tone::Casual,
        include_hashtags: false,
        include_emojis: false,
        include_setlist: false,
    }
}

fn stale_token(refresh: Option<&str>) -> OAuthToken {
    OAuthToken {
        access_token: "stale_token".to_string(),
        refresh_token: refresh.map(str::to_string),
        expires_at: None,
        scope: None,
    }
}

// ========================================
// Health
// ========================================

#[tokio::test]
async fn test_health_check_all_providers_healthy() {
    let config = client_config().await;
    let results = health_check(&config).await;

    assert_eq!(results.len(), Provider::ALL.len());
    for (provider, health) in &results {
        assert!(health.is_healthy(), "{} unhealthy: {:?}", provider, health.error);
        assert!(health.error.is_none());
    }
}

#[tokio::test]
async fn test_health_check_reports_unreachable_service() {
    let addr = spawn_mocks(MockServerConfig::default()).await;
    let mut endpoints = endpoints_for(addr);

    // Grab a free port, then close it
    let closed = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let closed_addr = closed.local_addr().unwrap();
    drop(closed);
    endpoints.set(
        Provider::Mapbox,
        Endpoint {
            base_url: format!("http://{}", closed_addr),
            credential: None,
            client_id: None,
            client_secret: None,
        },
    );

    let config = ServiceConfig::new(endpoints).unwrap();
    let results = health_check(&config).await;

    let mapbox = &results[&Provider::Mapbox];
    assert!(!mapbox.is_healthy());
    assert!(mapbox.error.is_some());
    assert!(results[&Provider::Spotify].is_healthy());
}

// ========================================
// Google Calendar
// ========================================

#[tokio::test]
async fn test_list_calendars() {
    let client = GoogleCalendarClient::new(client_config().await);
    let calendars = client.list_calendars().await.unwrap();

    assert!(calendars.iter().any(|c| c.id == "primary"));
    assert!(calendars.iter().any(|c| c.id == "band-calendar@example.com"));
}

#[tokio::test]
async fn test_sync_shows_creates_events() {
    let config = client_config().await;
    let client = GoogleCalendarClient::new(config.clone());
    let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
    let shows = vec![show("Spring Opener", date), show("Spring Closer", date + Duration::days(1))];

    let report = client.sync_shows(&shows, "primary").await;
    assert_eq!(report.success, 2);
    assert_eq!(report.failed, 0);

    let response = config
        .request(Provider::GoogleCalendar, Method::GET, "/calendar/v3/calendars/primary/events")
        .await
        .send()
        .await
        .unwrap();
    let events: Value = response.json().await.unwrap();
    let items = events["items"].as_array().unwrap();
    assert_eq!(items.len(), 4);

    let created = items.iter().find(|e| e["summary"] == "Spring Opener").unwrap();
    assert_eq!(created["start"]["dateTime"], "2025-03-14T21:00:00.000Z");
    assert_eq!(created["end"]["dateTime"], "2025-03-15T00:00:00.000Z");
    assert_eq!(created["location"], "The Bluebird Cafe, Nashville");
    assert_eq!(created["description"], "Show at The Bluebird Cafe");
}

// ========================================
// OAuth refresh-and-retry
// ========================================

#[tokio::test]
async fn test_rejected_token_is_refreshed_and_retried() {
    let config = client_config().await;
    config
        .tokens()
        .set(Provider::GoogleCalendar, stale_token(Some("refresh_abc")))
        .await;

    let calendars = GoogleCalendarClient::new(config.clone()).list_calendars().await.unwrap();
    assert!(!calendars.is_empty());

    let token = config.tokens().get(Provider::GoogleCalendar).await.unwrap();
    assert!(token.access_token.starts_with("mock_google_token_"));
    assert!(token.expires_at.is_some());
}

#[tokio::test]
async fn test_refresh_without_refresh_token_is_auth_error() {
    let config = client_config().await;
    config.tokens().set(Provider::GoogleCalendar, stale_token(None)).await;

    let err = GoogleCalendarClient::new(config).list_calendars().await.unwrap_err();
    assert!(matches!(err, ClientError::Auth { provider: Provider::GoogleCalendar, .. }));
}

#[tokio::test]
async fn test_second_rejection_is_auth_error() {
    // Refreshed tokens never match this prefix
    let mock_config = MockServerConfig::default().with_token_prefix(Provider::GoogleCalendar, "never");
    let addr = spawn_mocks(mock_config).await;
    let config = ServiceConfig::new(endpoints_for(addr)).unwrap();
    config
        .tokens()
        .set(Provider::GoogleCalendar, stale_token(Some("refresh_abc")))
        .await;

    let err = GoogleCalendarClient::new(config).list_calendars().await.unwrap_err();
    match err {
        ClientError::Auth { provider, message } => {
            assert_eq!(provider, Provider::GoogleCalendar);
            assert!(message.contains("after refresh"));
        }
        other => panic!("expected auth error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_spotify_code_exchange_stores_tokens() {
    let config = client_config().await;
    let oauth = config.oauth_client(Provider::Spotify).unwrap();

    assert!(!oauth.is_connected().await);
    let token = oauth.exchange_code("auth_code_123").await.unwrap();
    assert!(token.access_token.starts_with("mock_spotify_token_"));
    assert!(token.refresh_token.is_some());
    assert!(oauth.is_connected().await);

    oauth.disconnect().await;
    assert!(config.tokens().get(Provider::Spotify).await.is_none());
}

// ========================================
// Spotify
// ========================================

#[tokio::test]
async fn test_search_tracks_returns_candidates() {
    let client = SpotifyClient::new(client_config().await);
    let candidates = client.search_tracks("neon", 10).await.unwrap();

    assert_eq!(candidates.len(), 1);
    let neon = &candidates[0];
    assert_eq!(neon.spotify_track_id, "track_2");
    assert_eq!(neon.title, "Neon Lights");
    assert_eq!(neon.artist, "Electric Sunrise");
    assert!(neon.duration_sec > 0);
}

#[tokio::test]
async fn test_artist_lookup_and_analytics() {
    let client = SpotifyClient::new(client_config().await);

    let artist = client.artist_by_name("midnight").await.unwrap().unwrap();
    assert_eq!(artist.id, "artist_1");
    assert_eq!(artist.name, "The Midnight Echoes");

    let analytics = client.artist_analytics("midnight").await.unwrap().unwrap();
    assert_eq!(analytics.followers, artist.followers.total);
    assert!(analytics.top_tracks.iter().all(|t| t.artists[0].id == "artist_1"));
    assert!(!analytics.top_tracks.is_empty());

    assert!(client.artist_analytics("nobody at all").await.unwrap().is_none());
}

// ========================================
// Weather
// ========================================

#[tokio::test]
async fn test_weather_for_show_uses_forecast() {
    let client = WeatherClient::new(client_config().await);
    let now = time::now();
    let date = (now + Duration::days(2)).date_naive();

    let weather = client.weather_for_show("Nashville", date, now).await;
    // Latest mock forecast entry is closest to a date two days out
    assert_eq!(weather.date, date);
    assert_eq!(weather.temperature, 74);
    assert_eq!(weather.condition, "Clouds");
    assert_eq!(weather.wind_speed, 8);
}

#[tokio::test]
async fn test_weather_for_past_show_skips_network() {
    // Nothing listens here; a request would fail
    let config = ServiceConfig::new(ServiceEndpoints::defaults(AppMode::Production)).unwrap();
    let client = WeatherClient::new(config);
    let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

    let weather = client.weather_for_show("Austin", date, time::now()).await;
    assert_eq!(weather, mock_weather("Austin", date));
}

#[tokio::test]
async fn test_weather_falls_back_when_key_rejected() {
    let addr = spawn_mocks(MockServerConfig::default()).await;
    let mut endpoints = endpoints_for(addr);
    endpoints.set(
        Provider::OpenWeather,
        Endpoint {
            base_url: format!("http://{}/openweather", addr),
            credential: Some("wrong_key".to_string()),
            client_id: None,
            client_secret: None,
        },
    );
    let client = WeatherClient::new(ServiceConfig::new(endpoints).unwrap());
    let now = time::now();
    let date = (now + Duration::days(2)).date_naive();

    assert!(client.forecast("Nashville").await.is_err());
    let weather = client.weather_for_show("Nashville", date, now).await;
    assert_eq!(weather, mock_weather("Nashville", date));
}

// ========================================
// Captions
// ========================================

#[tokio::test]
async fn test_caption_from_model() {
    let client = CaptionClient::new(client_config().await);
    let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();

    let caption = client.generate_caption(&show("Spring Opener", date), &caption_options()).await;
    assert!(Category::SocialMedia
        .responses()
        .iter()
        .any(|r| r.trim() == caption));
}

#[tokio::test]
async fn test_caption_falls_back_to_template() {
    let addr = spawn_mocks(MockServerConfig::default()).await;
    let mut endpoints = endpoints_for(addr);
    endpoints.set(
        Provider::OpenRouter,
        Endpoint {
            base_url: format!("http://{}/openrouter", addr),
            credential: Some("rejected_key".to_string()),
            client_id: None,
            client_secret: None,
        },
    );
    let client = CaptionClient::new(ServiceConfig::new(endpoints).unwrap());
    let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
    let details = show("Spring Opener", date);

    let err = client.ai_caption(&details, &caption_options()).await.unwrap_err();
    assert!(matches!(err, ClientError::Auth { provider: Provider::OpenRouter, .. }));

    let variations = client.variations(&details, &caption_options()).await;
    assert_eq!(variations.len(), 3);
    for caption in &variations {
        assert!(caption.contains("Spring Opener"));
        assert!(caption.contains("The Bluebird Cafe"));
    }
}
