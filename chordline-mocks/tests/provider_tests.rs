//! Integration tests for the Spotify, OpenWeather, Mapbox and OpenRouter mocks
//!
//! Requests go through the combined router so the `/<slug>` mounts are
//! exercised along with the handlers.

use axum::{
    body::Body,
    http::{header::LOCATION, Request, StatusCode},
};
use chordline_mocks::{build_combined_router, AppState};
use serde_json::{json, Value};
use tower::util::ServiceExt; // for `oneshot` method

const SPOTIFY_TOKEN: &str = "mock_spotify_token_test";
const OPENROUTER_KEY: &str = "mock_openrouter_key_test";
const APPID: &str = "appid=mock_openweather_key_test";
const MAPBOX: &str = "access_token=mock_mapbox_token_test";

/// Test helper: GET with an optional bearer token
fn get(uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// Test helper: POST a JSON body with a bearer token
fn post_json(uri: &str, bearer: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("authorization", format!("Bearer {}", bearer))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test helper: Send one request through a fresh combined router
async fn send(request: Request<Body>) -> (StatusCode, Value) {
    let response = build_combined_router(AppState::default())
        .oneshot(request)
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Should parse JSON")
    };
    (status, body)
}

// =============================================================================
// Spotify
// =============================================================================

#[tokio::test]
async fn test_spotify_profile_requires_token() {
    let (status, _) = send(get("/spotify/v1/me", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(get("/spotify/v1/me", Some(SPOTIFY_TOKEN))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["id"].is_string());
    assert!(body["display_name"].is_string());
}

#[tokio::test]
async fn test_spotify_search_tracks_by_artist_name() {
    let (status, body) = send(get("/spotify/v1/search?q=electric%20sunrise", None)).await;
    assert_eq!(status, StatusCode::OK);

    // type defaults to track only
    assert!(body.get("artists").is_none());
    let items = body["tracks"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["name"], "Neon Lights");
    assert_eq!(body["tracks"]["total"], 1);
}

#[tokio::test]
async fn test_spotify_search_multiple_types_and_paging() {
    let (_, body) = send(get(
        "/spotify/v1/search?q=the&type=artist,track,playlist&limit=1&offset=1",
        None,
    ))
    .await;

    // "the" matches two artist names; total reflects all matches
    assert_eq!(body["artists"]["total"], 2);
    assert_eq!(body["artists"]["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["artists"]["items"][0]["name"], "The Wandering Minstrels");
    assert_eq!(body["artists"]["limit"], 1);
    assert_eq!(body["artists"]["offset"], 1);
    // playlist description contains "the"
    assert_eq!(body["playlists"]["total"], 1);
}

#[tokio::test]
async fn test_spotify_search_requires_query() {
    let (status, body) = send(get("/spotify/v1/search", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": {"status": 400, "message": "No search query provided"}}));
}

#[tokio::test]
async fn test_spotify_artist_lookup() {
    let (status, body) = send(get("/spotify/v1/artists/artist_3", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "The Wandering Minstrels");

    let (status, body) = send(get("/spotify/v1/artists/artist_1/top-tracks", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tracks"][0]["id"], "track_1");

    let (status, body) = send(get("/spotify/v1/artists/artist_9", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "Artist not found");
}

#[tokio::test]
async fn test_spotify_tracks_by_ids_skips_unknown() {
    let (status, body) = send(get("/spotify/v1/tracks?ids=track_3,nope,track_1", None)).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body["tracks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["track_3", "track_1"]);

    let (status, body) = send(get("/spotify/v1/tracks", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "No track IDs provided");

    let (status, _) = send(get("/spotify/v1/tracks/track_404", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_spotify_top_items_and_insights() {
    let (status, body) = send(get("/spotify/v1/me/top/tracks?limit=2", Some(SPOTIFY_TOKEN))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["total"], 3);

    let (status, body) = send(get(
        "/spotify/v1/artists/artist_1/insights/streams?start_date=2024-01-01&end_date=2024-01-31",
        Some(SPOTIFY_TOKEN),
    ))
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["period"]["start"], "2024-01-01");
    assert!(body["data"].as_array().unwrap().len() > 1);
}

#[tokio::test]
async fn test_spotify_token_endpoint_is_public() {
    let request = Request::builder()
        .method("POST")
        .uri("/spotify/api/token")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access_token"].as_str().unwrap().starts_with("mock_spotify_token"));
    assert_eq!(body["expires_in"], 3600);
}

// =============================================================================
// OpenWeather
// =============================================================================

#[tokio::test]
async fn test_weather_known_city_imperial() {
    let uri = format!("/openweather/weather?q=NASHVILLE&{}", APPID);
    let (status, body) = send(get(&uri, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Nashville");
    assert_eq!(body["main"]["temp"], 72.5);
    assert_eq!(body["weather"][0]["main"], "Clear");
    assert_eq!(body["cod"], 200);
}

#[tokio::test]
async fn test_weather_metric_conversion() {
    let uri = format!("/openweather/data/2.5/weather?q=austin&units=metric&{}", APPID);
    let (status, body) = send(get(&uri, None)).await;
    assert_eq!(status, StatusCode::OK);

    let temp = body["main"]["temp"].as_f64().unwrap();
    assert!((temp - (78.4 - 32.0) * 5.0 / 9.0).abs() < 0.01);
    let wind = body["wind"]["speed"].as_f64().unwrap();
    assert!((wind - 11.2 * 0.44704).abs() < 0.01);
    assert_eq!(body["rain"]["1h"], 0.5);
}

#[tokio::test]
async fn test_weather_unknown_city_named_after_query() {
    let uri = format!("/openweather/weather?q=Reykjavik&units=metric&{}", APPID);
    let (_, body) = send(get(&uri, None)).await;
    assert_eq!(body["name"], "Reykjavik");
    assert_eq!(body["main"]["temp"], 22.0);
}

#[tokio::test]
async fn test_weather_errors() {
    let (status, body) = send(get("/openweather/weather?q=austin&appid=real", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["cod"], 401);

    let (status, body) = send(get(&format!("/openweather/weather?{}", APPID), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"cod": 400, "message": "Nothing to geocode"}));
}

#[tokio::test]
async fn test_forecast_shape_and_cnt() {
    let uri = format!("/openweather/data/2.5/forecast?q=Memphis&units=imperial&{}", APPID);
    let (status, body) = send(get(&uri, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["city"]["name"], "Memphis");

    let list = body["list"].as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert!(list[0]["dt"].as_i64().unwrap() < list[1]["dt"].as_i64().unwrap());
    assert!(list[0]["wind"]["speed"].is_number());
    assert_eq!(list[0]["dt_txt"].as_str().unwrap().len(), "2024-01-01 00:00:00".len());

    let uri = format!("/openweather/forecast?q=Memphis&cnt=1&{}", APPID);
    let (_, body) = send(get(&uri, None)).await;
    assert_eq!(body["list"].as_array().unwrap().len(), 1);
    assert_eq!(body["cnt"], 1);
}

#[tokio::test]
async fn test_onecall_exclude_and_defaults() {
    let uri = format!("/openweather/onecall?exclude=hourly,daily&{}", APPID);
    let (status, body) = send(get(&uri, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lat"], 36.1627);
    assert_eq!(body["lon"], -86.7816);
    assert!(body.get("current").is_some());
    assert!(body.get("hourly").is_none());
    assert!(body.get("daily").is_none());

    let uri = format!("/openweather/onecall?lat=40.5&lon=-74.2&{}", APPID);
    let (_, body) = send(get(&uri, None)).await;
    assert_eq!(body["lat"], 40.5);
    assert_eq!(body["hourly"].as_array().unwrap().len(), 24);
    assert_eq!(body["daily"].as_array().unwrap().len(), 8);
}

// =============================================================================
// Mapbox
// =============================================================================

#[tokio::test]
async fn test_geocoding_known_and_unknown() {
    let uri = format!("/mapbox/geocoding/v5/mapbox.places/Bluebird%20Cafe.json?{}", MAPBOX);
    let (status, body) = send(get(&uri, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "FeatureCollection");
    assert_eq!(body["features"][0]["id"], "poi.bluebird");
    assert_eq!(body["features"][0]["properties"]["category"], "music venue");

    let uri = format!("/mapbox/geocoding/v5/mapbox.places/tulsa.json?{}", MAPBOX);
    let (_, body) = send(get(&uri, None)).await;
    assert_eq!(body["features"][0]["text"], "Tulsa");
    assert_eq!(body["features"][0]["geometry"]["coordinates"], json!([-95.7129, 37.0902]));
}

#[tokio::test]
async fn test_reverse_geocoding() {
    let uri = format!("/mapbox/geocoding/v5/mapbox.places/-86.78,36.16.json?{}", MAPBOX);
    let (status, body) = send(get(&uri, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["features"][0]["geometry"]["coordinates"], json!([-86.78, 36.16]));
    assert_eq!(body["features"][0]["text"], "123 Mock Street");
}

#[tokio::test]
async fn test_directions() {
    let uri = format!(
        "/mapbox/directions/v5/mapbox/driving/-86.78,36.16;-86.83,36.11?steps=false&{}",
        MAPBOX
    );
    let (status, body) = send(get(&uri, None)).await;
    assert_eq!(status, StatusCode::OK);

    let route = &body["routes"][0];
    let distance = route["distance"].as_f64().unwrap();
    assert!((1000.0..51000.0).contains(&distance));
    assert!((route["duration"].as_f64().unwrap() - distance / 15.0).abs() < 1e-6);
    assert!(route["legs"][0].get("steps").is_none());
    assert_eq!(body["waypoints"][1]["location"], json!([-86.83, 36.11]));
    assert_eq!(body["code"], "Ok");

    let uri = format!("/mapbox/directions/v5/mapbox/driving/-86.78,36.16;-86.83,36.11?{}", MAPBOX);
    let (_, body) = send(get(&uri, None)).await;
    assert_eq!(body["routes"][0]["legs"][0]["steps"].as_array().unwrap().len(), 2);

    let uri = format!("/mapbox/directions/v5/mapbox/driving/-86.78,36.16?{}", MAPBOX);
    let (status, body) = send(get(&uri, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"message": "At least two coordinates are required"}));
}

#[tokio::test]
async fn test_static_map_redirect() {
    let uri = format!(
        "/mapbox/styles/v1/mapbox/streets-v11/static/pin-s+ff0000(-86.78,36.16)/-86.78,36.16,14/600x400?{}",
        MAPBOX
    );
    let response = build_combined_router(AppState::default())
        .oneshot(get(&uri, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers()[LOCATION],
        "https://via.placeholder.com/600x400/2196F3/FFFFFF?text=Map+36.16,-86.78+Marker"
    );

    let uri = format!(
        "/mapbox/styles/v1/mapbox/streets-v11/static/none/-86.78,36.16,14/big?{}",
        MAPBOX
    );
    let (status, body) = send(get(&uri, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid dimensions format");
}

#[tokio::test]
async fn test_tileset_matrix_matching() {
    let (status, body) = send(get(&format!("/mapbox/tilesets/v1/demo/venues?{}", MAPBOX), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "demo.venues");

    let uri = format!("/mapbox/directions-matrix/v1/mapbox/driving/1,1;2,2;3,3?{}", MAPBOX);
    let (_, body) = send(get(&uri, None)).await;
    let distances = body["distances"].as_array().unwrap();
    assert_eq!(distances.len(), 3);
    assert_eq!(distances[1][1], 0.0);
    assert_eq!(body["sources"][2]["location"], json!([3.0, 3.0]));

    let uri = format!("/mapbox/matching/v5/mapbox/driving/1,1;2,2?{}", MAPBOX);
    let (_, body) = send(get(&uri, None)).await;
    assert_eq!(body["matchings"].as_array().unwrap().len(), 1);
    assert_eq!(body["tracepoints"][1]["waypoint_index"], 1);
}

// =============================================================================
// OpenRouter
// =============================================================================

fn chat_body(prompt: &str) -> Value {
    json!({ "messages": [{ "role": "user", "content": prompt }] })
}

#[tokio::test]
async fn test_chat_completion() {
    let prompt = "Write an Instagram caption for our show";
    let (status, body) = send(post_json(
        "/openrouter/api/v1/chat/completions",
        OPENROUTER_KEY,
        chat_body(prompt),
    ))
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["object"], "chat.completion");
    assert_eq!(body["model"], "anthropic/claude-3-sonnet");
    assert_eq!(body["choices"][0]["finish_reason"], "stop");

    let content = body["choices"][0]["message"]["content"].as_str().unwrap();
    assert!(content.contains('#'), "social media answers carry hashtags");
    assert_eq!(body["usage"]["prompt_tokens"], prompt.chars().count() / 4);
}

#[tokio::test]
async fn test_chat_completion_rejects_empty_messages() {
    let (status, body) = send(post_json(
        "/openrouter/api/v1/chat/completions",
        OPENROUTER_KEY,
        json!({ "messages": [] }),
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({"error": {"message": "Invalid messages format", "type": "invalid_request_error"}})
    );
}

#[tokio::test]
async fn test_chat_completion_stream() {
    let mut body = chat_body("Plan our next tour");
    body["stream"] = json!(true);
    body["model"] = json!("openai/gpt-4");

    let response = build_combined_router(AppState::default())
        .oneshot(post_json("/openrouter/api/v1/chat/completions", OPENROUTER_KEY, body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    let payloads: Vec<&str> = text
        .lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .collect();

    assert_eq!(payloads.last(), Some(&"[DONE]"));
    let chunks: Vec<Value> = payloads[..payloads.len() - 1]
        .iter()
        .map(|p| serde_json::from_str(p).unwrap())
        .collect();
    assert!(chunks.len() > 1);
    assert_eq!(chunks[0]["object"], "chat.completion.chunk");
    assert_eq!(chunks[0]["model"], "openai/gpt-4");
    assert!(chunks[0]["choices"][0]["finish_reason"].is_null());
    assert_eq!(chunks.last().unwrap()["choices"][0]["finish_reason"], "stop");

    let streamed: String = chunks
        .iter()
        .map(|c| c["choices"][0]["delta"]["content"].as_str().unwrap())
        .collect();
    assert!(!streamed.ends_with(' '));
    assert_eq!(streamed.split(' ').count(), chunks.len());
}

#[tokio::test]
async fn test_text_completion_and_generation() {
    let (status, body) = send(post_json(
        "/openrouter/api/v1/completions",
        OPENROUTER_KEY,
        json!({ "prompt": "Suggest a setlist" }),
    ))
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["object"], "text_completion");

    let (status, body) = send(post_json("/openrouter/api/v1/completions", OPENROUTER_KEY, json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "No prompt provided");

    let (status, body) = send(post_json(
        "/openrouter/api/v1/generation",
        OPENROUTER_KEY,
        json!({ "prompt": "anything", "type": "planning" }),
    ))
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["object"], "generation");
    assert_eq!(body["result"]["type"], "planning");
}

#[tokio::test]
async fn test_models_and_usage() {
    let (status, body) = send(get("/openrouter/api/v1/models", Some(OPENROUTER_KEY))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);

    let (status, body) = send(get("/openrouter/api/v1/usage", Some(OPENROUTER_KEY))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["requests_count"], 156);
}
