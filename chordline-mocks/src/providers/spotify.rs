//! Spotify Web API mock
//!
//! Catalogue lookups and search are public. Anything under `/v1/me` and
//! artist insights needs a bearer token.

use axum::{
    extract::{Path, Query},
    http::{Method, Uri},
    middleware,
    routing::{get, post},
    Json, Router,
};
use chordline_common::{time, Provider};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::require_credential;
use crate::error::{MockError, MockResult};
use crate::AppState;

const PROVIDER: Provider = Provider::Spotify;
const DEFAULT_LIMIT: usize = 20;

pub fn routes(state: &AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/v1/me", get(current_user))
        .route("/v1/me/top/tracks", get(top_tracks))
        .route("/v1/me/top/artists", get(top_artists))
        .route("/v1/me/playlists", get(my_playlists))
        .route("/v1/artists/:id/insights/streams", get(stream_insights))
        .route_layer(middleware::from_fn_with_state(
            (state.clone(), PROVIDER),
            require_credential,
        ));

    Router::new()
        .merge(protected)
        .route("/api/token", post(issue_token))
        .route("/v1/search", get(search))
        .route("/v1/artists/:id", get(get_artist))
        .route("/v1/artists/:id/top-tracks", get(artist_top_tracks))
        .route("/v1/tracks", get(get_tracks))
        .route("/v1/tracks/:id", get(get_track))
        .fallback(endpoint_not_found)
}

// ========================================
// Fixtures
// ========================================

fn image(url: &str, size: u32) -> Value {
    json!({ "url": url, "width": size, "height": size })
}

const ECHOES_PHOTO: &str = "https://images.unsplash.com/photo-1493225457124-a3eb161ffa5f";
const SUNRISE_PHOTO: &str = "https://images.unsplash.com/photo-1571266028243-d220c0a9db29";
const MINSTRELS_PHOTO: &str = "https://images.unsplash.com/photo-1520637836862-4d197d17c726";

fn artist(id: &str, name: &str, genres: [&str; 3], popularity: u32, followers: u32, photo: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "type": "artist",
        "genres": genres,
        "popularity": popularity,
        "followers": { "href": null, "total": followers },
        "images": [
            image(&format!("{}?w=640&h=640&fit=crop", photo), 640),
            image(&format!("{}?w=300&h=300&fit=crop", photo), 300),
        ],
        "external_urls": { "spotify": format!("https://open.spotify.com/artist/{}", id) }
    })
}

fn artists() -> Vec<Value> {
    vec![
        artist("artist_1", "The Midnight Echoes", ["indie rock", "folk rock", "alternative"], 65, 12500, ECHOES_PHOTO),
        artist("artist_2", "Electric Sunrise", ["electronic", "synthpop", "indie electronic"], 72, 18200, SUNRISE_PHOTO),
        artist("artist_3", "The Wandering Minstrels", ["folk", "acoustic", "indie folk"], 58, 8900, MINSTRELS_PHOTO),
    ]
}

fn track(
    id: &str,
    name: &str,
    artist: (&str, &str),
    album: (&str, &str, &str),
    duration_ms: u64,
    popularity: u32,
    photo: &str,
) -> Value {
    json!({
        "id": id,
        "name": name,
        "artists": [{ "id": artist.0, "name": artist.1 }],
        "album": {
            "id": album.0,
            "name": album.1,
            "images": [image(&format!("{}?w=640&h=640&fit=crop", photo), 640)],
            "release_date": album.2
        },
        "duration_ms": duration_ms,
        "popularity": popularity,
        "preview_url": null,
        "track_number": 1,
        "type": "track",
        "external_urls": { "spotify": format!("https://open.spotify.com/track/{}", id) }
    })
}

fn tracks() -> Vec<Value> {
    vec![
        track(
            "track_1",
            "Whispers in the Dark",
            ("artist_1", "The Midnight Echoes"),
            ("album_1", "Midnight Sessions", "2024-01-15"),
            245_000,
            78,
            ECHOES_PHOTO,
        ),
        track(
            "track_2",
            "Neon Lights",
            ("artist_2", "Electric Sunrise"),
            ("album_2", "Digital Dreams", "2024-03-22"),
            312_000,
            82,
            SUNRISE_PHOTO,
        ),
        track(
            "track_3",
            "The Traveler's Song",
            ("artist_3", "The Wandering Minstrels"),
            ("album_3", "Folk Tales", "2023-11-08"),
            234_000,
            65,
            MINSTRELS_PHOTO,
        ),
    ]
}

fn playlists() -> Vec<Value> {
    vec![json!({
        "id": "playlist_1",
        "name": "Indie Rock Rising",
        "description": "The best up-and-coming indie rock artists",
        "public": true,
        "followers": { "href": null, "total": 45231 },
        "images": [image(&format!("{}?w=300&h=300&fit=crop", ECHOES_PHOTO), 300)],
        "owner": { "display_name": "Spotify", "id": "spotify" },
        "tracks": { "href": "/playlists/playlist_1/tracks", "total": 52 },
        "type": "playlist",
        "external_urls": { "spotify": "https://open.spotify.com/playlist/playlist_1" }
    })]
}

fn str_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

fn track_artist_ids(track: &Value) -> impl Iterator<Item = &str> {
    track["artists"]
        .as_array()
        .into_iter()
        .flatten()
        .map(|a| str_field(a, "id"))
}

// ========================================
// Paging
// ========================================

#[derive(Debug, Default, Deserialize)]
struct PageQuery {
    limit: Option<String>,
    offset: Option<String>,
}

impl PageQuery {
    fn limit(&self) -> usize {
        self.limit.as_deref().and_then(|v| v.parse().ok()).unwrap_or(DEFAULT_LIMIT)
    }

    fn offset(&self) -> usize {
        self.offset.as_deref().and_then(|v| v.parse().ok()).unwrap_or(0)
    }
}

/// Spotify paging object over `items`; `total` counts every match
fn paging(items: Vec<Value>, href: String, limit: usize, offset: usize) -> Value {
    let total = items.len();
    let page: Vec<Value> = items.into_iter().skip(offset).take(limit).collect();
    json!({
        "href": href,
        "items": page,
        "limit": limit,
        "next": null,
        "offset": offset,
        "previous": null,
        "total": total,
    })
}

/// Percent-encode a query component (RFC 3986 unreserved characters pass)
fn encode_component(raw: &str) -> String {
    raw.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => (b as char).to_string(),
            _ => format!("%{:02X}", b),
        })
        .collect()
}

// ========================================
// Handlers
// ========================================

/// POST /api/token
async fn issue_token() -> Json<Value> {
    let ms = time::now_millis();
    Json(json!({
        "access_token": format!("mock_spotify_token_{}", ms),
        "token_type": "Bearer",
        "scope": "user-read-private user-read-email user-library-read playlist-read-private user-top-read",
        "expires_in": 3600,
        "refresh_token": format!("mock_refresh_token_{}", ms),
    }))
}

/// GET /v1/me
async fn current_user() -> Json<Value> {
    let user_id = "mock_user_123";
    Json(json!({
        "id": user_id,
        "display_name": "Demo User",
        "email": "demo@chordline.app",
        "country": "US",
        "product": "premium",
        "followers": { "href": null, "total": 42 },
        "images": [image("https://images.unsplash.com/photo-1472099645785-5658abf4ff4e?w=300&h=300&fit=crop", 300)],
        "external_urls": { "spotify": format!("https://open.spotify.com/user/{}", user_id) }
    }))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    q: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(flatten)]
    page: PageQuery,
}

/// GET /v1/search
async fn search(Query(query): Query<SearchQuery>) -> MockResult<Json<Value>> {
    let q = query
        .q
        .as_deref()
        .filter(|q| !q.is_empty())
        .ok_or_else(|| MockError::bad_request(PROVIDER, "No search query provided"))?;
    let needle = q.to_lowercase();
    let types: Vec<&str> = query.kind.as_deref().unwrap_or("track").split(',').map(str::trim).collect();
    let (limit, offset) = (query.page.limit(), query.page.offset());
    let href = |kind: &str| {
        format!(
            "/v1/search?q={}&type={}&offset={}&limit={}",
            encode_component(q),
            kind,
            offset,
            limit
        )
    };

    let mut results = serde_json::Map::new();

    if types.contains(&"artist") {
        let matches = artists()
            .into_iter()
            .filter(|a| contains_ci(str_field(a, "name"), &needle))
            .collect();
        results.insert("artists".to_string(), paging(matches, href("artist"), limit, offset));
    }

    if types.contains(&"track") {
        let matches = tracks()
            .into_iter()
            .filter(|t| {
                contains_ci(str_field(t, "name"), &needle)
                    || t["artists"]
                        .as_array()
                        .into_iter()
                        .flatten()
                        .any(|a| contains_ci(str_field(a, "name"), &needle))
            })
            .collect();
        results.insert("tracks".to_string(), paging(matches, href("track"), limit, offset));
    }

    if types.contains(&"playlist") {
        let matches = playlists()
            .into_iter()
            .filter(|p| {
                contains_ci(str_field(p, "name"), &needle) || contains_ci(str_field(p, "description"), &needle)
            })
            .collect();
        results.insert("playlists".to_string(), paging(matches, href("playlist"), limit, offset));
    }

    Ok(Json(Value::Object(results)))
}

fn find_artist(id: &str) -> MockResult<Value> {
    artists()
        .into_iter()
        .find(|a| str_field(a, "id") == id)
        .ok_or_else(|| MockError::not_found(PROVIDER, "Artist not found"))
}

/// GET /v1/artists/:id
async fn get_artist(Path(id): Path<String>) -> MockResult<Json<Value>> {
    find_artist(&id).map(Json)
}

/// GET /v1/artists/:id/top-tracks
async fn artist_top_tracks(Path(id): Path<String>) -> MockResult<Json<Value>> {
    find_artist(&id)?;
    let top: Vec<Value> = tracks()
        .into_iter()
        .filter(|t| track_artist_ids(t).any(|artist_id| artist_id == id))
        .collect();
    Ok(Json(json!({ "tracks": top })))
}

/// GET /v1/me/top/tracks
async fn top_tracks(Query(page): Query<PageQuery>) -> Json<Value> {
    let (limit, offset) = (page.limit(), page.offset());
    let href = format!("/v1/me/top/tracks?limit={}&offset={}", limit, offset);
    Json(paging(tracks(), href, limit, offset))
}

/// GET /v1/me/top/artists
async fn top_artists(Query(page): Query<PageQuery>) -> Json<Value> {
    let (limit, offset) = (page.limit(), page.offset());
    let href = format!("/v1/me/top/artists?limit={}&offset={}", limit, offset);
    Json(paging(artists(), href, limit, offset))
}

/// GET /v1/me/playlists
async fn my_playlists(Query(page): Query<PageQuery>) -> Json<Value> {
    let (limit, offset) = (page.limit(), page.offset());
    let href = format!("/v1/me/playlists?limit={}&offset={}", limit, offset);
    Json(paging(playlists(), href, limit, offset))
}

/// GET /v1/tracks/:id
async fn get_track(Path(id): Path<String>) -> MockResult<Json<Value>> {
    tracks()
        .into_iter()
        .find(|t| str_field(t, "id") == id)
        .map(Json)
        .ok_or_else(|| MockError::not_found(PROVIDER, "Track not found"))
}

#[derive(Debug, Deserialize)]
struct TracksQuery {
    ids: Option<String>,
}

/// GET /v1/tracks?ids=a,b
///
/// Unknown ids are skipped rather than returned as null.
async fn get_tracks(Query(query): Query<TracksQuery>) -> MockResult<Json<Value>> {
    let ids = query
        .ids
        .filter(|ids| !ids.is_empty())
        .ok_or_else(|| MockError::bad_request(PROVIDER, "No track IDs provided"))?;

    let catalogue = tracks();
    let found: Vec<&Value> = ids
        .split(',')
        .filter_map(|id| catalogue.iter().find(|t| str_field(t, "id") == id.trim()))
        .collect();
    Ok(Json(json!({ "tracks": found })))
}

#[derive(Debug, Deserialize)]
struct InsightsQuery {
    start_date: Option<String>,
    end_date: Option<String>,
}

/// GET /v1/artists/:id/insights/streams
async fn stream_insights(
    Path(_id): Path<String>,
    Query(query): Query<InsightsQuery>,
) -> Json<Value> {
    Json(json!({
        "data": [
            { "date": "2024-01-01", "streams": 1250, "listeners": 980 },
            { "date": "2024-01-02", "streams": 1450, "listeners": 1120 },
            { "date": "2024-01-03", "streams": 1680, "listeners": 1300 }
        ],
        "total_streams": 15420,
        "total_listeners": 8950,
        "period": { "start": query.start_date, "end": query.end_date }
    }))
}

/// Unknown Spotify paths, reported relative to the provider mount point
async fn endpoint_not_found(method: Method, uri: Uri) -> MockError {
    MockError::not_found(PROVIDER, format!("Endpoint not found: {} {}", method, uri.path()))
}
