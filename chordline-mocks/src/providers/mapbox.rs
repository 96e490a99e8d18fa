//! Mapbox mock: geocoding, directions, static images, tilesets, matrix, matching
//!
//! Every route expects `access_token` carrying the configured mock prefix.

use axum::{
    extract::{Path, Query},
    http::{header::LOCATION, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chordline_common::{time, Provider};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::auth::require_credential;
use crate::error::{MockError, MockResult};
use crate::AppState;

const PROVIDER: Provider = Provider::Mapbox;
const ATTRIBUTION: &str = "Mock Mapbox Geocoding API";
/// Geographic centre of the contiguous US
const US_CENTER: [f64; 2] = [-95.7129, 37.0902];

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/geocoding/v5/mapbox.places/:query", get(geocode))
        .route("/directions/v5/mapbox/:profile/:coordinates", get(directions))
        .route(
            "/styles/v1/mapbox/:style/static/:overlay/:position/:dimensions",
            get(static_image),
        )
        .route("/tilesets/v1/:username/:tileset", get(tileset))
        .route("/directions-matrix/v1/mapbox/:profile/:coordinates", get(matrix))
        .route("/matching/v5/mapbox/:profile/:coordinates", get(matching))
        .route_layer(middleware::from_fn_with_state(
            (state.clone(), PROVIDER),
            require_credential,
        ))
}

// ========================================
// Geocoding
// ========================================

#[derive(Debug, Clone, Serialize)]
struct ContextEntry {
    id: String,
    text: String,
}

#[derive(Debug, Clone, Serialize)]
struct Geometry {
    #[serde(rename = "type")]
    kind: &'static str,
    coordinates: [f64; 2],
}

#[derive(Debug, Clone, Serialize)]
struct Feature {
    id: String,
    #[serde(rename = "type")]
    kind: &'static str,
    place_name: String,
    properties: Map<String, Value>,
    text: String,
    geometry: Geometry,
    context: Vec<ContextEntry>,
}

impl Feature {
    fn new(
        id: impl Into<String>,
        place_name: impl Into<String>,
        text: impl Into<String>,
        coordinates: [f64; 2],
        context: &[(&str, &str)],
    ) -> Self {
        Self {
            id: id.into(),
            kind: "Feature",
            place_name: place_name.into(),
            properties: Map::new(),
            text: text.into(),
            geometry: Geometry {
                kind: "Point",
                coordinates,
            },
            context: context
                .iter()
                .map(|(id, text)| ContextEntry {
                    id: id.to_string(),
                    text: text.to_string(),
                })
                .collect(),
        }
    }

    fn with_property(mut self, key: &str, value: &str) -> Self {
        self.properties.insert(key.to_string(), Value::from(value));
        self
    }
}

#[derive(Debug, Serialize)]
struct FeatureCollection {
    #[serde(rename = "type")]
    kind: &'static str,
    features: Vec<Feature>,
    query: Vec<String>,
    attribution: &'static str,
}

impl FeatureCollection {
    fn new(features: Vec<Feature>, query: Vec<String>) -> Self {
        Self {
            kind: "FeatureCollection",
            features,
            query,
            attribution: ATTRIBUTION,
        }
    }
}

fn known_place(query: &str) -> Option<Feature> {
    let feature = match query {
        "nashville" => Feature::new(
            "place.nashville",
            "Nashville, Tennessee, United States",
            "Nashville",
            [-86.7816, 36.1627],
            &[("region.tennessee", "Tennessee"), ("country.us", "United States")],
        )
        .with_property("wikidata", "Q23197"),
        "new york" => Feature::new(
            "place.newyork",
            "New York, New York, United States",
            "New York",
            [-74.006, 40.7128],
            &[("region.newyork", "New York"), ("country.us", "United States")],
        )
        .with_property("wikidata", "Q60"),
        "bluebird cafe" => Feature::new(
            "poi.bluebird",
            "The Bluebird Cafe, 4104 Hillsboro Pike, Nashville, Tennessee 37215, United States",
            "The Bluebird Cafe",
            [-86.828, 36.1073],
            &[
                ("address.4104", "4104 Hillsboro Pike"),
                ("place.nashville", "Nashville"),
                ("region.tennessee", "Tennessee"),
                ("country.us", "United States"),
            ],
        )
        .with_property("category", "music venue")
        .with_property("maki", "music"),
        _ => return None,
    };
    Some(feature)
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `lon,lat` pair when the query is a coordinate
fn parse_lon_lat(query: &str) -> Option<(f64, f64)> {
    let (lon, lat) = query.split_once(',')?;
    Some((lon.trim().parse().ok()?, lat.trim().parse().ok()?))
}

fn forward_geocode(query: &str, limit: usize) -> FeatureCollection {
    let query = query.to_lowercase();
    let words = query.split_whitespace().map(str::to_string).collect();

    match known_place(&query) {
        Some(feature) => {
            let mut features = vec![feature];
            features.truncate(limit);
            FeatureCollection::new(features, words)
        }
        None => {
            let name = capitalize(&query);
            let id: String = query.split_whitespace().collect();
            let feature = Feature::new(
                format!("place.{id}"),
                format!("{name}, United States"),
                name,
                US_CENTER,
                &[("country.us", "United States")],
            );
            FeatureCollection::new(vec![feature], words)
        }
    }
}

fn reverse_geocode(raw: &str, lon: f64, lat: f64) -> FeatureCollection {
    let feature = Feature::new(
        format!("address.{}", time::now_millis()),
        "123 Mock Street, Sample City, State 12345, United States",
        "123 Mock Street",
        [lon, lat],
        &[
            ("locality.samplecity", "Sample City"),
            ("region.state", "State"),
            ("country.us", "United States"),
        ],
    );
    let query = raw.split(',').map(|part| part.trim().to_string()).collect();
    FeatureCollection::new(vec![feature], query)
}

#[derive(Debug, Deserialize)]
struct GeocodeQuery {
    limit: Option<String>,
}

/// GET /geocoding/v5/mapbox.places/{query}.json
async fn geocode(
    Path(query): Path<String>,
    Query(params): Query<GeocodeQuery>,
) -> Json<FeatureCollection> {
    let query = query.strip_suffix(".json").unwrap_or(&query);

    if let Some((lon, lat)) = parse_lon_lat(query) {
        return Json(reverse_geocode(query, lon, lat));
    }

    let limit = params
        .limit
        .as_deref()
        .and_then(|l| l.parse().ok())
        .unwrap_or(5);
    Json(forward_geocode(query, limit))
}

// ========================================
// Routing
// ========================================

/// Numbers in a `lon,lat` pair; unparsable parts become null
fn coordinate(pair: &str) -> Vec<Option<f64>> {
    pair.split(',').map(|part| part.trim().parse().ok()).collect()
}

fn random_distance() -> f64 {
    rand::thread_rng().gen_range(1000.0..51000.0)
}

fn demo_steps() -> Value {
    json!([
        {
            "distance": 245.8,
            "duration": 45.2,
            "geometry": "stepGeometry1",
            "maneuver": {
                "type": "depart",
                "instruction": "Head north on Main Street",
                "bearing_after": 0,
                "bearing_before": 0,
                "location": [-86.7816, 36.1627]
            }
        },
        {
            "distance": 523.1,
            "duration": 67.5,
            "geometry": "stepGeometry2",
            "maneuver": {
                "type": "turn",
                "instruction": "Turn right onto Music Row",
                "bearing_after": 90,
                "bearing_before": 0,
                "location": [-86.78, 36.164]
            }
        }
    ])
}

#[derive(Debug, Deserialize)]
struct DirectionsQuery {
    steps: Option<String>,
}

/// GET /directions/v5/mapbox/{profile}/{lon,lat;lon,lat...}
async fn directions(
    Path((_profile, coordinates)): Path<(String, String)>,
    Query(params): Query<DirectionsQuery>,
) -> MockResult<Json<Value>> {
    let pairs: Vec<&str> = coordinates.split(';').collect();
    let (first, last) = match pairs.as_slice() {
        [first, .., last] => (*first, *last),
        _ => {
            return Err(MockError::bad_request(
                PROVIDER,
                "At least two coordinates are required",
            ))
        }
    };

    let distance = random_distance();
    let duration = distance / 15.0;

    let mut leg = json!({ "distance": distance, "duration": duration });
    if params.steps.as_deref().unwrap_or("true") == "true" {
        leg["steps"] = demo_steps();
    }

    Ok(Json(json!({
        "routes": [{
            "distance": distance,
            "duration": duration,
            "geometry": "mockGeometryString123",
            "legs": [leg]
        }],
        "waypoints": [
            { "distance": 0, "name": "", "location": coordinate(first) },
            { "distance": distance, "name": "", "location": coordinate(last) }
        ],
        "code": "Ok",
        "uuid": format!("mock-uuid-{}", time::now_millis())
    })))
}

/// First `<digits>x<digits>` run in `raw`
fn parse_dimensions(raw: &str) -> Option<(u32, u32)> {
    let bytes = raw.as_bytes();
    for (i, _) in raw.match_indices('x') {
        let start = bytes[..i]
            .iter()
            .rposition(|b| !b.is_ascii_digit())
            .map_or(0, |p| p + 1);
        let end = bytes[i + 1..]
            .iter()
            .position(|b| !b.is_ascii_digit())
            .map_or(bytes.len(), |p| i + 1 + p);
        if start < i && end > i + 1 {
            let width = raw[start..i].parse().ok()?;
            let height = raw[i + 1..end].parse().ok()?;
            return Some((width, height));
        }
    }
    None
}

/// Placeholder image URL standing in for a rendered map
pub fn placeholder_map_url(lon: f64, lat: f64, width: u32, height: u32, marker: bool) -> String {
    let mut url = format!(
        "https://via.placeholder.com/{width}x{height}/2196F3/FFFFFF?text=Map+{lat},{lon}"
    );
    if marker {
        url.push_str("+Marker");
    }
    url
}

/// GET /styles/v1/mapbox/{style}/static/{overlay}/{lon,lat,zoom}/{WxH}
async fn static_image(
    Path((_style, overlay, position, dimensions)): Path<(String, String, String, String)>,
) -> MockResult<Response> {
    let (width, height) = parse_dimensions(&dimensions)
        .ok_or_else(|| MockError::bad_request(PROVIDER, "Invalid dimensions format"))?;

    let mut parts = position.split(',').map(|p| p.trim().parse::<f64>().unwrap_or(f64::NAN));
    let lon = parts.next().unwrap_or(f64::NAN);
    let lat = parts.next().unwrap_or(f64::NAN);

    let url = placeholder_map_url(lon, lat, width, height, overlay.contains("pin"));
    Ok((StatusCode::FOUND, [(LOCATION, url)]).into_response())
}

// ========================================
// Tilesets, matrix, matching
// ========================================

/// GET /tilesets/v1/{username}/{tileset}
async fn tileset(Path((username, tileset)): Path<(String, String)>) -> Json<Value> {
    let now = time::iso_now();
    Json(json!({
        "id": format!("{username}.{tileset}"),
        "name": "Mock Tileset",
        "description": "Mock tileset for local testing",
        "attribution": "Mock Mapbox Data",
        "bounds": [-180, -85, 180, 85],
        "center": [0, 0],
        "minzoom": 0,
        "maxzoom": 14,
        "created": now,
        "modified": now
    }))
}

fn travel_matrix(size: usize) -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
    let mut rng = rand::thread_rng();
    let mut distances = vec![vec![0.0; size]; size];
    let mut durations = vec![vec![0.0; size]; size];
    for i in 0..size {
        for j in 0..size {
            if i != j {
                let distance = rng.gen_range(1000.0..51000.0);
                distances[i][j] = distance;
                durations[i][j] = distance / 15.0;
            }
        }
    }
    (distances, durations)
}

/// GET /directions-matrix/v1/mapbox/{profile}/{coordinates}
async fn matrix(Path((_profile, coordinates)): Path<(String, String)>) -> Json<Value> {
    let pairs: Vec<&str> = coordinates.split(';').collect();
    let (distances, durations) = travel_matrix(pairs.len());
    let points: Vec<Value> = pairs
        .iter()
        .map(|pair| json!({ "distance": 0, "location": coordinate(pair) }))
        .collect();

    Json(json!({
        "distances": distances,
        "durations": durations,
        "sources": points,
        "destinations": points,
        "code": "Ok"
    }))
}

/// GET /matching/v5/mapbox/{profile}/{coordinates}
async fn matching(Path((_profile, coordinates)): Path<(String, String)>) -> Json<Value> {
    let (distance, duration) = {
        let mut rng = rand::thread_rng();
        (rng.gen_range(500.0..10500.0), rng.gen_range(60.0..1260.0))
    };
    let tracepoints: Vec<Value> = coordinates
        .split(';')
        .enumerate()
        .map(|(index, pair)| {
            json!({
                "alternatives_count": 0,
                "waypoint_index": index,
                "matchings_index": 0,
                "distance": 0,
                "name": "",
                "location": coordinate(pair)
            })
        })
        .collect();

    Json(json!({
        "matchings": [{
            "confidence": 0.95,
            "distance": distance,
            "duration": duration,
            "geometry": "mockMatchedGeometry123",
            "legs": [],
            "weight": 1.0,
            "weight_name": "routability"
        }],
        "tracepoints": tracepoints
    }))
}
