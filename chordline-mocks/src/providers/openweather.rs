//! OpenWeatherMap 2.5 mock
//!
//! Served both at the mount root and under `/data/2.5`, so clients can use
//! either the bare mock URL or the real API's path layout. Canned readings
//! are stored in imperial units and converted on `units=metric`.

use axum::{extract::Query, middleware, routing::get, Json, Router};
use chordline_common::time;
use chordline_common::weather::{mph_to_mps, Condition, ForecastEntry, MainReadings, Units, Wind};
use chordline_common::Provider;
use chrono::{Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::auth::require_credential;
use crate::error::{MockError, MockResult};
use crate::AppState;

const PROVIDER: Provider = Provider::OpenWeather;
const NASHVILLE: (f64, f64) = (36.1627, -86.7816);

pub fn routes(state: &AppState) -> Router<AppState> {
    let api = Router::new()
        .route("/weather", get(current_weather))
        .route("/forecast", get(forecast))
        .route("/onecall", get(one_call))
        .route_layer(middleware::from_fn_with_state(
            (state.clone(), PROVIDER),
            require_credential,
        ));

    Router::new().merge(api.clone()).nest("/data/2.5", api)
}

#[derive(Debug, Clone, Serialize)]
struct Coord {
    lon: f64,
    lat: f64,
}

#[derive(Debug, Clone, Serialize)]
struct Clouds {
    all: u32,
}

#[derive(Debug, Clone, Serialize)]
struct Rain {
    #[serde(rename = "1h")]
    one_hour: f64,
}

#[derive(Debug, Clone, Serialize)]
struct Sys {
    #[serde(rename = "type")]
    kind: u32,
    id: u32,
    country: &'static str,
    sunrise: i64,
    sunset: i64,
}

impl Sys {
    fn around_now(id: u32) -> Self {
        let now = time::now_secs();
        Self {
            kind: 1,
            id,
            country: "US",
            sunrise: now - 3600,
            sunset: now + 36000,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct CurrentWeather {
    coord: Coord,
    weather: Vec<Condition>,
    base: &'static str,
    main: MainReadings,
    visibility: u32,
    wind: Wind,
    clouds: Clouds,
    #[serde(skip_serializing_if = "Option::is_none")]
    rain: Option<Rain>,
    dt: i64,
    sys: Sys,
    timezone: i32,
    id: u64,
    name: String,
    cod: u16,
}

fn readings(temp: f64, feels_like: f64, temp_min: f64, temp_max: f64, pressure: f64, humidity: f64) -> MainReadings {
    MainReadings {
        temp,
        feels_like,
        temp_min,
        temp_max,
        pressure,
        sea_level: None,
        grnd_level: None,
        humidity,
    }
}

/// Canned current weather for the four demo cities (imperial)
fn city_weather(city: &str) -> Option<CurrentWeather> {
    let (coord, condition, main, visibility, wind, clouds, rain, sys_id, timezone, id, name) =
        match city.to_lowercase().as_str() {
            "nashville" => (
                Coord { lon: -86.7816, lat: 36.1627 },
                Condition::clear_sky(),
                readings(72.5, 75.2, 68.0, 78.0, 1015.0, 45.0),
                10000,
                (8.2, 190.0),
                0,
                None,
                4608,
                -18000,
                4644585,
                "Nashville",
            ),
            "new york" => (
                Coord { lon: -74.006, lat: 40.7143 },
                Condition::new(803, "Clouds", "broken clouds", "04d"),
                readings(65.8, 68.2, 62.0, 69.0, 1012.0, 60.0),
                8000,
                (12.5, 230.0),
                75,
                None,
                4610,
                -18000,
                5128581,
                "New York",
            ),
            "san francisco" => (
                Coord { lon: -122.4194, lat: 37.7749 },
                Condition::new(701, "Mist", "mist", "50d"),
                readings(58.3, 60.1, 55.0, 62.0, 1018.0, 85.0),
                5000,
                (6.8, 270.0),
                90,
                None,
                4612,
                -28800,
                5391959,
                "San Francisco",
            ),
            "austin" => (
                Coord { lon: -97.7431, lat: 30.2672 },
                Condition::new(500, "Rain", "light rain", "10d"),
                readings(78.4, 82.1, 75.0, 83.0, 1010.0, 78.0),
                6000,
                (11.2, 160.0),
                85,
                Some(Rain { one_hour: 0.5 }),
                4614,
                -21600,
                4671654,
                "Austin",
            ),
            _ => return None,
        };

    Some(CurrentWeather {
        coord,
        weather: vec![condition],
        base: "stations",
        main,
        visibility,
        wind: Wind { speed: wind.0, deg: wind.1, gust: None },
        clouds: Clouds { all: clouds },
        rain,
        dt: time::now_secs(),
        sys: Sys::around_now(sys_id),
        timezone,
        id,
        name: name.to_string(),
        cod: 200,
    })
}

/// Clear-sky reading for any other city, already in the requested units
fn generic_weather(city: &str, units: Units) -> CurrentWeather {
    let metric = units == Units::Metric;
    let pick = |m: f64, i: f64| if metric { m } else { i };

    CurrentWeather {
        coord: Coord { lon: 0.0, lat: 0.0 },
        weather: vec![Condition::clear_sky()],
        base: "stations",
        main: readings(pick(22.0, 72.0), pick(24.0, 75.0), pick(18.0, 65.0), pick(26.0, 80.0), 1015.0, 50.0),
        visibility: 10000,
        wind: Wind { speed: pick(3.6, 8.0), deg: 180.0, gust: None },
        clouds: Clouds { all: 20 },
        rain: None,
        dt: time::now_secs(),
        sys: Sys::around_now(9999),
        timezone: -18000,
        id: 9999999,
        name: city.to_string(),
        cod: 200,
    }
}

#[derive(Debug, Deserialize)]
struct CityQuery {
    q: Option<String>,
    units: Option<String>,
    cnt: Option<String>,
}

impl CityQuery {
    fn city(&self) -> MockResult<&str> {
        self.q
            .as_deref()
            .filter(|q| !q.is_empty())
            .ok_or_else(|| MockError::bad_request(PROVIDER, "Nothing to geocode"))
    }

    fn units(&self) -> Units {
        Units::from_query(self.units.as_deref())
    }
}

/// GET /weather?q=&units=
async fn current_weather(Query(query): Query<CityQuery>) -> MockResult<Json<CurrentWeather>> {
    let city = query.city()?;
    let units = query.units();

    let weather = match city_weather(city) {
        Some(mut weather) => {
            if units == Units::Metric {
                weather.main.to_metric();
                weather.wind.speed = mph_to_mps(weather.wind.speed);
            }
            weather
        }
        None => generic_weather(city, units),
    };
    Ok(Json(weather))
}

#[derive(Debug, Serialize)]
struct PartOfDay {
    pod: &'static str,
}

/// Forecast list entry with the fields clients here do not read
#[derive(Debug, Serialize)]
struct ForecastItem {
    #[serde(flatten)]
    entry: ForecastEntry,
    clouds: Clouds,
    visibility: u32,
    pop: f64,
    sys: PartOfDay,
}

fn forecast_item(
    hours_ahead: i64,
    main: MainReadings,
    condition: Condition,
    clouds: u32,
    wind: Wind,
    pop: f64,
) -> ForecastItem {
    let at = Utc::now() + Duration::hours(hours_ahead);
    ForecastItem {
        entry: ForecastEntry {
            dt: at.timestamp(),
            main,
            weather: vec![condition],
            wind: Some(wind),
            dt_txt: at.format("%Y-%m-%d %H:%M:%S").to_string(),
        },
        clouds: Clouds { all: clouds },
        visibility: 10000,
        pop,
        sys: PartOfDay { pod: "d" },
    }
}

fn forecast_items() -> Vec<ForecastItem> {
    let mut first = readings(75.2, 77.8, 72.5, 78.0, 1015.0, 48.0);
    first.sea_level = Some(1015.0);
    first.grnd_level = Some(1012.0);
    let mut second = readings(73.8, 76.2, 70.5, 76.0, 1016.0, 52.0);
    second.sea_level = Some(1016.0);
    second.grnd_level = Some(1013.0);

    vec![
        forecast_item(
            1,
            first,
            Condition::clear_sky(),
            5,
            Wind { speed: 8.5, deg: 185.0, gust: Some(12.1) },
            0.1,
        ),
        forecast_item(
            2,
            second,
            Condition::new(801, "Clouds", "few clouds", "02d"),
            15,
            Wind { speed: 7.8, deg: 190.0, gust: Some(11.5) },
            0.15,
        ),
    ]
}

/// GET /forecast?q=&units=&cnt=
async fn forecast(Query(query): Query<CityQuery>) -> MockResult<Json<Value>> {
    let city = query.city()?;
    let mut list = forecast_items();

    if let Some(cnt) = query.cnt.as_deref().and_then(|c| c.trim().parse::<usize>().ok()) {
        list.truncate(cnt);
    }

    if query.units() == Units::Metric {
        for item in &mut list {
            item.entry.main.to_metric();
            if let Some(wind) = item.entry.wind.as_mut() {
                wind.speed = mph_to_mps(wind.speed);
            }
        }
    }

    let now = time::now_secs();
    Ok(Json(json!({
        "cod": "200",
        "message": 0,
        "cnt": list.len(),
        "list": list,
        "city": {
            "id": 4644585,
            "name": city,
            "coord": { "lat": NASHVILLE.0, "lon": NASHVILLE.1 },
            "country": "US",
            "population": 691243,
            "timezone": -18000,
            "sunrise": now - 3600,
            "sunset": now + 36000
        }
    })))
}

#[derive(Debug, Deserialize)]
struct OneCallQuery {
    lat: Option<String>,
    lon: Option<String>,
    exclude: Option<String>,
    units: Option<String>,
}

fn parse_coord(raw: Option<&str>, default: f64) -> f64 {
    raw.and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

/// Randomised one-call payload; `metric` picks the Celsius ranges
fn one_call_body(lat: f64, lon: f64, metric: bool) -> Value {
    let mut rng = rand::thread_rng();
    let now = time::now_secs();
    let pick = |m: f64, i: f64| if metric { m } else { i };

    let hourly: Vec<Value> = (0..24)
        .map(|i: i64| {
            let daytime = i > 6 && i < 18;
            json!({
                "dt": now + i * 3600,
                "temp": pick(20.0, 68.0) + rng.gen::<f64>() * pick(10.0, 18.0),
                "feels_like": pick(22.0, 72.0) + rng.gen::<f64>() * pick(10.0, 18.0),
                "pressure": 1015.0 + rng.gen::<f64>() * 10.0 - 5.0,
                "humidity": 40.0 + rng.gen::<f64>() * 30.0,
                "dew_point": pick(10.0, 50.0) + rng.gen::<f64>() * pick(8.0, 15.0),
                "uvi": if daytime { rng.gen::<f64>() * 8.0 } else { 0.0 },
                "clouds": rng.gen_range(0..100),
                "visibility": 8000.0 + rng.gen::<f64>() * 2000.0,
                "wind_speed": pick(2.0, 4.5) + rng.gen::<f64>() * pick(6.0, 13.5),
                "wind_deg": 150.0 + rng.gen::<f64>() * 60.0,
                "weather": [Condition::new(800, "Clear", "clear sky", if daytime { "01d" } else { "01n" })],
                "pop": rng.gen::<f64>() * 0.3
            })
        })
        .collect();

    let daily: Vec<Value> = (0..8)
        .map(|i: i64| {
            let day = now + i * 86400;
            json!({
                "dt": day,
                "sunrise": day - 3600,
                "sunset": day + 36000,
                "moonrise": day + 43200,
                "moonset": day + 7200,
                "moon_phase": rng.gen::<f64>(),
                "temp": {
                    "day": pick(20.0, 68.0) + rng.gen::<f64>() * pick(8.0, 15.0),
                    "min": pick(15.0, 59.0) + rng.gen::<f64>() * pick(5.0, 9.0),
                    "max": pick(25.0, 77.0) + rng.gen::<f64>() * pick(5.0, 9.0),
                    "night": pick(16.0, 61.0) + rng.gen::<f64>() * pick(4.0, 7.0),
                    "eve": pick(22.0, 72.0) + rng.gen::<f64>() * pick(3.0, 5.0),
                    "morn": pick(18.0, 64.0) + rng.gen::<f64>() * pick(3.0, 5.0)
                },
                "feels_like": {
                    "day": pick(22.0, 72.0) + rng.gen::<f64>() * pick(8.0, 15.0),
                    "night": pick(18.0, 64.0) + rng.gen::<f64>() * pick(4.0, 7.0),
                    "eve": pick(24.0, 75.0) + rng.gen::<f64>() * pick(3.0, 5.0),
                    "morn": pick(20.0, 68.0) + rng.gen::<f64>() * pick(3.0, 5.0)
                },
                "pressure": 1015.0 + rng.gen::<f64>() * 10.0 - 5.0,
                "humidity": 40.0 + rng.gen::<f64>() * 30.0,
                "dew_point": pick(10.0, 50.0) + rng.gen::<f64>() * pick(8.0, 15.0),
                "wind_speed": pick(3.0, 7.0) + rng.gen::<f64>() * pick(5.0, 11.0),
                "wind_deg": 150.0 + rng.gen::<f64>() * 60.0,
                "weather": [Condition::clear_sky()],
                "clouds": rng.gen_range(0..50),
                "pop": rng.gen::<f64>() * 0.4,
                "uvi": 6.0 + rng.gen::<f64>() * 3.0
            })
        })
        .collect();

    json!({
        "lat": lat,
        "lon": lon,
        "timezone": "America/Chicago",
        "timezone_offset": -21600,
        "current": {
            "dt": now,
            "sunrise": now - 3600,
            "sunset": now + 36000,
            "temp": pick(22.5, 72.5),
            "feels_like": pick(24.2, 75.2),
            "pressure": 1015,
            "humidity": 45,
            "dew_point": pick(12.8, 55.0),
            "uvi": 6.5,
            "clouds": 0,
            "visibility": 10000,
            "wind_speed": pick(3.6, 8.2),
            "wind_deg": 190,
            "weather": [Condition::clear_sky()]
        },
        "hourly": hourly,
        "daily": daily
    })
}

/// GET /onecall?lat=&lon=&exclude=&units=
async fn one_call(Query(query): Query<OneCallQuery>) -> Json<Value> {
    let lat = parse_coord(query.lat.as_deref(), NASHVILLE.0);
    let lon = parse_coord(query.lon.as_deref(), NASHVILLE.1);
    let metric = Units::from_query(query.units.as_deref()) == Units::Metric;

    let mut body = one_call_body(lat, lon, metric);
    if let (Some(exclude), Some(object)) = (query.exclude.as_deref(), body.as_object_mut()) {
        for section in exclude.split(',').map(str::trim) {
            object.remove(section);
        }
    }
    Json(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_city_lookup_is_case_insensitive() {
        let weather = city_weather("NEW YORK").unwrap();
        assert_eq!(weather.name, "New York");
        assert!(city_weather("Paris").is_none());
    }

    #[test]
    fn test_forecast_item_flattens_entry() {
        let value = serde_json::to_value(&forecast_items()[0]).unwrap();
        assert!(value["dt"].is_i64());
        assert_eq!(value["main"]["sea_level"], 1015.0);
        assert_eq!(value["sys"]["pod"], "d");
        assert_eq!(value["dt_txt"].as_str().unwrap().len(), 19);
    }

    #[test]
    fn test_one_call_shape() {
        let body = one_call_body(1.0, 2.0, false);
        assert_eq!(body["hourly"].as_array().unwrap().len(), 24);
        assert_eq!(body["daily"].as_array().unwrap().len(), 8);
        let temp = body["hourly"][0]["temp"].as_f64().unwrap();
        assert!((68.0..86.0).contains(&temp));
    }

    #[test]
    fn test_parse_coord_defaults() {
        assert_eq!(parse_coord(None, 5.0), 5.0);
        assert_eq!(parse_coord(Some("abc"), 5.0), 5.0);
        assert_eq!(parse_coord(Some("-1.5"), 5.0), -1.5);
    }
}
