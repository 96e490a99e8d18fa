//! Show-day weather
//!
//! OpenWeatherMap payload shapes (shared with the mock server) and the
//! logic that turns a forecast into a per-show summary.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Fahrenheit lower bound for outdoor performances
pub const OUTDOOR_MIN_TEMP_F: f64 = 50.0;
/// Fahrenheit upper bound for outdoor performances
pub const OUTDOOR_MAX_TEMP_F: f64 = 85.0;
/// Humidity at or above this is considered bad for instruments
pub const OUTDOOR_MAX_HUMIDITY: f64 = 85.0;
/// Forecast API horizon in days
pub const FORECAST_HORIZON_DAYS: i64 = 5;

const BAD_CONDITIONS: [&str; 4] = ["Rain", "Thunderstorm", "Snow", "Drizzle"];

// ========================================
// OpenWeatherMap payloads
// ========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub id: u32,
    pub main: String,
    pub description: String,
    pub icon: String,
}

impl Condition {
    pub fn new(id: u32, main: &str, description: &str, icon: &str) -> Self {
        Self {
            id,
            main: main.to_string(),
            description: description.to_string(),
            icon: icon.to_string(),
        }
    }

    pub fn clear_sky() -> Self {
        Self::new(800, "Clear", "clear sky", "01d")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MainReadings {
    pub temp: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub pressure: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sea_level: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grnd_level: Option<f64>,
    pub humidity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed: f64,
    pub deg: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gust: Option<f64>,
}

/// One entry of the 5-day / 3-hour forecast list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub dt: i64,
    pub main: MainReadings,
    pub weather: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind: Option<Wind>,
    /// `YYYY-MM-DD HH:MM:SS` (UTC)
    pub dt_txt: String,
}

/// Temperature unit system requested with `units=`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Units {
    /// Fahrenheit, miles per hour
    #[default]
    Imperial,
    /// Celsius, metres per second
    Metric,
}

impl Units {
    /// Only `metric` switches units; anything else (including `standard`) is imperial
    pub fn from_query(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("metric") => Units::Metric,
            _ => Units::Imperial,
        }
    }
}

pub fn fahrenheit_to_celsius(f: f64) -> f64 {
    (f - 32.0) * 5.0 / 9.0
}

pub fn mph_to_mps(mph: f64) -> f64 {
    mph * 0.44704
}

impl MainReadings {
    /// Convert imperial temperatures to Celsius in place
    pub fn to_metric(&mut self) {
        self.temp = fahrenheit_to_celsius(self.temp);
        self.feels_like = fahrenheit_to_celsius(self.feels_like);
        self.temp_min = fahrenheit_to_celsius(self.temp_min);
        self.temp_max = fahrenheit_to_celsius(self.temp_max);
    }
}

// ========================================
// Per-show summary
// ========================================

/// Weather summary attached to a show
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedWeather {
    pub date: NaiveDate,
    /// Fahrenheit
    pub temperature: i32,
    pub condition: String,
    pub description: String,
    pub icon: String,
    pub humidity: u8,
    /// Miles per hour
    pub wind_speed: i32,
    pub is_outdoor_friendly: bool,
}

/// How weather for a show date is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForecastStrategy {
    /// Show already happened (or is today): deterministic mock
    Historical,
    /// Within the forecast horizon: query the forecast API
    Forecast,
    /// Beyond the horizon: optimistic placeholder
    Optimistic,
}

/// Pick a strategy from the number of days (rounded up) until the show
pub fn forecast_strategy(show_date: NaiveDate, now: DateTime<Utc>) -> ForecastStrategy {
    let show_start = show_date
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .unwrap_or(now);
    let diff_ms = (show_start - now).num_milliseconds();
    let day_ms = 24 * 60 * 60 * 1000;
    // ceil for both signs
    let days_ahead = if diff_ms > 0 {
        (diff_ms + day_ms - 1) / day_ms
    } else {
        diff_ms / day_ms
    };

    if days_ahead <= 0 {
        ForecastStrategy::Historical
    } else if days_ahead <= FORECAST_HORIZON_DAYS {
        ForecastStrategy::Forecast
    } else {
        ForecastStrategy::Optimistic
    }
}

pub fn is_outdoor_friendly(condition: &str, temperature: f64, humidity: f64) -> bool {
    let bad_weather = BAD_CONDITIONS.contains(&condition);
    let comfortable = (OUTDOOR_MIN_TEMP_F..=OUTDOOR_MAX_TEMP_F).contains(&temperature);
    !bad_weather && comfortable && humidity < OUTDOOR_MAX_HUMIDITY
}

struct MockCondition {
    main: &'static str,
    description: &'static str,
    icon: &'static str,
    temp: i32,
    humidity: u8,
}

const MOCK_CONDITIONS: [MockCondition; 5] = [
    MockCondition { main: "Clear", description: "clear sky", icon: "01d", temp: 75, humidity: 45 },
    MockCondition { main: "Clouds", description: "few clouds", icon: "02d", temp: 68, humidity: 60 },
    MockCondition { main: "Clouds", description: "partly cloudy", icon: "03d", temp: 65, humidity: 70 },
    MockCondition { main: "Rain", description: "light rain", icon: "10d", temp: 58, humidity: 85 },
    MockCondition { main: "Rain", description: "moderate rain", icon: "10d", temp: 55, humidity: 90 },
];

/// Deterministic stand-in weather derived from city name and date
pub fn mock_weather(city: &str, date: NaiveDate) -> ProcessedWeather {
    let seed = city.chars().count() as i32 + date.day() as i32;
    let base = &MOCK_CONDITIONS[(seed as usize) % MOCK_CONDITIONS.len()];

    let month0 = date.month0();
    let seasonal = if month0 < 3 || month0 > 10 {
        -15
    } else if month0 > 5 && month0 < 9 {
        10
    } else {
        0
    };

    ProcessedWeather {
        date,
        temperature: base.temp + seasonal + (seed % 10) - 5,
        condition: base.main.to_string(),
        description: base.description.to_string(),
        icon: base.icon.to_string(),
        humidity: base.humidity,
        wind_speed: 5 + (seed % 15),
        // Judged on the unadjusted base reading
        is_outdoor_friendly: is_outdoor_friendly(base.main, base.temp as f64, base.humidity as f64),
    }
}

/// Placeholder for dates too far out to forecast
pub fn optimistic_weather(date: NaiveDate) -> ProcessedWeather {
    ProcessedWeather {
        date,
        temperature: 72,
        condition: "Clear".to_string(),
        description: "clear sky".to_string(),
        icon: "01d".to_string(),
        humidity: 50,
        wind_speed: 8,
        is_outdoor_friendly: true,
    }
}

/// Forecast entry nearest to `target`; earliest entry wins ties
pub fn closest_forecast(entries: &[ForecastEntry], target: DateTime<Utc>) -> Option<&ForecastEntry> {
    let target_secs = target.timestamp();
    entries
        .iter()
        .enumerate()
        .min_by_key(|(idx, entry)| ((entry.dt - target_secs).abs(), *idx))
        .map(|(_, entry)| entry)
}

/// Summarise an imperial forecast entry for a show date
pub fn process_forecast(entry: &ForecastEntry, date: NaiveDate) -> ProcessedWeather {
    let condition = entry.weather.first().cloned().unwrap_or_else(Condition::clear_sky);
    let temperature = entry.main.temp.round();
    let humidity = entry.main.humidity.clamp(0.0, 100.0);

    ProcessedWeather {
        date,
        temperature: temperature as i32,
        is_outdoor_friendly: is_outdoor_friendly(&condition.main, temperature, humidity),
        condition: condition.main,
        description: condition.description,
        icon: condition.icon,
        humidity: humidity.round() as u8,
        wind_speed: entry.wind.as_ref().map(|w| w.speed.round() as i32).unwrap_or(0),
    }
}

/// Advice for the booking page
pub fn outdoor_recommendation(weather: &ProcessedWeather) -> &'static str {
    if weather.is_outdoor_friendly {
        return "Great weather for outdoor performances! 🌤️";
    }
    if weather.condition == "Rain" {
        return "Consider indoor venue or covered area ☔";
    }
    if (weather.temperature as f64) < OUTDOOR_MIN_TEMP_F {
        return "Cold weather - indoor venue recommended 🥶";
    }
    if (weather.temperature as f64) > OUTDOOR_MAX_TEMP_F {
        return "Hot weather - ensure good ventilation 🌡️";
    }
    if weather.humidity as f64 > OUTDOOR_MAX_HUMIDITY {
        return "High humidity - may affect instruments 💧";
    }
    "Check conditions closer to show date 🌦️"
}

pub fn icon_url(icon_code: &str) -> String {
    format!("https://openweathermap.org/img/wn/{}@2x.png", icon_code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry(dt: i64, temp: f64, main: &str, humidity: f64) -> ForecastEntry {
        ForecastEntry {
            dt,
            main: MainReadings {
                temp,
                feels_like: temp,
                temp_min: temp,
                temp_max: temp,
                pressure: 1015.0,
                sea_level: None,
                grnd_level: None,
                humidity,
            },
            weather: vec![Condition::new(800, main, "desc", "01d")],
            wind: Some(Wind { speed: 7.6, deg: 180.0, gust: None }),
            dt_txt: String::new(),
        }
    }

    #[test]
    fn test_outdoor_friendly_bounds() {
        assert!(is_outdoor_friendly("Clear", 50.0, 40.0));
        assert!(is_outdoor_friendly("Clouds", 85.0, 84.0));
        assert!(!is_outdoor_friendly("Clear", 49.0, 40.0));
        assert!(!is_outdoor_friendly("Clear", 86.0, 40.0));
        assert!(!is_outdoor_friendly("Clear", 70.0, 85.0));
        assert!(!is_outdoor_friendly("Drizzle", 70.0, 40.0));
    }

    #[test]
    fn test_mock_weather_is_deterministic() {
        // "Nashville" = 9 chars, 15th -> seed 24 -> index 4 (moderate rain)
        let w = mock_weather("Nashville", date(2024, 12, 15));
        assert_eq!(w.condition, "Rain");
        assert_eq!(w.description, "moderate rain");
        // 55 base - 15 (December) + 4 - 5
        assert_eq!(w.temperature, 39);
        assert_eq!(w.wind_speed, 5 + 24 % 15);
        assert!(!w.is_outdoor_friendly);
        assert_eq!(w, mock_weather("Nashville", date(2024, 12, 15)));
    }

    #[test]
    fn test_mock_weather_summer_adjustment() {
        // "Austin" = 6 chars, 4th -> seed 10 -> index 0 (clear)
        let w = mock_weather("Austin", date(2024, 7, 4));
        assert_eq!(w.condition, "Clear");
        assert_eq!(w.temperature, 75 + 10 + 0 - 5);
        assert!(w.is_outdoor_friendly);
    }

    #[test]
    fn test_forecast_strategy_buckets() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 15, 0, 0).unwrap();
        assert_eq!(forecast_strategy(date(2024, 5, 30), now), ForecastStrategy::Historical);
        assert_eq!(forecast_strategy(date(2024, 6, 1), now), ForecastStrategy::Historical);
        assert_eq!(forecast_strategy(date(2024, 6, 2), now), ForecastStrategy::Forecast);
        assert_eq!(forecast_strategy(date(2024, 6, 6), now), ForecastStrategy::Forecast);
        assert_eq!(forecast_strategy(date(2024, 6, 7), now), ForecastStrategy::Optimistic);
    }

    #[test]
    fn test_closest_forecast_picks_nearest_and_first_on_tie() {
        let target = Utc.timestamp_opt(10_000, 0).unwrap();
        let entries = vec![entry(0, 60.0, "Clear", 40.0), entry(9_000, 61.0, "Clear", 40.0), entry(11_000, 62.0, "Clear", 40.0)];
        let best = closest_forecast(&entries, target).unwrap();
        assert_eq!(best.dt, 9_000);
        assert!(closest_forecast(&[], target).is_none());
    }

    #[test]
    fn test_process_forecast_rounds_and_uses_wind() {
        let w = process_forecast(&entry(0, 74.6, "Clouds", 52.0), date(2024, 6, 3));
        assert_eq!(w.temperature, 75);
        assert_eq!(w.wind_speed, 8);
        assert_eq!(w.humidity, 52);
        assert!(w.is_outdoor_friendly);
    }

    #[test]
    fn test_recommendations() {
        let mut w = optimistic_weather(date(2025, 1, 1));
        assert!(outdoor_recommendation(&w).starts_with("Great weather"));

        w.is_outdoor_friendly = false;
        w.condition = "Rain".to_string();
        assert!(outdoor_recommendation(&w).starts_with("Consider indoor"));

        w.condition = "Clear".to_string();
        w.temperature = 30;
        assert!(outdoor_recommendation(&w).starts_with("Cold weather"));

        w.temperature = 95;
        assert!(outdoor_recommendation(&w).starts_with("Hot weather"));

        w.temperature = 70;
        w.humidity = 90;
        assert!(outdoor_recommendation(&w).starts_with("High humidity"));
    }

    #[test]
    fn test_unit_conversion() {
        assert!((fahrenheit_to_celsius(212.0) - 100.0).abs() < 1e-9);
        assert!((mph_to_mps(10.0) - 4.4704).abs() < 1e-9);
        assert_eq!(Units::from_query(Some("metric")), Units::Metric);
        assert_eq!(Units::from_query(Some("standard")), Units::Imperial);
        assert_eq!(Units::from_query(None), Units::Imperial);
    }

    #[test]
    fn test_icon_url() {
        assert_eq!(icon_url("10d"), "https://openweathermap.org/img/wn/10d@2x.png");
    }
}
