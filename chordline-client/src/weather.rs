//! Show-day weather through the OpenWeatherMap forecast API

use chordline_common::weather::{
    closest_forecast, forecast_strategy, mock_weather, optimistic_weather, process_forecast,
    ForecastEntry, ForecastStrategy, ProcessedWeather,
};
use chordline_common::Provider;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::ServiceConfig;
use crate::error::Result;

const PROVIDER: Provider = Provider::OpenWeather;

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    list: Vec<ForecastEntry>,
}

#[derive(Debug, Clone)]
pub struct WeatherClient {
    config: ServiceConfig,
}

impl WeatherClient {
    pub fn new(config: ServiceConfig) -> Self {
        Self { config }
    }

    /// 5-day / 3-hour forecast for a city in imperial units
    pub async fn forecast(&self, city: &str) -> Result<Vec<ForecastEntry>> {
        let response: ForecastResponse = self
            .config
            .send_json(PROVIDER, Method::GET, "/data/2.5/forecast", |r| {
                r.query(&[("q", city), ("units", "imperial")])
            })
            .await?;
        Ok(response.list)
    }

    /// Weather for a show in `city` on `date`
    ///
    /// Past and far-future dates never hit the network. Forecast failures
    /// fall back to the deterministic mock.
    pub async fn weather_for_show(&self, city: &str, date: NaiveDate, now: DateTime<Utc>) -> ProcessedWeather {
        match forecast_strategy(date, now) {
            ForecastStrategy::Historical => mock_weather(city, date),
            ForecastStrategy::Optimistic => optimistic_weather(date),
            ForecastStrategy::Forecast => match self.forecast(city).await {
                Ok(entries) => {
                    let target = date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()).unwrap_or(now);
                    match closest_forecast(&entries, target) {
                        Some(entry) => process_forecast(entry, date),
                        None => {
                            debug!("Empty forecast for {}, using mock weather", city);
                            mock_weather(city, date)
                        }
                    }
                }
                Err(e) => {
                    warn!("Weather forecast for {} failed: {}", city, e);
                    mock_weather(city, date)
                }
            },
        }
    }
}
