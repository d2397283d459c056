use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime};
use reqwest::Client;
use serde::Deserialize;

use crate::{
    config::OpenWeatherConfig,
    model::{ForecastSeries, WeatherSnapshot},
    provider::{Endpoint, ProviderError},
};

use super::WeatherProvider;

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: crate::config::DEFAULT_BASE_URL.to_string(),
            http: Client::new(),
        }
    }

    pub fn from_config(config: &OpenWeatherConfig, api_key: String) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("Failed to build HTTP client for OpenWeather")?;

        Ok(Self {
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// One GET against `endpoint` for `city`; returns the raw body of a 2xx response.
    async fn fetch(&self, endpoint: Endpoint, city: &str) -> Result<String, ProviderError> {
        let city = city.trim();
        if city.is_empty() {
            return Err(ProviderError::EmptyCity);
        }

        let url = format!("{}/{}", self.base_url, endpoint.path());
        tracing::debug!(%endpoint, city, "Calling OpenWeather");

        let res = self
            .http
            .get(&url)
            .query(&[("q", city), ("appid", self.api_key.as_str())])
            .send()
            .await
            .map_err(|source| ProviderError::Transport { endpoint, source })?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|source| ProviderError::Transport { endpoint, source })?;

        if !status.is_success() {
            return Err(ProviderError::Status {
                endpoint,
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        Ok(body)
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    #[serde(default)]
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
}

#[derive(Debug, Default, Deserialize)]
struct OwWind {
    #[serde(default)]
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    dt: i64,
    main: OwMain,
    weather: Vec<OwWeather>,
    #[serde(default)]
    wind: OwWind,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    dt_txt: Option<String>,
    main: OwMain,
    weather: Vec<OwWeather>,
    #[serde(default)]
    wind: OwWind,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    list: Vec<OwForecastEntry>,
}

fn first_description(weather: &[OwWeather]) -> String {
    weather
        .first()
        .map(|w| w.description.clone())
        .unwrap_or_else(|| "Unknown".to_string())
}

pub(crate) fn parse_current(body: &str) -> Result<WeatherSnapshot, serde_json::Error> {
    let parsed: OwCurrentResponse = serde_json::from_str(body)?;

    Ok(WeatherSnapshot {
        temperature_k: parsed.main.temp,
        humidity_pct: parsed.main.humidity,
        description: first_description(&parsed.weather),
        wind_speed_mps: parsed.wind.speed,
        timestamp: unix_to_naive(parsed.dt).unwrap_or_default(),
    })
}

/// Entries whose timestamp cannot be read are dropped with a warning.
pub(crate) fn parse_forecast(body: &str) -> Result<ForecastSeries, serde_json::Error> {
    let parsed: OwForecastResponse = serde_json::from_str(body)?;

    let entries = parsed
        .list
        .into_iter()
        .filter_map(|entry| {
            let timestamp = entry
                .dt_txt
                .as_deref()
                .and_then(|txt| NaiveDateTime::parse_from_str(txt, "%Y-%m-%d %H:%M:%S").ok())
                .or_else(|| unix_to_naive(entry.dt));

            let Some(timestamp) = timestamp else {
                tracing::warn!(dt = entry.dt, "Skipping forecast entry without a usable timestamp");
                return None;
            };

            Some(WeatherSnapshot {
                temperature_k: entry.main.temp,
                humidity_pct: entry.main.humidity,
                description: first_description(&entry.weather),
                wind_speed_mps: entry.wind.speed,
                timestamp,
            })
        })
        .collect();

    Ok(ForecastSeries::new(entries))
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current(&self, city: &str) -> Result<WeatherSnapshot, ProviderError> {
        let endpoint = Endpoint::Current;
        let body = self.fetch(endpoint, city).await?;
        parse_current(&body).map_err(|source| ProviderError::Decode { endpoint, source })
    }

    async fn forecast(&self, city: &str) -> Result<ForecastSeries, ProviderError> {
        let endpoint = Endpoint::Forecast;
        let body = self.fetch(endpoint, city).await?;
        parse_forecast(&body).map_err(|source| ProviderError::Decode { endpoint, source })
    }
}

fn unix_to_naive(ts: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(ts, 0).map(|dt| dt.naive_utc())
}

/// At most 200 bytes of `body`, cut on a char boundary.
fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body.to_string();
    }

    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
