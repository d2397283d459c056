use crate::{
    Config, ForecastSeries, WeatherSnapshot, provider::openweather::OpenWeatherProvider,
};
use async_trait::async_trait;
use serde_json::Value;
use std::{fmt::Debug, sync::Arc};

pub mod openweather;

/// The two OpenWeather resources this service reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Current,
    Forecast,
}

impl Endpoint {
    /// Path segment under the API base URL.
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Current => "weather",
            Endpoint::Forecast => "forecast",
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("city must be a non-empty name")]
    EmptyCity,

    #[error("OpenWeather {endpoint} request failed with status {status}: {body}")]
    Status {
        endpoint: Endpoint,
        status: u16,
        body: String,
    },

    #[error("Failed to send request to OpenWeather ({endpoint}): {source}")]
    Transport {
        endpoint: Endpoint,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to parse OpenWeather {endpoint} JSON: {source}")]
    Decode {
        endpoint: Endpoint,
        #[source]
        source: serde_json::Error,
    },
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current(&self, city: &str) -> Result<WeatherSnapshot, ProviderError>;

    async fn forecast(&self, city: &str) -> Result<ForecastSeries, ProviderError>;
}

/// Construct the OpenWeather provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherProvider>> {
    let api_key = config.api_key()?;
    let provider = OpenWeatherProvider::from_config(&config.openweather, api_key.to_owned())?;

    Ok(Arc::new(provider))
}

/// Collapse a `geo-city` parameter to a single city name.
///
/// The platform sends either a string or a list of strings; only the first
/// non-empty candidate is used.
pub fn normalize_city(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim()).filter(|s| !s.is_empty()).map(str::to_owned),
        Value::Array(items) => items.iter().find_map(normalize_city),
        _ => None,
    }
}
