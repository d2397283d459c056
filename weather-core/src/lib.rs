//! Core library for the weather fulfillment webhook.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The OpenWeather client behind the `WeatherProvider` trait
//! - Intent handlers, slot filling across turns and reply formatting
//! - Dialogflow webhook payloads
//!
//! It is used by `weather-webhook`, but the handlers take no dependency on the
//! HTTP transport and can be driven directly.

pub mod config;
pub mod context;
pub mod dialogflow;
pub mod format;
pub mod handlers;
pub mod intent;
pub mod model;
pub mod provider;

pub use config::Config;
pub use context::{ContextTag, ContextUpdate, PendingContext, SlotState};
pub use dialogflow::{DialogflowError, WebhookRequest, WebhookResponse};
pub use handlers::{Fulfillment, Outcome, Reply};
pub use intent::Intent;
pub use model::{ForecastSeries, IntentParams, IntentRequest, WeatherSnapshot};
pub use provider::{ProviderError, WeatherProvider};
