//! Intent handlers.
//!
//! Every weather handler has two states: with no city it prompts and leaves a
//! pending context behind; with a city it calls the provider once and formats
//! the answer. Provider failures are turned into an apology here and never
//! leave the handler.

use chrono::{Days, NaiveDate};
use std::sync::Arc;

use crate::{
    context::{ActiveContext, ContextTag, ContextUpdate, PendingContext, SlotState},
    format::{DailySummary, QueryTopic, alert_timestamp, celsius, is_alert_worthy, long_date},
    intent::Intent,
    model::IntentParams,
    provider::{ProviderError, WeatherProvider},
};

pub const WELCOME: &str = "Welcome to my agent!";
pub const UNRESOLVED_CITY: &str = "I'm sorry, I didn't understand that. Can you please specify the city you want the weather information for?";

pub const DEFAULT_FORECAST_DAYS: usize = 5;
pub const DEFAULT_ALERT_TYPE: &str = "emergencies";

const MORNING_HOURS: [u32; 1] = [6];
const NIGHT_HOURS: [u32; 4] = [18, 21, 0, 3];

/// How a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Answered,
    /// City absent; a prompt was sent, with a pending context when the intent has one.
    MissingSlot,
    /// Provider call failed; an apology was sent.
    ProviderError,
    /// The forecast had no entry for the requested slot.
    NoMatchingForecastEntry,
    /// Fallback turn with nothing pending.
    UnresolvedContext,
}

/// Text for the user plus any context change for the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub context: Option<ContextUpdate>,
    pub outcome: Outcome,
}

impl Reply {
    fn new(outcome: Outcome, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            context: None,
            outcome,
        }
    }

    pub fn answered(text: impl Into<String>) -> Self {
        Self::new(Outcome::Answered, text)
    }

    fn awaiting(text: impl Into<String>, pending: PendingContext) -> Self {
        Self {
            context: Some(ContextUpdate::Set(pending)),
            ..Self::new(Outcome::MissingSlot, text)
        }
    }

    /// Mark `tag` as used, unless the resumed handler already set a new context.
    fn consuming(mut self, tag: ContextTag) -> Self {
        if self.context.is_none() {
            self.context = Some(ContextUpdate::Consume(tag));
        }
        self
    }
}

/// Inputs of one handler invocation.
#[derive(Debug, Clone)]
pub struct Turn {
    pub params: IntentParams,
    pub query: String,
    /// Calendar date the turn is handled on.
    pub today: NaiveDate,
}

impl Turn {
    fn city(&self) -> Option<&str> {
        self.params
            .city
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

/// The fulfillment engine: one provider, no state between turns.
#[derive(Debug, Clone)]
pub struct Fulfillment {
    provider: Arc<dyn WeatherProvider>,
}

impl Fulfillment {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        Self { provider }
    }

    pub fn welcome() -> Reply {
        Reply::answered(WELCOME)
    }

    /// The handler that left `tag` behind.
    async fn resume(&self, tag: ContextTag, turn: &Turn) -> Reply {
        match tag {
            ContextTag::AwaitingCity => self.check_weather(turn).await,
            ContextTag::AwaitingCityForecast => self.weather_forecast(turn).await,
            ContextTag::AwaitingCityAlert => self.weather_alerts(turn).await,
            ContextTag::AwaitingCityGoodMorning => self.good_morning(turn).await,
            ContextTag::AwaitingCityGoodNight => self.good_night(turn).await,
        }
    }

    /// Resume whichever handler is waiting for a city, using the free text as the city.
    pub async fn fallback(&self, contexts: &[ActiveContext], turn: &Turn) -> Reply {
        match SlotState::resolve(contexts) {
            SlotState::NoContext => {
                tracing::info!("Fallback turn without a pending city request");
                Reply::new(Outcome::UnresolvedContext, UNRESOLVED_CITY)
            }
            SlotState::AwaitingCity(pending) => {
                tracing::info!(
                    context = %pending.tag,
                    intent = %pending.tag.intent(),
                    city = %turn.query,
                    "Resuming pending intent"
                );

                let resumed = Turn {
                    params: pending.resume_params(&turn.query, &turn.params),
                    query: turn.query.clone(),
                    today: turn.today,
                };

                self.resume(pending.tag, &resumed)
                    .await
                    .consuming(pending.tag)
            }
        }
    }

    pub async fn check_weather(&self, turn: &Turn) -> Reply {
        let Some(city) = turn.city() else {
            return Reply::awaiting(
                "Sure, I can help with that. Which city's weather would you like to know?",
                PendingContext::new(ContextTag::AwaitingCity),
            );
        };

        match self.provider.current(city).await {
            Ok(snap) => Reply::answered(QueryTopic::detect(&turn.query).reply(city, &snap)),
            Err(err) => provider_failure(
                Intent::CheckWeather,
                city,
                &err,
                format!("I couldn't get the weather information for {city}. Please try again later."),
            ),
        }
    }

    pub async fn weather_forecast(&self, turn: &Turn) -> Reply {
        let days = turn.params.num_days.unwrap_or(DEFAULT_FORECAST_DAYS);

        let Some(city) = turn.city() else {
            return Reply::awaiting(
                "Sure, I can help with that. Which city's weather forecast would you like to know?",
                PendingContext::new(ContextTag::AwaitingCityForecast).with_num_days(days),
            );
        };

        let series = match self.provider.forecast(city).await {
            Ok(series) => series,
            Err(err) => {
                return provider_failure(
                    Intent::WeatherForecast,
                    city,
                    &err,
                    format!("I couldn't get the weather forecast for {city}. Please try again later."),
                );
            }
        };

        let mut text = format!("The weather forecast for {city} on:\n");
        for summary in series
            .group_by_date()
            .iter()
            .take(days)
            .filter_map(DailySummary::from_group)
        {
            text.push_str(&format!(
                "{}: {}, Avg Temp: {}°C\n",
                long_date(summary.date),
                summary.description,
                summary.average()
            ));
        }

        Reply::answered(text)
    }

    pub async fn weather_alerts(&self, turn: &Turn) -> Reply {
        let alert_type = turn
            .params
            .alert_type
            .clone()
            .unwrap_or_else(|| DEFAULT_ALERT_TYPE.to_string());

        let Some(city) = turn.city() else {
            return Reply::awaiting(
                "Sure, I can help with that. Which city's weather alerts would you like to know?",
                PendingContext::new(ContextTag::AwaitingCityAlert).with_alert_type(alert_type),
            );
        };

        let series = match self.provider.forecast(city).await {
            Ok(series) => series,
            Err(err) => {
                return provider_failure(
                    Intent::WeatherAlerts,
                    city,
                    &err,
                    format!("I couldn't get the weather alerts for {city}. Please try again later."),
                );
            }
        };

        let alerts: Vec<_> = series
            .entries
            .iter()
            .filter(|e| is_alert_worthy(&e.description, &alert_type))
            .collect();

        if alerts.is_empty() {
            return Reply::answered(format!(
                "There are no {alert_type} alerts for {city} at the moment."
            ));
        }

        let mut text = format!("There are {} weather alerts for {city}:\n\n", alerts.len());
        for alert in alerts {
            text.push_str(&format!(
                "- {} expected on {}\n",
                alert.description,
                alert_timestamp(alert.timestamp)
            ));
        }

        Reply::answered(text)
    }

    pub async fn good_morning(&self, turn: &Turn) -> Reply {
        let Some(city) = turn.city() else {
            return Reply::awaiting(
                "Good morning! Which city's weather would you like to know?",
                PendingContext::new(ContextTag::AwaitingCityGoodMorning),
            );
        };

        let target = turn.params.date.unwrap_or(turn.today);
        let label = if target == turn.today {
            "today".to_string()
        } else if Some(target) == tomorrow(turn.today) {
            "tomorrow".to_string()
        } else {
            long_date(target)
        };

        if let Some(period) = &turn.params.time_period {
            tracing::debug!(period = %period, "Morning briefing always reports the 06:00 slot");
        }

        let series = match self.provider.forecast(city).await {
            Ok(series) => series,
            Err(err) => {
                return provider_failure(
                    Intent::GoodMorning,
                    city,
                    &err,
                    format!(
                        "Good morning! I couldn't get the weather information for {city}. Please try again later."
                    ),
                );
            }
        };

        match series.first_at_hours(target, &MORNING_HOURS) {
            Some(entry) => Reply::answered(format!(
                "Good morning! The weather on {label} morning in {city} is {} with a temperature of {}°C. Have a great day!",
                entry.description,
                celsius(entry.temperature_k)
            )),
            None => Reply::new(
                Outcome::NoMatchingForecastEntry,
                format!(
                    "Good morning! I couldn't get the weather information for {city} on {label} morning. Please try again later."
                ),
            ),
        }
    }

    pub async fn good_night(&self, turn: &Turn) -> Reply {
        let Some(city) = turn.city() else {
            return Reply::awaiting(
                "Good night! Which city's weather would you like to know?",
                PendingContext::new(ContextTag::AwaitingCityGoodNight),
            );
        };

        let target = turn.params.date.unwrap_or(turn.today);
        let label = if target == turn.today {
            "tonight".to_string()
        } else {
            long_date(target)
        };

        let series = match self.provider.forecast(city).await {
            Ok(series) => series,
            Err(err) => {
                return provider_failure(
                    Intent::GoodNight,
                    city,
                    &err,
                    format!(
                        "Good night! I couldn't get the weather information for {city}. Please try again later."
                    ),
                );
            }
        };

        match series.first_at_hours(target, &NIGHT_HOURS) {
            Some(entry) => Reply::answered(format!(
                "Good night! The weather {label} in {city} is expected to be {} with a temperature of {}°C. Sleep well!",
                entry.description,
                celsius(entry.temperature_k)
            )),
            None => Reply::new(
                Outcome::NoMatchingForecastEntry,
                format!(
                    "Good night! I couldn't get the night weather information for {city} {label}. Please try again later."
                ),
            ),
        }
    }

    /// Tomorrow has no pending-context tag, so a missing city gets the generic clarification.
    pub async fn weather_tomorrow(&self, turn: &Turn) -> Reply {
        let Some(city) = turn.city() else {
            return Reply::new(Outcome::MissingSlot, UNRESOLVED_CITY);
        };

        let apology =
            format!("I couldn't get the weather forecast for {city} for tomorrow. Please try again later.");

        let series = match self.provider.forecast(city).await {
            Ok(series) => series,
            Err(err) => return provider_failure(Intent::WeatherTomorrow, city, &err, apology),
        };

        let summary = tomorrow(turn.today)
            .and_then(|date| DailySummary::from_entries(date, &series.on_date(date)));

        match summary {
            Some(summary) => Reply::answered(format!(
                "The weather in {city} tomorrow is expected to be {} with an average temperature of {}°C.",
                summary.description,
                summary.average()
            )),
            None => Reply::new(Outcome::NoMatchingForecastEntry, apology),
        }
    }
}

fn tomorrow(today: NaiveDate) -> Option<NaiveDate> {
    today.checked_add_days(Days::new(1))
}

fn provider_failure(intent: Intent, city: &str, err: &ProviderError, apology: String) -> Reply {
    tracing::warn!(%intent, city, error = %err, "Weather provider call failed");
    Reply::new(Outcome::ProviderError, apology)
}
