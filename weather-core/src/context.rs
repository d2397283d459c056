//! Pending contexts and the slot-filling state machine.
//!
//! When a handler is missing its city it leaves a one-turn context behind.
//! The next fallback turn reads it back, treats the free text as the city
//! and resumes the handler that asked.

use serde_json::{Map, Value};

use crate::{intent::Intent, model::IntentParams};

const NUM_DAYS_KEY: &str = "numDays";
const ALERT_TYPE_KEY: &str = "alertType";

/// Which handler is waiting for a city.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextTag {
    AwaitingCity,
    AwaitingCityForecast,
    AwaitingCityAlert,
    AwaitingCityGoodMorning,
    AwaitingCityGoodNight,
}

impl ContextTag {
    /// Lookup order on fallback turns; the first live match wins.
    pub const PRECEDENCE: [ContextTag; 5] = [
        ContextTag::AwaitingCity,
        ContextTag::AwaitingCityForecast,
        ContextTag::AwaitingCityAlert,
        ContextTag::AwaitingCityGoodMorning,
        ContextTag::AwaitingCityGoodNight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContextTag::AwaitingCity => "awaiting_city",
            ContextTag::AwaitingCityForecast => "awaiting_city_forecast",
            ContextTag::AwaitingCityAlert => "awaiting_city_alert",
            ContextTag::AwaitingCityGoodMorning => "awaiting_city_good_morning",
            ContextTag::AwaitingCityGoodNight => "awaiting_city_good_night",
        }
    }

    /// The intent this tag resumes.
    pub fn intent(&self) -> Intent {
        match self {
            ContextTag::AwaitingCity => Intent::CheckWeather,
            ContextTag::AwaitingCityForecast => Intent::WeatherForecast,
            ContextTag::AwaitingCityAlert => Intent::WeatherAlerts,
            ContextTag::AwaitingCityGoodMorning => Intent::GoodMorning,
            ContextTag::AwaitingCityGoodNight => Intent::GoodNight,
        }
    }
}

impl std::fmt::Display for ContextTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A context the platform reports as active for this session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActiveContext {
    /// Short name, without the `{session}/contexts/` prefix.
    pub name: String,
    /// Remaining turns; `None` when the platform omitted it.
    pub lifespan: Option<u32>,
    pub parameters: Map<String, Value>,
}

impl ActiveContext {
    pub fn is_live(&self) -> bool {
        self.lifespan != Some(0)
    }
}

/// Non-city parameters captured before the city was asked for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CarriedParams {
    pub num_days: Option<usize>,
    pub alert_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingContext {
    pub tag: ContextTag,
    pub carried: CarriedParams,
}

impl PendingContext {
    /// Pending contexts live for exactly the next turn.
    pub const LIFESPAN: u32 = 1;

    pub fn new(tag: ContextTag) -> Self {
        Self {
            tag,
            carried: CarriedParams::default(),
        }
    }

    pub fn with_num_days(mut self, num_days: usize) -> Self {
        self.carried.num_days = Some(num_days);
        self
    }

    pub fn with_alert_type(mut self, alert_type: impl Into<String>) -> Self {
        self.carried.alert_type = Some(alert_type.into());
        self
    }

    /// Parameter payload stored with the context on the platform.
    pub fn parameters(&self) -> Map<String, Value> {
        let mut params = Map::new();
        if let Some(days) = self.carried.num_days {
            params.insert(NUM_DAYS_KEY.to_string(), Value::from(days));
        }
        if let Some(alert_type) = &self.carried.alert_type {
            params.insert(ALERT_TYPE_KEY.to_string(), Value::from(alert_type.as_str()));
        }
        params
    }

    /// Rebuild a pending context from what the platform echoed back.
    pub fn from_active(tag: ContextTag, ctx: &ActiveContext) -> Self {
        let carried = CarriedParams {
            num_days: ctx.parameters.get(NUM_DAYS_KEY).and_then(positive_count),
            alert_type: ctx
                .parameters
                .get(ALERT_TYPE_KEY)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_owned),
        };

        Self { tag, carried }
    }

    /// Parameters for the resumed handler: free text becomes the city, carried values are restored.
    pub fn resume_params(&self, query: &str, original: &IntentParams) -> IntentParams {
        let mut params = original.clone();
        params.city = Some(query.trim())
            .filter(|q| !q.is_empty())
            .map(str::to_owned);

        match self.tag {
            ContextTag::AwaitingCityForecast => params.num_days = self.carried.num_days,
            ContextTag::AwaitingCityAlert => params.alert_type = self.carried.alert_type.clone(),
            _ => {}
        }

        params
    }
}

/// Where a session stands with respect to the city slot.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotState {
    NoContext,
    AwaitingCity(PendingContext),
}

impl SlotState {
    /// Scan active contexts in fixed precedence order.
    pub fn resolve(active: &[ActiveContext]) -> Self {
        ContextTag::PRECEDENCE
            .iter()
            .find_map(|tag| {
                active
                    .iter()
                    .find(|ctx| ctx.is_live() && ctx.name == tag.as_str())
                    .map(|ctx| PendingContext::from_active(*tag, ctx))
            })
            .map(SlotState::AwaitingCity)
            .unwrap_or(SlotState::NoContext)
    }
}

/// Context change requested by a reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextUpdate {
    /// Ask the platform to remember a pending city request.
    Set(PendingContext),
    /// The pending context was used; expire it now.
    Consume(ContextTag),
}

/// Reads a day count sent as a number or a numeric string. Zero counts as absent.
pub(crate) fn positive_count(value: &Value) -> Option<usize> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };

    (n.is_finite() && n >= 1.0).then(|| n.trunc() as usize)
}
