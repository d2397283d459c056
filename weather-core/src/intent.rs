use chrono::NaiveDate;

use crate::{
    handlers::{Fulfillment, Reply, Turn},
    model::IntentRequest,
};

/// Intents configured on the dialog platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    Welcome,
    Fallback,
    CheckWeather,
    WeatherForecast,
    WeatherAlerts,
    GoodMorning,
    GoodNight,
    WeatherTomorrow,
}

impl Intent {
    /// Display name as configured on the platform.
    pub fn display_name(&self) -> &'static str {
        match self {
            Intent::Welcome => "Default Welcome Intent",
            Intent::Fallback => "Default Fallback Intent",
            Intent::CheckWeather => "CheckWeatherIntent",
            Intent::WeatherForecast => "WeatherForecastIntent",
            Intent::WeatherAlerts => "WeatherAlertsIntent",
            Intent::GoodMorning => "GoodMorningIntent",
            Intent::GoodNight => "GoodNightIntent",
            Intent::WeatherTomorrow => "WeatherTomorrowIntent",
        }
    }

    pub const fn all() -> &'static [Intent] {
        &[
            Intent::Welcome,
            Intent::Fallback,
            Intent::CheckWeather,
            Intent::WeatherForecast,
            Intent::WeatherAlerts,
            Intent::GoodMorning,
            Intent::GoodNight,
            Intent::WeatherTomorrow,
        ]
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown intent '{0}'")]
pub struct UnknownIntent(pub String);

impl TryFrom<&str> for Intent {
    type Error = UnknownIntent;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Intent::all()
            .iter()
            .find(|intent| intent.display_name() == value)
            .copied()
            .ok_or_else(|| UnknownIntent(value.to_string()))
    }
}

impl Fulfillment {
    /// Route one turn to its handler.
    pub async fn dispatch(&self, request: &IntentRequest, today: NaiveDate) -> Reply {
        tracing::info!(intent = %request.intent, "Dispatching intent");

        let turn = Turn {
            params: request.params.clone(),
            query: request.query.clone(),
            today,
        };

        match request.intent {
            Intent::Welcome => Fulfillment::welcome(),
            Intent::Fallback => self.fallback(&request.contexts, &turn).await,
            Intent::CheckWeather => self.check_weather(&turn).await,
            Intent::WeatherForecast => self.weather_forecast(&turn).await,
            Intent::WeatherAlerts => self.weather_alerts(&turn).await,
            Intent::GoodMorning => self.good_morning(&turn).await,
            Intent::GoodNight => self.good_night(&turn).await,
            Intent::WeatherTomorrow => self.weather_tomorrow(&turn).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_roundtrip() {
        for intent in Intent::all() {
            let parsed = Intent::try_from(intent.display_name()).expect("roundtrip should succeed");
            assert_eq!(*intent, parsed);
        }
    }

    #[test]
    fn unknown_intent_error() {
        let err = Intent::try_from("OrderPizzaIntent").unwrap_err();
        assert_eq!(err.to_string(), "Unknown intent 'OrderPizzaIntent'");
    }
}
