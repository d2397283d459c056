use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::{context::ActiveContext, intent::Intent};

/// Parameters the dialog platform recognized for one turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntentParams {
    pub city: Option<String>,
    /// Calendar date the user asked about, if any.
    pub date: Option<NaiveDate>,
    pub time_period: Option<String>,
    pub alert_type: Option<String>,
    pub num_days: Option<usize>,
}

/// One fulfillment turn as decoded from the platform.
#[derive(Debug, Clone)]
pub struct IntentRequest {
    pub intent: Intent,
    pub params: IntentParams,
    pub query: String,
    pub contexts: Vec<ActiveContext>,
}

/// A single observation or forecast step. Temperature stays in Kelvin as the provider sends it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub temperature_k: f64,
    pub humidity_pct: u8,
    pub description: String,
    pub wind_speed_mps: f64,
    pub timestamp: NaiveDateTime,
}

impl WeatherSnapshot {
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// True when the snapshot falls exactly on `hour`:00:00.
    pub fn is_at_hour(&self, hour: u32) -> bool {
        let time = self.timestamp.time();
        time.hour() == hour && time.minute() == 0 && time.second() == 0
    }
}

/// Forecast entries for one calendar date, in provider order.
#[derive(Debug, Clone, PartialEq)]
pub struct DayGroup<'a> {
    pub date: NaiveDate,
    pub entries: Vec<&'a WeatherSnapshot>,
}

/// The 3-hour-step forecast list, ordered as the provider returned it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastSeries {
    pub entries: Vec<WeatherSnapshot>,
}

impl ForecastSeries {
    pub fn new(entries: Vec<WeatherSnapshot>) -> Self {
        Self { entries }
    }

    /// Groups entries by calendar date. Groups appear in order of each date's first entry.
    pub fn group_by_date(&self) -> Vec<DayGroup<'_>> {
        let mut groups: Vec<DayGroup<'_>> = Vec::new();

        for entry in &self.entries {
            let date = entry.date();
            match groups.iter_mut().find(|g| g.date == date) {
                Some(group) => group.entries.push(entry),
                None => groups.push(DayGroup { date, entries: vec![entry] }),
            }
        }

        groups
    }

    pub fn on_date(&self, date: NaiveDate) -> Vec<&WeatherSnapshot> {
        self.entries.iter().filter(|e| e.date() == date).collect()
    }

    /// First entry on `date` whose time of day is one of `hours` (on the hour).
    pub fn first_at_hours(&self, date: NaiveDate, hours: &[u32]) -> Option<&WeatherSnapshot> {
        self.entries
            .iter()
            .find(|e| e.date() == date && hours.iter().any(|h| e.is_at_hour(*h)))
    }
}
