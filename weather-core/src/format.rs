//! Turns provider snapshots into reply sentences.

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;

use crate::model::{DayGroup, WeatherSnapshot};

const KELVIN_OFFSET: f64 = 273.15;

/// Keywords that always make a forecast entry alert-worthy.
const ALERT_KEYWORDS: [&str; 3] = ["storm", "rain", "snow"];
const UMBRELLA_KEYWORDS: [&str; 3] = ["rain", "drizzle", "shower"];

pub fn kelvin_to_celsius(kelvin: f64) -> f64 {
    kelvin - KELVIN_OFFSET
}

/// Celsius with exactly two decimals, e.g. `20.00`.
pub fn celsius(kelvin: f64) -> String {
    two_decimals(kelvin_to_celsius(kelvin))
}

fn two_decimals(value: f64) -> String {
    format!("{value:.2}")
}

/// `Tuesday, June 3`
pub fn long_date(date: NaiveDate) -> String {
    date.format("%A, %B %-d").to_string()
}

/// `6/3/2024, 3:00:00 PM`
pub fn alert_timestamp(ts: NaiveDateTime) -> String {
    ts.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string()
}

pub fn needs_umbrella(description: &str) -> bool {
    UMBRELLA_KEYWORDS.iter().any(|k| description.contains(k))
}

pub fn is_alert_worthy(description: &str, alert_type: &str) -> bool {
    let description = description.to_lowercase();
    description.contains(&alert_type.to_lowercase())
        || ALERT_KEYWORDS.iter().any(|k| description.contains(k))
}

/// Most frequent description.
///
/// Descriptions are stable-sorted by ascending frequency and the last one wins,
/// so among equally frequent candidates the one listed last is chosen.
pub fn modal_description<'a, I>(descriptions: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut all: Vec<&str> = descriptions.into_iter().collect();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for d in &all {
        *counts.entry(*d).or_default() += 1;
    }

    all.sort_by_key(|d| counts[d]);
    all.pop()
}

/// Average temperature and dominant condition of a group of forecast entries.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub average_c: f64,
    pub description: String,
}

impl DailySummary {
    pub fn from_entries(date: NaiveDate, entries: &[&WeatherSnapshot]) -> Option<Self> {
        let description = modal_description(entries.iter().map(|e| e.description.as_str()))?;

        let total: f64 = entries.iter().map(|e| kelvin_to_celsius(e.temperature_k)).sum();
        let average_c = total / entries.len() as f64;

        Some(Self {
            date,
            average_c,
            description: description.to_string(),
        })
    }

    pub fn from_group(group: &DayGroup<'_>) -> Option<Self> {
        Self::from_entries(group.date, &group.entries)
    }

    pub fn average(&self) -> String {
        two_decimals(self.average_c)
    }
}

/// What a current-weather question is about, judged from its wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryTopic {
    Sunny,
    Umbrella,
    Temperature,
    Humidity,
    Rain,
    Windy,
    General,
}

/// Checked top to bottom; the first keyword found in the query decides.
const TOPIC_KEYWORDS: [(&str, QueryTopic); 7] = [
    ("sunny", QueryTopic::Sunny),
    ("umbrella", QueryTopic::Umbrella),
    ("temperature", QueryTopic::Temperature),
    ("warm", QueryTopic::Temperature),
    ("humidity", QueryTopic::Humidity),
    ("rain", QueryTopic::Rain),
    ("windy", QueryTopic::Windy),
];

impl QueryTopic {
    pub fn detect(query: &str) -> Self {
        let query = query.to_lowercase();
        TOPIC_KEYWORDS
            .iter()
            .find(|(keyword, _)| query.contains(keyword))
            .map(|(_, topic)| *topic)
            .unwrap_or(QueryTopic::General)
    }

    pub fn reply(&self, city: &str, snap: &WeatherSnapshot) -> String {
        let temperature = celsius(snap.temperature_k);
        let description = &snap.description;
        let humidity = snap.humidity_pct;

        match self {
            QueryTopic::Sunny => {
                if description.contains("clear") || description.contains("sunny") {
                    format!(
                        "Yes, it is currently sunny in {city}. The temperature is {temperature}°C."
                    )
                } else {
                    format!(
                        "No, it is not sunny in {city}. It is {description} with a temperature of {temperature}°C."
                    )
                }
            }
            QueryTopic::Umbrella => {
                if needs_umbrella(description) {
                    format!(
                        "Yes, you might want to take an umbrella as it is {description} in {city}."
                    )
                } else {
                    format!(
                        "No, you probably don't need an umbrella as it is {description} in {city}."
                    )
                }
            }
            QueryTopic::Temperature => {
                format!("The current temperature in {city} is {temperature}°C.")
            }
            QueryTopic::Humidity => format!("The current humidity in {city} is {humidity}%."),
            QueryTopic::Rain => {
                if description.contains("rain") {
                    format!(
                        "Yes, it is currently raining in {city}. The temperature is {temperature}°C."
                    )
                } else {
                    format!(
                        "No, it is not raining in {city}. It is {description} with a temperature of {temperature}°C."
                    )
                }
            }
            QueryTopic::Windy => format!(
                "The current wind speed in {city} is {} meters per second.",
                snap.wind_speed_mps
            ),
            QueryTopic::General => format!(
                "The current weather in {city} is {description} with a temperature of {temperature}°C and humidity of {humidity}%."
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::snapshot;

    #[test]
    fn celsius_has_two_decimals() {
        assert_eq!(celsius(293.15), "20.00");
        assert_eq!(celsius(300.0), "26.85");
        assert_eq!(celsius(273.15), "0.00");
    }

    #[test]
    fn long_date_is_weekday_month_day() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        assert_eq!(long_date(date), "Monday, June 3");
    }

    #[test]
    fn alert_timestamp_is_us_short_form() {
        let ts = NaiveDateTime::parse_from_str("2024-06-03 15:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(alert_timestamp(ts), "6/3/2024, 3:00:00 PM");

        let midnight =
            NaiveDateTime::parse_from_str("2024-12-10 00:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(alert_timestamp(midnight), "12/10/2024, 12:00:00 AM");
    }

    #[test]
    fn modal_description_strict_majority() {
        assert_eq!(modal_description(["a", "a", "b"]), Some("a"));
        assert_eq!(modal_description(["b", "a", "a"]), Some("a"));
    }

    #[test]
    fn modal_description_tie_goes_to_last() {
        assert_eq!(modal_description(["a", "b"]), Some("b"));
        assert_eq!(modal_description(["b", "a", "a", "b"]), Some("b"));
        assert_eq!(modal_description(std::iter::empty()), None);
    }

    #[test]
    fn umbrella_keywords_are_case_sensitive() {
        assert!(needs_umbrella("light rain"));
        assert!(needs_umbrella("shower drizzle"));
        assert!(!needs_umbrella("Rain"));
        assert!(!needs_umbrella("clear sky"));
    }

    #[test]
    fn alert_worthy_matches_requested_type_or_fixed_keywords() {
        assert!(is_alert_worthy("light rain", "storm"));
        assert!(is_alert_worthy("Heavy Snow", "emergencies"));
        assert!(is_alert_worthy("extreme heat", "Heat"));
        assert!(!is_alert_worthy("clear sky", "emergencies"));
    }

    #[test]
    fn daily_summary_averages_celsius() {
        let a = snapshot("2024-06-03 06:00:00", 293.15, "clear sky");
        let b = snapshot("2024-06-03 09:00:00", 295.15, "clear sky");
        let c = snapshot("2024-06-03 12:00:00", 297.15, "few clouds");
        let date = a.date();

        let summary = DailySummary::from_entries(date, &[&a, &b, &c]).unwrap();
        assert_eq!(summary.average(), "22.00");
        assert_eq!(summary.description, "clear sky");
        assert!(DailySummary::from_entries(date, &[]).is_none());
    }

    #[test]
    fn topic_detection_follows_priority() {
        assert_eq!(QueryTopic::detect("Is it SUNNY and rainy?"), QueryTopic::Sunny);
        assert_eq!(QueryTopic::detect("umbrella for the rain?"), QueryTopic::Umbrella);
        assert_eq!(QueryTopic::detect("how warm is it"), QueryTopic::Temperature);
        assert_eq!(QueryTopic::detect("humidity and rain"), QueryTopic::Humidity);
        assert_eq!(QueryTopic::detect("will it rain"), QueryTopic::Rain);
        assert_eq!(QueryTopic::detect("is it windy"), QueryTopic::Windy);
        assert_eq!(QueryTopic::detect("weather in Paris"), QueryTopic::General);
    }

    #[test]
    fn topic_replies() {
        let snap = snapshot("2024-06-03 09:00:00", 293.15, "light rain");

        assert_eq!(
            QueryTopic::Sunny.reply("Paris", &snap),
            "No, it is not sunny in Paris. It is light rain with a temperature of 20.00°C."
        );
        assert_eq!(
            QueryTopic::Umbrella.reply("Paris", &snap),
            "Yes, you might want to take an umbrella as it is light rain in Paris."
        );
        assert_eq!(
            QueryTopic::Rain.reply("Paris", &snap),
            "Yes, it is currently raining in Paris. The temperature is 20.00°C."
        );
        assert_eq!(
            QueryTopic::Humidity.reply("Paris", &snap),
            "The current humidity in Paris is 50%."
        );
        assert_eq!(
            QueryTopic::Windy.reply("Paris", &snap),
            "The current wind speed in Paris is 3 meters per second."
        );
        assert_eq!(
            QueryTopic::General.reply("Paris", &snap),
            "The current weather in Paris is light rain with a temperature of 20.00°C and humidity of 50%."
        );
    }
}
