//! Weather forecast as shown on the dashboard
//!
//! `/api/weather` answers
//! `{ "weekly_weather": { "2025-07-22": [hour, ..] }, "daily_weather": [day, ..], "version": .. }`
//! with the next few hours grouped by ISO day and a short daily outlook.

use crate::dates::{format_german_date_with_weekday, INVALID_DATE};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct HourlyForecast {
    #[serde(rename = "zeit")]
    pub time: String,
    #[serde(rename = "beschreibung")]
    pub description: String,
    #[serde(rename = "temperatur")]
    pub temperature: f64,
}

impl HourlyForecast {
    pub fn temperature_label(&self) -> String {
        format!("{:.0}°", self.temperature)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DailyForecast {
    #[serde(rename = "tag")]
    pub day: String,
    #[serde(rename = "beschreibung")]
    pub description: String,
    pub temp_min: f64,
    pub temp_max: f64,
}

impl DailyForecast {
    /// `12° / 24°`
    pub fn range_label(&self) -> String {
        format!("{:.0}° / {:.0}°", self.temp_min, self.temp_max)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HourlyDay {
    pub label: String,
    pub hours: Vec<HourlyForecast>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct WeatherReport {
    pub hourly: Vec<HourlyDay>,
    pub daily: Vec<(String, DailyForecast)>,
}

impl WeatherReport {
    pub fn is_empty(&self) -> bool {
        self.hourly.is_empty() && self.daily.is_empty()
    }
}

/// Drop the version token so an unchanged forecast compares equal
pub fn select_weather(body: Value) -> Value {
    match body {
        Value::Object(mut map) => {
            map.remove("version");
            Value::Object(map)
        }
        other => other,
    }
}

fn list<T: for<'de> Deserialize<'de>>(value: Option<&Value>) -> Vec<T> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value::<T>(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Relabel a backend day string, keeping it when it can't be read
fn day_label(raw: &str, today: NaiveDate) -> String {
    let label = format_german_date_with_weekday(raw, today, false);
    if label == INVALID_DATE {
        raw.to_string()
    } else {
        label
    }
}

pub fn weather_from_value(value: &Value, today: NaiveDate) -> WeatherReport {
    let mut hourly: Vec<(String, HourlyDay)> = value
        .get("weekly_weather")
        .and_then(Value::as_object)
        .map(|days| {
            days.iter()
                .map(|(date, hours)| {
                    let day = HourlyDay {
                        label: day_label(date, today),
                        hours: list(Some(hours)),
                    };
                    (date.clone(), day)
                })
                .collect()
        })
        .unwrap_or_default();
    hourly.sort_by(|a, b| a.0.cmp(&b.0));

    let daily = list::<DailyForecast>(value.get("daily_weather"))
        .into_iter()
        .map(|day| (day_label(&day.day, today), day))
        .collect();

    WeatherReport {
        hourly: hourly.into_iter().map(|(_, day)| day).collect(),
        daily,
    }
}
