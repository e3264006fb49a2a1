//! FritzBox call list as shown on the dashboard
//!
//! `/api/calls` answers `{ "sid": .., "calls": { "<day>": [call, ..] }, "version": .. }`.
//! Day keys are preformatted by the backend; entries carry an ISO `date`.

use crate::dates::{format_german_date_with_weekday, INVALID_DATE};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::Value;

const UNKNOWN_CALLER: &str = "Unbekannt";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallKind {
    Incoming,
    Missed,
    Outgoing,
    Rejected,
    Voicemail,
    Other,
}

impl CallKind {
    /// FritzBox call list `Type`. The backend reports answering machine
    /// entries as `11`.
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "1" | "9" => CallKind::Incoming,
            "2" => CallKind::Missed,
            "3" => CallKind::Outgoing,
            "10" => CallKind::Rejected,
            "11" => CallKind::Voicemail,
            _ => CallKind::Other,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            CallKind::Incoming => "EIN",
            CallKind::Missed => "VERPASST",
            CallKind::Outgoing => "AUS",
            CallKind::Rejected => "ABGELEHNT",
            CallKind::Voicemail => "AB",
            CallKind::Other => "--",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CallEntry {
    #[serde(rename = "type")]
    pub code: Option<String>,
    pub name: Option<String>,
    pub caller: Option<String>,
    pub called: Option<String>,
    pub date: String,
    pub duration: Option<String>,
}

impl CallEntry {
    pub fn kind(&self) -> CallKind {
        CallKind::from_code(self.code.as_deref().unwrap_or_default())
    }

    /// Contact name, else the number, else `Unbekannt`
    pub fn display_name(&self) -> &str {
        [self.name.as_deref(), self.caller.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_CALLER)
    }

    /// `14:02`, or the raw value if it isn't an ISO timestamp
    pub fn time(&self) -> String {
        NaiveDateTime::parse_from_str(&self.date, "%Y-%m-%dT%H:%M:%S")
            .map(|dt| dt.format("%H:%M").to_string())
            .unwrap_or_else(|_| self.date.clone())
    }

    /// Duration for calls that were actually talked through
    pub fn talk_time(&self) -> Option<&str> {
        match self.kind() {
            CallKind::Missed | CallKind::Rejected => None,
            _ => self.duration.as_deref().filter(|d| !d.trim().is_empty()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CallDay {
    /// `Heute` or `Sonntag, 13. Juli`
    pub label: String,
    pub calls: Vec<CallEntry>,
}

impl CallDay {
    fn newest(&self) -> &str {
        self.calls.first().map(|c| c.date.as_str()).unwrap_or_default()
    }
}

/// Keep the `calls` map; `sid` and `version` are of no use to the view
pub fn select_calls(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("calls") => {
            map.remove("calls").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Days newest first, calls within a day newest first.
pub fn calls_from_value(value: &Value, today: NaiveDate) -> Vec<CallDay> {
    let Some(days) = value.as_object() else {
        return Vec::new();
    };

    let mut grouped: Vec<CallDay> = days
        .iter()
        .map(|(key, entries)| {
            let mut calls: Vec<CallEntry> = entries
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|item| serde_json::from_value::<CallEntry>(item.clone()).ok())
                        .collect()
                })
                .unwrap_or_default();
            calls.sort_by(|a, b| b.date.cmp(&a.date));

            // Relabel from the timestamps so today reads `Heute`
            let label = calls
                .first()
                .map(|c| format_german_date_with_weekday(&c.date, today, false))
                .filter(|l| l != INVALID_DATE)
                .unwrap_or_else(|| key.clone());

            CallDay { label, calls }
        })
        .collect();

    // The JSON map loses the backend's ordering
    grouped.sort_by(|a, b| b.newest().cmp(a.newest()));
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 13).unwrap()
    }

    #[test]
    fn days_are_ordered_and_relabelled() {
        let payload = select_calls(json!({
            "sid": "abcdef0123456789",
            "version": "2025-07-13 14:05:00",
            "calls": {
                "Saturday, 12. July": [
                    {"type": "3", "name": "", "caller": "", "called": "0891234", "date": "2025-07-12T18:00:00", "duration": "0:12", "audio_path": null}
                ],
                "Sunday, 13. July": [
                    {"type": "2", "name": "Oma", "caller": "0301234", "called": "0897777", "date": "2025-07-13T09:15:00", "duration": "0:00", "audio_path": null},
                    {"type": "1", "name": "", "caller": "0171555", "called": "0897777", "date": "2025-07-13T14:02:00", "duration": "0:05", "audio_path": null}
                ]
            }
        }));

        let days = calls_from_value(&payload, today());
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].label, "Heute");
        assert_eq!(days[0].calls[0].time(), "14:02");
        assert_eq!(days[0].calls[0].display_name(), "0171555");
        assert_eq!(days[0].calls[1].display_name(), "Oma");
        assert_eq!(days[0].calls[1].kind(), CallKind::Missed);
        assert_eq!(days[0].calls[1].talk_time(), None);
        assert_eq!(days[1].label, "Samstag, 12. Juli");
        assert_eq!(days[1].calls[0].display_name(), UNKNOWN_CALLER);
        assert_eq!(days[1].calls[0].talk_time(), Some("0:12"));
    }

    #[test]
    fn kinds_from_fritzbox_codes() {
        assert_eq!(CallKind::from_code("1"), CallKind::Incoming);
        assert_eq!(CallKind::from_code("9"), CallKind::Incoming);
        assert_eq!(CallKind::from_code("3"), CallKind::Outgoing);
        assert_eq!(CallKind::from_code("10"), CallKind::Rejected);
        assert_eq!(CallKind::from_code("11").tag(), "AB");
        assert_eq!(CallKind::from_code(""), CallKind::Other);
    }

    #[test]
    fn odd_timestamps_keep_backend_label() {
        let payload = json!({
            "Montag, 14. Juli": [{"type": "1", "name": "Max", "date": "14.07.25 10:00"}]
        });
        let days = calls_from_value(&payload, today());
        assert_eq!(days[0].label, "Montag, 14. Juli");
        assert_eq!(days[0].calls[0].time(), "14.07.25 10:00");
    }
}
