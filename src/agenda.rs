//! Calendar payload as shown on the dashboard
//!
//! `/api/events` answers `{ "data": { .. }, "version": .. }` where `data`
//! groups upcoming events by day:
//! `{ "2025-07-22": [{ "start_time": "14:00", "end_time": "15:00", "title": .., "calendar": .. }] }`

use crate::dates::format_german_date_with_weekday;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AgendaEvent {
    pub start_time: String,
    pub end_time: String,
    pub title: String,
    pub calendar: String,
}

impl AgendaEvent {
    /// `14:00 - 15:00`, or just the start for all-day entries
    pub fn time_range(&self) -> String {
        if self.end_time.is_empty() {
            self.start_time.clone()
        } else {
            format!("{} - {}", self.start_time, self.end_time)
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AgendaDay {
    pub date: String,
    /// `Heute` or `Mittwoch, 23. Juli`
    pub label: String,
    pub events: Vec<AgendaEvent>,
}

/// Keep the `data` map; the version token next to it changes on every update
pub fn select_events(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Days in date order. Entries that don't look like events are skipped.
pub fn agenda_from_value(value: &Value, today: NaiveDate) -> Vec<AgendaDay> {
    let Some(days) = value.as_object() else {
        return Vec::new();
    };

    let mut agenda: Vec<AgendaDay> = days
        .iter()
        .map(|(date, events)| {
            let events = events
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|item| serde_json::from_value::<AgendaEvent>(item.clone()).ok())
                        .collect()
                })
                .unwrap_or_default();
            AgendaDay {
                date: date.clone(),
                label: format_german_date_with_weekday(date, today, false),
                events,
            }
        })
        .collect();

    agenda.sort_by(|a, b| a.date.cmp(&b.date));
    agenda
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn groups_are_labelled_and_sorted() {
        let today = NaiveDate::from_ymd_opt(2025, 7, 22).unwrap();
        let payload = json!({
            "2025-07-23": [
                {"start_time": "Ganztägig", "end_time": "", "title": "Sommerfest", "calendar": "Familie"}
            ],
            "2025-07-22": [
                {"start_time": "14:00", "end_time": "15:00", "title": "Team Meeting", "calendar": "Arbeit"},
                {"start_time": "18:30", "end_time": "19:00", "title": "Einkaufen", "calendar": "Familie"}
            ]
        });

        let agenda = agenda_from_value(&payload, today);
        assert_eq!(agenda.len(), 2);
        assert_eq!(agenda[0].label, "Heute");
        assert_eq!(agenda[0].events.len(), 2);
        assert_eq!(agenda[0].events[0].time_range(), "14:00 - 15:00");
        assert_eq!(agenda[1].label, "Mittwoch, 23. Juli");
        assert_eq!(agenda[1].events[0].time_range(), "Ganztägig");
    }

    #[test]
    fn envelope_is_unwrapped() {
        let body = json!({"data": {"2025-07-22": []}, "version": "2025-07-22 08:00:00"});
        assert_eq!(select_events(body), json!({"2025-07-22": []}));
        assert_eq!(select_events(json!([1])), json!([1]));
    }

    #[test]
    fn non_object_payload_is_empty() {
        let today = NaiveDate::from_ymd_opt(2025, 7, 22).unwrap();
        assert!(agenda_from_value(&json!(["x"]), today).is_empty());
    }
}
