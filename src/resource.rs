//! Backend resources the dashboard polls
//!
//! Each resource is served at `/api/<name>` with a version token at
//! `/api/<name>-version`.

use crate::query::VersionedQueryOptions;
use crate::settings::ClientSettings;
use crate::{agenda, calls, weather};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    /// Google calendar entries grouped by day
    Events,
    /// FritzBox call list
    Calls,
    Weather,
}

impl Resource {
    pub const ALL: [Resource; 3] = [Resource::Events, Resource::Calls, Resource::Weather];

    pub fn name(self) -> &'static str {
        match self {
            Resource::Events => "events",
            Resource::Calls => "calls",
            Resource::Weather => "weather",
        }
    }

    /// Panel heading
    pub fn title(self) -> &'static str {
        match self {
            Resource::Events => "TERMINE",
            Resource::Calls => "ANRUFE",
            Resource::Weather => "WETTER",
        }
    }

    pub fn data_path(self) -> String {
        format!("/api/{}", self.name())
    }

    pub fn version_path(self) -> String {
        format!("/api/{}-version", self.name())
    }

    /// Trims the response body down to what the view model reads
    pub fn select(self) -> fn(Value) -> Value {
        match self {
            Resource::Events => agenda::select_events,
            Resource::Calls => calls::select_calls,
            Resource::Weather => weather::select_weather,
        }
    }

    pub fn query_options(self, settings: &ClientSettings) -> VersionedQueryOptions {
        VersionedQueryOptions::new(
            self.name(),
            &settings.version_url(self),
            &settings.data_url(self),
        )
        .with_select(self.select())
        .with_interval(settings.poll_interval())
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn routes_match_backend() {
        assert_eq!(Resource::Events.data_path(), "/api/events");
        assert_eq!(Resource::Events.version_path(), "/api/events-version");
        assert_eq!(Resource::Calls.version_path(), "/api/calls-version");
        assert_eq!(Resource::Weather.data_path(), "/api/weather");
    }

    #[test]
    fn options_follow_settings() {
        let settings = ClientSettings {
            server_url: "http://pi.local:8080".to_string(),
            version_poll_secs: 30,
            ..ClientSettings::default()
        };
        let options = Resource::Calls.query_options(&settings);
        assert_eq!(options.key, "calls");
        assert_eq!(options.data_url, "http://pi.local:8080/api/calls");
        assert_eq!(options.version_url, "http://pi.local:8080/api/calls-version");
        assert_eq!(options.refetch_interval, Duration::from_secs(30));
        assert!(options.select.is_some());
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Resource::Weather).unwrap(), "\"weather\"");
        assert_eq!(
            serde_json::from_str::<Vec<Resource>>(r#"["calls", "events"]"#).unwrap(),
            vec![Resource::Calls, Resource::Events]
        );
    }
}
