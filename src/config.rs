//! Remote dashboard configuration (`/api/config`) and the session context

use crate::query::{JsonFetcher, QueryClient};
use crate::settings::ClientSettings;
use crate::theme::{
    Rgb, ThemeConfig, DEFAULT_DAY_BG, DEFAULT_DAY_TEXT, DEFAULT_EVENING_BG, DEFAULT_EVENING_TEXT,
    DEFAULT_LAT, DEFAULT_LON,
};
use serde::{Deserialize, Deserializer};
use std::sync::Arc;

/// Config served by the backend. Every key is optional.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct AppConfig {
    #[serde(default, deserialize_with = "coordinate")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "coordinate")]
    pub lon: Option<f64>,
    #[serde(default)]
    pub theme_day_bg: Option<String>,
    #[serde(default)]
    pub theme_day_text: Option<String>,
    #[serde(default)]
    pub theme_evening_bg: Option<String>,
    #[serde(default)]
    pub theme_evening_text: Option<String>,
}

/// Coordinates come from a `.env` on the backend and may be quoted
fn coordinate<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid coordinate {:?}", s))),
    }
}

impl AppConfig {
    /// Resolve into theme inputs, falling back to defaults for missing or bad values
    pub fn theme_config(&self, evening_intensity: f64) -> ThemeConfig {
        ThemeConfig {
            lat: self.lat.unwrap_or(DEFAULT_LAT),
            lon: self.lon.unwrap_or(DEFAULT_LON),
            day_bg: color_or_default("theme_day_bg", self.theme_day_bg.as_deref(), DEFAULT_DAY_BG),
            day_text: color_or_default("theme_day_text", self.theme_day_text.as_deref(), DEFAULT_DAY_TEXT),
            evening_bg: color_or_default("theme_evening_bg", self.theme_evening_bg.as_deref(), DEFAULT_EVENING_BG),
            evening_text: color_or_default(
                "theme_evening_text",
                self.theme_evening_text.as_deref(),
                DEFAULT_EVENING_TEXT,
            ),
            evening_intensity: evening_intensity.clamp(0.0, 1.0),
        }
    }

    /// Blocking; call from a worker thread once the window is up.
    pub fn fetch(fetcher: &dyn JsonFetcher, url: &str) -> Self {
        match fetcher.get_json(url) {
            Ok(body) => match serde_json::from_value::<AppConfig>(body) {
                Ok(config) => {
                    tracing::info!(%url, "config loaded");
                    config
                }
                Err(e) => {
                    tracing::error!(%url, error = %e, "config has unexpected shape, using defaults");
                    AppConfig::default()
                }
            },
            Err(e) => {
                tracing::error!(error = %e, "config load failed, using defaults");
                AppConfig::default()
            }
        }
    }
}

fn color_or_default(name: &str, value: Option<&str>, default: &str) -> Rgb {
    if let Some(value) = value {
        match Rgb::from_hex(value) {
            Ok(rgb) => return rgb,
            Err(e) => tracing::warn!(key = name, error = %e, "ignoring configured color"),
        }
    }
    Rgb::from_hex(default).unwrap_or(Rgb(0, 0, 0))
}

/// Everything the dashboard needs for one session, built once at startup
pub struct AppContext {
    pub settings: ClientSettings,
    pub config: AppConfig,
    pub client: QueryClient,
    pub fetcher: Arc<dyn JsonFetcher>,
}

impl AppContext {
    /// Fetch `/api/config` once. A failed load is logged and defaults are used,
    /// the theme still has to run.
    pub fn load(settings: ClientSettings, fetcher: Arc<dyn JsonFetcher>) -> Self {
        let config = AppConfig::fetch(fetcher.as_ref(), &settings.config_url());
        Self {
            settings,
            config,
            client: QueryClient::default(),
            fetcher,
        }
    }

    pub fn theme_config(&self) -> ThemeConfig {
        self.config.theme_config(self.settings.evening_intensity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::FetchError;
    use serde_json::json;

    struct StaticFetcher(Result<serde_json::Value, FetchError>);

    impl JsonFetcher for StaticFetcher {
        fn get_json(&self, _url: &str) -> Result<serde_json::Value, FetchError> {
            self.0.clone()
        }
    }

    #[test]
    fn parses_full_config() {
        let config: AppConfig = serde_json::from_value(json!({
            "lat": "52.52",
            "lon": 13.405,
            "theme_day_bg": "#ffffffff",
            "theme_day_text": "#000000",
            "theme_evening_bg": "#ffe0a0",
            "theme_evening_text": "#402000",
            "timezone": "Europe/Berlin"
        }))
        .unwrap();
        assert_eq!(config.lat, Some(52.52));
        assert_eq!(config.lon, Some(13.405));

        let theme = config.theme_config(0.5);
        assert_eq!(theme.day_bg, Rgb(0xff, 0xff, 0xff));
        assert_eq!(theme.evening_text, Rgb(0x40, 0x20, 0x00));
        assert_eq!(theme.evening_intensity, 0.5);
    }

    #[test]
    fn missing_and_bad_values_fall_back() {
        let config: AppConfig = serde_json::from_value(json!({
            "lat": "",
            "theme_day_bg": "not-a-color"
        }))
        .unwrap();
        let theme = config.theme_config(0.7);
        assert_eq!(theme, ThemeConfig::default());
    }

    #[test]
    fn unparseable_coordinate_is_rejected() {
        assert!(serde_json::from_value::<AppConfig>(json!({"lat": "north"})).is_err());
    }

    #[test]
    fn context_falls_back_when_backend_is_down() {
        let fetcher = StaticFetcher(Err(FetchError::Connect {
            url: "http://localhost:8080/api/config".to_string(),
        }));
        let ctx = AppContext::load(ClientSettings::default(), Arc::new(fetcher));
        assert_eq!(ctx.config, AppConfig::default());
        assert_eq!(ctx.theme_config(), ThemeConfig::default());
    }

    #[test]
    fn context_uses_served_config() {
        let fetcher = StaticFetcher(Ok(json!({"lat": 53.55, "lon": 9.99})));
        let ctx = AppContext::load(ClientSettings::default(), Arc::new(fetcher));
        let theme = ctx.theme_config();
        assert_eq!(theme.lat, 53.55);
        assert_eq!(theme.lon, 9.99);
    }
}
