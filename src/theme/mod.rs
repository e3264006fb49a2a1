//! Day/evening theme driven by the local sun times
//!
//! `compute_theme` is pure; the once-a-minute refresh and the writes to the
//! rendering surfaces live in [`timer`] and [`visuals`].

pub mod color;
pub mod solar;
pub mod timer;
pub mod visuals;

use chrono::{DateTime, Datelike, TimeZone, Timelike};

pub use color::{normalize_hex, ColorError, Rgb};
pub use solar::{sun_times, SunTimes};
pub use timer::{Clock, CssVariables, SystemClock, ThemeTarget, ThemeTimer};

/// How far towards the evening palette the theme goes at night (0..=1)
pub const DEFAULT_EVENING_INTENSITY: f64 = 0.7;

pub const DEFAULT_LAT: f64 = 48.0;
pub const DEFAULT_LON: f64 = 10.0;

pub const DEFAULT_DAY_BG: &str = "#eaeaeaff";
pub const DEFAULT_DAY_TEXT: &str = "#222222";
pub const DEFAULT_EVENING_BG: &str = "#ffeebbff";
pub const DEFAULT_EVENING_TEXT: &str = "#3a2c00";

/// Latest minute of day the evening fade-in may end at (22:00)
const EVENING_CAP_MINUTES: i32 = 22 * 60;
const FADE_MINUTES: i32 = 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThemeLabel {
    Day,
    Evening,
}

impl ThemeLabel {
    pub fn label(&self) -> &'static str {
        match self {
            ThemeLabel::Day => "day",
            ThemeLabel::Evening => "evening",
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            ThemeLabel::Day => "theme-day",
            ThemeLabel::Evening => "theme-evening",
        }
    }
}

/// Resolved theme inputs: observer position and both palettes
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThemeConfig {
    pub lat: f64,
    pub lon: f64,
    pub day_bg: Rgb,
    pub day_text: Rgb,
    pub evening_bg: Rgb,
    pub evening_text: Rgb,
    pub evening_intensity: f64,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            lat: DEFAULT_LAT,
            lon: DEFAULT_LON,
            day_bg: Rgb(0xea, 0xea, 0xea),
            day_text: Rgb(0x22, 0x22, 0x22),
            evening_bg: Rgb(0xff, 0xee, 0xbb),
            evening_text: Rgb(0x3a, 0x2c, 0x00),
            evening_intensity: DEFAULT_EVENING_INTENSITY,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThemeState {
    /// Blend factor, 0 = day palette
    pub t: f64,
    pub background: Rgb,
    pub text: Rgb,
    pub label: ThemeLabel,
}

impl ThemeState {
    pub fn background_hex(&self) -> String {
        self.background.to_hex()
    }

    pub fn text_hex(&self) -> String {
        self.text.to_hex()
    }
}

/// Blend factor for a time of day, all arguments in minutes since local midnight.
///
/// The result is always within `[0, intensity]`.
pub fn blend_factor(now: i32, sunrise: i32, sunset: i32, intensity: f64) -> f64 {
    let intensity = intensity.clamp(0.0, 1.0);
    let ramp = |x: f64| x.clamp(0.0, 1.0) * intensity;

    let evening_start = sunset - FADE_MINUTES;
    let morning_start = sunrise - FADE_MINUTES;
    // Late sunsets keep the evening window open until the sun is actually down
    let evening_end = sunset.max(EVENING_CAP_MINUTES);

    if now >= evening_start && now < evening_end {
        let fade_end = sunset.min(EVENING_CAP_MINUTES);
        if fade_end <= evening_start {
            return intensity;
        }
        return ramp(f64::from(now - evening_start) / f64::from(fade_end - evening_start));
    }

    if now >= morning_start && now < sunrise {
        return ramp(f64::from(sunrise - now) / f64::from(sunrise - morning_start));
    }

    if now >= sunset || now < sunrise {
        return intensity;
    }

    0.0
}

/// Compute the theme for `now`, in whatever zone `now` carries.
pub fn compute_theme<Tz: TimeZone>(now: &DateTime<Tz>, config: &ThemeConfig) -> ThemeState {
    let intensity = config.evening_intensity.clamp(0.0, 1.0);
    let date = now.date_naive();

    let t = match sun_times(date, config.lat, config.lon) {
        SunTimes::Regular { sunrise, sunset } => {
            let zone = now.timezone();
            blend_factor(
                minute_of_day(now),
                minute_of_day(&sunrise.with_timezone(&zone)),
                minute_of_day(&sunset.with_timezone(&zone)),
                intensity,
            )
        }
        SunTimes::PolarDay => 0.0,
        SunTimes::PolarNight => intensity,
    };

    tracing::trace!(
        day = date.ordinal(),
        t,
        "theme blend factor computed"
    );

    ThemeState {
        t,
        background: Rgb::lerp(config.day_bg, config.evening_bg, t),
        text: Rgb::lerp(config.day_text, config.evening_text, t),
        label: if t > 0.0 {
            ThemeLabel::Evening
        } else {
            ThemeLabel::Day
        },
    }
}

fn minute_of_day<Tz: TimeZone>(dt: &DateTime<Tz>) -> i32 {
    (dt.hour() * 60 + dt.minute()) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    const INTENSITY: f64 = 0.7;

    fn m(h: i32, min: i32) -> i32 {
        h * 60 + min
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn evening_fade_in() {
        let (rise, set) = (m(6, 30), m(21, 0));
        assert!(approx(blend_factor(m(20, 0), rise, set, INTENSITY), 0.0));
        assert!(approx(blend_factor(m(20, 30), rise, set, INTENSITY), 0.35));
        assert!(approx(blend_factor(m(21, 30), rise, set, INTENSITY), INTENSITY));
    }

    #[test]
    fn night_and_morning_fade_out() {
        let (rise, set) = (m(6, 30), m(21, 0));
        assert!(approx(blend_factor(m(23, 45), rise, set, INTENSITY), INTENSITY));
        assert!(approx(blend_factor(m(3, 0), rise, set, INTENSITY), INTENSITY));
        assert!(approx(blend_factor(m(5, 30), rise, set, INTENSITY), INTENSITY));
        assert!(approx(blend_factor(m(6, 0), rise, set, INTENSITY), 0.35));
        assert!(approx(blend_factor(m(6, 30), rise, set, INTENSITY), 0.0));
        assert!(approx(blend_factor(m(7, 0), rise, set, INTENSITY), 0.0));
        assert!(approx(blend_factor(m(13, 0), rise, set, INTENSITY), 0.0));
    }

    #[test]
    fn late_sunset_caps_ramp_at_ten() {
        let (rise, set) = (m(5, 0), m(22, 30));
        // ramp runs 21:30 -> 22:00
        assert!(approx(blend_factor(m(21, 30), rise, set, INTENSITY), 0.0));
        assert!(approx(blend_factor(m(21, 45), rise, set, INTENSITY), 0.35));
        assert!(approx(blend_factor(m(22, 0), rise, set, INTENSITY), INTENSITY));
        assert!(approx(blend_factor(m(22, 15), rise, set, INTENSITY), INTENSITY));
        assert!(approx(blend_factor(m(22, 30), rise, set, INTENSITY), INTENSITY));
    }

    #[test]
    fn sunset_exactly_at_cap_still_fades() {
        let (rise, set) = (m(5, 0), m(22, 0));
        assert!(approx(blend_factor(m(21, 30), rise, set, INTENSITY), 0.35));
        assert!(approx(blend_factor(m(22, 0), rise, set, INTENSITY), INTENSITY));
    }

    #[test]
    fn ramp_starting_after_cap_is_full() {
        let (rise, set) = (m(4, 0), m(23, 30));
        assert!(approx(blend_factor(m(22, 0), rise, set, INTENSITY), 0.0));
        assert!(approx(blend_factor(m(22, 40), rise, set, INTENSITY), INTENSITY));
    }

    #[test]
    fn early_sunrise_fade_starts_before_midnight_clamps() {
        let (rise, set) = (m(0, 30), m(20, 0));
        assert!(approx(blend_factor(m(0, 0), rise, set, INTENSITY), 0.35));
    }

    #[test]
    fn factor_never_leaves_bounds() {
        for (rise, set) in [(m(6, 30), m(21, 0)), (m(3, 20), m(22, 40)), (m(8, 0), m(16, 0))] {
            for now in 0..(24 * 60) {
                let t = blend_factor(now, rise, set, INTENSITY);
                assert!((0.0..=INTENSITY).contains(&t), "t={t} at {now}");
            }
        }
    }

    #[test]
    fn intensity_is_clamped() {
        let t = blend_factor(m(23, 0), m(6, 0), m(20, 0), 4.0);
        assert!(approx(t, 1.0));
    }

    #[test]
    fn midday_is_day_palette() {
        let cest = FixedOffset::east_opt(2 * 3600).unwrap();
        let noon = cest.with_ymd_and_hms(2025, 6, 21, 12, 0, 0).unwrap();
        let config = ThemeConfig::default();
        let state = compute_theme(&noon, &config);
        assert_eq!(state.t, 0.0);
        assert_eq!(state.label, ThemeLabel::Day);
        assert_eq!(state.background_hex(), "#eaeaea");
        assert_eq!(state.text_hex(), "#222222");
    }

    #[test]
    fn midnight_is_full_evening_palette() {
        let cest = FixedOffset::east_opt(2 * 3600).unwrap();
        let night = cest.with_ymd_and_hms(2025, 6, 21, 0, 30, 0).unwrap();
        let config = ThemeConfig {
            evening_intensity: 1.0,
            ..ThemeConfig::default()
        };
        let state = compute_theme(&night, &config);
        assert_eq!(state.label, ThemeLabel::Evening);
        assert_eq!(state.background_hex(), "#ffeebb");
        assert_eq!(state.text_hex(), "#3a2c00");
    }

    #[test]
    fn sun_times_are_read_in_local_zone() {
        // Midsummer sunset at 48N/10E is 21:23 CEST; 20:53 is half way into the ramp
        let cest = FixedOffset::east_opt(2 * 3600).unwrap();
        let dusk = cest.with_ymd_and_hms(2025, 6, 21, 20, 53, 0).unwrap();
        let state = compute_theme(&dusk, &ThemeConfig::default());
        assert!(approx(state.t, 0.35));
        assert_eq!(state.label.css_class(), "theme-evening");
    }

    #[test]
    fn polar_night_is_full_intensity() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let noon = utc.with_ymd_and_hms(2025, 12, 21, 12, 0, 0).unwrap();
        let config = ThemeConfig {
            lat: 78.0,
            lon: 15.0,
            ..ThemeConfig::default()
        };
        assert!(approx(compute_theme(&noon, &config).t, DEFAULT_EVENING_INTENSITY));
    }
}
