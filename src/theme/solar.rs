//! Approximate sunrise/sunset times
//!
//! Single-pass almanac formula: day of year, solar mean anomaly, ecliptic
//! longitude, right ascension, declination, local hour angle. No correction
//! iteration is applied, the error stays within a few minutes at mid latitudes.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};

/// Sun altitude reference including refraction and the solar disk radius.
pub const ZENITH_DEG: f64 = 90.8333;

const D2R: f64 = std::f64::consts::PI / 180.0;
const R2D: f64 = 180.0 / std::f64::consts::PI;

/// Sun times for a single calendar day
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SunTimes {
    Regular {
        sunrise: DateTime<Utc>,
        sunset: DateTime<Utc>,
    },
    /// Sun stays above the horizon all day
    PolarDay,
    /// Sun stays below the horizon all day
    PolarNight,
}

#[derive(Clone, Copy, PartialEq)]
enum Event {
    Sunrise,
    Sunset,
}

enum Outcome {
    Hour(f64),
    AlwaysUp,
    AlwaysDown,
}

/// Compute sunrise and sunset for `date` at the given coordinates (degrees, east positive).
///
/// Times are UTC on `date`, with the UTC hour wrapped into `[0, 24)`. Only the
/// time of day is meaningful once converted to the observer's zone.
pub fn sun_times(date: NaiveDate, lat: f64, lon: f64) -> SunTimes {
    let rise = event_hour_utc(date, lat, lon, Event::Sunrise);
    let set = event_hour_utc(date, lat, lon, Event::Sunset);

    match (rise, set) {
        (Outcome::Hour(rise), Outcome::Hour(set)) => SunTimes::Regular {
            sunrise: at_utc_hour(date, rise),
            sunset: at_utc_hour(date, set),
        },
        (Outcome::AlwaysDown, _) | (_, Outcome::AlwaysDown) => SunTimes::PolarNight,
        _ => SunTimes::PolarDay,
    }
}

fn day_of_year(date: NaiveDate) -> f64 {
    let day = f64::from(date.day());
    let month = f64::from(date.month());
    let year = f64::from(date.year());

    let n1 = (275.0 * month / 9.0).floor();
    let n2 = ((month + 9.0) / 12.0).floor();
    let n3 = 1.0 + ((year - 4.0 * (year / 4.0).floor() + 2.0) / 3.0).floor();
    n1 - (n2 * n3) + day - 30.0
}

fn event_hour_utc(date: NaiveDate, lat: f64, lon: f64, event: Event) -> Outcome {
    let lng_hour = lon / 15.0;
    let base_hour = match event {
        Event::Sunrise => 6.0,
        Event::Sunset => 18.0,
    };
    let t = day_of_year(date) + ((base_hour - lng_hour) / 24.0);

    // Solar mean anomaly and true longitude
    let m = (0.9856 * t) - 3.289;
    let l = (m + (1.916 * (D2R * m).sin()) + (0.020 * (2.0 * D2R * m).sin()) + 282.634)
        .rem_euclid(360.0);

    // Right ascension, moved into the same quadrant as L
    let mut ra = (R2D * (0.91764 * (D2R * l).tan()).atan()).rem_euclid(360.0);
    let l_quadrant = (l / 90.0).floor() * 90.0;
    let ra_quadrant = (ra / 90.0).floor() * 90.0;
    ra = (ra + (l_quadrant - ra_quadrant)) / 15.0;

    let sin_dec = 0.39782 * (D2R * l).sin();
    let cos_dec = sin_dec.asin().cos();

    let cos_h = ((D2R * ZENITH_DEG).cos() - (sin_dec * (D2R * lat).sin()))
        / (cos_dec * (D2R * lat).cos());
    if cos_h > 1.0 {
        return Outcome::AlwaysDown;
    }
    if cos_h < -1.0 {
        return Outcome::AlwaysUp;
    }

    let h = match event {
        Event::Sunrise => 360.0 - R2D * cos_h.acos(),
        Event::Sunset => R2D * cos_h.acos(),
    } / 15.0;

    let local_mean = h + ra - (0.06571 * t) - 6.622;
    Outcome::Hour((local_mean - lng_hour).rem_euclid(24.0))
}

/// Whole minutes are kept, seconds are dropped.
fn at_utc_hour(date: NaiveDate, ut: f64) -> DateTime<Utc> {
    let hours = ut.floor() as i64;
    let minutes = ((ut - ut.floor()) * 60.0).floor() as i64;
    date.and_time(NaiveTime::default()).and_utc()
        + Duration::hours(hours)
        + Duration::minutes(minutes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn hm(dt: DateTime<Utc>) -> (u32, u32) {
        (dt.hour(), dt.minute())
    }

    fn regular(times: SunTimes) -> (DateTime<Utc>, DateTime<Utc>) {
        match times {
            SunTimes::Regular { sunrise, sunset } => (sunrise, sunset),
            other => panic!("expected a regular day, got {other:?}"),
        }
    }

    #[test]
    fn midsummer_at_default_location() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 21).unwrap();
        let (rise, set) = regular(sun_times(date, 48.0, 10.0));
        assert_eq!(hm(rise), (3, 20));
        assert_eq!(hm(set), (19, 23));
        assert_eq!(rise.date_naive(), date);
    }

    #[test]
    fn midwinter_at_default_location() {
        let date = NaiveDate::from_ymd_opt(2025, 12, 21).unwrap();
        let (rise, set) = regular(sun_times(date, 48.0, 10.0));
        assert_eq!(hm(rise), (7, 6));
        assert_eq!(hm(set), (15, 29));
    }

    #[test]
    fn equinox_day_is_about_twelve_hours() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 20).unwrap();
        let (rise, set) = regular(sun_times(date, 48.0, 10.0));
        let length = set - rise;
        assert!(length > Duration::hours(12) && length < Duration::minutes(12 * 60 + 20));
    }

    #[test]
    fn southern_hemisphere_wraps_utc_hour() {
        // Sydney: local sunrise around 07:00 AEST is the previous UTC evening
        let date = NaiveDate::from_ymd_opt(2025, 6, 21).unwrap();
        let (rise, set) = regular(sun_times(date, -33.9, 151.2));
        assert_eq!(hm(rise), (20, 59));
        assert_eq!(hm(set), (6, 53));
    }

    #[test]
    fn polar_cases() {
        let june = NaiveDate::from_ymd_opt(2025, 6, 21).unwrap();
        let december = NaiveDate::from_ymd_opt(2025, 12, 21).unwrap();
        assert_eq!(sun_times(june, 78.0, 15.0), SunTimes::PolarDay);
        assert_eq!(sun_times(december, 78.0, 15.0), SunTimes::PolarNight);
    }
}
