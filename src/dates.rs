//! German date labels for dashboard entries

use chrono::{DateTime, Datelike, Locale, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use regex::Regex;
use std::sync::OnceLock;

pub const TODAY_LABEL: &str = "Heute";
pub const INVALID_DATE: &str = "Ungültiges Datum";

const GERMAN_MONTHS: [&str; 12] = [
    "januar", "februar", "märz", "april", "mai", "juni",
    "juli", "august", "september", "oktober", "november", "dezember",
];

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

fn long_form_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{1,2})\.\s*([A-Za-zäöüÄÖÜß]+)").ok())
        .as_ref()
}

/// Label a date string as `Heute` or `Dienstag, 22. Juli`.
///
/// Accepts ISO dates (`2025-07-22`, RFC 3339, naive date-times) and the
/// German long form (`Dienstag, 22. Juli`, year taken from `today`). Only the
/// calendar day is compared, time of day is ignored.
pub fn format_german_date_with_weekday(input: &str, today: NaiveDate, only_weekday: bool) -> String {
    let Some(date) = parse_date(input, today) else {
        tracing::debug!(input, "unparseable date");
        return INVALID_DATE.to_string();
    };

    if date == today {
        return TODAY_LABEL.to_string();
    }

    let fmt = if only_weekday { "%A" } else { "%A, %d. %B" };
    localized(date, fmt)
}

/// Header date: `Dienstag, 22. Juli` when short, `Dienstag, 22. Juli 2025` otherwise
pub fn formatted_date<Tz: TimeZone>(now: &DateTime<Tz>, short: bool) -> String {
    let fmt = if short { "%A, %-d. %B" } else { "%A, %-d. %B %Y" };
    localized(now.date_naive(), fmt)
}

fn localized(date: NaiveDate, fmt: &str) -> String {
    date.and_time(NaiveTime::default())
        .and_utc()
        .format_localized(fmt, Locale::de_DE)
        .to_string()
}

fn parse_date(input: &str, today: NaiveDate) -> Option<NaiveDate> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    match input.split_once(',') {
        Some((_, rest)) => parse_long_form(rest.trim(), today.year()),
        None => parse_iso(input),
    }
}

fn parse_long_form(text: &str, year: i32) -> Option<NaiveDate> {
    let caps = long_form_regex()?.captures(text)?;
    let day: u32 = caps.get(1)?.as_str().parse().ok()?;
    let month_name = caps.get(2)?.as_str().to_lowercase();
    let month = GERMAN_MONTHS.iter().position(|m| *m == month_name)? as u32 + 1;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_iso(text: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }
    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|dt| dt.date())
}
