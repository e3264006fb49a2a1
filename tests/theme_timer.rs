use chrono::{DateTime, FixedOffset};
use infocenter::theme::timer::{CSS_BACKGROUND, CSS_TEXT};
use infocenter::theme::{Clock, CssVariables, ThemeConfig, ThemeTimer};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Clock the test can move around
#[derive(Clone)]
struct ManualClock(Arc<Mutex<DateTime<FixedOffset>>>);

impl ManualClock {
    fn at(rfc3339: &str) -> Self {
        Self(Arc::new(Mutex::new(parse(rfc3339))))
    }

    fn set(&self, rfc3339: &str) {
        *self.0.lock().unwrap() = parse(rfc3339);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self.0.lock().unwrap()
    }
}

fn parse(s: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(s).unwrap()
}

fn class_of(css: &Arc<Mutex<CssVariables>>) -> Option<&'static str> {
    css.lock().unwrap().class
}

#[test]
fn applies_immediately_then_follows_the_clock() {
    let clock = ManualClock::at("2025-06-21T12:00:00+02:00");
    let css = Arc::new(Mutex::new(CssVariables::default()));

    let mut timer = ThemeTimer::start_with_interval(
        ThemeConfig::default(),
        clock.clone(),
        css.clone(),
        Duration::from_millis(10),
    );

    // Noon in midsummer: pure day palette, written before start returns
    {
        let vars = css.lock().unwrap();
        assert_eq!(vars.class, Some("theme-day"));
        assert_eq!(vars.get(CSS_BACKGROUND), Some("#eaeaea"));
        assert_eq!(vars.get(CSS_TEXT), Some("#222222"));
    }
    assert!(timer.is_running());

    clock.set("2025-06-21T23:30:00+02:00");
    let deadline = Instant::now() + Duration::from_secs(5);
    while class_of(&css) != Some("theme-evening") {
        assert!(Instant::now() < deadline, "theme never switched to evening");
        thread::sleep(Duration::from_millis(5));
    }
    assert_ne!(css.lock().unwrap().get(CSS_BACKGROUND), Some("#eaeaea"));

    timer.stop();
    assert!(!timer.is_running());

    // No more refreshes after stop
    clock.set("2025-06-21T12:00:00+02:00");
    thread::sleep(Duration::from_millis(60));
    assert_eq!(class_of(&css), Some("theme-evening"));
}

#[test]
fn dropping_the_timer_stops_it() {
    let clock = ManualClock::at("2025-12-21T23:00:00+01:00");
    let css = Arc::new(Mutex::new(CssVariables::default()));

    let timer = ThemeTimer::start_with_interval(
        ThemeConfig::default(),
        clock.clone(),
        css.clone(),
        Duration::from_millis(10),
    );
    assert_eq!(class_of(&css), Some("theme-evening"));
    drop(timer);

    clock.set("2025-12-21T12:00:00+01:00");
    thread::sleep(Duration::from_millis(60));
    assert_eq!(class_of(&css), Some("theme-evening"));
    assert!(css.lock().unwrap().to_root_rule().starts_with(":root {"));
}
