//! Periodic theme refresh and the surfaces it writes to

use super::{compute_theme, ThemeConfig, ThemeLabel, ThemeState};
use chrono::{DateTime, FixedOffset, Local};
use std::collections::BTreeMap;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub const THEME_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

pub const CSS_BACKGROUND: &str = "--background";
pub const CSS_TEXT: &str = "--text";

/// Source of "now" for the theme timer
pub trait Clock: Send + 'static {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Wall clock in the machine's local zone
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Something a computed theme gets written to
pub trait ThemeTarget: Send + 'static {
    fn apply(&mut self, state: &ThemeState);
}

/// Root-level CSS custom properties plus the theme class
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CssVariables {
    pub properties: BTreeMap<String, String>,
    pub class: Option<&'static str>,
}

impl CssVariables {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    pub fn set_property(&mut self, name: &str, value: String) {
        self.properties.insert(name.to_string(), value);
    }

    /// Render as a `:root` rule, e.g. for injecting into an embedded web view
    pub fn to_root_rule(&self) -> String {
        let mut rule = String::from(":root {\n");
        for (name, value) in &self.properties {
            rule.push_str(&format!("  {}: {};\n", name, value));
        }
        rule.push('}');
        rule
    }
}

impl ThemeTarget for CssVariables {
    fn apply(&mut self, state: &ThemeState) {
        self.set_property(CSS_BACKGROUND, state.background_hex());
        self.set_property(CSS_TEXT, state.text_hex());
        self.class = Some(state.label.css_class());
    }
}

impl<T: ThemeTarget> ThemeTarget for std::sync::Arc<std::sync::Mutex<T>> {
    fn apply(&mut self, state: &ThemeState) {
        let mut guard = self.lock().unwrap_or_else(|e| e.into_inner());
        guard.apply(state);
    }
}

/// Recomputes the theme on a fixed interval until stopped or dropped.
pub struct ThemeTimer {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ThemeTimer {
    pub fn start<C: Clock, T: ThemeTarget>(config: ThemeConfig, clock: C, target: T) -> Self {
        Self::start_with_interval(config, clock, target, THEME_REFRESH_INTERVAL)
    }

    /// The first computation happens before this returns.
    pub fn start_with_interval<C: Clock, T: ThemeTarget>(
        config: ThemeConfig,
        clock: C,
        mut target: T,
        interval: Duration,
    ) -> Self {
        let mut last_label = refresh(&config, &clock, &mut target, None);

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name("theme-timer".to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        last_label = refresh(&config, &clock, &mut target, Some(last_label));
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            });

        let handle = match handle {
            Ok(h) => Some(h),
            Err(e) => {
                tracing::error!(error = %e, "failed to spawn theme timer, theme stays static");
                None
            }
        };

        Self {
            stop_tx: Some(stop_tx),
            handle,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ThemeTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn refresh<C: Clock, T: ThemeTarget>(
    config: &ThemeConfig,
    clock: &C,
    target: &mut T,
    previous: Option<ThemeLabel>,
) -> ThemeLabel {
    let state = compute_theme(&clock.now(), config);
    target.apply(&state);
    if previous != Some(state.label) {
        tracing::info!(
            theme = state.label.label(),
            t = state.t,
            background = %state.background_hex(),
            text = %state.text_hex(),
            "theme switched"
        );
    }
    state.label
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::Rgb;

    #[test]
    fn css_variables_receive_hex_and_class() {
        let mut css = CssVariables::default();
        css.apply(&ThemeState {
            t: 0.7,
            background: Rgb(0xfb, 0xed, 0xc4),
            text: Rgb(0x34, 0x28, 0x0a),
            label: ThemeLabel::Evening,
        });
        assert_eq!(css.get(CSS_BACKGROUND), Some("#fbedc4"));
        assert_eq!(css.get(CSS_TEXT), Some("#34280a"));
        assert_eq!(css.class, Some("theme-evening"));
        assert_eq!(
            css.to_root_rule(),
            ":root {\n  --background: #fbedc4;\n  --text: #34280a;\n}"
        );
    }
}
