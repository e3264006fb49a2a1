//! Home Info Center
//!
//! Family dashboard: upcoming calendar entries, the phone's call list and
//! the weather, tinted towards a warm evening palette as the sun goes down.

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // Hide console on Windows

use chrono::{Local, NaiveDate};
use eframe::egui;
use infocenter::agenda::{agenda_from_value, AgendaDay};
use infocenter::calls::{calls_from_value, CallDay};
use infocenter::dates::formatted_date;
use infocenter::query::{HttpFetcher, JsonFetcher, QueryKey, QuerySnapshot, VersionedQuery};
use infocenter::settings::{interval_label, POLL_PRESETS};
use infocenter::theme::visuals::{apply_palette, Palette};
use infocenter::theme::{
    compute_theme, CssVariables, SystemClock, ThemeConfig, ThemeState, ThemeTarget, ThemeTimer,
};
use infocenter::weather::{weather_from_value, WeatherReport};
use infocenter::{AppConfig, AppContext, ClientSettings, Resource};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::thread;
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    tracing::info!(version = VERSION, "starting Home Info Center");

    let settings = ClientSettings::load();
    let fetcher: Arc<dyn JsonFetcher> = match HttpFetcher::new() {
        Ok(f) => Arc::new(f),
        Err(e) => {
            tracing::error!(error = %e, "cannot start without an HTTP client");
            return Ok(());
        }
    };
    let context = AppContext::load(settings, fetcher);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([640.0, 760.0])
            .with_min_inner_size([420.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Home Info Center",
        options,
        Box::new(|cc| Ok(Box::new(App::new(cc, context)))),
    )
}

/// Theme output for the window: shared state read every frame, plus the CSS
/// variables for embedded web content
struct WindowTheme {
    state: Arc<Mutex<ThemeState>>,
    css: CssVariables,
    ctx: egui::Context,
}

impl ThemeTarget for WindowTheme {
    fn apply(&mut self, state: &ThemeState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = *state;
        self.css.apply(state);
        tracing::trace!(css = %self.css.to_root_rule(), "theme applied");
        self.ctx.request_repaint();
    }
}

struct App {
    context: AppContext,
    theme_state: Arc<Mutex<ThemeState>>,
    theme_timer: Option<ThemeTimer>,
    queries: BTreeMap<Resource, VersionedQuery>,
    // Written by the config reload thread after a server change
    pending_config: Arc<Mutex<Option<AppConfig>>>,
    // Settings popup edits a copy, applied on close
    draft: ClientSettings,
    show_settings: bool,
}

impl App {
    fn new(cc: &eframe::CreationContext<'_>, context: AppContext) -> Self {
        let theme_config = context.theme_config();
        let ctx = cc.egui_ctx.clone();
        context.client.set_listener(move || ctx.request_repaint());

        let mut app = Self {
            draft: context.settings.clone(),
            theme_state: Arc::new(Mutex::new(compute_theme(&Local::now(), &theme_config))),
            theme_timer: None,
            queries: BTreeMap::new(),
            pending_config: Arc::new(Mutex::new(None)),
            show_settings: false,
            context,
        };
        app.start_theme(&cc.egui_ctx, theme_config);
        app.sync_queries();
        app
    }

    fn start_theme(&mut self, ctx: &egui::Context, config: ThemeConfig) {
        // Old timer joins before the new one writes
        self.theme_timer = None;
        let target = WindowTheme {
            state: Arc::clone(&self.theme_state),
            css: CssVariables::default(),
            ctx: ctx.clone(),
        };
        self.theme_timer = Some(ThemeTimer::start(config, SystemClock, target));
    }

    /// Spawn pollers for newly enabled resources, retire disabled ones
    fn sync_queries(&mut self) {
        let enabled = self.context.settings.resources.clone();

        let disabled: Vec<Resource> = self
            .queries
            .keys()
            .filter(|r| !enabled.contains(r))
            .copied()
            .collect();
        for resource in disabled {
            if let Some(query) = self.queries.remove(&resource) {
                self.retire(query);
            }
        }

        for resource in enabled {
            if self.queries.contains_key(&resource) {
                continue;
            }
            let query = VersionedQuery::spawn(
                resource.query_options(&self.context.settings),
                self.context.client.clone(),
                Arc::clone(&self.context.fetcher),
            );
            self.queries.insert(resource, query);
        }
    }

    fn restart_queries(&mut self) {
        for query in std::mem::take(&mut self.queries).into_values() {
            self.retire(query);
        }
        self.sync_queries();
    }

    /// Stop without waiting and forget the cached state, so a restarted
    /// poller starts from an empty entry
    fn retire(&self, query: VersionedQuery) {
        query.stop();
        let key = query.key();
        self.context.client.remove(key);
        self.context.client.remove(&QueryKey::version(&key.name));
    }

    fn refresh_all(&self) {
        for query in self.queries.values() {
            query.refetch();
        }
    }

    fn reload_config(&self, ctx: &egui::Context) {
        let slot = Arc::clone(&self.pending_config);
        let fetcher = Arc::clone(&self.context.fetcher);
        let url = self.context.settings.config_url();
        let ctx = ctx.clone();

        thread::spawn(move || {
            let config = AppConfig::fetch(fetcher.as_ref(), &url);
            *slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(config);
            ctx.request_repaint();
        });
    }

    fn apply_settings(&mut self, ctx: &egui::Context) {
        let next = self.draft.clone().sanitized();
        self.draft = next.clone();
        let previous = std::mem::replace(&mut self.context.settings, next);
        if previous == self.context.settings {
            return;
        }
        if let Err(e) = self.context.settings.save() {
            tracing::error!(error = %e, "settings not saved");
        }

        let current = &self.context.settings;
        let server_changed = previous.server_url != current.server_url;
        let intensity_changed = previous.evening_intensity != current.evening_intensity;
        let poll_changed = previous.version_poll_secs != current.version_poll_secs;

        if server_changed {
            // Theme restarts once the new config arrives
            self.reload_config(ctx);
        } else if intensity_changed {
            self.start_theme(ctx, self.context.theme_config());
        }

        if server_changed || poll_changed {
            self.restart_queries();
        } else {
            self.sync_queries();
        }
    }

    fn status_line(&self) -> String {
        if self.queries.is_empty() {
            return "SYNC: STOPPED".to_string();
        }
        let snapshots: Vec<QuerySnapshot> = self.queries.values().map(|q| q.snapshot()).collect();
        let poll = format!("POLL: {}", self.context.settings.poll_label());

        if let Some(err) = snapshots.iter().find_map(|s| s.error.as_deref()) {
            format!("SYNC: ERROR :: {} :: {}", err, poll)
        } else if snapshots.iter().any(|s| s.is_loading) {
            format!("SYNC: LOADING... :: {}", poll)
        } else if let Some(at) = snapshots.iter().filter_map(|s| s.updated_at).max() {
            format!("SYNC: OK :: {} :: {}", at.format("%H:%M:%S"), poll)
        } else {
            format!("SYNC: WAITING :: {}", poll)
        }
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let pending = self.pending_config.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(config) = pending {
            self.context.config = config;
            self.start_theme(ctx, self.context.theme_config());
        }

        let state = *self.theme_state.lock().unwrap_or_else(|e| e.into_inner());
        let palette = Palette::from_state(&state);
        apply_palette(ctx, &palette);

        // Header
        egui::TopBottomPanel::top("header")
            .frame(egui::Frame::none().fill(palette.header))
            .show(ctx, |ui| {
                ui.add_space(12.0);
                ui.horizontal(|ui| {
                    ui.add_space(20.0);

                    let (rect, _) = ui.allocate_exact_size(egui::vec2(10.0, 10.0), egui::Sense::hover());
                    ui.painter().rect_filled(rect, 0.0, palette.accent);

                    ui.add_space(10.0);
                    ui.label(
                        egui::RichText::new(formatted_date(&Local::now(), false))
                            .size(16.0)
                            .strong()
                            .color(palette.text),
                    );

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.add_space(20.0);
                        if Self::header_button(ui, &palette, "SETTINGS", self.show_settings).clicked() {
                            if self.show_settings {
                                self.apply_settings(ctx);
                            } else {
                                self.draft = self.context.settings.clone();
                            }
                            self.show_settings = !self.show_settings;
                        }
                        ui.add_space(6.0);
                        if Self::header_button(ui, &palette, "REFRESH", false).clicked() {
                            self.refresh_all();
                        }
                    });
                });
                ui.add_space(12.0);
            });

        // Footer
        egui::TopBottomPanel::bottom("footer")
            .frame(egui::Frame::none().fill(palette.window))
            .show(ctx, |ui| {
                ui.add_space(10.0);
                ui.horizontal(|ui| {
                    ui.add_space(25.0);
                    ui.label(
                        egui::RichText::new(self.status_line())
                            .size(9.0)
                            .family(egui::FontFamily::Monospace)
                            .color(palette.text_dim),
                    );

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.add_space(25.0);
                        ui.label(
                            egui::RichText::new(format!("v{}", VERSION))
                                .size(9.0)
                                .family(egui::FontFamily::Monospace)
                                .color(palette.text_dim),
                        );
                        ui.add_space(15.0);
                        ui.label(
                            egui::RichText::new(format!(
                                "THEME: {} :: {:.2}",
                                state.label.label().to_uppercase(),
                                state.t
                            ))
                            .size(9.0)
                            .family(egui::FontFamily::Monospace)
                            .color(palette.text_dim),
                        );
                    });
                });
                ui.add_space(10.0);
            });

        if self.show_settings {
            self.render_settings(ctx, &palette);
        }

        // Main content
        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(palette.bg).inner_margin(25.0))
            .show(ctx, |ui| {
                let today = Local::now().date_naive();
                let sections: Vec<(Resource, QuerySnapshot)> = self
                    .queries
                    .iter()
                    .map(|(resource, query)| (*resource, query.snapshot()))
                    .collect();

                egui::ScrollArea::vertical()
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        if sections.is_empty() {
                            Self::render_placeholder(ui, &palette, "Keine Bereiche aktiviert");
                        }
                        for (resource, snapshot) in &sections {
                            Self::render_resource(ui, &palette, *resource, snapshot, today);
                        }
                    });
            });
    }
}

impl App {
    fn header_button(ui: &mut egui::Ui, palette: &Palette, label: &str, active: bool) -> egui::Response {
        let button = egui::Button::new(
            egui::RichText::new(label)
                .size(9.0)
                .strong()
                .family(egui::FontFamily::Monospace)
                .color(if active { palette.accent } else { palette.text }),
        )
        .fill(palette.panel)
        .stroke(egui::Stroke::new(1.0, palette.border))
        .rounding(0.0)
        .min_size(egui::vec2(70.0, 22.0));
        ui.add(button)
    }

    fn render_settings(&mut self, ctx: &egui::Context, palette: &Palette) {
        egui::Area::new(egui::Id::new("settings_popup"))
            .anchor(egui::Align2::RIGHT_TOP, [-25.0, 55.0])
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                egui::Frame::none()
                    .fill(palette.panel)
                    .stroke(egui::Stroke::new(1.0, palette.border))
                    .rounding(0.0)
                    .shadow(egui::Shadow::NONE)
                    .inner_margin(12.0)
                    .show(ui, |ui| {
                        ui.set_min_width(240.0);
                        let section = |ui: &mut egui::Ui, title: &str| {
                            ui.label(
                                egui::RichText::new(title)
                                    .size(9.0)
                                    .family(egui::FontFamily::Monospace)
                                    .color(palette.text_dim),
                            );
                            ui.add_space(5.0);
                        };
                        let divider = |ui: &mut egui::Ui| {
                            ui.add_space(8.0);
                            ui.add(egui::Separator::default().spacing(1.0));
                            ui.add_space(8.0);
                        };

                        section(ui, "// SERVER");
                        ui.add(egui::TextEdit::singleline(&mut self.draft.server_url).desired_width(220.0));
                        divider(ui);

                        section(ui, "// PANELS");
                        for resource in Resource::ALL {
                            let mut enabled = self.draft.is_enabled(resource);
                            if Self::render_styled_checkbox(ui, &mut enabled, resource.title(), palette) {
                                self.draft.set_enabled(resource, enabled);
                            }
                        }
                        divider(ui);

                        section(ui, "// VERSION POLL");
                        ui.horizontal(|ui| {
                            for secs in POLL_PRESETS {
                                let is_selected = self.draft.version_poll_secs == secs;
                                let btn = egui::Button::new(
                                    egui::RichText::new(interval_label(secs))
                                        .size(9.0)
                                        .family(egui::FontFamily::Monospace)
                                        .color(if is_selected { egui::Color32::WHITE } else { palette.text }),
                                )
                                .fill(if is_selected { palette.accent } else { palette.panel })
                                .stroke(egui::Stroke::new(1.0, palette.border))
                                .rounding(0.0)
                                .min_size(egui::vec2(34.0, 18.0));

                                if ui.add(btn).clicked() {
                                    self.draft.version_poll_secs = secs;
                                }
                            }
                        });
                        divider(ui);

                        section(ui, "// EVENING INTENSITY");
                        ui.add(egui::Slider::new(&mut self.draft.evening_intensity, 0.0..=1.0).step_by(0.05));
                    });
            });
    }

    /// Returns true when toggled
    fn render_styled_checkbox(ui: &mut egui::Ui, value: &mut bool, label: &str, palette: &Palette) -> bool {
        let desired_size = egui::vec2(ui.available_width().min(200.0), 18.0);
        let (rect, response) = ui.allocate_exact_size(desired_size, egui::Sense::click());

        if response.clicked() {
            *value = !*value;
        }

        let box_size = 12.0;
        let box_rect = egui::Rect::from_min_size(
            rect.min + egui::vec2(0.0, (rect.height() - box_size) / 2.0),
            egui::vec2(box_size, box_size),
        );
        let stroke_color = if response.hovered() { palette.accent } else { palette.border };
        ui.painter().rect_filled(box_rect, 0.0, if *value { palette.accent } else { palette.panel });
        ui.painter().rect_stroke(box_rect, 0.0, egui::Stroke::new(1.0, stroke_color));

        ui.painter().text(
            rect.min + egui::vec2(box_size + 8.0, rect.height() / 2.0),
            egui::Align2::LEFT_CENTER,
            label,
            egui::FontId::new(10.0, egui::FontFamily::Monospace),
            if *value { palette.text } else { palette.text_dim },
        );

        response.clicked()
    }

    fn render_resource(
        ui: &mut egui::Ui,
        palette: &Palette,
        resource: Resource,
        snapshot: &QuerySnapshot,
        today: NaiveDate,
    ) {
        ui.label(
            egui::RichText::new(format!("// {}", resource.title()))
                .size(9.0)
                .family(egui::FontFamily::Monospace)
                .color(palette.text_dim),
        );
        ui.add_space(6.0);

        let Some(data) = &snapshot.data else {
            let text = if snapshot.error.is_some() { "Keine Daten verfügbar" } else { "Lade..." };
            Self::render_placeholder(ui, palette, text);
            ui.add_space(16.0);
            return;
        };

        match resource {
            Resource::Events => {
                let agenda = agenda_from_value(data, today);
                if agenda.is_empty() {
                    Self::render_placeholder(ui, palette, "Keine Termine");
                }
                for day in &agenda {
                    Self::render_day(ui, palette, day);
                }
            }
            Resource::Calls => {
                let days = calls_from_value(data, today);
                if days.is_empty() {
                    Self::render_placeholder(ui, palette, "Keine Anrufe");
                }
                for day in &days {
                    Self::render_call_day(ui, palette, day);
                }
            }
            Resource::Weather => {
                let report = weather_from_value(data, today);
                if report.is_empty() {
                    Self::render_placeholder(ui, palette, "Keine Wetterdaten");
                } else {
                    Self::render_weather(ui, palette, &report);
                }
            }
        }
        ui.add_space(16.0);
    }

    fn render_day_label(ui: &mut egui::Ui, palette: &Palette, label: &str) {
        ui.label(egui::RichText::new(label).size(12.0).strong().color(palette.text));
        ui.add_space(4.0);
    }

    /// Panel row with an accent bar, a title line and a dimmed detail line
    fn render_row(ui: &mut egui::Ui, palette: &Palette, title: &str, detail: &str) {
        egui::Frame::none().fill(palette.panel).show(ui, |ui| {
            ui.horizontal(|ui| {
                let (rect, _) = ui.allocate_exact_size(egui::vec2(3.0, 40.0), egui::Sense::hover());
                ui.painter().rect_filled(rect, 0.0, palette.accent);
                ui.add_space(12.0);

                ui.vertical(|ui| {
                    ui.add_space(6.0);
                    ui.label(egui::RichText::new(title).size(12.0).color(palette.text));
                    ui.add(
                        egui::Label::new(
                            egui::RichText::new(detail)
                                .size(9.0)
                                .family(egui::FontFamily::Monospace)
                                .color(palette.text_dim),
                        )
                        .wrap(),
                    );
                    ui.add_space(6.0);
                });
            });
        });
        ui.add_space(5.0);
    }

    fn render_day(ui: &mut egui::Ui, palette: &Palette, day: &AgendaDay) {
        Self::render_day_label(ui, palette, &day.label);
        for event in &day.events {
            let detail = format!("{} :: {}", event.time_range(), event.calendar);
            Self::render_row(ui, palette, &event.title, &detail);
        }
        ui.add_space(10.0);
    }

    fn render_call_day(ui: &mut egui::Ui, palette: &Palette, day: &CallDay) {
        Self::render_day_label(ui, palette, &day.label);
        for call in &day.calls {
            let mut detail = format!("{} :: {}", call.time(), call.kind().tag());
            if let Some(talk) = call.talk_time() {
                detail.push_str(&format!(" :: {}", talk));
            }
            Self::render_row(ui, palette, call.display_name(), &detail);
        }
        ui.add_space(10.0);
    }

    fn render_weather(ui: &mut egui::Ui, palette: &Palette, report: &WeatherReport) {
        for day in &report.hourly {
            Self::render_day_label(ui, palette, &day.label);
            ui.horizontal_wrapped(|ui| {
                for hour in &day.hours {
                    egui::Frame::none()
                        .fill(palette.panel)
                        .inner_margin(egui::Margin::symmetric(10.0, 6.0))
                        .show(ui, |ui| {
                            ui.vertical(|ui| {
                                ui.label(
                                    egui::RichText::new(&hour.time)
                                        .size(9.0)
                                        .family(egui::FontFamily::Monospace)
                                        .color(palette.text_dim),
                                );
                                ui.label(
                                    egui::RichText::new(hour.temperature_label())
                                        .size(14.0)
                                        .strong()
                                        .color(palette.text),
                                );
                                ui.label(egui::RichText::new(&hour.description).size(9.0).color(palette.text_dim));
                            });
                        });
                }
            });
            ui.add_space(10.0);
        }

        for (label, day) in &report.daily {
            let detail = format!("{} :: {}", day.range_label(), day.description);
            Self::render_row(ui, palette, label, &detail);
        }
    }

    fn render_placeholder(ui: &mut egui::Ui, palette: &Palette, text: &str) {
        egui::Frame::none()
            .fill(palette.panel)
            .inner_margin(egui::Margin::symmetric(15.0, 10.0))
            .show(ui, |ui| {
                ui.label(
                    egui::RichText::new(text)
                        .size(10.0)
                        .family(egui::FontFamily::Monospace)
                        .color(palette.text_dim),
                );
            });
    }
}
