//! Dashboard palette for egui, derived from the current theme state

use super::{Rgb, ThemeState};
use egui::Color32;

const DAY_ACCENT: Rgb = Rgb(0x00, 0xbc, 0xd4);
const EVENING_ACCENT: Rgb = Rgb(0xff, 0x98, 0x00);
const WHITE: Rgb = Rgb(0xff, 0xff, 0xff);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Palette {
    pub bg: Color32,
    pub window: Color32,
    pub header: Color32,
    pub panel: Color32,
    pub text: Color32,
    pub text_dim: Color32,
    pub border: Color32,
    pub accent: Color32,
}

impl Palette {
    /// Surfaces are shades between the background and text color, and the
    /// accent slides from cyan to amber with the same blend factor, so the
    /// whole UI follows the evening fade.
    pub fn from_state(state: &ThemeState) -> Self {
        let bg = state.background;
        let text = state.text;

        Self {
            bg: bg.to_color32(),
            window: Rgb::lerp(bg, WHITE, 0.35).to_color32(),
            header: Rgb::lerp(bg, WHITE, 0.6).to_color32(),
            panel: Rgb::lerp(bg, WHITE, 0.75).to_color32(),
            text: text.to_color32(),
            text_dim: Rgb::lerp(text, bg, 0.5).to_color32(),
            border: Rgb::lerp(text, bg, 0.7).to_color32(),
            accent: Rgb::lerp(DAY_ACCENT, EVENING_ACCENT, state.t).to_color32(),
        }
    }

    pub fn visuals(&self) -> egui::Visuals {
        let mut visuals = egui::Visuals::light();

        visuals.panel_fill = self.window;
        visuals.window_fill = self.panel;
        visuals.window_stroke.color = self.border;
        visuals.extreme_bg_color = self.bg;
        visuals.faint_bg_color = self.header;
        visuals.override_text_color = Some(self.text);
        visuals.hyperlink_color = self.accent;

        let widgets = &mut visuals.widgets;
        for (state, fg) in [
            (&mut widgets.noninteractive, self.text),
            (&mut widgets.inactive, self.text_dim),
            (&mut widgets.hovered, self.text),
            (&mut widgets.active, self.text),
        ] {
            state.fg_stroke.color = fg;
            state.bg_stroke.color = self.border;
            state.bg_fill = self.panel;
            state.weak_bg_fill = self.panel;
        }
        widgets.hovered.bg_stroke.color = self.accent;

        // Selected text and slider rails carry the accent, so they warm up too
        visuals.selection.bg_fill = self.accent.gamma_multiply(0.6);
        visuals.selection.stroke.color = self.accent;

        visuals
    }
}

pub fn apply_palette(ctx: &egui::Context, palette: &Palette) {
    ctx.set_visuals(palette.visuals());
}
