//! Hex color handling for the day/evening palette

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorError {
    #[error("invalid hex color {0:?}: expected 3, 6 or 8 hex digits")]
    InvalidLength(String),

    #[error("invalid hex color {0:?}: non-hex digit")]
    InvalidDigit(String),
}

/// RGB triplet, always valid 0-255 channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Parse `#RGB`, `#RRGGBB` or `#RRGGBBAA` (alpha dropped). The `#` is optional.
    pub fn from_hex(hex: &str) -> Result<Self, ColorError> {
        let normalized = normalize_hex(hex)?;
        let num = u32::from_str_radix(&normalized[1..], 16)
            .map_err(|_| ColorError::InvalidDigit(hex.to_string()))?;
        Ok(Rgb(
            ((num >> 16) & 0xff) as u8,
            ((num >> 8) & 0xff) as u8,
            (num & 0xff) as u8,
        ))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }

    /// Per-channel linear interpolation, rounded to the nearest integer.
    pub fn lerp(a: Rgb, b: Rgb, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let channel = |x: u8, y: u8| -> u8 {
            let v = f64::from(x) + (f64::from(y) - f64::from(x)) * t;
            v.round().clamp(0.0, 255.0) as u8
        };
        Rgb(channel(a.0, b.0), channel(a.1, b.1), channel(a.2, b.2))
    }

    pub fn to_color32(self) -> egui::Color32 {
        egui::Color32::from_rgb(self.0, self.1, self.2)
    }
}

/// Normalize a hex color to `#rrggbb`.
///
/// 8-digit values lose their alpha channel, 3-digit shorthand is expanded.
pub fn normalize_hex(hex: &str) -> Result<String, ColorError> {
    let digits = hex.trim().trim_start_matches('#');
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ColorError::InvalidDigit(hex.to_string()));
    }
    let six = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect::<String>(),
        6 => digits.to_string(),
        8 => digits[..6].to_string(),
        _ => return Err(ColorError::InvalidLength(hex.to_string())),
    };
    Ok(format!("#{}", six.to_ascii_lowercase()))
}
