//! Diverging red/white/green scale for return cells
//!
//! Positive returns fade from white to green, negative returns from white to red.
//! Full saturation is reached at ±100%; channels never leave `0..=255`.

use crate::constants::WHITE_TEXT_THRESHOLD;
use crate::error::Result;
use crate::services::format::parse_value;
use serde::Serialize;
use std::fmt;

/// Cell background
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Background {
    White,
    Rgb { r: u8, g: u8, b: u8 },
}

impl fmt::Display for Background {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Background::White => f.write_str("white"),
            Background::Rgb { r, g, b } => write!(f, "rgba({}, {}, {}, 1)", r, g, b),
        }
    }
}

/// Cell text color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextColor {
    Black,
    White,
}

impl fmt::Display for TextColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextColor::Black => f.write_str("black"),
            TextColor::White => f.write_str("white"),
        }
    }
}

/// Background and text color for one cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CellStyle {
    pub background: Background,
    pub text: TextColor,
}

impl CellStyle {
    /// Style for a return expressed in percent
    pub fn for_value(value: f64) -> Self {
        let background = if value.is_nan() || value == 0.0 {
            Background::White
        } else {
            let ratio = (value / 100.0).clamp(-1.0, 1.0);
            if ratio > 0.0 {
                let fade = channel(1.0 - ratio);
                Background::Rgb { r: fade, g: 255, b: fade }
            } else {
                let fade = channel(1.0 + ratio);
                Background::Rgb { r: 255, g: fade, b: fade }
            }
        };

        let text = if value >= WHITE_TEXT_THRESHOLD {
            TextColor::White
        } else {
            TextColor::Black
        };

        Self { background, text }
    }

    /// Inline CSS declaration for an HTML cell
    pub fn css(&self) -> String {
        format!("background-color: {}; color: {}", self.background, self.text)
    }
}

/// Style a formatted cell (`"-3,40"`) by parsing it back to a number
pub fn color_map(cell: &str) -> Result<CellStyle> {
    parse_value(cell).map(CellStyle::for_value)
}

/// Scale a fraction to a color channel, truncating toward zero
fn channel(fraction: f64) -> u8 {
    // `as` saturates, the clamp keeps intent explicit
    (255.0 * fraction).clamp(0.0, 255.0) as u8
}
