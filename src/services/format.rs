//! Locale-style number formatting for matrix cells
//!
//! Values are rendered with two decimals and a comma as decimal separator
//! (`-3.4` → `"-3,40"`). No thousands separator is emitted.

use crate::error::{AppError, Result};
use crate::models::FormattedCell;

/// Format a return value for display
pub fn format_value(value: f64) -> String {
    format!("{:.2}", value).replace('.', ",")
}

/// Format a return value into an immutable matrix cell
pub fn format_cell(value: f64) -> FormattedCell {
    FormattedCell::new(format_value(value), value)
}

/// Parse a formatted cell back into a number
pub fn parse_value(text: &str) -> Result<f64> {
    let trimmed = text.trim();
    trimmed
        .replace(',', ".")
        .parse::<f64>()
        .map_err(|_| AppError::Parse(format!("'{}' is not a formatted number", trimmed)))
}
