//! Timestamp parsing and formatting utilities.
//!
//! Supports `HH:MM:SS`, `MM:SS` and `SS`, each with optional fractional
//! seconds, and formats offsets as `HH:MM:SS.mmm` for logs and reports.

use thiserror::Error;

/// Parse a timestamp string to total seconds.
///
/// Supports formats:
/// - `HH:MM:SS` or `HH:MM:SS.mmm`
/// - `MM:SS` or `MM:SS.mmm`
/// - `SS` or `SS.mmm`
///
/// # Examples
/// ```
/// use tailtrim_models::timestamp::parse_timestamp;
/// assert_eq!(parse_timestamp("01:30:00").unwrap(), 5400.0);
/// assert_eq!(parse_timestamp("05:30").unwrap(), 330.0);
/// assert_eq!(parse_timestamp("90").unwrap(), 90.0);
/// ```
pub fn parse_timestamp(ts: &str) -> Result<f64, TimestampError> {
    let ts = ts.trim();
    if ts.is_empty() {
        return Err(TimestampError::Empty);
    }

    let parts: Vec<&str> = ts.split(':').collect();
    if parts.len() > 3 {
        return Err(TimestampError::InvalidFormat(ts.to_string()));
    }

    const COMPONENTS: [&str; 3] = ["hours", "minutes", "seconds"];
    let names = &COMPONENTS[COMPONENTS.len() - parts.len()..];

    let mut total = 0.0;
    for (part, name) in parts.iter().zip(names) {
        let value: f64 = part
            .parse()
            .map_err(|_| TimestampError::InvalidValue(name, part.to_string()))?;
        if !value.is_finite() {
            return Err(TimestampError::InvalidValue(name, part.to_string()));
        }
        if value < 0.0 {
            return Err(TimestampError::Negative);
        }
        total = total * 60.0 + value;
    }

    Ok(total)
}

/// Format seconds as `HH:MM:SS.mmm`.
///
/// Negative inputs are formatted with a leading `-`.
pub fn format_hms(seconds: f64) -> String {
    if !seconds.is_finite() {
        return "#N/A".to_string();
    }

    let sign = if seconds < 0.0 { "-" } else { "" };
    let total_ms = (seconds.abs() * 1000.0).floor() as u64;
    let hours = total_ms / 3_600_000;
    let mins = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let ms = total_ms % 1000;

    format!("{}{:02}:{:02}:{:02}.{:03}", sign, hours, mins, secs, ms)
}

/// Timestamp parsing error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimestampError {
    #[error("Timestamp cannot be empty")]
    Empty,

    #[error("Timestamp cannot be negative")]
    Negative,

    #[error("Invalid {0} value: {1}")]
    InvalidValue(&'static str, String),

    #[error("Invalid timestamp format '{0}'. Use HH:MM:SS, MM:SS or SS (fractions allowed)")]
    InvalidFormat(String),
}
