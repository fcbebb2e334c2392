//! Time display formatting and parsing
//!
//! Centralizes the display contracts for countdown values so the same
//! strings show up everywhere a timer is rendered.

use crate::timer::{TimeValue, MAX_HOURS};

/// Format a value compactly according to its magnitude
///
/// `HH:MM:SS` while hours remain, `MM:SS` while minutes remain, bare
/// seconds digits below one minute.
pub fn format_compact(value: TimeValue) -> String {
    if value.hours() > 0 {
        format!(
            "{:02}:{:02}:{:02}",
            value.hours(),
            value.minutes(),
            value.seconds()
        )
    } else if value.minutes() > 0 {
        format!("{:02}:{:02}", value.minutes(), value.seconds())
    } else {
        format!("{}", value.seconds())
    }
}

/// Format a value as fixed-width `HH:MM:SS`
pub fn format_full(value: TimeValue) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        value.hours(),
        value.minutes(),
        value.seconds()
    )
}

/// Format a total-seconds count through the compact formatter
pub fn format_seconds(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format_compact(TimeValue::from_parts(
        hours.min(MAX_HOURS as u64) as u8,
        minutes as u8,
        seconds as u8,
    ))
}

/// Parse a strict `HH:MM:SS` string into a TimeValue
///
/// Each field must be exactly two digits. Components are clamped into
/// their legal ranges (99/59/59) rather than carried, matching how
/// dialog input was sanitized upstream.
pub fn parse_time(text: &str) -> Option<TimeValue> {
    let parts: Vec<&str> = text.split(':').collect();
    if parts.len() != 3 {
        return None;
    }
    for part in &parts {
        if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
    }

    let hours: u8 = parts[0].parse().ok()?;
    let minutes: u8 = parts[1].parse().ok()?;
    let seconds: u8 = parts[2].parse().ok()?;

    Some(TimeValue::from_parts(
        hours.min(MAX_HOURS),
        minutes.min(59),
        seconds.min(59),
    ))
}
