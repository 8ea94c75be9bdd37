//! ISO-8601 duration parsing for video lengths (`PT1H2M3S`, `P1DT2H`, `P0D`)

use crate::{Error, Result};

/// Parse an ISO-8601 duration into minutes
///
/// Supports weeks, days, hours, minutes and seconds with optional fractional
/// values. Calendar units (years, months) have no fixed length and are
/// rejected.
pub fn parse_iso8601_minutes(input: &str) -> Result<f64> {
    parse_iso8601_seconds(input).map(|secs| secs / 60.0)
}

/// Parse an ISO-8601 duration into seconds
pub fn parse_iso8601_seconds(input: &str) -> Result<f64> {
    let invalid = || Error::InvalidInput(format!("Invalid ISO-8601 duration: '{}'", input));

    let body = input.trim().strip_prefix('P').ok_or_else(invalid)?;
    if body.is_empty() {
        return Err(invalid());
    }

    let mut seconds = 0.0;
    let mut in_time = false;
    let mut number = String::new();
    let mut saw_component = false;

    for c in body.chars() {
        match c {
            'T' => {
                if in_time || !number.is_empty() {
                    return Err(invalid());
                }
                in_time = true;
            }
            '0'..='9' | '.' | ',' => number.push(if c == ',' { '.' } else { c }),
            unit => {
                let value: f64 = number.parse().map_err(|_| invalid())?;
                number.clear();
                let factor = match (in_time, unit) {
                    (false, 'W') => 7.0 * 86_400.0,
                    (false, 'D') => 86_400.0,
                    (true, 'H') => 3_600.0,
                    (true, 'M') => 60.0,
                    (true, 'S') => 1.0,
                    _ => return Err(invalid()),
                };
                seconds += value * factor;
                saw_component = true;
            }
        }
    }

    if !number.is_empty() || !saw_component {
        return Err(invalid());
    }
    Ok(seconds)
}
