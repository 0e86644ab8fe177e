use crate::error::{AflockError, Result};
use std::time::Duration;

/// Parse a duration string like "500ms", "30s", "5m", "2h", "7d"
/// Defaults to seconds if no unit specified
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();

    if s.is_empty() {
        return Err(AflockError::InvalidDuration {
            input: s.to_string(),
            message: "empty string".to_string(),
        });
    }

    let (num_str, unit) = if let Some(stripped) = s.strip_suffix("ms") {
        (stripped, "ms")
    } else if let Some(stripped) = s.strip_suffix('s') {
        (stripped, "s")
    } else if let Some(stripped) = s.strip_suffix('m') {
        (stripped, "m")
    } else if let Some(stripped) = s.strip_suffix('h') {
        (stripped, "h")
    } else if let Some(stripped) = s.strip_suffix('d') {
        (stripped, "d")
    } else {
        // No unit, assume seconds
        (s, "s")
    };

    let value: u64 = num_str.parse().map_err(|_| AflockError::InvalidDuration {
        input: s.to_string(),
        message: "expected format: NUMBER[ms|s|m|h|d] (e.g., '500ms', '30s', '5m')"
            .to_string(),
    })?;

    let seconds_per_unit: u64 = match unit {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 60 * 60 * 24,
        _ => unreachable!(),
    };

    let seconds = value
        .checked_mul(seconds_per_unit)
        .ok_or_else(|| AflockError::InvalidDuration {
            input: s.to_string(),
            message: "value is too large".to_string(),
        })?;

    Ok(Duration::from_secs(seconds))
}
