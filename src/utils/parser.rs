//! Argument parsing helpers shared by command handlers.

use std::time::Duration;

/// Longest mute a single command may set.
const MAX_MUTE: Duration = Duration::from_secs(365 * 86_400);

/// Format a duration with its two most significant units.
pub fn format_duration_full(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        let mins = secs / 60;
        let rest = secs % 60;
        if rest > 0 {
            format!("{}m {}s", mins, rest)
        } else {
            format!("{}m", mins)
        }
    } else if secs < 86400 {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        if mins > 0 {
            format!("{}h {}m", hours, mins)
        } else {
            format!("{}h", hours)
        }
    } else {
        let days = secs / 86400;
        let hours = (secs % 86400) / 3600;
        if hours > 0 {
            format!("{}d {}h", days, hours)
        } else {
            format!("{}d", days)
        }
    }
}

/// Parse duration string (e.g., "1h", "30m", "1d").
///
/// Supported units:
/// - m: minutes
/// - h: hours
/// - d: days
/// - w: weeks
pub fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim();
    let unit = input.chars().last()?;
    let digits = &input[..input.len() - unit.len_utf8()];
    let amount: u64 = digits.parse().ok()?;

    let seconds = match unit {
        'm' => amount.checked_mul(60)?,
        'h' => amount.checked_mul(3600)?,
        'd' => amount.checked_mul(86400)?,
        'w' => amount.checked_mul(604800)?,
        _ => return None,
    };

    Some(Duration::from_secs(seconds))
}

/// Mute length: a bare positive integer means minutes, otherwise a unit suffix.
pub fn parse_mute_duration(input: &str) -> Option<Duration> {
    let input = input.trim();
    let duration = match input.parse::<u64>() {
        Ok(minutes) => Duration::from_secs(minutes.checked_mul(60)?),
        Err(_) => parse_duration(input)?,
    };
    (!duration.is_zero() && duration <= MAX_MUTE).then_some(duration)
}

/// `on`/`off` style switch arguments.
pub fn parse_toggle(input: &str) -> Option<bool> {
    match input.trim().to_lowercase().as_str() {
        "on" | "enable" | "enabled" | "true" | "yes" | "1" => Some(true),
        "off" | "disable" | "disabled" | "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("30m"), Some(Duration::from_secs(1800)));
        assert_eq!(parse_duration("1h"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_duration("1d"), Some(Duration::from_secs(86400)));
        assert_eq!(parse_duration("1w"), Some(Duration::from_secs(604800)));
        assert_eq!(parse_duration("invalid"), None);
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("5é"), None);
    }

    #[test]
    fn test_parse_mute_duration() {
        assert_eq!(parse_mute_duration("10"), Some(Duration::from_secs(600)));
        assert_eq!(parse_mute_duration("2h"), Some(Duration::from_secs(7200)));
        assert_eq!(parse_mute_duration("0"), None);
        assert_eq!(parse_mute_duration("-5"), None);
        assert_eq!(parse_mute_duration("abc"), None);
        assert_eq!(parse_mute_duration("99999999"), None);
    }

    #[test]
    fn test_format_duration_full() {
        assert_eq!(format_duration_full(45), "45s");
        assert_eq!(format_duration_full(599), "9m 59s");
        assert_eq!(format_duration_full(3660), "1h 1m");
        assert_eq!(format_duration_full(90000), "1d 1h");
    }

    #[test]
    fn test_parse_toggle() {
        assert_eq!(parse_toggle("ON"), Some(true));
        assert_eq!(parse_toggle("off"), Some(false));
        assert_eq!(parse_toggle("maybe"), None);
    }
}
