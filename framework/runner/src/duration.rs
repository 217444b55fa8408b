use std::time::Duration;

use anyhow::{bail, Context};

/// Parse a duration string such as `500ms`, `60s`, `5m`, `1h30m` or `1.5s`.
///
/// A bare whole number is read as seconds. Durations are truncated to millisecond precision.
pub fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        bail!("Empty duration");
    }

    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let is_number_char = |c: char| c.is_ascii_digit() || c == '.';

    let mut total_ms = 0.0;
    let mut rest = s;
    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !is_number_char(c))
            .with_context(|| format!("Missing unit in duration `{s}`"))?;
        if number_end == 0 {
            bail!("Invalid duration `{s}`, expected a number before each unit");
        }

        let (number, tail) = rest.split_at(number_end);
        let number = number
            .parse::<f64>()
            .with_context(|| format!("Invalid number `{number}` in duration `{s}`"))?;

        let unit_end = tail.find(is_number_char).unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_end);
        let unit_ms = match unit {
            "ms" => 1.0,
            "s" => 1_000.0,
            "m" => 60_000.0,
            "h" => 3_600_000.0,
            other => bail!("Unknown unit `{other}` in duration `{s}`, expected one of ms, s, m, h"),
        };

        total_ms += number * unit_ms;
        rest = tail;
    }

    Ok(Duration::from_millis(total_ms.round() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_units() {
        assert_eq!(Duration::from_millis(500), parse_duration("500ms").unwrap());
        assert_eq!(Duration::from_secs(60), parse_duration("60s").unwrap());
        assert_eq!(Duration::from_secs(300), parse_duration("5m").unwrap());
        assert_eq!(Duration::from_secs(7200), parse_duration("2h").unwrap());
    }

    #[test]
    fn bare_number_is_seconds() {
        assert_eq!(Duration::from_secs(45), parse_duration("45").unwrap());
    }

    #[test]
    fn compound_and_fractional() {
        assert_eq!(Duration::from_secs(5400), parse_duration("1h30m").unwrap());
        assert_eq!(Duration::from_millis(90_250), parse_duration("1m30s250ms").unwrap());
        assert_eq!(Duration::from_millis(1500), parse_duration(" 1.5s ").unwrap());
    }

    #[test]
    fn invalid_durations() {
        for input in ["", "s", "10x", "1.2.3s", "-5s", "10 s"] {
            assert!(parse_duration(input).is_err(), "Expected `{input}` to be rejected");
        }
    }
}
