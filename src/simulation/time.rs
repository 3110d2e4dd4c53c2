//! Publisher time expressions
//!
//! `*` is now; `*-5M` is five minutes ago (units `S`, `M`, `H`, `D`, also
//! `*+n` for the future). Anything else must be an absolute timestamp, as
//! RFC 3339 or `YYYY-MM-DD HH:MM:SS[.fff]` in UTC.

use crate::error::{GridLinesError, Result};
use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};

pub fn parse_time_expression(expression: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let trimmed = expression.trim();

    if let Some(relative) = trimmed.strip_prefix('*') {
        let relative = relative.trim();
        if relative.is_empty() {
            return Ok(now);
        }
        let offset = parse_offset(expression, relative)?;
        return now
            .checked_add_signed(offset)
            .ok_or_else(|| invalid(expression));
    }

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(timestamp.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| invalid(expression))
}

fn parse_offset(expression: &str, relative: &str) -> Result<TimeDelta> {
    let mut chars = relative.chars();
    let sign: i64 = match chars.next() {
        Some('-') => -1,
        Some('+') => 1,
        _ => return Err(invalid(expression)),
    };

    let rest = chars.as_str().trim();
    let unit = rest.chars().last().ok_or_else(|| invalid(expression))?;
    let amount: i64 = rest[..rest.len() - unit.len_utf8()]
        .trim()
        .parse()
        .map_err(|_| invalid(expression))?;

    let amount = amount.checked_mul(sign).ok_or_else(|| invalid(expression))?;
    let offset = match unit.to_ascii_uppercase() {
        'S' => TimeDelta::try_seconds(amount),
        'M' => TimeDelta::try_minutes(amount),
        'H' => TimeDelta::try_hours(amount),
        'D' => TimeDelta::try_days(amount),
        _ => return Err(invalid(expression)),
    };

    // Out of range offsets are rejected rather than saturated
    offset.ok_or_else(|| invalid(expression))
}

fn invalid(expression: &str) -> GridLinesError {
    GridLinesError::Provider(format!("Invalid time expression \"{}\"", expression))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_relative() {
        assert_eq!(parse_time_expression("*", now()).unwrap(), now());
        assert_eq!(
            parse_time_expression("*-5M", now()).unwrap(),
            now() - TimeDelta::minutes(5)
        );
        assert_eq!(
            parse_time_expression("* - 30s", now()).unwrap(),
            now() - TimeDelta::seconds(30)
        );
        assert_eq!(
            parse_time_expression("*+1H", now()).unwrap(),
            now() + TimeDelta::hours(1)
        );
    }

    #[test]
    fn test_absolute() {
        let expected = Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 30).unwrap();
        assert_eq!(
            parse_time_expression("2024-02-29 23:59:30", now()).unwrap(),
            expected
        );
        assert_eq!(
            parse_time_expression("2024-02-29T23:59:30Z", now()).unwrap(),
            expected
        );
    }

    #[test]
    fn test_invalid() {
        for expression in ["*-5", "*-xM", "*-5Y", "*5M", "yesterday"] {
            assert!(parse_time_expression(expression, now()).is_err(), "{}", expression);
        }
    }

    #[test]
    fn test_out_of_range_offsets_are_errors() {
        for expression in [
            "*-99999999999D",
            "*+99999999999D",
            "*-9223372036854775807S",
            "*-99999999D",
            "*+99999999D",
        ] {
            assert!(
                matches!(
                    parse_time_expression(expression, now()),
                    Err(GridLinesError::Provider(_))
                ),
                "{}",
                expression
            );
        }
    }
}
