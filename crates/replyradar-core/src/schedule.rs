//! Opaque schedule expressions for discovery jobs.
//!
//! The scheduler never inspects the text of a schedule; it asks this type
//! for an interpretation. Two grammars are supported today: six/seven-field
//! cron lines (interpreted by tokio-cron-scheduler downstream) and fixed
//! intervals written as `@every <n><unit>`. Adding a grammar means adding a
//! variant here, not touching the scheduler.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ScheduleExpr {
    /// A cron line, e.g. `0 */5 * * * *` (seconds field included).
    Cron(String),
    /// A fixed interval, e.g. `@every 5m`.
    Every(Duration),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleParseError {
    #[error("empty schedule expression")]
    Empty,
    #[error("cron expression must have 6 or 7 fields, got {0}")]
    CronFieldCount(usize),
    #[error("invalid interval '{0}': expected e.g. '@every 5m', '@every 90s', '@every 1h'")]
    InvalidInterval(String),
}

impl fmt::Display for ScheduleExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleExpr::Cron(expr) => f.write_str(expr),
            ScheduleExpr::Every(interval) => write!(f, "@every {}s", interval.as_secs()),
        }
    }
}

impl FromStr for ScheduleExpr {
    type Err = ScheduleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ScheduleParseError::Empty);
        }

        if let Some(rest) = trimmed.strip_prefix("@every") {
            let interval = parse_interval(rest.trim())
                .ok_or_else(|| ScheduleParseError::InvalidInterval(trimmed.to_string()))?;
            return Ok(ScheduleExpr::Every(interval));
        }

        let fields = trimmed.split_whitespace().count();
        if !(6..=7).contains(&fields) {
            return Err(ScheduleParseError::CronFieldCount(fields));
        }
        Ok(ScheduleExpr::Cron(trimmed.to_string()))
    }
}

impl TryFrom<String> for ScheduleExpr {
    type Error = ScheduleParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ScheduleExpr> for String {
    fn from(expr: ScheduleExpr) -> Self {
        expr.to_string()
    }
}

/// Parse `<n><unit>` where unit is `s`, `m`, or `h`.
fn parse_interval(s: &str) -> Option<Duration> {
    let unit = s.chars().last()?;
    let digits = &s[..s.len() - unit.len_utf8()];
    let n: u64 = digits.parse().ok()?;
    if n == 0 {
        return None;
    }
    match unit {
        's' => Some(Duration::from_secs(n)),
        'm' => Some(Duration::from_secs(n * 60)),
        'h' => Some(Duration::from_secs(n * 3600)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_six_field_cron() {
        let expr: ScheduleExpr = "0 */5 * * * *".parse().unwrap();
        assert_eq!(expr, ScheduleExpr::Cron("0 */5 * * * *".to_string()));
    }

    #[test]
    fn rejects_five_field_cron() {
        let err = "*/5 * * * *".parse::<ScheduleExpr>().unwrap_err();
        assert_eq!(err, ScheduleParseError::CronFieldCount(5));
    }

    #[test]
    fn parses_interval_units() {
        assert_eq!(
            "@every 90s".parse::<ScheduleExpr>().unwrap(),
            ScheduleExpr::Every(Duration::from_secs(90))
        );
        assert_eq!(
            "@every 5m".parse::<ScheduleExpr>().unwrap(),
            ScheduleExpr::Every(Duration::from_secs(300))
        );
        assert_eq!(
            "@every 2h".parse::<ScheduleExpr>().unwrap(),
            ScheduleExpr::Every(Duration::from_secs(7200))
        );
    }

    #[test]
    fn rejects_zero_and_garbage_intervals() {
        assert!("@every 0m".parse::<ScheduleExpr>().is_err());
        assert!("@every soon".parse::<ScheduleExpr>().is_err());
        assert!("".parse::<ScheduleExpr>().is_err());
    }

    #[test]
    fn interval_display_round_trips() {
        let expr: ScheduleExpr = "@every 5m".parse().unwrap();
        assert_eq!(expr.to_string().parse::<ScheduleExpr>().unwrap(), expr);
    }
}
