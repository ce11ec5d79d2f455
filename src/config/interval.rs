//! Go-style duration strings: `90s`, `10m`, `1h30m`, `1500ms`.
//!
//! A bare number is read as seconds. Anything under [`MIN_INTERVAL`] is
//! rejected.

use std::time::Duration;

use thiserror::Error;

/// Shortest accepted polling interval.
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntervalError {
    #[error("empty interval")]
    Empty,
    #[error("interval must be greater than zero")]
    Zero,
    #[error("interval of {0:?} is below the 1s minimum")]
    TooShort(Duration),
    #[error("unknown unit {0:?} (expected ms, s, m or h)")]
    UnknownUnit(String),
    #[error("missing number before {0:?}")]
    MissingNumber(String),
    #[error("interval too large")]
    Overflow,
}

pub fn parse_interval(input: &str) -> Result<Duration, IntervalError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(IntervalError::Empty);
    }

    if let Ok(secs) = input.parse::<u64>() {
        return at_least_minimum(Duration::from_secs(secs));
    }

    let mut total = Duration::ZERO;
    let mut rest = input;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        let (number, tail) = rest.split_at(digits);
        let unit_len = tail.find(|c: char| c.is_ascii_digit()).unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_len);

        if number.is_empty() {
            return Err(IntervalError::MissingNumber(unit.to_owned()));
        }
        let value: u64 = number.parse().map_err(|_| IntervalError::Overflow)?;
        let millis_per_unit: u64 = match unit {
            "ms" => 1,
            "s" => 1_000,
            "m" => 60_000,
            "h" => 3_600_000,
            other => return Err(IntervalError::UnknownUnit(other.to_owned())),
        };
        let millis = value.checked_mul(millis_per_unit).ok_or(IntervalError::Overflow)?;
        total = total
            .checked_add(Duration::from_millis(millis))
            .ok_or(IntervalError::Overflow)?;
        rest = next;
    }

    at_least_minimum(total)
}

fn at_least_minimum(duration: Duration) -> Result<Duration, IntervalError> {
    if duration.is_zero() {
        Err(IntervalError::Zero)
    } else if duration < MIN_INTERVAL {
        Err(IntervalError::TooShort(duration))
    } else {
        Ok(duration)
    }
}
