use crate::time::error::Error;
use core::str::FromStr;
use lazy_static::*;
use regex::{Captures, Regex};
use std::convert::TryFrom;
use std::time::Duration;

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;
const NANOS_PER_MIN: u128 = 60 * NANOS_PER_SEC;
const NANOS_PER_HOUR: u128 = 60 * NANOS_PER_MIN;

// Digits past nanosecond precision of the largest unit carry no information.
const MAX_FRACTION_DIGITS: usize = 18;

lazy_static! {
    static ref DURATION_REGEX: Regex = Regex::new(
        r"^(?:(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:ns|us|µs|μs|ms|s|m|h|d))+$"
    )
    .expect("Regex compilation error");

    static ref COMPONENT_REGEX: Regex = Regex::new(
        r"(?P<value>[0-9]*)(?:\.(?P<fraction>[0-9]*))?(?P<unit>ns|us|µs|μs|ms|s|m|h|d)"
    )
    .expect("Regex compilation error");
}

/// One `<number><unit>` component of a duration string, e.g. `1.5s`.
#[derive(Debug, PartialEq)]
pub struct DurationUnit {
    value: u64,
    fraction: String,
    unit: TimeUnit,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum TimeUnit {
    Nanosecond,
    Microsecond,
    Millisecond,
    Second,
    Minute,
    Hour,
    Day,
}

impl TimeUnit {
    fn nanos(self) -> u128 {
        match self {
            TimeUnit::Nanosecond => 1,
            TimeUnit::Microsecond => NANOS_PER_MICRO,
            TimeUnit::Millisecond => NANOS_PER_MILLI,
            TimeUnit::Second => NANOS_PER_SEC,
            TimeUnit::Minute => NANOS_PER_MIN,
            TimeUnit::Hour => NANOS_PER_HOUR,
            TimeUnit::Day => 24 * NANOS_PER_HOUR,
        }
    }
}

impl DurationUnit {
    fn from_captures(source: &str, caps: &Captures) -> Result<Self, Error> {
        let digits = caps.name("value").map_or("", |m| m.as_str());
        let fraction = caps.name("fraction").map_or("", |m| m.as_str());
        if digits.is_empty() && fraction.is_empty() {
            return Err(Error::Syntax(source.to_owned()));
        }
        let value = if digits.is_empty() {
            0
        } else {
            digits
                .parse::<u64>()
                .map_err(|_| Error::OutOfRange(source.to_owned()))?
        };
        let unit = caps
            .name("unit")
            .map_or("", |m| m.as_str())
            .parse::<TimeUnit>()?;
        Ok(Self {
            value,
            fraction: fraction.chars().take(MAX_FRACTION_DIGITS).collect(),
            unit,
        })
    }

    fn nanos(&self) -> Option<u128> {
        let scale = self.unit.nanos();
        let whole = u128::from(self.value).checked_mul(scale)?;
        let mut fraction: u128 = 0;
        let mut divisor: u128 = 1;
        for digit in self.fraction.bytes() {
            fraction = fraction * 10 + u128::from(digit - b'0');
            divisor *= 10;
        }
        whole.checked_add(fraction * scale / divisor)
    }
}

impl FromStr for DurationUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match COMPONENT_REGEX.captures(s) {
            Some(caps) if caps.get(0).map(|m| m.as_str().len()) == Some(s.len()) => {
                Self::from_captures(s, &caps)
            }
            _ => Err(Error::Syntax(s.to_owned())),
        }
    }
}

impl TryFrom<DurationUnit> for Duration {
    type Error = Error;

    fn try_from(unit: DurationUnit) -> Result<Self, Self::Error> {
        unit.nanos()
            .and_then(|nanos| u64::try_from(nanos).ok())
            .map(Duration::from_nanos)
            .ok_or_else(|| Error::OutOfRange(format!("{}{:?}", unit.value, unit.unit)))
    }
}

impl FromStr for TimeUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ns" | "nanosecond" | "nanos" | "nanoseconds" => Ok(TimeUnit::Nanosecond),
            "us" | "µs" | "μs" | "microsecond" | "micros" | "microseconds" => {
                Ok(TimeUnit::Microsecond)
            }
            "ms" | "millisecond" | "millis" | "milliseconds" => Ok(TimeUnit::Millisecond),
            "s" | "second" | "secs" | "seconds" => Ok(TimeUnit::Second),
            "m" | "minute" | "mins" | "minutes" => Ok(TimeUnit::Minute),
            "h" | "hour" | "hours" => Ok(TimeUnit::Hour),
            "d" | "day" | "days" => Ok(TimeUnit::Day),
            _ => Err(Error::UnitNotSupported(s.to_owned())),
        }
    }
}

/// Parses a sequence of `<number><unit>` components such as `1h30m` or
/// `1.5s`. A bare `0` is accepted as zero.
pub fn parse_duration(s: &str) -> Result<Duration, Error> {
    let s = s.trim();
    if s == "0" {
        return Ok(Duration::from_nanos(0));
    }
    if !DURATION_REGEX.is_match(s) {
        return Err(Error::Syntax(s.to_owned()));
    }
    let mut total: u128 = 0;
    for component in COMPONENT_REGEX.find_iter(s) {
        let unit = component.as_str().parse::<DurationUnit>()?;
        total = total
            .checked_add(Duration::try_from(unit)?.as_nanos())
            .ok_or_else(|| Error::OutOfRange(s.to_owned()))?;
    }
    u64::try_from(total)
        .map(Duration::from_nanos)
        .map_err(|_| Error::OutOfRange(s.to_owned()))
}

/// Formats a duration the way it is parsed back: `0s`, `750ns`, `1.5µs`,
/// `250ms`, `1.5s`, `5m0s`, `1h0m3.2s`.
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    if nanos == 0 {
        return "0s".to_owned();
    }
    if nanos < NANOS_PER_MICRO {
        return format!("{}ns", nanos);
    }
    if nanos < NANOS_PER_MILLI {
        return format!("{}µs", fraction(nanos, NANOS_PER_MICRO));
    }
    if nanos < NANOS_PER_SEC {
        return format!("{}ms", fraction(nanos, NANOS_PER_MILLI));
    }

    let hours = nanos / NANOS_PER_HOUR;
    let minutes = nanos % NANOS_PER_HOUR / NANOS_PER_MIN;
    let seconds = nanos % NANOS_PER_MIN;
    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{}h", hours));
    }
    if hours > 0 || minutes > 0 {
        out.push_str(&format!("{}m", minutes));
    }
    out.push_str(&format!("{}s", fraction(seconds, NANOS_PER_SEC)));
    out
}

fn fraction(value: u128, scale: u128) -> String {
    let whole = value / scale;
    let rest = value % scale;
    if rest == 0 {
        return whole.to_string();
    }
    let width = scale.to_string().len() - 1;
    let digits = format!("{:0width$}", rest, width = width);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}
