use crate::time::timeunit::{format_duration, parse_duration};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::time::Duration as StdDuration;

const NANOS_PER_MILLI: f64 = 1_000_000.0;

/// Nanosecond precision duration used by test definitions.
///
/// Serialized as a human readable string (`"5m0s"`), deserialized from
/// either such a string or a raw number of nanoseconds.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duration(StdDuration);

/// Elapsed time reported in logs and result records.
///
/// Serialized as milliseconds rounded to two decimal places, deserialized
/// from a number of milliseconds or a numeric string.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DurationMs(StdDuration);

impl Duration {
    pub fn is_zero(&self) -> bool {
        self.0.as_nanos() == 0
    }

    pub fn get(&self) -> StdDuration {
        self.0
    }

    pub fn ms(&self) -> DurationMs {
        DurationMs(self.0)
    }
}

impl DurationMs {
    pub fn get(&self) -> StdDuration {
        self.0
    }

    pub fn as_millis_f64(&self) -> f64 {
        self.0.as_nanos() as f64 / NANOS_PER_MILLI
    }

    fn from_millis_f64(millis: f64) -> Option<Self> {
        let nanos = (millis * NANOS_PER_MILLI).round();
        if nanos.is_finite() && nanos >= 0.0 && nanos <= u64::MAX as f64 {
            Some(DurationMs(StdDuration::from_nanos(nanos as u64)))
        } else {
            None
        }
    }
}

impl From<StdDuration> for Duration {
    fn from(duration: StdDuration) -> Self {
        Duration(duration)
    }
}

impl From<Duration> for StdDuration {
    fn from(duration: Duration) -> Self {
        duration.0
    }
}

impl From<StdDuration> for DurationMs {
    fn from(duration: StdDuration) -> Self {
        DurationMs(duration)
    }
}

impl From<DurationMs> for StdDuration {
    fn from(duration: DurationMs) -> Self {
        duration.0
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&format_duration(self.0))
    }
}

impl fmt::Display for DurationMs {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:.2}ms", self.as_millis_f64())
    }
}

impl Serialize for Duration {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_duration(self.0))
    }
}

impl<'de> Deserialize<'de> for Duration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(DurationVisitor)
    }
}

struct DurationVisitor;

impl<'de> Visitor<'de> for DurationVisitor {
    type Value = Duration;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a duration string like \"1m30s\" or a number of nanoseconds")
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        parse_duration(value)
            .map(Duration)
            .map_err(|err| E::custom(err.to_string()))
    }

    fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Duration(StdDuration::from_nanos(value)))
    }

    fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        if value < 0 {
            return Err(E::custom(format!("negative duration {}", value)));
        }
        self.visit_u64(value as u64)
    }

    fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        if !value.is_finite() || value < 0.0 || value > u64::MAX as f64 {
            return Err(E::custom(format!("invalid duration {}", value)));
        }
        Ok(Duration(StdDuration::from_nanos(value as u64)))
    }
}

impl Serialize for DurationMs {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64((self.as_millis_f64() * 100.0).round() / 100.0)
    }
}

impl<'de> Deserialize<'de> for DurationMs {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(DurationMsVisitor)
    }
}

struct DurationMsVisitor;

impl<'de> Visitor<'de> for DurationMsVisitor {
    type Value = DurationMs;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a number of milliseconds")
    }

    fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        DurationMs::from_millis_f64(value)
            .ok_or_else(|| E::custom(format!("invalid millisecond duration {}", value)))
    }

    fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        self.visit_f64(value as f64)
    }

    fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        self.visit_f64(value as f64)
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        let millis = value
            .trim()
            .parse::<f64>()
            .map_err(|err| E::custom(format!("invalid millisecond duration '{}': {}", value, err)))?;
        self.visit_f64(millis)
    }
}
