//! Human-readable durations for config fields.
//!
//! [`Duration`] wraps [`std::time::Duration`] and reads/writes Go-style
//! duration strings such as `"90s"`, `"1h30m"` or `"250ms"`. A bare integer
//! is taken as whole seconds. Using it as a field type lets the schema binder
//! tag the key with [`Shape::Duration`](crate::schema::Shape::Duration).

use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Newtype name the flattening serializer looks for to recognize durations.
pub(crate) const MARKER: &str = "$flagfig::Duration";

const NANOS_PER_SEC: u128 = 1_000_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    #[error("empty duration")]
    Empty,
    #[error("invalid duration '{0}'")]
    Invalid(String),
    #[error("missing unit in duration '{0}'")]
    MissingUnit(String),
    #[error("unknown unit '{unit}' in duration '{input}'")]
    UnknownUnit { unit: String, input: String },
    #[error("duration '{0}' is out of range")]
    Overflow(String),
}

/// A config-friendly duration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duration(pub std::time::Duration);

impl Duration {
    pub const fn from_secs(secs: u64) -> Self {
        Duration(std::time::Duration::from_secs(secs))
    }

    pub const fn from_millis(millis: u64) -> Self {
        Duration(std::time::Duration::from_millis(millis))
    }

    pub fn into_inner(self) -> std::time::Duration {
        self.0
    }
}

impl Deref for Duration {
    type Target = std::time::Duration;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<std::time::Duration> for Duration {
    fn from(d: std::time::Duration) -> Self {
        Duration(d)
    }
}

impl From<Duration> for std::time::Duration {
    fn from(d: Duration) -> Self {
        d.0
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_duration(self.0))
    }
}

impl FromStr for Duration {
    type Err = DurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_duration(s).map(Duration)
    }
}

impl Serialize for Duration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(MARKER, &format_duration(self.0))
    }
}

impl<'de> Deserialize<'de> for Duration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(DurationVisitor)
    }
}

struct DurationVisitor;

impl<'de> Visitor<'de> for DurationVisitor {
    type Value = Duration;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a duration string like \"30s\" or a number of seconds")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Duration, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Duration, E> {
        Ok(Duration::from_secs(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Duration, E> {
        u64::try_from(v)
            .map(Duration::from_secs)
            .map_err(|_| E::custom(format!("negative duration {v}")))
    }

    fn visit_newtype_struct<D: Deserializer<'de>>(self, d: D) -> Result<Duration, D::Error> {
        Duration::deserialize(d)
    }
}

/// Parse a Go-style duration: one or more `<number><unit>` pairs, where the
/// number may have a fractional part and the unit is one of `ns`, `us`
/// (`µs`), `ms`, `s`, `m`, `h`. `"0"` is accepted without a unit.
pub fn parse_duration(input: &str) -> Result<std::time::Duration, DurationError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(DurationError::Empty);
    }
    if s == "0" {
        return Ok(std::time::Duration::ZERO);
    }

    let is_number = |c: char| c.is_ascii_digit() || c == '.';
    let overflow = || DurationError::Overflow(s.to_string());

    let mut total: u128 = 0;
    let mut rest = s;
    while !rest.is_empty() {
        let number_end = rest.find(|c: char| !is_number(c)).unwrap_or(rest.len());
        let number = &rest[..number_end];
        rest = &rest[number_end..];
        let unit_end = rest.find(is_number).unwrap_or(rest.len());
        let unit = &rest[..unit_end];
        rest = &rest[unit_end..];

        if number.is_empty() || number == "." {
            return Err(DurationError::Invalid(s.to_string()));
        }
        let scale: u128 = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => 1_000,
            "ms" => 1_000_000,
            "s" => NANOS_PER_SEC,
            "m" => 60 * NANOS_PER_SEC,
            "h" => 3_600 * NANOS_PER_SEC,
            "" => return Err(DurationError::MissingUnit(s.to_string())),
            other => {
                return Err(DurationError::UnknownUnit {
                    unit: other.to_string(),
                    input: s.to_string(),
                });
            }
        };

        let (whole, frac) = number.split_once('.').unwrap_or((number, ""));
        if frac.contains('.') {
            return Err(DurationError::Invalid(s.to_string()));
        }
        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| overflow())?
        };
        let mut nanos = whole.checked_mul(scale).ok_or_else(overflow)?;
        if !frac.is_empty() {
            // Digits past nanosecond precision cannot change the result.
            let frac = &frac[..frac.len().min(18)];
            let digits: u128 = frac.parse().map_err(|_| overflow())?;
            let denom = 10u128.pow(frac.len() as u32);
            nanos = nanos
                .checked_add(digits * scale / denom)
                .ok_or_else(overflow)?;
        }
        total = total.checked_add(nanos).ok_or_else(overflow)?;
    }

    let secs = u64::try_from(total / NANOS_PER_SEC).map_err(|_| overflow())?;
    let sub = (total % NANOS_PER_SEC) as u32;
    Ok(std::time::Duration::new(secs, sub))
}

/// Format a duration in the compact form [`parse_duration`] reads back,
/// e.g. `1h30m`, `1s250ms`, `0s`.
pub fn format_duration(d: std::time::Duration) -> String {
    if d.is_zero() {
        return "0s".into();
    }
    let secs = d.as_secs();
    let sub = d.subsec_nanos();
    let parts = [
        (secs / 3_600, "h"),
        ((secs / 60) % 60, "m"),
        (secs % 60, "s"),
        (u64::from(sub / 1_000_000), "ms"),
        (u64::from((sub / 1_000) % 1_000), "us"),
        (u64::from(sub % 1_000), "ns"),
    ];
    parts
        .iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, unit)| format!("{n}{unit}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as Std;

    #[test]
    fn parse_simple_units() {
        assert_eq!(parse_duration("30s").unwrap(), Std::from_secs(30));
        assert_eq!(parse_duration("5m").unwrap(), Std::from_secs(300));
        assert_eq!(parse_duration("2h").unwrap(), Std::from_secs(7200));
        assert_eq!(parse_duration("250ms").unwrap(), Std::from_millis(250));
        assert_eq!(parse_duration("10us").unwrap(), Std::from_micros(10));
        assert_eq!(parse_duration("10µs").unwrap(), Std::from_micros(10));
        assert_eq!(parse_duration("7ns").unwrap(), Std::from_nanos(7));
    }

    #[test]
    fn parse_compound() {
        assert_eq!(parse_duration("1h30m").unwrap(), Std::from_secs(5400));
        assert_eq!(
            parse_duration("1m30s500ms").unwrap(),
            Std::from_millis(90_500)
        );
    }

    #[test]
    fn parse_fractional() {
        assert_eq!(parse_duration("1.5s").unwrap(), Std::from_millis(1500));
        assert_eq!(parse_duration(".5h").unwrap(), Std::from_secs(1800));
    }

    #[test]
    fn parse_zero_without_unit() {
        assert_eq!(parse_duration("0").unwrap(), Std::ZERO);
    }

    #[test]
    fn parse_rejects_missing_unit() {
        assert!(matches!(
            parse_duration("30"),
            Err(DurationError::MissingUnit(_))
        ));
    }

    #[test]
    fn parse_rejects_unknown_unit() {
        assert!(matches!(
            parse_duration("3 days"),
            Err(DurationError::UnknownUnit { .. })
        ));
        assert!(matches!(
            parse_duration("3d"),
            Err(DurationError::UnknownUnit { .. })
        ));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(parse_duration(""), Err(DurationError::Empty));
        assert!(parse_duration("s").is_err());
        assert!(parse_duration("1.2.3s").is_err());
        assert!(parse_duration("-5s").is_err());
    }

    #[test]
    fn format_is_compact() {
        assert_eq!(format_duration(Std::ZERO), "0s");
        assert_eq!(format_duration(Std::from_secs(5400)), "1h30m");
        assert_eq!(format_duration(Std::from_millis(1250)), "1s250ms");
        assert_eq!(format_duration(Std::from_nanos(1_000_001)), "1ms1ns");
    }

    #[test]
    fn format_parses_back() {
        for d in [
            Std::from_secs(1),
            Std::from_secs(3_601),
            Std::from_millis(42),
            Std::new(86_400, 999_999_999),
        ] {
            assert_eq!(parse_duration(&format_duration(d)).unwrap(), d);
        }
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Holder {
        timeout: Duration,
    }

    #[test]
    fn deserialize_from_string_and_integer() {
        let from_str: Holder = toml::from_str("timeout = \"1m\"").unwrap();
        assert_eq!(from_str.timeout, Duration::from_secs(60));
        let from_int: Holder = toml::from_str("timeout = 15").unwrap();
        assert_eq!(from_int.timeout, Duration::from_secs(15));
    }

    #[test]
    fn serialize_as_string() {
        let h = Holder {
            timeout: Duration::from_millis(1500),
        };
        assert_eq!(toml::to_string(&h).unwrap().trim(), "timeout = \"1s500ms\"");
    }

    #[test]
    fn deserialize_rejects_negative() {
        let result: Result<Holder, _> = toml::from_str("timeout = -3");
        assert!(result.is_err());
    }
}
