//! W3C Datetime parsing and canonical rendering.
//!
//! ResourceSync documents carry `lastmod` values in the W3C Datetime
//! profile of ISO 8601, which admits several dialects: a bare year, a
//! year-month, a full date, or a date-time with minute, second or
//! fractional-second precision and a mandatory zone designator.  All of
//! them normalize into a single [`Timestamp`] stored in UTC, and every
//! `Timestamp` renders back to exactly one canonical form
//! (`YYYY-MM-DDThh:mm:ssZ`, extended with a fraction only when non-zero).

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, TimeDelta, TimeZone, Timelike, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors raised when a `lastmod` string cannot be normalized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimestampError {
    /// The text does not match any accepted W3C Datetime dialect.
    #[error("invalid W3C Datetime '{0}'")]
    Invalid(String),

    /// The text is well-formed but a component is out of range
    /// (month 13, day 32, hour 24, second 60, offset minute 60, ...).
    #[error("out-of-range date-time component in '{0}'")]
    OutOfRange(String),
}

/// One anchored pattern covering all accepted dialects.
///
/// The nesting of optional groups is what enforces the grammar: a time of
/// day requires the full date before it and a zone designator after it, a
/// fraction requires seconds, and an offset must be `Z` or `[+-]hh:mm`
/// with the colon.  Anything else fails to match and is rejected outright.
static W3C_DATETIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)^
          (\d{4})                          # year
          (?: - (\d{2})                    # month
            (?: - (\d{2})                  # day
              (?: T (\d{2}) : (\d{2})      # hour:minute
                (?: : (\d{2})              # second
                  (?: \. (\d+) )?          # fraction (seconds required)
                )?
                ( Z | [+-] \d{2} : \d{2} ) # zone designator (mandatory)
              )?
            )?
          )?
        $",
    )
    .expect("static pattern compiles")
});

/// A last-modification instant, stored in UTC at millisecond resolution.
///
/// Fractional input digits beyond milliseconds are truncated, never
/// rounded.  Two `Timestamp`s compare equal only at the stored millisecond
/// resolution; [`Resource`](crate::Resource) equality deliberately uses the
/// coarser [`Timestamp::whole_seconds`] view instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Parse any accepted W3C Datetime dialect into a UTC instant.
    ///
    /// Date-only dialects resolve to midnight UTC; non-UTC offsets are
    /// converted to UTC before storage, so `02:00:00-02:00` and
    /// `00:00:00Z` produce the same value.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError::Invalid`] when `text` matches no dialect
    /// (this includes a space instead of `T`, a colonless offset such as
    /// `+0000`, and any time of day without a zone designator), and
    /// [`TimestampError::OutOfRange`] when a matched component is not a
    /// real date or time.
    pub fn parse(text: &str) -> Result<Self, TimestampError> {
        let caps = W3C_DATETIME
            .captures(text)
            .ok_or_else(|| TimestampError::Invalid(text.to_string()))?;

        let number = |i: usize, default: u32| -> u32 {
            caps.get(i)
                .map_or(default, |m| m.as_str().parse().unwrap_or(default))
        };
        let year: i32 = caps[1]
            .parse()
            .map_err(|_| TimestampError::Invalid(text.to_string()))?;
        let month = number(2, 1);
        let day = number(3, 1);
        let hour = number(4, 0);
        let minute = number(5, 0);
        let second = number(6, 0);
        let millis = Self::truncate_fraction(caps.get(7).map_or("", |m| m.as_str()));

        let out_of_range = || TimestampError::OutOfRange(text.to_string());
        let naive = NaiveDate::from_ymd_opt(year, month, day)
            .ok_or_else(out_of_range)?
            .and_hms_milli_opt(hour, minute, second, millis)
            .ok_or_else(out_of_range)?;

        let offset = match caps.get(8).map(|m| m.as_str()) {
            Some(zone) if zone != "Z" => Self::offset_seconds(zone).ok_or_else(out_of_range)?,
            _ => 0,
        };

        Ok(Self(Utc.from_utc_datetime(&(naive - TimeDelta::seconds(offset)))))
    }

    /// Truncate a fractional-second digit string to milliseconds.
    ///
    /// Storage truncation; distinct from the whole-second truncation that
    /// [`whole_seconds`](Self::whole_seconds) applies for value equality.
    fn truncate_fraction(digits: &str) -> u32 {
        let mut millis = 0;
        for (i, c) in digits.chars().take(3).enumerate() {
            millis += c.to_digit(10).unwrap_or(0) * 10u32.pow(2 - i as u32);
        }
        millis
    }

    /// Seconds east of UTC for a `[+-]hh:mm` designator, `None` if the
    /// hour or minute field is out of range.
    fn offset_seconds(zone: &str) -> Option<i64> {
        let (sign, rest) = zone.split_at(1);
        let (hh, mm) = rest.split_once(':')?;
        let hours: i64 = hh.parse().ok()?;
        let minutes: i64 = mm.parse().ok()?;
        if hours > 23 || minutes > 59 {
            return None;
        }
        let magnitude = hours * 3600 + minutes * 60;
        Some(if sign == "-" { -magnitude } else { magnitude })
    }

    /// The instant truncated to whole seconds, as seconds since the Unix
    /// epoch.  This is the resolution at which resources compare equal.
    pub fn whole_seconds(&self) -> i64 {
        self.0.timestamp()
    }

    /// The current instant, truncated to the stored resolution.
    pub fn now() -> Self {
        Self::from(Utc::now())
    }

    /// The underlying UTC instant.
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl From<DateTime<Utc>> for Timestamp {
    /// Truncates sub-millisecond precision; the stored value always
    /// round-trips losslessly through the canonical string form.
    fn from(dt: DateTime<Utc>) -> Self {
        let millis = dt.timestamp_subsec_millis();
        Self(dt.with_nanosecond(millis * 1_000_000).unwrap_or(dt))
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

impl FromStr for Timestamp {
    type Err = TimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Timestamp {
    /// Canonical W3C Datetime: always UTC, always `Z`, fraction only when
    /// a non-zero sub-second component survived truncation.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%dT%H:%M:%S"))?;
        let millis = self.0.timestamp_subsec_millis();
        if millis != 0 {
            write!(f, "{}", format!(".{millis:03}").trim_end_matches('0'))?;
        }
        write!(f, "Z")
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
