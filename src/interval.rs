//! Supported candle intervals
//!
//! A closed set of granularities with exact durations. Everything downstream
//! (window arithmetic, gap detection, provider parameter mapping) keys off
//! this enum, so an unsupported granularity fails at parse time rather than
//! deep inside a fetch.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A supported time-series granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    Min1,
    #[serde(rename = "5m")]
    Min5,
    #[serde(rename = "15m")]
    Min15,
    #[serde(rename = "30m")]
    Min30,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "4h")]
    Hour4,
    #[serde(rename = "6h")]
    Hour6,
    #[serde(rename = "12h")]
    Hour12,
    #[serde(rename = "1d")]
    Day1,
}

/// Calendar unit an interval is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarUnit {
    Minute,
    Hour,
    Day,
}

impl Interval {
    /// Every supported interval, ascending by duration
    pub const ALL: [Interval; 9] = [
        Interval::Min1,
        Interval::Min5,
        Interval::Min15,
        Interval::Min30,
        Interval::Hour1,
        Interval::Hour4,
        Interval::Hour6,
        Interval::Hour12,
        Interval::Day1,
    ];

    /// Exact duration in milliseconds
    pub fn duration_ms(&self) -> i64 {
        self.duration_secs() * 1_000
    }

    /// Exact duration in seconds
    pub fn duration_secs(&self) -> i64 {
        match self {
            Interval::Min1 => 60,
            Interval::Min5 => 300,
            Interval::Min15 => 900,
            Interval::Min30 => 1_800,
            Interval::Hour1 => 3_600,
            Interval::Hour4 => 14_400,
            Interval::Hour6 => 21_600,
            Interval::Hour12 => 43_200,
            Interval::Day1 => 86_400,
        }
    }

    /// Calendar unit and frequency, e.g. `4h` is 4 hours
    pub fn unit(&self) -> (CalendarUnit, u32) {
        match self {
            Interval::Min1 => (CalendarUnit::Minute, 1),
            Interval::Min5 => (CalendarUnit::Minute, 5),
            Interval::Min15 => (CalendarUnit::Minute, 15),
            Interval::Min30 => (CalendarUnit::Minute, 30),
            Interval::Hour1 => (CalendarUnit::Hour, 1),
            Interval::Hour4 => (CalendarUnit::Hour, 4),
            Interval::Hour6 => (CalendarUnit::Hour, 6),
            Interval::Hour12 => (CalendarUnit::Hour, 12),
            Interval::Day1 => (CalendarUnit::Day, 1),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Min1 => "1m",
            Interval::Min5 => "5m",
            Interval::Min15 => "15m",
            Interval::Min30 => "30m",
            Interval::Hour1 => "1h",
            Interval::Hour4 => "4h",
            Interval::Hour6 => "6h",
            Interval::Hour12 => "12h",
            Interval::Day1 => "1d",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unrecognized interval strings
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported interval '{0}'")]
pub struct ParseIntervalError(pub String);

impl FromStr for Interval {
    type Err = ParseIntervalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(Interval::Min1),
            "5m" => Ok(Interval::Min5),
            "15m" => Ok(Interval::Min15),
            "30m" => Ok(Interval::Min30),
            "1h" => Ok(Interval::Hour1),
            "4h" => Ok(Interval::Hour4),
            "6h" => Ok(Interval::Hour6),
            "12h" => Ok(Interval::Hour12),
            "1d" => Ok(Interval::Day1),
            other => Err(ParseIntervalError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_durations_are_exact() {
        assert_eq!(Interval::Min1.duration_ms(), 60_000);
        assert_eq!(Interval::Min30.duration_ms(), 1_800_000);
        assert_eq!(Interval::Hour4.duration_ms(), 14_400_000);
        assert_eq!(Interval::Day1.duration_ms(), 86_400_000);
        for interval in Interval::ALL {
            assert_eq!(interval.duration_ms(), interval.duration_secs() * 1_000);
        }
    }

    #[test]
    fn test_parse_display_roundtrip() {
        for interval in Interval::ALL {
            let parsed: Interval = interval.as_str().parse().unwrap();
            assert_eq!(parsed, interval);
            assert_eq!(interval.to_string(), interval.as_str());
        }
        assert!("2h".parse::<Interval>().is_err());
        assert!("".parse::<Interval>().is_err());
    }

    #[test]
    fn test_unit_lookup() {
        assert_eq!(Interval::Min15.unit(), (CalendarUnit::Minute, 15));
        assert_eq!(Interval::Hour12.unit(), (CalendarUnit::Hour, 12));
        assert_eq!(Interval::Day1.unit(), (CalendarUnit::Day, 1));
    }

    #[test]
    fn test_serde_uses_short_names() {
        let json = serde_json::to_string(&Interval::Hour4).unwrap();
        assert_eq!(json, "\"4h\"");
        let back: Interval = serde_json::from_str("\"1d\"").unwrap();
        assert_eq!(back, Interval::Day1);
    }
}
