//! Bar timeframe identity, e.g. `15-MINUTE` or `1-HOUR`.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimeframeError {
    #[error("malformed timeframe '{0}' (expected STEP-UNIT, e.g. 15-MINUTE)")]
    Malformed(String),
    #[error("unknown timeframe unit '{0}'")]
    UnknownUnit(String),
    #[error("timeframe step must be >= 1 in '{0}'")]
    ZeroStep(String),
}

/// Aggregation unit of a timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    Day,
}

impl TimeUnit {
    fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Second => "SECOND",
            TimeUnit::Minute => "MINUTE",
            TimeUnit::Hour => "HOUR",
            TimeUnit::Day => "DAY",
        }
    }

    fn seconds(&self) -> i64 {
        match self {
            TimeUnit::Second => 1,
            TimeUnit::Minute => 60,
            TimeUnit::Hour => 3_600,
            TimeUnit::Day => 86_400,
        }
    }
}

/// A bar timeframe: `step` units of `unit`.
///
/// Serialized as its string form (`"15-MINUTE"`) so configuration files and
/// CSV bar files stay readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timeframe {
    step: u32,
    unit: TimeUnit,
}

impl Timeframe {
    pub fn new(step: u32, unit: TimeUnit) -> Self {
        assert!(step >= 1, "timeframe step must be >= 1");
        Self { step, unit }
    }

    pub fn minutes(step: u32) -> Self {
        Self::new(step, TimeUnit::Minute)
    }

    pub fn hours(step: u32) -> Self {
        Self::new(step, TimeUnit::Hour)
    }

    pub fn step(&self) -> u32 {
        self.step
    }

    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    pub fn duration(&self) -> Duration {
        Duration::seconds(self.step as i64 * self.unit.seconds())
    }

    /// Round `ts` up to the next bar-close boundary of this timeframe.
    ///
    /// Timestamps already on a boundary are returned unchanged.
    pub fn ceil_to_boundary(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let step = self.duration().num_seconds();
        let secs = ts.timestamp();
        let rem = secs.rem_euclid(step);
        if rem == 0 && ts.timestamp_subsec_nanos() == 0 {
            return ts;
        }
        let ceiled = secs - rem + step;
        Utc.timestamp_opt(ceiled, 0).single().unwrap_or(ts)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.step, self.unit.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = TimeframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (step, unit) = trimmed
            .split_once('-')
            .ok_or_else(|| TimeframeError::Malformed(s.to_string()))?;
        let step: u32 = step
            .parse()
            .map_err(|_| TimeframeError::Malformed(s.to_string()))?;
        if step == 0 {
            return Err(TimeframeError::ZeroStep(s.to_string()));
        }
        let unit = match unit.to_ascii_uppercase().as_str() {
            "SECOND" | "SECONDS" => TimeUnit::Second,
            "MINUTE" | "MINUTES" => TimeUnit::Minute,
            "HOUR" | "HOURS" => TimeUnit::Hour,
            "DAY" | "DAYS" => TimeUnit::Day,
            other => return Err(TimeframeError::UnknownUnit(other.to_string())),
        };
        Ok(Self { step, unit })
    }
}

impl TryFrom<String> for Timeframe {
    type Error = TimeframeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Timeframe> for String {
    fn from(value: Timeframe) -> Self {
        value.to_string()
    }
}
