//! Time axis handling for gridded datasets.

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ClickHistError, ClickHistResult};

/// Units of the numeric values stored on a dataset's time dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnits {
    Seconds,
    Minutes,
    #[default]
    Hours,
    Days,
}

impl TimeUnits {
    /// Number of seconds in one unit.
    pub fn seconds_per_unit(&self) -> f64 {
        match self {
            TimeUnits::Seconds => 1.0,
            TimeUnits::Minutes => 60.0,
            TimeUnits::Hours => 3600.0,
            TimeUnits::Days => 86400.0,
        }
    }

    /// Parse from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "s" | "sec" | "secs" | "seconds" => Some(Self::Seconds),
            "min" | "mins" | "minutes" => Some(Self::Minutes),
            "h" | "hr" | "hrs" | "hours" => Some(Self::Hours),
            "d" | "days" => Some(Self::Days),
            _ => None,
        }
    }
}

/// Numeric time coordinate anchored at an epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeAxis {
    pub epoch: DateTime<Utc>,
    pub units: TimeUnits,
    values: Vec<f64>,
}

impl TimeAxis {
    /// Build a time axis, rejecting non-finite or decreasing values.
    pub fn new(epoch: DateTime<Utc>, units: TimeUnits, values: Vec<f64>) -> ClickHistResult<Self> {
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(ClickHistError::InvalidTime(format!(
                "non-finite time value at index {}",
                pos
            )));
        }
        if let Some(pos) = values.windows(2).position(|w| w[1] < w[0]) {
            return Err(ClickHistError::InvalidTime(format!(
                "time values decrease at index {} ({} -> {})",
                pos + 1,
                values[pos],
                values[pos + 1]
            )));
        }
        let axis = Self {
            epoch,
            units,
            values,
        };
        // values are non-decreasing, so the ends bound every step
        for idx in [0, axis.len().saturating_sub(1)] {
            if idx < axis.len() && axis.datetime_at(idx).is_none() {
                return Err(ClickHistError::InvalidTime(format!(
                    "time value {} {:?} from {} is out of range",
                    axis.values[idx], axis.units, axis.epoch
                )));
            }
        }
        Ok(axis)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw numeric values in the axis units.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Offset of step `idx` from the epoch, in whole milliseconds.
    ///
    /// `None` past the end of the axis or when the offset does not fit a
    /// `Duration`.
    pub fn offset_at(&self, idx: usize) -> Option<Duration> {
        let value = *self.values.get(idx)?;
        let millis = (value * self.units.seconds_per_unit() * 1000.0).round();
        if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
            return None;
        }
        Duration::try_milliseconds(millis as i64)
    }

    /// Absolute datetime of step `idx`, or `None` if it is not representable.
    pub fn datetime_at(&self, idx: usize) -> Option<DateTime<Utc>> {
        self.epoch.checked_add_signed(self.offset_at(idx)?)
    }
}

/// A closed time interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Window extending `secs_from_center` seconds either side of `center`.
    ///
    /// `None` when either end falls outside the representable range.
    pub fn around(center: DateTime<Utc>, secs_from_center: u64) -> Option<Self> {
        let half = Duration::try_seconds(i64::try_from(secs_from_center).ok()?)?;
        Some(Self {
            start: center.checked_sub_signed(half)?,
            end: center.checked_add_signed(half)?,
        })
    }

    pub fn contains(&self, dt: &DateTime<Utc>) -> bool {
        dt >= &self.start && dt <= &self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Parse an ISO 8601 datetime; a missing timezone is taken as UTC.
pub fn parse_iso8601(s: &str) -> ClickHistResult<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    if let Ok(ndt) =
        NaiveDateTime::parse_from_str(&format!("{}T00:00:00", s), "%Y-%m-%dT%H:%M:%S")
    {
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    Err(ClickHistError::InvalidTime(format!(
        "unrecognised datetime '{}'",
        s
    )))
}
