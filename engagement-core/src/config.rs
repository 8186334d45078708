//! Engine configuration
//!
//! The library never reads the system clock or the machine's time zone. The
//! date used for age bands and the offset used for day and hour bucketing are
//! both supplied here by the caller.

use chrono::{FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};

/// Largest accepted UTC offset, in minutes
const MAX_OFFSET_MINUTES: i32 = 14 * 60;

/// Configuration shared by the filter and aggregation engines
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Offset from UTC, in minutes, of the local calendar used for day and
    /// hour buckets (e.g. -180 for UTC-3)
    #[serde(default)]
    pub utc_offset_minutes: i32,

    /// Date ages are computed on; callers decide what "today" is
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

impl EngineConfig {
    /// Create a configuration with UTC buckets and no fixed evaluation date
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the bucketing offset in minutes
    pub fn with_utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = minutes;
        self
    }

    /// Builder method: pin the age evaluation date
    pub fn with_as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = Some(as_of);
        self
    }

    /// Offset used for bucketing; out-of-range values fall back to UTC
    pub fn time_offset(&self) -> FixedOffset {
        let utc = Utc.fix();
        if !(-MAX_OFFSET_MINUTES..=MAX_OFFSET_MINUTES).contains(&self.utc_offset_minutes) {
            log::warn!(
                "UTC offset of {} minutes is out of range; using UTC",
                self.utc_offset_minutes
            );
            return utc;
        }
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or(utc)
    }

    /// The configured evaluation date, or `fallback` when none is pinned
    pub fn as_of_or(&self, fallback: NaiveDate) -> NaiveDate {
        self.as_of.unwrap_or(fallback)
    }
}
