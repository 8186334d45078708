//! Calendar-day and hour-of-day bucketing
//!
//! Timestamps are stored in UTC; buckets are taken in the local calendar
//! given by a fixed offset.

use crate::types::Timestamp;
use chrono::{FixedOffset, NaiveDate, Timelike};

/// Number of hour-of-day buckets
pub const HOURS_PER_DAY: usize = 24;

/// Local calendar date of a timestamp
pub fn day_of(timestamp: Timestamp, offset: FixedOffset) -> NaiveDate {
    timestamp.with_timezone(&offset).date_naive()
}

/// Local hour of day (0-23) of a timestamp
pub fn hour_of(timestamp: Timestamp, offset: FixedOffset) -> u32 {
    timestamp.with_timezone(&offset).hour()
}

/// Display label of a date (`dd/mm/yyyy`)
pub fn day_label(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Display label of an hour bucket (`HH:00`)
pub fn hour_label(hour: u32) -> String {
    format!("{:02}:00", hour)
}
