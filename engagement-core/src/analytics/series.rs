//! Output series of the aggregation engine
//!
//! Plain serializable values; nothing here borrows from the snapshot.

use crate::types::EntityId;
use chrono::NaiveDate;
use serde::Serialize;

/// Headline numbers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    /// Distinct users with at least one check-in link
    pub users_with_checkins: usize,
    pub total_checkins: usize,
    pub total_redemptions: usize,
    pub published_activations: usize,
    /// Mean of present ratings on published evaluations (2 decimals, 0 if none)
    pub mean_rating: f64,
}

/// Check-ins of one published activation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivationCheckins {
    pub id: EntityId,
    pub name: String,
    pub checkins: usize,
    pub mean_rating: f64,
    pub kind: Option<String>,
    pub location: Option<String>,
    pub points: f64,
}

/// Check-ins of one calendar day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayCheckins {
    pub date: NaiveDate,
    /// `dd/mm/yyyy`
    pub label: String,
    pub checkins: usize,
    /// Mean rating of evaluations the day's users created that same day
    pub mean_rating: f64,
}

/// One hour-of-day bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourBucket {
    pub hour: u32,
    /// `HH:00`
    pub label: String,
    pub count: usize,
}

/// A selectable day
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayOption {
    pub value: NaiveDate,
    pub label: String,
}

/// Hour-of-day histogram plus the days available to narrow it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourlyPeaks {
    /// Always 24 buckets, hour 0 first
    pub buckets: Vec<HourBucket>,
    /// Every day with a check-in, ascending
    pub days: Vec<DayOption>,
}

/// Redemptions of one prize
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrizeRedemptions {
    pub id: EntityId,
    pub title: String,
    pub redemptions: usize,
    pub points: f64,
    pub stock: f64,
}

/// One funnel stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunnelStage {
    pub stage: String,
    pub count: usize,
    /// Relative to the largest stage
    pub percentage: u32,
    pub color: String,
}

/// How much of the data the current filter keeps
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterStats {
    /// Unfiltered check-in count
    pub total: usize,
    /// Filtered check-in count
    pub filtered: usize,
    pub percentage: u32,
    pub has_active_filters: bool,
}

/// All dashboard series for one view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub metrics: Metrics,
    pub top_activations: Vec<ActivationCheckins>,
    pub checkins_by_day: Vec<DayCheckins>,
    pub hourly_peaks: HourlyPeaks,
    pub redemptions_by_prize: Vec<PrizeRedemptions>,
    pub funnel: Vec<FunnelStage>,
    pub filter_stats: FilterStats,
}
