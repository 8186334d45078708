//! Engagement Insights Library
//!
//! A stateless library for filtering and aggregating one immutable snapshot of
//! an event participation program: users, check-ins at activations, prize
//! redemptions, evaluations, surveys and the link tables between them.
//!
//! # Architecture
//!
//! - [`Snapshot`]: every entity and link table, loaded once and indexed by id
//! - [`filter_view`]: applies a [`FilterState`] and returns a [`FilteredView`]
//!   that references the snapshot's rows instead of copying them
//! - [`Relations`]: multi-hop lookups over a snapshot or a view
//! - [`Analytics`]: metrics, grouped series, histograms and the funnel
//!
//! The library does NOT:
//! - Fetch snapshots over the network
//! - Read the system clock or time zone (callers pass `as_of` and an offset)
//! - Render anything
//!
//! Presentation lives in the application layer (engagement-cli).
//!
//! # Example Usage
//!
//! ```
//! use engagement_core::{filter_view, Analytics, EngineConfig, FilterState, Snapshot};
//! use chrono::NaiveDate;
//!
//! let snapshot = Snapshot::from_json_str(r#"{
//!     "tables": {
//!         "up_users": { "data": [ {"id": 1, "tenho_conta": true} ] },
//!         "checkins": { "data": [ {"id": 10, "created_at": "2025-01-01T10:00:00Z"} ] },
//!         "checkins_users_permissions_user_lnk": { "data": [ {"checkin_id": 10, "user_id": 1} ] }
//!     }
//! }"#).unwrap();
//!
//! let filter = FilterState::new().with_has_account(Some(true));
//! let as_of = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
//! let view = filter_view(&snapshot, &filter, as_of);
//!
//! let analytics = Analytics::new(&view, &EngineConfig::new());
//! assert_eq!(analytics.metrics().total_checkins, 1);
//! assert_eq!(analytics.hourly_peaks(None).buckets[10].count, 1);
//! ```

// Public modules
pub mod analytics;
pub mod config;
pub mod filter;
pub mod relations;
pub mod schema;
pub mod snapshot;
pub mod source;
pub mod types;
pub mod view;

// Re-export main types for convenience
pub use analytics::Analytics;
pub use config::EngineConfig;
pub use filter::{AgeBand, FilterState};
pub use relations::Relations;
pub use schema::{EntityKind, LinkKind, Side};
pub use snapshot::{Link, Snapshot, SnapshotStats};
pub use source::TableSource;
pub use types::{EntityId, InsightsError, Record, Result, Timestamp};
pub use view::{filter_view, filter_view_ordered, CascadeOrder, FilteredView, Selection};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_basics() {
        // Smoke test: an empty snapshot filters and aggregates to zeros
        let snapshot = Snapshot::default();
        assert_eq!(snapshot.stats().num_records, 0);

        let view = FilteredView::unfiltered(&snapshot);
        let metrics = Analytics::new(&view, &EngineConfig::new()).metrics();
        assert_eq!(metrics.total_checkins, 0);
        assert_eq!(metrics.mean_rating, 0.0);
    }
}
