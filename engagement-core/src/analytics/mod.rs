//! Aggregation engine
//!
//! Derived series over a [`FilteredView`]: headline metrics, check-ins per
//! activation and per day, hourly peaks, redemptions per prize, the
//! registration funnel and filter coverage. Every grouped series goes through
//! [`grouping::GroupTally`].
//!
//! Nothing here reads the raw snapshot except [`Analytics::filter_stats`],
//! which compares the view against it.

pub mod bucketing;
pub mod grouping;
pub mod series;

pub use series::{
    ActivationCheckins, Dashboard, DayCheckins, DayOption, FilterStats, FunnelStage,
    HourBucket, HourlyPeaks, Metrics, PrizeRedemptions,
};

use crate::config::EngineConfig;
use crate::schema::{attr, EntityKind, LinkKind, Side};
use crate::source::TableSource;
use crate::types::{EntityId, Record};
use crate::view::FilteredView;
use bucketing::{day_label, day_of, hour_label, hour_of, HOURS_PER_DAY};
use chrono::{FixedOffset, NaiveDate};
use grouping::{percentage, GroupTally, Mean};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Decimals kept in every mean produced here
const MEAN_DECIMALS: u32 = 2;

/// Number of activations shown on the dashboard
pub const DASHBOARD_TOP_ACTIVATIONS: usize = 10;

const REGISTERED_STAGE: &str = "Registered users";
const REGISTERED_COLOR: &str = "#0d6efd";
const CHECKIN_STAGE: &str = "Check-ins";
const CHECKIN_COLOR: &str = "#198754";

/// Aggregations over one filtered view
pub struct Analytics<'v, 'a> {
    view: &'v FilteredView<'a>,
    offset: FixedOffset,
}

impl<'v, 'a> Analytics<'v, 'a> {
    pub fn new(view: &'v FilteredView<'a>, config: &EngineConfig) -> Self {
        Self {
            view,
            offset: config.time_offset(),
        }
    }

    /// The view being aggregated
    pub fn view(&self) -> &'v FilteredView<'a> {
        self.view
    }

    /// Headline numbers
    pub fn metrics(&self) -> Metrics {
        let users: HashSet<EntityId> = self
            .view
            .links(LinkKind::CheckinUser)
            .map(|link| link.right)
            .collect();

        let mean: Mean = self
            .view
            .records(EntityKind::Evaluations)
            .filter_map(published_rating)
            .collect();

        Metrics {
            users_with_checkins: users.len(),
            total_checkins: self.view.len(EntityKind::Checkins),
            total_redemptions: self.view.len(EntityKind::Redemptions),
            published_activations: self
                .view
                .records(EntityKind::Activations)
                .filter(|activation| activation.is_published())
                .count(),
            mean_rating: mean.rounded(MEAN_DECIMALS),
        }
    }

    /// Check-ins per published activation, busiest first
    ///
    /// Activations without a check-in link are absent, not zero.
    pub fn checkins_by_activation(&self) -> Vec<ActivationCheckins> {
        let mut tally = GroupTally::new();
        for link in self.view.links(LinkKind::CheckinActivation) {
            if self.published_activation(link.right).is_some() {
                tally.count(link.right);
            }
        }

        for link in self.view.links(LinkKind::EvaluationActivation) {
            if !tally.contains(&link.right) {
                continue;
            }
            let rating = self
                .view
                .get(EntityKind::Evaluations, link.left)
                .and_then(published_rating);
            tally.sample(&link.right, rating);
        }

        tally
            .sorted_by_count()
            .into_iter()
            .map(|group| {
                let activation = self.published_activation(group.key);
                ActivationCheckins {
                    id: group.key,
                    name: activation
                        .and_then(|a| a.text(attr::NAME))
                        .map_or_else(|| format!("Activation {}", group.key), str::to_string),
                    checkins: group.count,
                    mean_rating: group.mean.rounded(MEAN_DECIMALS),
                    kind: activation
                        .and_then(|a| a.text(attr::KIND))
                        .map(str::to_string),
                    location: activation
                        .and_then(|a| a.text(attr::LOCATION))
                        .map(str::to_string),
                    points: activation
                        .and_then(|a| a.number(attr::SCORE))
                        .unwrap_or(0.0),
                }
            })
            .collect()
    }

    /// The `n` busiest activations
    pub fn top_activations(&self, n: usize) -> Vec<ActivationCheckins> {
        let mut activations = self.checkins_by_activation();
        activations.truncate(n);
        activations
    }

    /// Check-ins per local calendar day, oldest first
    ///
    /// Each day's mean rating covers evaluations written by that day's
    /// checked-in users on the same day.
    pub fn checkins_by_day(&self) -> Vec<DayCheckins> {
        let mut tally = GroupTally::new();
        let mut users_by_day: HashMap<NaiveDate, Vec<EntityId>> = HashMap::new();

        for checkin in self.view.records(EntityKind::Checkins) {
            let Some(created) = checkin.timestamp(attr::CREATED_AT) else {
                continue;
            };
            let day = day_of(created, self.offset);
            tally.count(day);

            let user = self
                .view
                .linked_ids(LinkKind::CheckinUser, Side::Left, checkin.id)
                .first()
                .copied();
            if let Some(user) = user {
                let users = users_by_day.entry(day).or_default();
                if !users.contains(&user) {
                    users.push(user);
                }
            }
        }

        for (day, users) in &users_by_day {
            for &user in users {
                for evaluation in self.view.linked_ids(LinkKind::EvaluationUser, Side::Right, user) {
                    let Some(evaluation) = self.view.get(EntityKind::Evaluations, evaluation) else {
                        continue;
                    };
                    let same_day = evaluation
                        .timestamp(attr::CREATED_AT)
                        .is_some_and(|created| day_of(created, self.offset) == *day);
                    if same_day {
                        tally.sample(day, evaluation.number(attr::RATING));
                    }
                }
            }
        }

        tally
            .sorted_by_key()
            .into_iter()
            .map(|group| DayCheckins {
                date: group.key,
                label: day_label(group.key),
                checkins: group.count,
                mean_rating: group.mean.rounded(MEAN_DECIMALS),
            })
            .collect()
    }

    /// Check-ins per local hour of day, optionally for a single day
    ///
    /// The day list always covers every check-in, whatever `day` is.
    pub fn hourly_peaks(&self, day: Option<NaiveDate>) -> HourlyPeaks {
        let mut counts = [0usize; HOURS_PER_DAY];
        let mut days = BTreeSet::new();

        for checkin in self.view.records(EntityKind::Checkins) {
            let Some(created) = checkin.timestamp(attr::CREATED_AT) else {
                continue;
            };
            let checkin_day = day_of(created, self.offset);
            days.insert(checkin_day);
            if day.map_or(true, |wanted| wanted == checkin_day) {
                counts[hour_of(created, self.offset) as usize] += 1;
            }
        }

        HourlyPeaks {
            buckets: counts
                .iter()
                .enumerate()
                .map(|(hour, &count)| HourBucket {
                    hour: hour as u32,
                    label: hour_label(hour as u32),
                    count,
                })
                .collect(),
            days: days
                .into_iter()
                .map(|value| DayOption {
                    value,
                    label: day_label(value),
                })
                .collect(),
        }
    }

    /// Redemption links per prize, most redeemed first
    ///
    /// Display fields come from the prize only when it is published.
    pub fn redemptions_by_prize(&self) -> Vec<PrizeRedemptions> {
        let mut tally = GroupTally::new();
        for link in self.view.links(LinkKind::RedemptionPrize) {
            tally.count(link.right);
        }

        tally
            .sorted_by_count()
            .into_iter()
            .map(|group| {
                let prize = self
                    .view
                    .get(EntityKind::Prizes, group.key)
                    .filter(|prize| prize.is_published());
                PrizeRedemptions {
                    id: group.key,
                    title: prize
                        .and_then(|p| p.text(attr::TITLE))
                        .map_or_else(|| format!("Prize {}", group.key), str::to_string),
                    redemptions: group.count,
                    points: prize.and_then(|p| p.number(attr::POINTS)).unwrap_or(0.0),
                    stock: prize.and_then(|p| p.number(attr::STOCK)).unwrap_or(0.0),
                }
            })
            .collect()
    }

    /// Registered users versus check-ins
    pub fn funnel(&self) -> Vec<FunnelStage> {
        let users = self.view.len(EntityKind::Users);
        let checkins = self.view.len(EntityKind::Checkins);
        let largest = users.max(checkins);

        vec![
            FunnelStage {
                stage: REGISTERED_STAGE.to_string(),
                count: users,
                percentage: percentage(users, largest),
                color: REGISTERED_COLOR.to_string(),
            },
            FunnelStage {
                stage: CHECKIN_STAGE.to_string(),
                count: checkins,
                percentage: percentage(checkins, largest),
                color: CHECKIN_COLOR.to_string(),
            },
        ]
    }

    /// Share of all check-ins the current filter keeps
    pub fn filter_stats(&self) -> FilterStats {
        let total = self.view.snapshot().table(EntityKind::Checkins).len();
        let filtered = self.view.len(EntityKind::Checkins);
        FilterStats {
            total,
            filtered,
            percentage: percentage(filtered, total),
            has_active_filters: self.view.filter().is_active(),
        }
    }

    /// Every dashboard series at once
    pub fn dashboard(&self, day: Option<NaiveDate>) -> Dashboard {
        Dashboard {
            metrics: self.metrics(),
            top_activations: self.top_activations(DASHBOARD_TOP_ACTIVATIONS),
            checkins_by_day: self.checkins_by_day(),
            hourly_peaks: self.hourly_peaks(day),
            redemptions_by_prize: self.redemptions_by_prize(),
            funnel: self.funnel(),
            filter_stats: self.filter_stats(),
        }
    }

    fn published_activation(&self, id: EntityId) -> Option<&'a Record> {
        self.view
            .get(EntityKind::Activations, id)
            .filter(|activation| activation.is_published())
    }
}

/// Rating of a published evaluation, if it has one
fn published_rating(evaluation: &Record) -> Option<f64> {
    if evaluation.is_published() {
        evaluation.number(attr::RATING)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterState;
    use crate::snapshot::Snapshot;
    use crate::view::filter_view;
    use serde_json::{json, Value};

    const T: &str = "2025-01-01T00:00:00Z";

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn load(tables: Value) -> Snapshot {
        Snapshot::from_document(json!({ "tables": tables })).unwrap()
    }

    fn analyze<R>(snapshot: &Snapshot, filter: FilterState, f: impl FnOnce(&Analytics) -> R) -> R {
        let view = filter_view(snapshot, &filter, as_of());
        let analytics = Analytics::new(&view, &EngineConfig::new());
        f(&analytics)
    }

    fn dashboard_snapshot() -> Snapshot {
        load(json!({
            "up_users": { "data": [
                {"id": 1, "tenho_conta": true},
                {"id": 2, "tenho_conta": false}
            ]},
            "checkins": { "data": [
                {"id": 10, "created_at": "2025-01-01T10:00:00Z"},
                {"id": 11, "created_at": "2025-01-01T23:00:00Z"},
                {"id": 12, "created_at": "2025-01-02T10:30:00Z"},
                {"id": 13}
            ]},
            "checkins_users_permissions_user_lnk": { "data": [
                {"checkin_id": 10, "user_id": 1},
                {"checkin_id": 11, "user_id": 2},
                {"checkin_id": 12, "user_id": 1},
                {"checkin_id": 13, "user_id": 1}
            ]},
            "checkins_ativacao_lnk": { "data": [
                {"checkin_id": 10, "ativacao_id": 6},
                {"checkin_id": 11, "ativacao_id": 5},
                {"checkin_id": 12, "ativacao_id": 5},
                {"checkin_id": 13, "ativacao_id": 7}
            ]},
            "ativacoes": { "data": [
                {"id": 5, "nome": "Photo booth", "tipo": "game", "pontuacao": 10, "published_at": T},
                {"id": 6, "published_at": T},
                {"id": 7, "nome": "Draft", "published_at": null},
                {"id": 8, "nome": "Unvisited", "published_at": T}
            ]},
            "avaliacao_de_ativacaos": { "data": [
                {"id": 60, "avaliacao": 4, "published_at": T, "created_at": "2025-01-01T12:00:00Z"},
                {"id": 61, "avaliacao": 5, "published_at": T, "created_at": "2025-01-02T12:00:00Z"},
                {"id": 62, "avaliacao": 1, "published_at": null, "created_at": "2025-01-01T13:00:00Z"}
            ]},
            "avaliacao_de_ativacaos_ativacao_lnk": { "data": [
                {"avaliacao_de_ativacao_id": 60, "ativacao_id": 5},
                {"avaliacao_de_ativacao_id": 61, "ativacao_id": 5},
                {"avaliacao_de_ativacao_id": 62, "ativacao_id": 5}
            ]},
            "avaliacao_de_ativacaos_users_permissions_user_lnk": { "data": [
                {"avaliacao_de_ativacao_id": 60, "user_id": 1},
                {"avaliacao_de_ativacao_id": 61, "user_id": 1},
                {"avaliacao_de_ativacao_id": 62, "user_id": 2}
            ]},
            "resgates": { "data": [ {"id": 20}, {"id": 21}, {"id": 22} ]},
            "resgates_users_permissions_user_lnk": { "data": [
                {"resgate_id": 20, "user_id": 1},
                {"resgate_id": 21, "user_id": 2},
                {"resgate_id": 22, "user_id": 2}
            ]},
            "resgates_brinde_lnk": { "data": [
                {"resgate_id": 20, "brinde_id": 31},
                {"resgate_id": 21, "brinde_id": 30},
                {"resgate_id": 22, "brinde_id": 30}
            ]},
            "brindes": { "data": [
                {"id": 30, "titulo": "Cap", "pontos": 50, "estoque": 3, "published_at": T},
                {"id": 31, "titulo": "Mug", "pontos": 80}
            ]}
        }))
    }

    /// Three published ratings (4, 5, 5) for one activation on one day
    fn uneven_rating_snapshot() -> Snapshot {
        load(json!({
            "up_users": { "data": [ {"id": 1}, {"id": 2}, {"id": 3} ]},
            "checkins": { "data": [
                {"id": 10, "created_at": "2025-03-01T09:00:00Z"},
                {"id": 11, "created_at": "2025-03-01T10:00:00Z"},
                {"id": 12, "created_at": "2025-03-01T11:00:00Z"}
            ]},
            "checkins_users_permissions_user_lnk": { "data": [
                {"checkin_id": 10, "user_id": 1},
                {"checkin_id": 11, "user_id": 2},
                {"checkin_id": 12, "user_id": 3}
            ]},
            "checkins_ativacao_lnk": { "data": [
                {"checkin_id": 10, "ativacao_id": 5},
                {"checkin_id": 11, "ativacao_id": 5},
                {"checkin_id": 12, "ativacao_id": 5}
            ]},
            "ativacoes": { "data": [ {"id": 5, "nome": "Quiz", "published_at": T} ]},
            "avaliacao_de_ativacaos": { "data": [
                {"id": 70, "avaliacao": 4, "published_at": T, "created_at": "2025-03-01T12:00:00Z"},
                {"id": 71, "avaliacao": 5, "published_at": T, "created_at": "2025-03-01T12:00:00Z"},
                {"id": 72, "avaliacao": 5, "published_at": T, "created_at": "2025-03-01T12:00:00Z"}
            ]},
            "avaliacao_de_ativacaos_ativacao_lnk": { "data": [
                {"avaliacao_de_ativacao_id": 70, "ativacao_id": 5},
                {"avaliacao_de_ativacao_id": 71, "ativacao_id": 5},
                {"avaliacao_de_ativacao_id": 72, "ativacao_id": 5}
            ]},
            "avaliacao_de_ativacaos_users_permissions_user_lnk": { "data": [
                {"avaliacao_de_ativacao_id": 70, "user_id": 1},
                {"avaliacao_de_ativacao_id": 71, "user_id": 2},
                {"avaliacao_de_ativacao_id": 72, "user_id": 3}
            ]}
        }))
    }

    #[test]
    fn test_series_means_round_to_two_decimals() {
        let snapshot = uneven_rating_snapshot();

        let metrics = analyze(&snapshot, FilterState::new(), |a| a.metrics());
        assert_eq!(metrics.mean_rating, 4.67);

        let activations = analyze(&snapshot, FilterState::new(), |a| a.checkins_by_activation());
        assert_eq!(activations.len(), 1);
        assert_eq!(activations[0].checkins, 3);
        assert_eq!(activations[0].mean_rating, 4.67);

        let days = analyze(&snapshot, FilterState::new(), |a| a.checkins_by_day());
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].checkins, 3);
        assert_eq!(days[0].mean_rating, 4.67);
    }

    #[test]
    fn test_metrics() {
        let snapshot = dashboard_snapshot();
        let metrics = analyze(&snapshot, FilterState::new(), |a| a.metrics());

        assert_eq!(metrics.users_with_checkins, 2);
        assert_eq!(metrics.total_checkins, 4);
        assert_eq!(metrics.total_redemptions, 3);
        assert_eq!(metrics.published_activations, 3);
        assert_eq!(metrics.mean_rating, 4.5);
    }

    #[test]
    fn test_metrics_mean_ignores_unpublished() {
        let snapshot = load(json!({
            "avaliacao_de_ativacaos": { "data": [
                {"id": 1, "avaliacao": 4, "published_at": T},
                {"id": 2, "avaliacao": 5, "published_at": null}
            ]}
        }));
        let metrics = analyze(&snapshot, FilterState::new(), |a| a.metrics());
        assert_eq!(metrics.mean_rating, 4.0);
    }

    #[test]
    fn test_checkins_by_activation() {
        let snapshot = dashboard_snapshot();
        let series = analyze(&snapshot, FilterState::new(), |a| a.checkins_by_activation());

        let ids: Vec<_> = series.iter().map(|s| s.id).collect();
        // 7 is unpublished and 8 has no check-ins
        assert_eq!(ids, vec![5, 6]);

        assert_eq!(series[0].name, "Photo booth");
        assert_eq!(series[0].checkins, 2);
        assert_eq!(series[0].mean_rating, 4.5);
        assert_eq!(series[0].kind.as_deref(), Some("game"));
        assert_eq!(series[0].points, 10.0);

        assert_eq!(series[1].name, "Activation 6");
        assert_eq!(series[1].mean_rating, 0.0);
        assert_eq!(series[1].location, None);
    }

    #[test]
    fn test_checkins_by_activation_ties_keep_first_seen_order() {
        let snapshot = load(json!({
            "ativacoes": { "data": [
                {"id": 1, "published_at": T},
                {"id": 2, "published_at": T}
            ]},
            "checkins_ativacao_lnk": { "data": [
                {"checkin_id": 10, "ativacao_id": 2},
                {"checkin_id": 11, "ativacao_id": 1}
            ]}
        }));
        let series = analyze(&snapshot, FilterState::new(), |a| a.checkins_by_activation());
        let ids: Vec<_> = series.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn test_top_activations() {
        let snapshot = dashboard_snapshot();
        let top = analyze(&snapshot, FilterState::new(), |a| a.top_activations(1));
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].id, 5);
    }

    #[test]
    fn test_checkins_by_day() {
        let snapshot = dashboard_snapshot();
        let days = analyze(&snapshot, FilterState::new(), |a| a.checkins_by_day());

        assert_eq!(days.len(), 2);
        assert_eq!(days[0].label, "01/01/2025");
        assert_eq!(days[0].checkins, 2);
        // Evaluations 60 (user 1) and 62 (user 2) were written on Jan 1
        assert_eq!(days[0].mean_rating, 2.5);
        assert_eq!(days[1].date, NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());
        assert_eq!(days[1].checkins, 1);
        assert_eq!(days[1].mean_rating, 5.0);
    }

    #[test]
    fn test_checkins_by_day_uses_configured_offset() {
        let snapshot = dashboard_snapshot();
        let view = filter_view(&snapshot, &FilterState::new(), as_of());
        let config = EngineConfig::new().with_utc_offset_minutes(-180);
        let days = Analytics::new(&view, &config).checkins_by_day();

        // 2025-01-01T23:00Z is 20:00 local; 10:00Z checkins stay on their day
        let counts: Vec<_> = days.iter().map(|d| (d.label.as_str(), d.checkins)).collect();
        assert_eq!(counts, vec![("01/01/2025", 2), ("02/01/2025", 1)]);
    }

    #[test]
    fn test_hourly_peaks() {
        let snapshot = load(json!({
            "checkins": { "data": [
                {"id": 10, "created_at": "2025-01-01T10:00:00Z"},
                {"id": 11, "created_at": "2025-01-01T23:00:00Z"}
            ]}
        }));
        let peaks = analyze(&snapshot, FilterState::new(), |a| a.hourly_peaks(None));

        assert_eq!(peaks.buckets.len(), 24);
        for bucket in &peaks.buckets {
            let expected = if bucket.hour == 10 || bucket.hour == 23 { 1 } else { 0 };
            assert_eq!(bucket.count, expected, "hour {}", bucket.hour);
        }
        assert_eq!(peaks.buckets[23].label, "23:00");
        assert_eq!(peaks.days.len(), 1);
    }

    #[test]
    fn test_hourly_peaks_for_one_day() {
        let snapshot = dashboard_snapshot();
        let day = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let peaks = analyze(&snapshot, FilterState::new(), |a| a.hourly_peaks(Some(day)));

        let total: usize = peaks.buckets.iter().map(|b| b.count).sum();
        assert_eq!(total, 1);
        assert_eq!(peaks.buckets[10].count, 1);
        // Day list is unaffected by the selected day
        let labels: Vec<_> = peaks.days.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, vec!["01/01/2025", "02/01/2025"]);
    }

    #[test]
    fn test_redemptions_by_prize() {
        let snapshot = dashboard_snapshot();
        let prizes = analyze(&snapshot, FilterState::new(), |a| a.redemptions_by_prize());

        assert_eq!(prizes.len(), 2);
        assert_eq!(prizes[0].id, 30);
        assert_eq!(prizes[0].title, "Cap");
        assert_eq!(prizes[0].redemptions, 2);
        assert_eq!(prizes[0].stock, 3.0);
        // Unpublished prize keeps its count but loses its display fields
        assert_eq!(prizes[1].title, "Prize 31");
        assert_eq!(prizes[1].points, 0.0);
    }

    #[test]
    fn test_redemptions_by_prize_follow_user_filter() {
        let snapshot = dashboard_snapshot();
        let filter = FilterState::new().with_has_account(Some(true));
        let prizes = analyze(&snapshot, filter, |a| a.redemptions_by_prize());

        assert_eq!(prizes.len(), 1);
        assert_eq!(prizes[0].id, 31);
    }

    #[test]
    fn test_funnel() {
        let users: Vec<Value> = (1..=100).map(|id| json!({"id": id})).collect();
        let checkins: Vec<Value> = (1..=40).map(|id| json!({"id": id})).collect();
        let snapshot = load(json!({
            "up_users": { "data": users },
            "checkins": { "data": checkins }
        }));
        let funnel = analyze(&snapshot, FilterState::new(), |a| a.funnel());

        assert_eq!(funnel[0].count, 100);
        assert_eq!(funnel[0].percentage, 100);
        assert_eq!(funnel[0].color, "#0d6efd");
        assert_eq!(funnel[1].count, 40);
        assert_eq!(funnel[1].percentage, 40);
    }

    #[test]
    fn test_funnel_empty() {
        let snapshot = Snapshot::default();
        let funnel = analyze(&snapshot, FilterState::new(), |a| a.funnel());
        assert!(funnel.iter().all(|stage| stage.percentage == 0));
    }

    #[test]
    fn test_filter_stats() {
        let snapshot = dashboard_snapshot();
        let stats = analyze(&snapshot, FilterState::new(), |a| a.filter_stats());
        assert_eq!(stats.total, 4);
        assert_eq!(stats.filtered, 4);
        assert_eq!(stats.percentage, 100);
        assert!(!stats.has_active_filters);

        let filter = FilterState::new().with_selected_activation(Some(5));
        let stats = analyze(&snapshot, filter, |a| a.filter_stats());
        assert_eq!(stats.filtered, 2);
        assert_eq!(stats.percentage, 50);
        assert!(stats.has_active_filters);

        let empty = Snapshot::default();
        let stats = analyze(&empty, FilterState::new(), |a| a.filter_stats());
        assert_eq!(stats.percentage, 0);
    }

    #[test]
    fn test_dashboard_serializes() {
        let snapshot = dashboard_snapshot();
        let dashboard = analyze(&snapshot, FilterState::new(), |a| a.dashboard(None));
        let json = serde_json::to_value(&dashboard).unwrap();

        assert_eq!(json["metrics"]["total_checkins"], 4);
        assert_eq!(json["top_activations"][0]["name"], "Photo booth");
        assert_eq!(json["checkins_by_day"][0]["date"], "2025-01-01");
        assert_eq!(json["hourly_peaks"]["buckets"].as_array().map(Vec::len), Some(24));
    }
}
