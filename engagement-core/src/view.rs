//! Filter engine
//!
//! Turns a [`Snapshot`] plus a [`FilterState`] into a [`FilteredView`]: the
//! referentially consistent subset of every table that survives the active
//! predicates.
//!
//! # Cascade
//!
//! 1. User-dimension predicates (`has_account`, `age_band`) pick a user id set;
//!    when both are set the sets are intersected.
//! 2. A selected activation narrows check-in links to that activation, then
//!    check-ins, check-in/user links and the redemptions of those users.
//! 3. The user set narrows check-in/user links, check-ins, check-in/activation
//!    links, redemption/user links, redemptions and redemption/prize links.
//! 4. Links left pointing at a filtered-out record are dropped.
//!
//! Steps 2 and 3 commute; [`filter_view_ordered`] runs them in either order so
//! that property stays checked. The published gate is never applied here.
//!
//! A view never copies records. It stores, per table, which row positions of
//! the snapshot survive.

use crate::filter::{AgeBand, FilterState};
use crate::schema::{attr, EntityKind, LinkKind, Side};
use crate::snapshot::{Link, Snapshot};
use crate::source::TableSource;
use crate::types::{EntityId, Record};
use chrono::NaiveDate;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::ops::Range;

/// Which rows of one table survive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Every row of the underlying table
    All,
    /// Only these positions (ascending, no duplicates)
    Only(Vec<usize>),
}

impl Selection {
    /// Iterate surviving positions of a table with `len` rows
    pub fn positions(&self, len: usize) -> SelectionIter<'_> {
        match self {
            Selection::All => SelectionIter::All(0..len),
            Selection::Only(positions) => SelectionIter::Only(positions.iter()),
        }
    }

    pub fn contains(&self, position: usize) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(positions) => positions.binary_search(&position).is_ok(),
        }
    }

    pub fn len(&self, table_len: usize) -> usize {
        match self {
            Selection::All => table_len,
            Selection::Only(positions) => positions.len(),
        }
    }

    pub fn is_restricted(&self) -> bool {
        matches!(self, Selection::Only(_))
    }

    /// Keep only positions for which `keep` returns true
    fn retain(&mut self, len: usize, mut keep: impl FnMut(usize) -> bool) {
        let kept: Vec<usize> = self.positions(len).filter(|&pos| keep(pos)).collect();
        *self = Selection::Only(kept);
    }
}

/// Iterator over the surviving positions of a [`Selection`]
pub enum SelectionIter<'s> {
    All(Range<usize>),
    Only(std::slice::Iter<'s, usize>),
}

impl Iterator for SelectionIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        match self {
            SelectionIter::All(range) => range.next(),
            SelectionIter::Only(iter) => iter.next().copied(),
        }
    }
}

/// Order in which the activation and user cascades run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeOrder {
    /// The defined order: activation cascade, then user cascade
    ActivationFirst,
    /// Reverse order; yields the same view
    UserFirst,
}

/// The subset of a snapshot that survives a filter state
///
/// Under a user predicate, evaluation, lucky number, coin guess and survey
/// links of filtered-out users are dropped too, so [`Relations`](crate::Relations)
/// lookups over a view narrow to the surviving users.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    snapshot: &'a Snapshot,
    filter: FilterState,
    /// Indexed by `EntityKind::index()`
    tables: Vec<Selection>,
    /// Indexed by `LinkKind::index()`
    links: Vec<Selection>,
}

/// Apply a filter state to a snapshot
///
/// `as_of` is the date ages are computed on. The function is pure: the same
/// inputs always produce equal views.
///
/// # Example
/// ```
/// use engagement_core::{filter_view, FilterState, Snapshot};
/// use chrono::NaiveDate;
///
/// let snapshot = Snapshot::from_json_str(r#"{"tables": {}}"#).unwrap();
/// let filter = FilterState::new().with_has_account(Some(true));
/// let today = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
///
/// let view = filter_view(&snapshot, &filter, today);
/// assert_eq!(view.len(engagement_core::EntityKind::Checkins), 0);
/// ```
pub fn filter_view<'a>(
    snapshot: &'a Snapshot,
    filter: &FilterState,
    as_of: NaiveDate,
) -> FilteredView<'a> {
    filter_view_ordered(snapshot, filter, as_of, CascadeOrder::ActivationFirst)
}

/// Apply a filter state, choosing the cascade order explicitly
pub fn filter_view_ordered<'a>(
    snapshot: &'a Snapshot,
    filter: &FilterState,
    as_of: NaiveDate,
    order: CascadeOrder,
) -> FilteredView<'a> {
    let mut view = FilteredView::unfiltered(snapshot);
    view.filter = *filter;

    if !filter.is_active() {
        return view;
    }

    let users = select_users(snapshot, filter, as_of);
    if let Some(users) = &users {
        view.restrict_table(EntityKind::Users, users);
    }

    match order {
        CascadeOrder::ActivationFirst => {
            if let Some(activation) = filter.selected_activation {
                view.activation_cascade(activation);
            }
            if let Some(users) = &users {
                view.user_cascade(users);
            }
        }
        CascadeOrder::UserFirst => {
            if let Some(users) = &users {
                view.user_cascade(users);
            }
            if let Some(activation) = filter.selected_activation {
                view.activation_cascade(activation);
            }
        }
    }

    view.prune_dangling_links();

    log::debug!(
        "Filtered view: {} of {} check-ins, {} of {} redemptions",
        view.len(EntityKind::Checkins),
        snapshot.table(EntityKind::Checkins).len(),
        view.len(EntityKind::Redemptions),
        snapshot.table(EntityKind::Redemptions).len()
    );
    view
}

/// User ids matching the user-dimension predicates, `None` if none are set
fn select_users(
    snapshot: &Snapshot,
    filter: &FilterState,
    as_of: NaiveDate,
) -> Option<HashSet<EntityId>> {
    if !filter.has_user_predicate() {
        return None;
    }

    let selected: HashSet<EntityId> = snapshot
        .table(EntityKind::Users)
        .records()
        .iter()
        .filter(|user| {
            filter
                .has_account
                .map_or(true, |wanted| user.flag(attr::HAS_ACCOUNT) == Some(wanted))
        })
        .filter(|user| {
            filter.age_band.map_or(true, |wanted| {
                AgeBand::classify(user.date(attr::BIRTH_DATE), as_of) == wanted
            })
        })
        .map(|user| user.id)
        .collect();

    log::trace!("User predicates matched {} users", selected.len());
    Some(selected)
}

impl<'a> FilteredView<'a> {
    /// A view in which every row survives
    pub fn unfiltered(snapshot: &'a Snapshot) -> Self {
        Self {
            snapshot,
            filter: FilterState::default(),
            tables: vec![Selection::All; EntityKind::ALL.len()],
            links: vec![Selection::All; LinkKind::ALL.len()],
        }
    }

    /// The snapshot this view was derived from
    pub fn snapshot(&self) -> &'a Snapshot {
        self.snapshot
    }

    /// The filter state this view was derived with
    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    /// Selection of an entity table
    pub fn selection(&self, kind: EntityKind) -> &Selection {
        &self.tables[kind.index()]
    }

    /// Selection of a link table
    pub fn link_selection(&self, kind: LinkKind) -> &Selection {
        &self.links[kind.index()]
    }

    /// Surviving records of a table, in snapshot order
    pub fn records(&self, kind: EntityKind) -> impl Iterator<Item = &'a Record> + '_ {
        let table = self.snapshot.table(kind);
        self.selection(kind)
            .positions(table.len())
            .filter_map(move |pos| table.at(pos))
    }

    /// Surviving links of a link table, in snapshot order
    pub fn links(&self, kind: LinkKind) -> impl Iterator<Item = &'a Link> + '_ {
        let table = self.snapshot.link_table(kind);
        self.link_selection(kind)
            .positions(table.len())
            .filter_map(move |pos| table.at(pos))
    }

    /// Number of surviving records of a table
    pub fn len(&self, kind: EntityKind) -> usize {
        self.selection(kind).len(self.snapshot.table(kind).len())
    }

    /// Number of surviving links of a link table
    pub fn link_len(&self, kind: LinkKind) -> usize {
        self.link_selection(kind)
            .len(self.snapshot.link_table(kind).len())
    }

    /// True if the record with this id survives
    pub fn contains(&self, kind: EntityKind, id: EntityId) -> bool {
        self.position_of(kind, id).is_some()
    }

    /// Surviving record with this id
    pub fn get(&self, kind: EntityKind, id: EntityId) -> Option<&'a Record> {
        let table = self.snapshot.table(kind);
        table
            .position(id)
            .filter(|&pos| self.selection(kind).contains(pos))
            .and_then(|pos| table.at(pos))
    }

    /// Copy the surviving rows into a document shaped like the loader input
    pub fn materialize(&self) -> Value {
        let mut tables = Map::new();

        for kind in EntityKind::ALL {
            let data: Vec<Value> = self
                .records(kind)
                .map(|record| {
                    let mut row = record.attributes.clone();
                    row.insert("id".to_string(), json!(record.id));
                    Value::Object(row)
                })
                .collect();
            tables.insert(kind.table_name().to_string(), json!({ "data": data }));
        }

        for kind in LinkKind::ALL {
            let (left, right) = (kind.left().column, kind.right().column);
            let data: Vec<Value> = self
                .links(kind)
                .map(|link| {
                    let mut row = Map::new();
                    row.insert(left.to_string(), json!(link.left));
                    row.insert(right.to_string(), json!(link.right));
                    Value::Object(row)
                })
                .collect();
            tables.insert(kind.table_name().to_string(), json!({ "data": data }));
        }

        json!({ "tables": tables })
    }

    /// Ids on one side of the surviving links of a link table
    fn link_keys(&self, kind: LinkKind, side: Side) -> HashSet<EntityId> {
        self.links(kind).map(|link| link.key(side)).collect()
    }

    fn restrict_table(&mut self, kind: EntityKind, ids: &HashSet<EntityId>) {
        let snapshot = self.snapshot;
        let table = snapshot.table(kind);
        self.tables[kind.index()].retain(table.len(), |pos| {
            table.at(pos).is_some_and(|record| ids.contains(&record.id))
        });
        log::trace!("{} narrowed to {} rows", kind, self.len(kind));
    }

    fn restrict_links(&mut self, kind: LinkKind, mut keep: impl FnMut(&Link) -> bool) {
        let snapshot = self.snapshot;
        let table = snapshot.link_table(kind);
        self.links[kind.index()].retain(table.len(), |pos| {
            table.at(pos).map_or(false, |link| keep(link))
        });
        log::trace!("{} narrowed to {} links", kind, self.link_len(kind));
    }

    fn activation_cascade(&mut self, activation: EntityId) {
        self.restrict_links(LinkKind::CheckinActivation, |l| l.right == activation);
        let checkins = self.link_keys(LinkKind::CheckinActivation, Side::Left);
        self.restrict_table(EntityKind::Checkins, &checkins);

        self.restrict_links(LinkKind::CheckinUser, |l| checkins.contains(&l.left));
        let users = self.link_keys(LinkKind::CheckinUser, Side::Right);

        self.restrict_links(LinkKind::RedemptionUser, |l| users.contains(&l.right));
        let redemptions = self.link_keys(LinkKind::RedemptionUser, Side::Left);
        self.restrict_table(EntityKind::Redemptions, &redemptions);
    }

    fn user_cascade(&mut self, users: &HashSet<EntityId>) {
        self.restrict_links(LinkKind::CheckinUser, |l| users.contains(&l.right));
        let checkins = self.link_keys(LinkKind::CheckinUser, Side::Left);
        self.restrict_table(EntityKind::Checkins, &checkins);
        self.restrict_links(LinkKind::CheckinActivation, |l| checkins.contains(&l.left));

        self.restrict_links(LinkKind::RedemptionUser, |l| users.contains(&l.right));
        let redemptions = self.link_keys(LinkKind::RedemptionUser, Side::Left);
        self.restrict_table(EntityKind::Redemptions, &redemptions);
        self.restrict_links(LinkKind::RedemptionPrize, |l| redemptions.contains(&l.left));
    }

    /// Drop links whose endpoint sits in a narrowed table but did not survive
    fn prune_dangling_links(&mut self) {
        for kind in LinkKind::ALL {
            let left = kind.left().kind;
            let right = kind.right().kind;
            let check_left = self.selection(left).is_restricted();
            let check_right = self.selection(right).is_restricted();
            if !check_left && !check_right {
                continue;
            }

            let left_ids: HashSet<EntityId> = if check_left {
                self.records(left).map(|r| r.id).collect()
            } else {
                HashSet::new()
            };
            let right_ids: HashSet<EntityId> = if check_right {
                self.records(right).map(|r| r.id).collect()
            } else {
                HashSet::new()
            };

            self.restrict_links(kind, |l| {
                (!check_left || left_ids.contains(&l.left))
                    && (!check_right || right_ids.contains(&l.right))
            });
        }
    }
}

impl PartialEq for FilteredView<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.snapshot, other.snapshot)
            && self.filter == other.filter
            && self.tables == other.tables
            && self.links == other.links
    }
}

impl Eq for FilteredView<'_> {}

impl TableSource for FilteredView<'_> {
    fn position_of(&self, kind: EntityKind, id: EntityId) -> Option<usize> {
        self.snapshot
            .table(kind)
            .position(id)
            .filter(|&pos| self.selection(kind).contains(pos))
    }

    fn record_at(&self, kind: EntityKind, position: usize) -> Option<&Record> {
        if self.selection(kind).contains(position) {
            self.snapshot.table(kind).at(position)
        } else {
            None
        }
    }

    fn linked_ids(&self, link: LinkKind, from: Side, id: EntityId) -> Vec<EntityId> {
        let table = self.snapshot.link_table(link);
        let selection = self.link_selection(link);
        let to = from.opposite();
        table
            .positions(from, id)
            .iter()
            .filter(|&&pos| selection.contains(pos))
            .filter_map(|&pos| table.at(pos))
            .map(|l| l.key(to))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn snapshot() -> Snapshot {
        Snapshot::from_document(json!({
            "tables": {
                "up_users": { "data": [
                    {"id": 1, "tenho_conta": true, "data_usuario": "2000-01-01"},
                    {"id": 2, "tenho_conta": false, "data_usuario": "2010-01-01"},
                    {"id": 3, "tenho_conta": true}
                ]},
                "checkins": { "data": [
                    {"id": 10}, {"id": 11}, {"id": 12}, {"id": 13}
                ]},
                "checkins_users_permissions_user_lnk": { "data": [
                    {"checkin_id": 10, "user_id": 1},
                    {"checkin_id": 11, "user_id": 2},
                    {"checkin_id": 12, "user_id": 1},
                    {"checkin_id": 13, "user_id": 3}
                ]},
                "checkins_ativacao_lnk": { "data": [
                    {"checkin_id": 10, "ativacao_id": 5},
                    {"checkin_id": 11, "ativacao_id": 5},
                    {"checkin_id": 12, "ativacao_id": 6},
                    {"checkin_id": 13, "ativacao_id": 6}
                ]},
                "resgates": { "data": [ {"id": 20}, {"id": 21} ]},
                "resgates_users_permissions_user_lnk": { "data": [
                    {"resgate_id": 20, "user_id": 1},
                    {"resgate_id": 21, "user_id": 3}
                ]},
                "resgates_brinde_lnk": { "data": [
                    {"resgate_id": 20, "brinde_id": 30},
                    {"resgate_id": 21, "brinde_id": 30}
                ]}
            }
        }))
        .unwrap()
    }

    fn ids<'a>(records: impl Iterator<Item = &'a Record>) -> Vec<EntityId> {
        records.map(|r| r.id).collect()
    }

    #[test]
    fn test_no_filter_is_unfiltered() {
        let snapshot = snapshot();
        let view = filter_view(&snapshot, &FilterState::new(), as_of());
        assert_eq!(view, FilteredView::unfiltered(&snapshot));
        assert_eq!(view.len(EntityKind::Checkins), 4);
    }

    #[test]
    fn test_has_account_cascade() {
        let snapshot = snapshot();
        let filter = FilterState::new().with_has_account(Some(true));
        let view = filter_view(&snapshot, &filter, as_of());

        assert_eq!(ids(view.records(EntityKind::Users)), vec![1, 3]);
        assert_eq!(ids(view.records(EntityKind::Checkins)), vec![10, 12, 13]);
        assert_eq!(view.link_len(LinkKind::CheckinActivation), 3);
        assert_eq!(ids(view.records(EntityKind::Redemptions)), vec![20, 21]);
    }

    #[test]
    fn test_activation_cascade() {
        let snapshot = snapshot();
        let filter = FilterState::new().with_selected_activation(Some(6));
        let view = filter_view(&snapshot, &filter, as_of());

        assert_eq!(ids(view.records(EntityKind::Checkins)), vec![12, 13]);
        // Users are not narrowed by the activation cascade
        assert_eq!(view.len(EntityKind::Users), 3);
        assert_eq!(ids(view.records(EntityKind::Redemptions)), vec![20, 21]);
    }

    #[test]
    fn test_combined_filters_intersect() {
        let snapshot = snapshot();
        let filter = FilterState::new()
            .with_selected_activation(Some(5))
            .with_age_band(Some(AgeBand::From18To24));
        let view = filter_view(&snapshot, &filter, as_of());

        assert_eq!(ids(view.records(EntityKind::Users)), vec![1]);
        assert_eq!(ids(view.records(EntityKind::Checkins)), vec![10]);
        assert_eq!(ids(view.records(EntityKind::Redemptions)), vec![20]);
        let prize_links: Vec<_> = view.links(LinkKind::RedemptionPrize).copied().collect();
        assert_eq!(prize_links, vec![Link::new(20, 30)]);

        let reversed = filter_view_ordered(&snapshot, &filter, as_of(), CascadeOrder::UserFirst);
        assert_eq!(view, reversed);
    }

    #[test]
    fn test_empty_candidates_yield_empty_tables() {
        let snapshot = snapshot();
        let filter = FilterState::new().with_age_band(Some(AgeBand::SixtyPlus));
        let view = filter_view(&snapshot, &filter, as_of());

        assert_eq!(view.len(EntityKind::Users), 0);
        assert_eq!(view.len(EntityKind::Checkins), 0);
        assert_eq!(view.len(EntityKind::Redemptions), 0);
        assert_eq!(view.link_len(LinkKind::CheckinUser), 0);
    }

    #[test]
    fn test_materialize_shape() {
        let snapshot = snapshot();
        let filter = FilterState::new().with_selected_activation(Some(5));
        let document = filter_view(&snapshot, &filter, as_of()).materialize();

        assert_eq!(
            document["tables"]["checkins"]["data"],
            json!([{"id": 10}, {"id": 11}])
        );
        assert_eq!(
            document["tables"]["checkins_ativacao_lnk"]["data"][0],
            json!({"checkin_id": 10, "ativacao_id": 5})
        );

        // The materialized document loads back into an equivalent snapshot
        let reloaded = Snapshot::from_document(document).unwrap();
        assert_eq!(reloaded.table(EntityKind::Checkins).len(), 2);
    }
}
