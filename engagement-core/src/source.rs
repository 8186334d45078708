//! Read-only access to a set of tables
//!
//! Relation lookups run either against the full [`Snapshot`] or against a
//! [`FilteredView`](crate::FilteredView). Both expose their rows through this
//! trait so the traversal code is written once.

use crate::schema::{EntityKind, LinkKind, Side};
use crate::snapshot::Snapshot;
use crate::types::{EntityId, Record};

/// Common trait for anything relation lookups can traverse
pub trait TableSource {
    /// Position of a visible record in its table, if any
    fn position_of(&self, kind: EntityKind, id: EntityId) -> Option<usize>;

    /// Visible record at a table position
    fn record_at(&self, kind: EntityKind, position: usize) -> Option<&Record>;

    /// Keys on the opposite side of every visible link whose `from` key is `id`,
    /// in link order
    fn linked_ids(&self, link: LinkKind, from: Side, id: EntityId) -> Vec<EntityId>;

    /// Visible record with the given id
    fn record(&self, kind: EntityKind, id: EntityId) -> Option<&Record> {
        self.position_of(kind, id)
            .and_then(|pos| self.record_at(kind, pos))
    }
}

impl TableSource for Snapshot {
    fn position_of(&self, kind: EntityKind, id: EntityId) -> Option<usize> {
        self.table(kind).position(id)
    }

    fn record_at(&self, kind: EntityKind, position: usize) -> Option<&Record> {
        self.table(kind).at(position)
    }

    fn linked_ids(&self, link: LinkKind, from: Side, id: EntityId) -> Vec<EntityId> {
        let table = self.link_table(link);
        let to = from.opposite();
        table
            .positions(from, id)
            .iter()
            .filter_map(|&pos| table.at(pos))
            .map(|l| l.key(to))
            .collect()
    }
}
