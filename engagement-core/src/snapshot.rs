//! Immutable in-memory snapshot of every entity and link table
//!
//! Built once from the loader document. All id indices are computed here at
//! load time so that filtering and relation lookups never scan a table to find
//! a record by id.

use crate::schema::{EntityKind, LinkKind, Side};
use crate::types::{integer, EntityId, InsightsError, Record, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// One row of a link table: a pair of foreign keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Link {
    /// Foreign key into the link's left entity kind
    pub left: EntityId,
    /// Foreign key into the link's right entity kind
    pub right: EntityId,
}

impl Link {
    pub fn new(left: EntityId, right: EntityId) -> Self {
        Self { left, right }
    }

    /// Foreign key on the given side
    pub fn key(&self, side: Side) -> EntityId {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
}

/// An ordered entity table with an id index
#[derive(Debug, Clone)]
pub struct Table {
    records: Vec<Record>,
    /// Key: record id, Value: position in `records`
    positions: HashMap<EntityId, usize>,
}

impl Table {
    fn new(kind: EntityKind, rows: Vec<Value>) -> Self {
        let mut records = Vec::with_capacity(rows.len());
        let mut positions = HashMap::with_capacity(rows.len());

        for row in rows {
            let Some(record) = Record::from_value(row) else {
                log::warn!("Skipping {} row without an integer id", kind);
                continue;
            };
            if positions.contains_key(&record.id) {
                log::warn!("Skipping duplicate id {} in {}", record.id, kind);
                continue;
            }
            positions.insert(record.id, records.len());
            records.push(record);
        }

        Self { records, positions }
    }

    /// All records in document order
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Record at a position
    pub fn at(&self, position: usize) -> Option<&Record> {
        self.records.get(position)
    }

    /// Position of the record with the given id
    pub fn position(&self, id: EntityId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    /// Record with the given id
    pub fn get(&self, id: EntityId) -> Option<&Record> {
        self.position(id).and_then(|pos| self.records.get(pos))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A link table with indices on both foreign keys
#[derive(Debug, Clone)]
pub struct LinkTable {
    links: Vec<Link>,
    /// Key: left id, Value: positions of links naming it
    by_left: HashMap<EntityId, Vec<usize>>,
    /// Key: right id, Value: positions of links naming it
    by_right: HashMap<EntityId, Vec<usize>>,
}

impl LinkTable {
    fn new(kind: LinkKind, rows: Vec<Value>) -> Self {
        let left_column = kind.left().column;
        let right_column = kind.right().column;

        let mut table = Self {
            links: Vec::with_capacity(rows.len()),
            by_left: HashMap::new(),
            by_right: HashMap::new(),
        };

        for row in rows {
            let left = row.get(left_column).and_then(integer);
            let right = row.get(right_column).and_then(integer);
            match (left, right) {
                (Some(left), Some(right)) => table.push(Link::new(left, right)),
                _ => log::warn!(
                    "Skipping {} row missing {} or {}",
                    kind,
                    left_column,
                    right_column
                ),
            }
        }

        table
    }

    fn push(&mut self, link: Link) {
        let pos = self.links.len();
        self.by_left.entry(link.left).or_default().push(pos);
        self.by_right.entry(link.right).or_default().push(pos);
        self.links.push(link);
    }

    /// Link at a position
    pub fn at(&self, position: usize) -> Option<&Link> {
        self.links.get(position)
    }

    /// Positions (ascending) of links whose `side` key equals `id`
    pub fn positions(&self, side: Side, id: EntityId) -> &[usize] {
        let index = match side {
            Side::Left => &self.by_left,
            Side::Right => &self.by_right,
        };
        index.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// The complete, immutable snapshot
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Indexed by `EntityKind::index()`
    tables: Vec<Table>,
    /// Indexed by `LinkKind::index()`
    links: Vec<LinkTable>,
}

impl Snapshot {
    /// Parse a loader document from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(json)?;
        Self::from_document(document)
    }

    /// Parse a loader document from any reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let document: Value = serde_json::from_reader(reader)?;
        Self::from_document(document)
    }

    /// Parse a loader document stored in a file
    pub fn from_path(path: &Path) -> Result<Self> {
        log::info!("Loading snapshot: {:?}", path);
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Build a snapshot from a parsed document
    ///
    /// The document is `{ "tables": { "<table>": { "data": [ ... ] } } }`.
    /// Tables absent from the document are empty; unknown tables are ignored.
    pub fn from_document(document: Value) -> Result<Self> {
        let Value::Object(mut root) = document else {
            return Err(InsightsError::InvalidDocument(
                "document root is not an object".to_string(),
            ));
        };
        let mut raw_tables = match root.remove("tables") {
            Some(Value::Object(tables)) => tables,
            Some(_) => {
                return Err(InsightsError::InvalidDocument(
                    "`tables` is not an object".to_string(),
                ))
            }
            None => {
                return Err(InsightsError::InvalidDocument(
                    "missing `tables`".to_string(),
                ))
            }
        };

        let mut take_rows = |name: &str| -> Vec<Value> {
            match raw_tables.remove(name) {
                Some(Value::Object(mut table)) => match table.remove("data") {
                    Some(Value::Array(rows)) => rows,
                    Some(Value::Null) | None => Vec::new(),
                    Some(_) => {
                        log::warn!("Table {} has a non-array `data`; treating as empty", name);
                        Vec::new()
                    }
                },
                Some(_) => {
                    log::warn!("Table {} is not an object; treating as empty", name);
                    Vec::new()
                }
                None => Vec::new(),
            }
        };

        let tables: Vec<Table> = EntityKind::ALL
            .into_iter()
            .map(|kind| Table::new(kind, take_rows(kind.table_name())))
            .collect();
        let links: Vec<LinkTable> = LinkKind::ALL
            .into_iter()
            .map(|kind| LinkTable::new(kind, take_rows(kind.table_name())))
            .collect();

        for name in raw_tables.keys() {
            log::debug!("Ignoring unknown table: {}", name);
        }

        let snapshot = Self { tables, links };
        let stats = snapshot.stats();
        log::debug!(
            "Snapshot loaded: {} records, {} links",
            stats.num_records,
            stats.num_links
        );
        Ok(snapshot)
    }

    /// Entity table of the given kind
    pub fn table(&self, kind: EntityKind) -> &Table {
        &self.tables[kind.index()]
    }

    /// Link table of the given kind
    pub fn link_table(&self, kind: LinkKind) -> &LinkTable {
        &self.links[kind.index()]
    }

    /// Sorted distinct values of an attribute over the whole table
    ///
    /// Null and empty-string values are skipped. Values sort by their text
    /// form, which is what selector widgets display.
    pub fn distinct_values(&self, kind: EntityKind, attribute: &str) -> Vec<Value> {
        let mut values: Vec<Value> = Vec::new();
        for record in self.table(kind).records() {
            let Some(value) = record.get(attribute) else {
                continue;
            };
            if value.as_str() == Some("") || values.contains(value) {
                continue;
            }
            values.push(value.clone());
        }
        values.sort_by_cached_key(display_text);
        values
    }

    /// Get snapshot statistics
    pub fn stats(&self) -> SnapshotStats {
        SnapshotStats {
            num_records: self.tables.iter().map(Table::len).sum(),
            num_links: self.links.iter().map(LinkTable::len).sum(),
            num_users: self.table(EntityKind::Users).len(),
            num_checkins: self.table(EntityKind::Checkins).len(),
        }
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            tables: EntityKind::ALL
                .into_iter()
                .map(|kind| Table::new(kind, Vec::new()))
                .collect(),
            links: LinkKind::ALL
                .into_iter()
                .map(|kind| LinkTable::new(kind, Vec::new()))
                .collect(),
        }
    }
}

fn display_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Snapshot statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SnapshotStats {
    /// Total records across all entity tables
    pub num_records: usize,
    /// Total links across all link tables
    pub num_links: usize,
    pub num_users: usize,
    pub num_checkins: usize,
}
