use crate::model::{NamespaceScope, ResourceKind};
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct HeaderColumn {
    pub name: String,
    pub wide: bool,
}

impl HeaderColumn {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            wide: false,
        }
    }

    pub fn wide(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            wide: true,
        }
    }
}

/// Ordered column descriptors. Column order defines the positional meaning of
/// every row's field sequence; a table keeps one header for its lifetime.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Header {
    columns: Vec<HeaderColumn>,
}

impl Header {
    pub fn new(columns: Vec<HeaderColumn>) -> Self {
        Self { columns }
    }

    pub fn from_names(names: &[&str]) -> Self {
        Self {
            columns: names.iter().map(|name| HeaderColumn::new(*name)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[HeaderColumn] {
        &self.columns
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|column| column.name.eq_ignore_ascii_case(name))
    }
}

pub type Fields = Vec<String>;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Row {
    pub id: String,
    pub fields: Fields,
}

impl Row {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

/// A complete point-in-time set of rows for one resource kind and scope, as
/// produced by an external source. Snapshots are consumed by `reconcile`;
/// they are never a view into live table state.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub rows: Vec<Row>,
}

impl Snapshot {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RowEventKind {
    Added,
    Updated,
    Unchanged,
    Deleted,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RowEvent {
    pub kind: RowEventKind,
    pub row: Row,
    /// Per-cell change mask, present only on `Updated` events. Advisory:
    /// meaningful for exactly one render pass after the reconciliation.
    pub changed_cells: Option<Vec<bool>>,
}

impl RowEvent {
    fn added(row: Row) -> Self {
        Self {
            kind: RowEventKind::Added,
            row,
            changed_cells: None,
        }
    }

    fn updated(row: Row, changed_cells: Vec<bool>) -> Self {
        Self {
            kind: RowEventKind::Updated,
            row,
            changed_cells: Some(changed_cells),
        }
    }

    fn unchanged(row: Row) -> Self {
        Self {
            kind: RowEventKind::Unchanged,
            row,
            changed_cells: None,
        }
    }

    fn deleted(row: Row) -> Self {
        Self {
            kind: RowEventKind::Deleted,
            row,
            changed_cells: None,
        }
    }
}

/// The classified outcome of one reconciliation pass.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub events: Vec<RowEvent>,
    /// Snapshot rows dropped for malformed field counts or duplicate ids.
    pub dropped: usize,
}

impl ChangeSet {
    pub fn count(&self, kind: RowEventKind) -> usize {
        self.events.iter().filter(|event| event.kind == kind).count()
    }

    /// True when the pass produced no visible difference: every retained row
    /// unchanged, nothing added or deleted, nothing dropped.
    pub fn is_quiet(&self) -> bool {
        self.dropped == 0
            && self
                .events
                .iter()
                .all(|event| event.kind == RowEventKind::Unchanged)
    }

    pub fn changed_cells_for(&self, id: &str) -> Option<&[bool]> {
        self.events
            .iter()
            .find(|event| event.row.id == id)
            .and_then(|event| event.changed_cells.as_deref())
    }
}

/// Per-cell change mask between two field sequences of the same table.
/// Index `i` is true when column `i` differs.
pub fn changed_cells(before: &Fields, after: &Fields) -> Vec<bool> {
    let len = before.len().max(after.len());
    (0..len)
        .map(|index| before.get(index) != after.get(index))
        .collect()
}

/// Canonical table state for one resource kind and namespace scope: the
/// header plus the current row set keyed by identity. The only mutation
/// entry point is `reconcile`.
#[derive(Debug, Clone)]
pub struct TableData {
    kind: ResourceKind,
    scope: NamespaceScope,
    header: Header,
    rows: BTreeMap<String, Row>,
}

impl TableData {
    pub fn new(kind: ResourceKind, scope: NamespaceScope, header: Header) -> Self {
        Self {
            kind,
            scope,
            header,
            rows: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn scope(&self) -> &NamespaceScope {
        &self.scope
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rows.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Row> {
        self.rows.get(id)
    }

    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.values()
    }

    /// Merge a full snapshot into the table, classifying every identity as
    /// added, updated, unchanged, or deleted. Afterward the table holds
    /// exactly the snapshot's well-formed rows.
    ///
    /// `full_resync` bypasses the early equality shortcut so every retained
    /// row is recompared cell by cell and its stored fields rewritten; rows
    /// whose fields turn out identical are still classified as unchanged,
    /// so a quiescent table stays quiet after a reconnect.
    ///
    /// Rows whose field count disagrees with the header, and rows repeating
    /// an identity already seen in this snapshot, are dropped and counted on
    /// the returned set; the pass itself never fails.
    pub fn reconcile(&mut self, snapshot: Snapshot, full_resync: bool) -> ChangeSet {
        let mut previous = std::mem::take(&mut self.rows);
        let mut next = BTreeMap::new();
        let mut changes = ChangeSet::default();

        for row in snapshot.rows {
            if row.fields.len() != self.header.len() {
                warn!(
                    kind = self.kind.title(),
                    id = row.id.as_str(),
                    got = row.fields.len(),
                    want = self.header.len(),
                    "dropping row with malformed field count"
                );
                changes.dropped += 1;
                continue;
            }
            if next.contains_key(&row.id) {
                warn!(
                    kind = self.kind.title(),
                    id = row.id.as_str(),
                    "dropping row with duplicate identity"
                );
                changes.dropped += 1;
                continue;
            }

            let event = match previous.remove(&row.id) {
                None => RowEvent::added(row.clone()),
                Some(old) => {
                    if !full_resync && old.fields == row.fields {
                        RowEvent::unchanged(row.clone())
                    } else {
                        let mask = changed_cells(&old.fields, &row.fields);
                        if mask.iter().any(|changed| *changed) {
                            RowEvent::updated(row.clone(), mask)
                        } else {
                            RowEvent::unchanged(row.clone())
                        }
                    }
                }
            };
            next.insert(row.id.clone(), row);
            changes.events.push(event);
        }

        for (_, row) in previous {
            changes.events.push(RowEvent::deleted(row));
        }

        self.rows = next;
        changes
    }
}
