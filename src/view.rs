use crate::table::TableData;
use std::cmp::Ordering;

/// Substring filter over a row's rendered field values. A leading `!` in the
/// raw filter string negates the match.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct FilterSpec {
    query: String,
    invert: bool,
}

impl FilterSpec {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.strip_prefix('!') {
            Some(rest) => Self {
                query: rest.trim().to_ascii_lowercase(),
                invert: true,
            },
            None => Self {
                query: trimmed.to_ascii_lowercase(),
                invert: false,
            },
        }
    }

    pub fn matches(&self, id: &str, fields: &[String]) -> bool {
        if self.query.is_empty() {
            return true;
        }

        let hit = id.to_ascii_lowercase().contains(&self.query)
            || fields
                .iter()
                .any(|field| field.to_ascii_lowercase().contains(&self.query));
        hit != self.invert
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct SortSpec {
    pub column: usize,
    pub ascending: bool,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            column: 0,
            ascending: true,
        }
    }
}

impl SortSpec {
    /// Move the sort key left or right, wrapping around the header.
    pub fn cycled(self, columns: usize, delta: isize) -> Self {
        if columns == 0 {
            return self;
        }
        let len = columns as isize;
        let column = (self.column as isize + delta).rem_euclid(len) as usize;
        Self { column, ..self }
    }

    pub fn inverted(self) -> Self {
        Self {
            ascending: !self.ascending,
            ..self
        }
    }
}

fn compare_values(left: &str, right: &str) -> Ordering {
    match (left.parse::<f64>(), right.parse::<f64>()) {
        (Ok(l), Ok(r)) => l.partial_cmp(&r).unwrap_or(Ordering::Equal),
        _ => left.to_ascii_lowercase().cmp(&right.to_ascii_lowercase()),
    }
}

/// Derive the ordered, visible identity sequence for one table state: filter
/// predicate first, then the sort comparator, with ties always broken by
/// identity so repeated computations over an unchanged table agree.
pub fn view_order(table: &TableData, filter: &FilterSpec, sort: &SortSpec) -> Vec<String> {
    let mut visible = table
        .rows()
        .filter(|row| filter.matches(&row.id, &row.fields))
        .collect::<Vec<_>>();

    visible.sort_by(|left, right| {
        let lv = left.fields.get(sort.column).map(String::as_str).unwrap_or("");
        let rv = right
            .fields
            .get(sort.column)
            .map(String::as_str)
            .unwrap_or("");
        let keyed = if sort.ascending {
            compare_values(lv, rv)
        } else {
            compare_values(rv, lv)
        };
        keyed.then_with(|| left.id.cmp(&right.id))
    });

    visible.into_iter().map(|row| row.id.clone()).collect()
}

/// Tracks the highlighted row by identity, not position. The identity is a
/// soft reference: it survives reconciliation churn and is re-resolved
/// against the current view order on each render.
#[derive(Debug, Clone, Default)]
pub struct SelectionTracker {
    current: Option<String>,
    position: usize,
}

impl SelectionTracker {
    /// Select `path` if it is visible in `view`. A miss leaves the current
    /// selection and position untouched.
    pub fn select_by_path(&mut self, path: &str, view: &[String]) -> bool {
        let Some(index) = view.iter().position(|id| id == path) else {
            return false;
        };
        self.current = Some(path.to_string());
        self.position = index;
        true
    }

    /// Select whatever identity sits at `index` in `view`, clamping to the
    /// visible range. Empty views clear nothing and select nothing.
    pub fn select_index(&mut self, index: usize, view: &[String]) {
        if view.is_empty() {
            return;
        }
        let index = index.min(view.len() - 1);
        self.current = Some(view[index].clone());
        self.position = index;
    }

    pub fn move_by(&mut self, delta: isize, view: &[String]) {
        if view.is_empty() {
            return;
        }
        let next = match self.current {
            // Nothing highlighted yet: any movement lands on the first row.
            None => 0,
            Some(_) => {
                let max = view.len() as isize - 1;
                let base =
                    self.resolve(view).unwrap_or(self.position.min(view.len() - 1)) as isize;
                (base + delta).clamp(0, max) as usize
            }
        };
        self.select_index(next, view);
    }

    /// The last successfully selected identity, whether or not it still
    /// exists anywhere. Resolution against the live view is the caller's job.
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Where the current identity sits in `view`, if it is still visible.
    pub fn resolve(&self, view: &[String]) -> Option<usize> {
        let current = self.current.as_deref()?;
        view.iter().position(|id| id == current)
    }

    /// Best-effort visible position for rendering: the resolved index when
    /// the identity survives, otherwise the remembered position clamped into
    /// the view.
    pub fn display_position(&self, view: &[String]) -> Option<usize> {
        if view.is_empty() {
            return None;
        }
        Some(
            self.resolve(view)
                .unwrap_or_else(|| self.position.min(view.len() - 1)),
        )
    }

    /// Forget the selection entirely. Used on structural table replacement
    /// (kind or namespace scope switch), never on in-place reconciliation.
    pub fn reset(&mut self) {
        self.current = None;
        self.position = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::{FilterSpec, SelectionTracker, SortSpec, view_order};
    use crate::model::{NamespaceScope, ResourceKind};
    use crate::table::{Header, Row, Snapshot, TableData};

    fn table_with(rows: &[(&str, &[&str])]) -> TableData {
        let mut table = TableData::new(
            ResourceKind::Pods,
            NamespaceScope::All,
            Header::from_names(&["NAMESPACE", "NAME", "RESTARTS"]),
        );
        table.reconcile(
            Snapshot::new(
                rows.iter()
                    .map(|(id, fields)| {
                        Row::new(
                            *id,
                            fields.iter().map(|field| field.to_string()).collect(),
                        )
                    })
                    .collect(),
            ),
            false,
        );
        table
    }

    fn sample() -> TableData {
        table_with(&[
            ("default/pod1", &["default", "pod1", "3"]),
            ("default/pod2", &["default", "pod2", "10"]),
            ("kube-system/dns", &["kube-system", "dns", "2"]),
        ])
    }

    #[test]
    fn view_order_is_a_subset_of_store_identities() {
        let table = sample();
        let filter = FilterSpec::parse("default");
        let view = view_order(&table, &filter, &SortSpec::default());

        assert_eq!(view.len(), 2);
        assert!(view.iter().all(|id| table.contains(id)));
    }

    #[test]
    fn sort_only_changes_permute_the_full_identity_set() {
        let table = sample();
        let filter = FilterSpec::default();
        let by_name = view_order(&table, &filter, &SortSpec { column: 1, ascending: true });
        let by_name_desc = view_order(&table, &filter, &SortSpec { column: 1, ascending: false });

        assert_eq!(by_name.len(), table.row_count());
        let mut fwd = by_name.clone();
        let mut rev = by_name_desc.clone();
        fwd.sort();
        rev.sort();
        assert_eq!(fwd, rev);
        assert_eq!(by_name.first().map(String::as_str), Some("kube-system/dns"));
        assert_eq!(by_name_desc.first().map(String::as_str), Some("default/pod2"));
    }

    #[test]
    fn numeric_columns_sort_numerically() {
        let table = sample();
        let view = view_order(
            &table,
            &FilterSpec::default(),
            &SortSpec { column: 2, ascending: true },
        );
        assert_eq!(
            view,
            vec!["kube-system/dns", "default/pod1", "default/pod2"]
        );
    }

    #[test]
    fn ties_break_by_identity_for_reproducible_orders() {
        let table = table_with(&[
            ("default/b", &["default", "b", "1"]),
            ("default/a", &["default", "a", "1"]),
            ("default/c", &["default", "c", "1"]),
        ]);
        let sort = SortSpec { column: 2, ascending: false };
        let first = view_order(&table, &FilterSpec::default(), &sort);
        let second = view_order(&table, &FilterSpec::default(), &sort);

        assert_eq!(first, vec!["default/a", "default/b", "default/c"]);
        assert_eq!(first, second);
    }

    #[test]
    fn inverted_filters_negate_the_match() {
        let table = sample();
        let view = view_order(
            &table,
            &FilterSpec::parse("!default"),
            &SortSpec::default(),
        );
        assert_eq!(view, vec!["kube-system/dns"]);
    }

    #[test]
    fn select_by_path_hits_visible_identities() {
        let table = sample();
        let view = view_order(&table, &FilterSpec::default(), &SortSpec::default());
        let mut selection = SelectionTracker::default();

        assert!(selection.select_by_path("default/pod2", &view));
        assert_eq!(selection.current(), Some("default/pod2"));
        assert_eq!(selection.resolve(&view), view.iter().position(|id| id == "default/pod2"));
    }

    #[test]
    fn select_by_path_misses_are_no_ops() {
        let table = sample();
        let view = view_order(&table, &FilterSpec::default(), &SortSpec::default());
        let mut selection = SelectionTracker::default();
        selection.select_by_path("default/pod2", &view);

        assert!(!selection.select_by_path("default/nonexistent", &view));
        assert_eq!(selection.current(), Some("default/pod2"));
    }

    #[test]
    fn empty_tables_never_acquire_a_selection() {
        let view: Vec<String> = Vec::new();
        let mut selection = SelectionTracker::default();

        for _ in 0..3 {
            selection.select_by_path("default/pod1", &view);
        }
        assert_eq!(selection.current(), None);
        assert_eq!(selection.display_position(&view), None);
    }

    #[test]
    fn selection_survives_rows_vanishing_from_view() {
        let table = sample();
        let view = view_order(&table, &FilterSpec::default(), &SortSpec::default());
        let mut selection = SelectionTracker::default();
        selection.select_by_path("default/pod1", &view);

        let narrowed = view_order(&table, &FilterSpec::parse("dns"), &SortSpec::default());
        assert_eq!(selection.resolve(&narrowed), None);
        assert_eq!(selection.current(), Some("default/pod1"));
        assert_eq!(selection.display_position(&narrowed), Some(0));
    }
}
