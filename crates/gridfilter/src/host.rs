//! Collaborators supplied by the hosting view.
//!
//! The engine talks to the grid and its data cache only through the
//! [`GridHost`] and [`DataView`] traits. [`MemoryGrid`] and [`MemoryDataView`]
//! are simple in-memory implementations for hosts that keep everything in a
//! `Vec`, such as command-line tools and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use serde_json::Value;

use crate::column::ColumnDefinition;
use crate::filter::LocalFilter;

/// The grid widget hosting the filters.
pub trait GridHost: Send + Sync {
    /// Currently displayed columns, in display order.
    fn columns(&self) -> Vec<ColumnDefinition>;

    /// Index of a displayed column.
    fn column_index(&self, column_id: &str) -> Option<usize> {
        self.columns().iter().position(|c| c.id == column_id)
    }

    /// Marks every rendered row as stale.
    fn invalidate(&self) {}

    /// Re-renders stale rows.
    fn render(&self) {}
}

/// The data cache rows are filtered in, in local mode.
pub trait DataView: Send + Sync {
    /// Index of a row record in the full dataset.
    fn row_index(&self, row: &Value) -> Option<usize>;

    /// Replaces the predicate applied on refresh.
    fn set_filter(&self, filter: LocalFilter);

    /// Re-applies the predicate to every row.
    fn refresh(&self);
}

/// A grid with a fixed set of columns that counts invalidate/render calls.
#[derive(Debug, Default)]
pub struct MemoryGrid {
    columns: Mutex<Vec<ColumnDefinition>>,
    invalidations: AtomicUsize,
    renders: AtomicUsize,
}

impl MemoryGrid {
    /// Creates a grid displaying `columns`.
    pub fn new(columns: Vec<ColumnDefinition>) -> Self {
        Self {
            columns: Mutex::new(columns),
            ..Self::default()
        }
    }

    /// Replaces the displayed columns.
    pub fn set_columns(&self, columns: Vec<ColumnDefinition>) {
        *self.columns.lock().unwrap_or_else(PoisonError::into_inner) = columns;
    }

    /// Number of `invalidate` calls so far.
    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }

    /// Number of `render` calls so far.
    pub fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}

impl GridHost for MemoryGrid {
    fn columns(&self) -> Vec<ColumnDefinition> {
        self.columns
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn invalidate(&self) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
    }

    fn render(&self) {
        self.renders.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
struct ViewState {
    filter: Option<LocalFilter>,
    visible: Vec<usize>,
    refreshes: usize,
}

/// A data view over an in-memory list of rows.
///
/// Rows are identified by their id field (`"id"` unless configured), falling
/// back to value equality for rows without one.
#[derive(Debug)]
pub struct MemoryDataView {
    rows: Vec<Value>,
    id_field: String,
    /// Row position by the JSON text of its id.
    ids: HashMap<String, usize>,
    state: Mutex<ViewState>,
}

impl MemoryDataView {
    /// Creates a view over `rows`, all visible until the first refresh.
    pub fn new(rows: Vec<Value>) -> Self {
        let visible = (0..rows.len()).collect();
        let id_field = "id".to_string();
        let ids = index_ids(&rows, &id_field);
        Self {
            rows,
            id_field,
            ids,
            state: Mutex::new(ViewState {
                visible,
                ..ViewState::default()
            }),
        }
    }

    /// Sets the field rows are identified by.
    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self.ids = index_ids(&self.rows, &self.id_field);
        self
    }

    /// All rows, filtered or not.
    pub fn rows(&self) -> &[Value] {
        &self.rows
    }

    /// Indexes of the rows that passed the last refresh.
    pub fn visible_indices(&self) -> Vec<usize> {
        self.lock().visible.clone()
    }

    /// Rows that passed the last refresh.
    pub fn visible_rows(&self) -> Vec<&Value> {
        self.visible_indices()
            .into_iter()
            .filter_map(|i| self.rows.get(i))
            .collect()
    }

    /// The filter currently applied.
    pub fn filter(&self) -> Option<LocalFilter> {
        self.lock().filter.clone()
    }

    /// Number of refreshes so far.
    pub fn refresh_count(&self) -> usize {
        self.lock().refreshes
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Maps each id to the first row carrying it.
fn index_ids(rows: &[Value], id_field: &str) -> HashMap<String, usize> {
    let mut ids = HashMap::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        if let Some(id) = row.get(id_field) {
            ids.entry(id.to_string()).or_insert(i);
        }
    }
    ids
}

impl DataView for MemoryDataView {
    fn row_index(&self, row: &Value) -> Option<usize> {
        match row.get(&self.id_field) {
            Some(id) => self.ids.get(&id.to_string()).copied(),
            None => self.rows.iter().position(|r| std::ptr::eq(r, row) || r == row),
        }
    }

    fn set_filter(&self, filter: LocalFilter) {
        self.lock().filter = Some(filter);
    }

    fn refresh(&self) {
        let filter = self.filter();
        let visible = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| filter.as_ref().map_or(true, |f| f.matches(row, Some(self))))
            .map(|(i, _)| i)
            .collect();

        let mut state = self.lock();
        state.visible = visible;
        state.refreshes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ColumnFilterStore;
    use serde_json::json;

    fn rows() -> Vec<Value> {
        vec![
            json!({ "id": 10, "name": "John" }),
            json!({ "id": 11, "name": "Jane" }),
            json!({ "name": "Bob" }),
        ]
    }

    #[test]
    fn test_row_index_by_id() {
        let view = MemoryDataView::new(rows());
        assert_eq!(view.row_index(&json!({ "id": 11 })), Some(1));
        assert_eq!(view.row_index(&json!({ "id": 99 })), None);
    }

    #[test]
    fn test_row_index_without_id_uses_equality() {
        let view = MemoryDataView::new(rows());
        assert_eq!(view.row_index(&json!({ "name": "Bob" })), Some(2));
    }

    #[test]
    fn test_row_index_custom_id_field() {
        let view = MemoryDataView::new(rows()).with_id_field("name");
        assert_eq!(view.row_index(&json!({ "name": "Jane" })), Some(1));
        assert_eq!(view.row_index(&json!({ "name": "Bob" })), Some(2));
        assert_eq!(view.row_index(&json!({ "id": 10 })), None);
    }

    #[test]
    fn test_row_index_distinguishes_id_types() {
        let view = MemoryDataView::new(vec![
            json!({ "id": "7", "name": "text" }),
            json!({ "id": 7, "name": "number" }),
            json!({ "id": 7, "name": "duplicate" }),
        ]);
        assert_eq!(view.row_index(&json!({ "id": "7" })), Some(0));
        assert_eq!(view.row_index(&json!({ "id": 7 })), Some(1));
    }

    #[test]
    fn test_refresh_over_many_rows() {
        let rows: Vec<Value> = (0..5_000)
            .map(|i| json!({ "id": i, "name": if i % 2 == 0 { "even" } else { "odd" } }))
            .collect();
        let view = MemoryDataView::new(rows);
        assert_eq!(view.row_index(&json!({ "id": 4_999 })), Some(4_999));

        let column = ColumnDefinition::new("name", "name");
        let mut store = ColumnFilterStore::new();
        store.upsert("name", &column, None, vec![json!("odd")]);
        view.set_filter(LocalFilter::new(store.snapshot(), vec![column]));
        view.refresh();

        assert_eq!(view.visible_indices().len(), 2_500);
        assert_eq!(view.visible_indices()[0], 1);
    }

    #[test]
    fn test_refresh_applies_filter() {
        let view = MemoryDataView::new(rows());
        assert_eq!(view.visible_indices(), vec![0, 1, 2]);

        let column = ColumnDefinition::new("name", "name");
        let mut store = ColumnFilterStore::new();
        store.upsert("name", &column, None, vec![json!("J*")]);
        view.set_filter(LocalFilter::new(store.snapshot(), vec![column]));
        view.refresh();

        assert_eq!(view.visible_indices(), vec![0, 1]);
        assert_eq!(view.refresh_count(), 1);
    }

    #[test]
    fn test_memory_grid_counts_calls() {
        let grid = MemoryGrid::new(vec![ColumnDefinition::new("a", "a")]);
        grid.invalidate();
        grid.render();
        grid.render();

        assert_eq!(grid.invalidations(), 1);
        assert_eq!(grid.renders(), 2);
        assert_eq!(grid.column_index("a"), Some(0));
        assert_eq!(grid.column_index("b"), None);
    }
}
