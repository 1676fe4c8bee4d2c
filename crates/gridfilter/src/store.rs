//! Column filter state.
//!
//! [`ColumnFilterStore`] is the single source of truth for which columns are
//! filtered and how. It never holds a filter with empty search terms: upserting
//! blank input removes the column's entry instead.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::column::ColumnDefinition;
use crate::filter::{retain_terms, Operator};

/// The active filter of one column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnFilter {
    /// Column identifier.
    pub column_id: String,
    /// Definition of the filtered column.
    pub column: ColumnDefinition,
    /// Resolved operator.
    pub operator: Operator,
    /// Search terms, never empty while stored.
    pub search_terms: Vec<Value>,
}

impl ColumnFilter {
    /// Returns the serializable summary of this filter.
    pub fn to_current_filter(&self) -> CurrentFilter {
        CurrentFilter {
            column_id: self.column_id.clone(),
            operator: self.operator,
            search_terms: self.search_terms.clone(),
        }
    }
}

/// Serializable summary of a column filter.
///
/// Used for filter-changed notifications, presets and remote payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentFilter {
    /// Column identifier.
    pub column_id: String,
    /// Operator.
    #[serde(default)]
    pub operator: Operator,
    /// Search terms.
    #[serde(default)]
    pub search_terms: Vec<Value>,
}

impl CurrentFilter {
    /// Creates a current filter entry.
    pub fn new(column_id: impl Into<String>, operator: Operator, search_terms: Vec<Value>) -> Self {
        Self {
            column_id: column_id.into(),
            operator,
            search_terms,
        }
    }
}

/// Column filters keyed by column id, in insertion order.
///
/// Order does not affect evaluation but keeps listings and remote payloads
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnFilters {
    entries: Vec<ColumnFilter>,
}

impl ColumnFilters {
    /// Creates an empty set of filters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of filtered columns.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no column is filtered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the filter of a column.
    pub fn get(&self, column_id: &str) -> Option<&ColumnFilter> {
        self.entries.iter().find(|f| f.column_id == column_id)
    }

    /// Returns true if the column is filtered.
    pub fn contains(&self, column_id: &str) -> bool {
        self.get(column_id).is_some()
    }

    /// Iterates filters in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, ColumnFilter> {
        self.entries.iter()
    }

    /// Filtered column ids in insertion order.
    pub fn column_ids(&self) -> Vec<&str> {
        self.entries.iter().map(|f| f.column_id.as_str()).collect()
    }

    /// Summaries of every filter in insertion order.
    pub fn to_current_filters(&self) -> Vec<CurrentFilter> {
        self.entries.iter().map(ColumnFilter::to_current_filter).collect()
    }

    /// Inserts or replaces a filter, keeping the position of a replaced entry.
    fn insert(&mut self, filter: ColumnFilter) {
        match self.entries.iter_mut().find(|f| f.column_id == filter.column_id) {
            Some(existing) => *existing = filter,
            None => self.entries.push(filter),
        }
    }

    fn remove(&mut self, column_id: &str) -> Option<ColumnFilter> {
        let index = self.entries.iter().position(|f| f.column_id == column_id)?;
        Some(self.entries.remove(index))
    }
}

impl<'a> IntoIterator for &'a ColumnFilters {
    type Item = &'a ColumnFilter;
    type IntoIter = std::slice::Iter<'a, ColumnFilter>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Owner of the column filter state.
#[derive(Debug, Default)]
pub struct ColumnFilterStore {
    filters: ColumnFilters,
}

impl ColumnFilterStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores or replaces a column's filter, or removes it when no search term remains.
    ///
    /// Blank terms are dropped first. The operator resolves to the explicit one,
    /// else the column's configured default, else [`Operator::Equal`].
    ///
    /// Returns true if the stored state changed.
    pub fn upsert(
        &mut self,
        column_id: &str,
        column: &ColumnDefinition,
        operator: Option<Operator>,
        search_terms: Vec<Value>,
    ) -> bool {
        let search_terms = retain_terms(search_terms);
        if search_terms.is_empty() {
            return self.remove(column_id).is_some();
        }

        let filter = ColumnFilter {
            column_id: column_id.to_string(),
            column: column.clone(),
            operator: operator
                .or_else(|| column.default_operator())
                .unwrap_or_default(),
            search_terms,
        };

        if self.filters.get(column_id) == Some(&filter) {
            return false;
        }
        self.filters.insert(filter);
        true
    }

    /// Removes a column's filter. No-op if the column is not filtered.
    pub fn remove(&mut self, column_id: &str) -> Option<ColumnFilter> {
        self.filters.remove(column_id)
    }

    /// Removes every filter, returning the cleared column ids.
    pub fn clear_all(&mut self) -> Vec<String> {
        std::mem::take(&mut self.filters.entries)
            .into_iter()
            .map(|f| f.column_id)
            .collect()
    }

    /// Returns the filter of a column.
    pub fn get(&self, column_id: &str) -> Option<&ColumnFilter> {
        self.filters.get(column_id)
    }

    /// Number of filtered columns.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns true if no column is filtered.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Returns a copy of the current filters.
    pub fn snapshot(&self) -> ColumnFilters {
        self.filters.clone()
    }

    /// Returns summaries of the current filters in insertion order.
    pub fn current_filters(&self) -> Vec<CurrentFilter> {
        self.filters.to_current_filters()
    }
}
