//! Filter evaluation against row records.
//!
//! This module provides the operator evaluator ([`evaluate`]) and the
//! [`FilterEvaluator`], which ANDs every active column filter for a row.
//!
//! # Example
//!
//! ```
//! use gridfilter_rs::filter::{FilterContext, FilterEvaluator};
//! use gridfilter_rs::{ColumnDefinition, ColumnFilterStore};
//! use serde_json::json;
//!
//! let column = ColumnDefinition::new("firstName", "firstName");
//! let mut store = ColumnFilterStore::new();
//! store.upsert("firstName", &column, None, vec![json!("Jo*")]);
//!
//! let columns = vec![column];
//! let filters = store.snapshot();
//! let context = FilterContext::new(&columns);
//! let evaluator = FilterEvaluator::new(&filters, &context);
//!
//! assert!(evaluator.matches(&json!({ "firstName": "John" })));
//! assert!(!evaluator.matches(&json!({ "firstName": "Jane" })));
//! ```

use std::cmp::Ordering;

use serde_json::Value;

use super::condition::{normalize, Condition};
use super::operator::Operator;
use super::resolver::resolve_value;
use crate::column::ColumnDefinition;
use crate::host::DataView;
use crate::store::ColumnFilters;

/// Evaluates an operator against a resolved value and its search terms.
///
/// Empty search terms (after dropping blanks) always match. Otherwise an
/// unresolved value never matches, whatever the operator. Never panics.
pub fn evaluate(operator: Option<Operator>, actual: Option<&Value>, search_terms: &[Value]) -> bool {
    let conditions = normalize(operator, search_terms);
    if conditions.is_empty() {
        return true;
    }

    let Some(actual) = actual.filter(|v| !v.is_null()) else {
        return false;
    };

    let (negative, positive): (Vec<&Condition>, Vec<&Condition>) =
        conditions.iter().partition(|c| c.operator.is_negative());

    negative.iter().all(|c| condition_holds(c, actual))
        && (positive.is_empty() || positive.iter().any(|c| condition_holds(c, actual)))
}

/// Tests one normalized condition against a value.
fn condition_holds(condition: &Condition, actual: &Value) -> bool {
    let operand = &condition.operand;

    match condition.operator {
        Operator::Equal | Operator::In => loose_eq(actual, operand) == Some(true),
        Operator::NotEqual | Operator::NotIn => loose_eq(actual, operand) == Some(false),

        Operator::InContains => list_items(actual)
            .is_some_and(|items| items.iter().any(|item| loose_eq(item, operand) == Some(true))),
        Operator::NotInContains => list_items(actual)
            .is_some_and(|items| items.iter().all(|item| loose_eq(item, operand) != Some(true))),

        Operator::StartsWith => text_test(actual, operand, |a, b| a.starts_with(b)),
        Operator::EndsWith => text_test(actual, operand, |a, b| a.ends_with(b)),
        Operator::Contains => text_test(actual, operand, |a, b| a.contains(b)),
        Operator::NotContains => text_test(actual, operand, |a, b| !a.contains(b)),

        Operator::LessThan => compare(actual, operand) == Some(Ordering::Less),
        Operator::LessThanOrEqual => {
            matches!(compare(actual, operand), Some(Ordering::Less | Ordering::Equal))
        }
        Operator::GreaterThan => compare(actual, operand) == Some(Ordering::Greater),
        Operator::GreaterThanOrEqual => {
            matches!(compare(actual, operand), Some(Ordering::Greater | Ordering::Equal))
        }
    }
}

/// Reads a number, parsing numeric strings. Non-finite results are rejected so
/// words like "inf" stay text.
fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Reads a scalar as lowercase text. Objects, arrays and null have no text form.
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.to_lowercase()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Reads an integer exactly, parsing integer strings. Floats are not integers.
fn as_integer(value: &Value) -> Option<i128> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from)),
        Value::String(s) => s.trim().parse::<i128>().ok(),
        _ => None,
    }
}

/// Equality across strings and numbers. `None` means the values are not comparable.
///
/// Integers compare exactly; anything else numeric compares as `f64`.
fn loose_eq(a: &Value, b: &Value) -> Option<bool> {
    if let (Some(x), Some(y)) = (as_integer(a), as_integer(b)) {
        return Some(x == y);
    }
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return Some(x == y);
    }
    Some(as_text(a)? == as_text(b)?)
}

/// Ordering across strings and numbers: numeric when both sides are numeric.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (as_integer(a), as_integer(b)) {
        return Some(x.cmp(&y));
    }
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x.partial_cmp(&y);
    }
    Some(as_text(a)?.cmp(&as_text(b)?))
}

fn text_test(actual: &Value, operand: &Value, test: impl Fn(&str, &str) -> bool) -> bool {
    match (as_text(actual), as_text(operand)) {
        (Some(a), Some(b)) => test(&a, &b),
        _ => false,
    }
}

/// Items of a list-like value: an array, or a comma-joined string.
fn list_items(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items.clone()),
        Value::String(s) => Some(
            s.split(',')
                .map(|part| Value::String(part.trim().to_string()))
                .collect(),
        ),
        Value::Number(_) | Value::Bool(_) => Some(vec![value.clone()]),
        _ => None,
    }
}

/// Context for filter evaluation.
///
/// Holds the grid's currently displayed columns and, optionally, the data view
/// used to find row indexes for formatters.
#[derive(Clone, Copy)]
pub struct FilterContext<'a> {
    columns: &'a [ColumnDefinition],
    data_view: Option<&'a dyn DataView>,
}

impl<'a> FilterContext<'a> {
    /// Creates a context over the displayed columns.
    pub fn new(columns: &'a [ColumnDefinition]) -> Self {
        Self {
            columns,
            data_view: None,
        }
    }

    /// Attaches the data view rows are looked up in.
    pub fn with_data_view(mut self, data_view: &'a dyn DataView) -> Self {
        self.data_view = Some(data_view);
        self
    }

    /// Finds a displayed column and its index by id.
    pub fn find_column(&self, column_id: &str) -> Option<(usize, &'a ColumnDefinition)> {
        self.columns
            .iter()
            .enumerate()
            .find(|(_, column)| column.id == column_id)
    }

    /// Returns the data view, if one is attached.
    pub fn data_view(&self) -> Option<&'a dyn DataView> {
        self.data_view
    }
}

/// Evaluates a set of column filters against rows.
pub struct FilterEvaluator<'a> {
    filters: &'a ColumnFilters,
    context: &'a FilterContext<'a>,
}

impl<'a> FilterEvaluator<'a> {
    /// Creates a new evaluator.
    ///
    /// # Arguments
    ///
    /// * `filters` - The active column filters
    /// * `context` - Displayed columns and data view
    pub fn new(filters: &'a ColumnFilters, context: &'a FilterContext<'a>) -> Self {
        Self { filters, context }
    }

    /// Returns true if the row satisfies every active column filter.
    ///
    /// A filter whose column is no longer displayed makes the row non-matching.
    pub fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|filter| {
            let Some((cell, column)) = self.context.find_column(&filter.column_id) else {
                return false;
            };
            let value = resolve_value(row, column, Some(cell), self.context.data_view());
            evaluate(Some(filter.operator), value.as_deref(), &filter.search_terms)
        })
    }

    /// Filters a slice of rows, returning only those that match.
    pub fn filter_rows<'b>(&self, rows: &'b [Value]) -> Vec<&'b Value> {
        rows.iter().filter(|row| self.matches(row)).collect()
    }
}

/// Returns true if `row` satisfies every filter in `filters`.
pub fn matches_filters(row: &Value, filters: &ColumnFilters, context: &FilterContext<'_>) -> bool {
    FilterEvaluator::new(filters, context).matches(row)
}

/// An owned snapshot of the filters and columns a data view filters with.
///
/// The coordinator hands a fresh `LocalFilter` to the data view every time the
/// local filter state changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalFilter {
    filters: ColumnFilters,
    columns: Vec<ColumnDefinition>,
}

impl LocalFilter {
    /// Creates a local filter over the given filters and displayed columns.
    pub fn new(filters: ColumnFilters, columns: Vec<ColumnDefinition>) -> Self {
        Self { filters, columns }
    }

    /// The active filters.
    pub fn filters(&self) -> &ColumnFilters {
        &self.filters
    }

    /// The displayed columns.
    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    /// Returns true if the row matches, looking up row indexes in `data_view`.
    pub fn matches(&self, row: &Value, data_view: Option<&dyn DataView>) -> bool {
        if self.filters.is_empty() {
            return true;
        }
        let mut context = FilterContext::new(&self.columns);
        if let Some(dv) = data_view {
            context = context.with_data_view(dv);
        }
        matches_filters(row, &self.filters, &context)
    }
}
