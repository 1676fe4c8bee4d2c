//! Column definitions supplied by the hosting view.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::filter::Operator;

/// Arguments handed to a [`Formatter`] when a column filters on formatted output.
#[derive(Debug, Clone, Copy)]
pub struct FormatterArgs<'a> {
    /// Row index of the data context in the data view, when it can be found.
    pub row: Option<usize>,
    /// Index of the column among the grid's displayed columns.
    pub cell: Option<usize>,
    /// Raw value resolved from the column's field path.
    pub value: Option<&'a Value>,
    /// The column being formatted.
    pub column: &'a ColumnDefinition,
    /// The full row record.
    pub data_context: &'a Value,
}

type FormatterFn = dyn Fn(&FormatterArgs<'_>) -> Value + Send + Sync;

/// A cell formatter. Filters can match against its output instead of the raw field.
#[derive(Clone)]
pub struct Formatter(Arc<FormatterFn>);

impl Formatter {
    /// Wraps a formatting function.
    pub fn new(f: impl Fn(&FormatterArgs<'_>) -> Value + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Formats a cell.
    pub fn format(&self, args: &FormatterArgs<'_>) -> Value {
        (self.0)(args)
    }
}

impl fmt::Debug for Formatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Formatter(..)")
    }
}

impl PartialEq for Formatter {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// One selectable option of a column filter's value collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionOption {
    /// The value filtered on when this option is chosen.
    pub value: Value,
    /// Display label.
    pub label: String,
}

/// Per-column filter configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnFilterConfig {
    /// Operator used when the input does not provide one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<Operator>,

    /// Preset search terms applied when the column's filter is first rendered.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub search_terms: Vec<Value>,

    /// Allowed values, for select-style filters.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collection: Vec<CollectionOption>,
}

/// A grid column as the filter engine sees it.
///
/// Column definitions are owned by the hosting view and do not change during a
/// grid session. Everything except the formatter can be loaded with serde.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Unique column identifier.
    pub id: String,

    /// Header text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Field path in the row record (dot-separated for nested fields).
    /// Empty means "same as `id`".
    #[serde(default)]
    pub field: String,

    /// Whether the column shows a filter.
    #[serde(default = "default_filterable")]
    pub filterable: bool,

    /// Path used for filtering instead of `field`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_field: Option<String>,

    /// Match filters against the formatter output instead of the raw value.
    #[serde(default)]
    pub use_formatter_output_to_filter: bool,

    /// Filter configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<ColumnFilterConfig>,

    /// Cell formatter.
    #[serde(skip)]
    pub formatter: Option<Formatter>,
}

fn default_filterable() -> bool {
    true
}

impl ColumnDefinition {
    /// Creates a filterable column reading `field`.
    pub fn new(id: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            field: field.into(),
            filterable: true,
            ..Self::default()
        }
    }

    /// Sets the header text.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the path used for filtering.
    pub fn with_query_field(mut self, path: impl Into<String>) -> Self {
        self.query_field = Some(path.into());
        self
    }

    /// Sets the cell formatter. `filter_on_output` makes filters match its output.
    pub fn with_formatter(mut self, formatter: Formatter, filter_on_output: bool) -> Self {
        self.formatter = Some(formatter);
        self.use_formatter_output_to_filter = filter_on_output;
        self
    }

    /// Sets the filter configuration.
    pub fn with_filter(mut self, filter: ColumnFilterConfig) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Marks the column as not filterable.
    pub fn not_filterable(mut self) -> Self {
        self.filterable = false;
        self
    }

    /// Returns the path values are resolved from when filtering.
    pub fn filter_path(&self) -> &str {
        match self.query_field.as_deref() {
            Some(path) if !path.is_empty() => path,
            _ if self.field.is_empty() => &self.id,
            _ => &self.field,
        }
    }

    /// Returns the configured default operator, if any.
    pub fn default_operator(&self) -> Option<Operator> {
        self.filter.as_ref().and_then(|f| f.operator)
    }

    /// Returns the preset search terms (possibly empty).
    pub fn preset_search_terms(&self) -> &[Value] {
        self.filter
            .as_ref()
            .map(|f| f.search_terms.as_slice())
            .unwrap_or_default()
    }

    /// Returns the header text, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_path_prefers_query_field() {
        let column = ColumnDefinition::new("zip", "zip").with_query_field("address.zip");
        assert_eq!(column.filter_path(), "address.zip");
    }

    #[test]
    fn test_filter_path_falls_back_to_id() {
        let column = ColumnDefinition {
            id: "age".to_string(),
            ..ColumnDefinition::default()
        };
        assert_eq!(column.filter_path(), "age");
    }

    #[test]
    fn test_deserialize_from_toml() {
        let toml_src = r#"
            id = "isActive"
            field = "isActive"

            [filter]
            operator = "EQ"
            search_terms = [true]
            collection = [
                { value = true, label = "True" },
                { value = false, label = "False" },
            ]
        "#;

        let column: ColumnDefinition = toml::from_str(toml_src).unwrap();

        assert!(column.filterable);
        assert_eq!(column.default_operator(), Some(Operator::Equal));
        assert_eq!(column.preset_search_terms(), &[json!(true)]);
        assert_eq!(column.filter.unwrap().collection.len(), 2);
    }

    #[test]
    fn test_formatter_equality_is_identity() {
        let formatter = Formatter::new(|_| json!("x"));
        let a = ColumnDefinition::new("a", "a").with_formatter(formatter.clone(), true);
        let b = ColumnDefinition::new("a", "a").with_formatter(formatter, true);
        let c = ColumnDefinition::new("a", "a").with_formatter(Formatter::new(|_| json!("x")), true);

        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
