//! Resolution of a column's filter value from a row record.

use std::borrow::Cow;

use serde_json::Value;

use crate::column::{ColumnDefinition, FormatterArgs};
use crate::host::DataView;

/// Reserved key holding a detail row's parent record.
pub const PARENT_KEY: &str = "__parent";

/// Reserved key marking a detail (padding) row.
pub const PADDING_KEY: &str = "__isPadding";

/// Walks a dot-separated path through nested objects and arrays.
///
/// A key that literally contains the full path is preferred over walking, so
/// flat records with dotted keys still resolve.
pub fn resolve_path<'a>(row: &'a Value, path: &str) -> Option<&'a Value> {
    if let Some(direct) = row.get(path) {
        return Some(direct);
    }

    path.split('.').try_fold(row, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Returns the parent record of a padding row, if the row is one.
pub fn detail_parent(row: &Value) -> Option<&Value> {
    let is_padding = row.get(PADDING_KEY).and_then(Value::as_bool) == Some(true);
    if !is_padding {
        return None;
    }
    row.get(PARENT_KEY).filter(|parent| parent.is_object())
}

/// Resolves the value a column's filter is matched against.
///
/// Padding rows resolve against their parent record. When the column filters on
/// formatter output, the formatter is called with the record's index in
/// `data_view` and `cell` as its context. Returns `None` when nothing resolves;
/// JSON `null` counts as unresolved.
pub fn resolve_value<'a>(
    row: &'a Value,
    column: &ColumnDefinition,
    cell: Option<usize>,
    data_view: Option<&dyn DataView>,
) -> Option<Cow<'a, Value>> {
    let record = detail_parent(row).unwrap_or(row);
    let raw = resolve_path(record, column.filter_path()).filter(|v| !v.is_null());

    let formatter = column
        .formatter
        .as_ref()
        .filter(|_| column.use_formatter_output_to_filter);

    match formatter {
        Some(formatter) => {
            let args = FormatterArgs {
                row: data_view.and_then(|dv| dv.row_index(record)),
                cell,
                value: raw,
                column,
                data_context: record,
            };
            Some(formatter.format(&args))
                .filter(|v| !v.is_null())
                .map(Cow::Owned)
        }
        None => raw.map(Cow::Borrowed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Formatter;
    use crate::host::MemoryDataView;
    use serde_json::json;

    fn person() -> Value {
        json!({
            "id": 1,
            "firstName": "John",
            "fullName": "John Doe",
            "address": { "zip": 123456, "lines": ["1 Main St", "Apt 2"] },
            "flat.key": "flat"
        })
    }

    #[test]
    fn test_resolve_plain_field() {
        let row = person();
        assert_eq!(resolve_path(&row, "firstName"), Some(&json!("John")));
    }

    #[test]
    fn test_resolve_nested_field() {
        let row = person();
        assert_eq!(resolve_path(&row, "address.zip"), Some(&json!(123456)));
        assert_eq!(resolve_path(&row, "address.lines.1"), Some(&json!("Apt 2")));
    }

    #[test]
    fn test_resolve_dotted_key_directly() {
        let row = person();
        assert_eq!(resolve_path(&row, "flat.key"), Some(&json!("flat")));
    }

    #[test]
    fn test_resolve_missing_segment() {
        let row = person();
        assert_eq!(resolve_path(&row, "address.city"), None);
        assert_eq!(resolve_path(&row, "firstName.length"), None);
    }

    #[test]
    fn test_query_field_overrides_field() {
        let row = person();
        let column = ColumnDefinition::new("zip", "zip").with_query_field("address.zip");
        let value = resolve_value(&row, &column, None, None).unwrap();
        assert_eq!(value.as_ref(), &json!(123456));
    }

    #[test]
    fn test_null_is_unresolved() {
        let row = json!({ "age": null });
        let column = ColumnDefinition::new("age", "age");
        assert!(resolve_value(&row, &column, None, None).is_none());
    }

    #[test]
    fn test_padding_row_resolves_against_parent() {
        let row = json!({ "__isPadding": true, "__parent": person() });
        let column = ColumnDefinition::new("zip", "zip").with_query_field("address.zip");
        let value = resolve_value(&row, &column, None, None).unwrap();
        assert_eq!(value.as_ref(), &json!(123456));
    }

    #[test]
    fn test_parent_ignored_without_padding_flag() {
        let row = json!({ "__parent": person() });
        let column = ColumnDefinition::new("firstName", "firstName");
        assert!(resolve_value(&row, &column, None, None).is_none());
    }

    #[test]
    fn test_formatter_output_used_when_enabled() {
        let row = person();
        let formatter = Formatter::new(|args| {
            let full = args.data_context["fullName"].as_str().unwrap_or_default();
            json!(full.split(' ').next().unwrap_or_default())
        });
        let column = ColumnDefinition::new("first", "missing").with_formatter(formatter, true);

        let value = resolve_value(&row, &column, None, None).unwrap();
        assert_eq!(value.as_ref(), &json!("John"));
    }

    #[test]
    fn test_formatter_ignored_when_disabled() {
        let row = person();
        let column = ColumnDefinition::new("firstName", "firstName")
            .with_formatter(Formatter::new(|_| json!("formatted")), false);

        let value = resolve_value(&row, &column, None, None).unwrap();
        assert_eq!(value.as_ref(), &json!("John"));
    }

    #[test]
    fn test_formatter_receives_parent_row_index() {
        let parent = person();
        let other = json!({ "id": 0, "firstName": "Jane" });
        let view = MemoryDataView::new(vec![other, parent.clone()]);
        let padding = json!({ "__isPadding": true, "__parent": parent });

        let formatter = Formatter::new(|args| json!(args.row));
        let column = ColumnDefinition::new("idx", "idx").with_formatter(formatter, true);

        let value = resolve_value(&padding, &column, Some(3), Some(&view)).unwrap();
        assert_eq!(value.as_ref(), &json!(1));
    }
}
