//! Columns command implementation.
//!
//! Loads row data and column definitions, and lists the filterable columns.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use gridfilter_rs::ColumnDefinition;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{CommandContext, CommandError, Result};
use crate::output::{format_columns_json, format_columns_table};

/// A TOML file of `[[columns]]` tables.
#[derive(Debug, Deserialize)]
struct ColumnsFile {
    #[serde(default)]
    columns: Vec<ColumnDefinition>,
}

/// Reads a JSON array of row objects from a file, or stdin for `-`.
pub fn load_rows(path: &Path) -> Result<Vec<Value>> {
    let content = if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        fs::read_to_string(path)?
    };

    parse_rows(&content)
}

/// Parses row data. Every row must be a JSON object.
pub fn parse_rows(content: &str) -> Result<Vec<Value>> {
    let Value::Array(rows) = serde_json::from_str::<Value>(content)? else {
        return Err(CommandError::Input(
            "expected a JSON array of row objects".to_string(),
        ));
    };

    if let Some(position) = rows.iter().position(|row| !row.is_object()) {
        return Err(CommandError::Input(format!(
            "row {} is not a JSON object",
            position
        )));
    }

    debug!(rows = rows.len(), "loaded rows");
    Ok(rows)
}

/// Loads column definitions from a TOML file.
pub fn load_columns(path: &Path) -> Result<Vec<ColumnDefinition>> {
    let content = fs::read_to_string(path)?;
    parse_columns(&content)
}

/// Parses `[[columns]]` definitions, filling in empty fields with the id.
pub fn parse_columns(content: &str) -> Result<Vec<ColumnDefinition>> {
    let file: ColumnsFile = toml::from_str(content)?;
    if file.columns.is_empty() {
        return Err(CommandError::Input(
            "column file defines no [[columns]]".to_string(),
        ));
    }

    let columns = file
        .columns
        .into_iter()
        .map(|mut column| {
            if column.field.is_empty() {
                column.field = column.id.clone();
            }
            column
        })
        .collect();
    Ok(columns)
}

/// Derives one column per top-level key of the first row.
pub fn infer_columns(rows: &[Value]) -> Vec<ColumnDefinition> {
    rows.first()
        .and_then(Value::as_object)
        .map(|first| {
            first
                .keys()
                .filter(|key| !key.starts_with("__"))
                .map(|key| ColumnDefinition::new(key.as_str(), key.as_str()))
                .collect()
        })
        .unwrap_or_default()
}

/// Resolves the column set: an explicit file wins, then inference from rows.
pub fn resolve_columns(
    columns_path: Option<&Path>,
    rows: Option<&[Value]>,
) -> Result<Vec<ColumnDefinition>> {
    match (columns_path, rows) {
        (Some(path), _) => load_columns(path),
        (None, Some(rows)) => Ok(infer_columns(rows)),
        (None, None) => Err(CommandError::Input(
            "pass an input file or --columns to list columns".to_string(),
        )),
    }
}

/// Options for the columns command.
pub struct ColumnsOptions<'a> {
    /// Row data to infer columns from.
    pub input: Option<&'a Path>,
    /// Column definition file.
    pub columns: Option<&'a Path>,
}

/// Executes the columns command.
pub fn execute(ctx: &CommandContext, opts: &ColumnsOptions<'_>) -> Result<()> {
    let rows = match (opts.columns, opts.input) {
        (None, Some(input)) => Some(load_rows(input)?),
        _ => None,
    };
    let columns = resolve_columns(opts.columns, rows.as_deref())?;

    if ctx.json_output {
        println!("{}", format_columns_json(&columns)?);
    } else if !ctx.quiet {
        print!("{}", format_columns_table(&columns, ctx.use_colors));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridfilter_rs::Operator;
    use serde_json::json;

    #[test]
    fn test_parse_rows_requires_array() {
        let err = parse_rows(r#"{"id": 1}"#).unwrap_err();
        assert!(matches!(err, CommandError::Input(_)));
    }

    #[test]
    fn test_parse_rows_requires_objects() {
        let err = parse_rows(r#"[{"id": 1}, 2]"#).unwrap_err();
        assert_eq!(err.to_string(), "invalid input: row 1 is not a JSON object");
    }

    #[test]
    fn test_parse_rows_rejects_malformed_json() {
        assert!(matches!(
            parse_rows("[{").unwrap_err(),
            CommandError::Json(_)
        ));
    }

    #[test]
    fn test_infer_columns_skips_internal_keys() {
        let rows = vec![json!({ "id": 1, "name": "Ada", "__isPadding": false })];

        let ids: Vec<String> = infer_columns(&rows).into_iter().map(|c| c.id).collect();

        assert_eq!(ids, vec!["id", "name"]);
    }

    #[test]
    fn test_infer_columns_from_nothing() {
        assert!(infer_columns(&[]).is_empty());
    }

    #[test]
    fn test_parse_columns() {
        let columns = parse_columns(
            r#"
            [[columns]]
            id = "name"
            name = "Full name"

            [[columns]]
            id = "city"
            field = "location.city"
            filter = { operator = "a*" }

            [[columns]]
            id = "notes"
            filterable = false
            "#,
        )
        .unwrap();

        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0].field, "name");
        assert_eq!(columns[0].display_name(), "Full name");
        assert_eq!(columns[1].filter_path(), "location.city");
        assert_eq!(columns[1].default_operator(), Some(Operator::StartsWith));
        assert!(!columns[2].filterable);
    }

    #[test]
    fn test_parse_columns_requires_entries() {
        assert!(matches!(
            parse_columns("").unwrap_err(),
            CommandError::Input(_)
        ));
    }

    #[test]
    fn test_resolve_columns_needs_a_source() {
        assert!(resolve_columns(None, None).is_err());
    }
}
