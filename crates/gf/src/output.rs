//! Output formatting utilities for the gf CLI.
//!
//! Rows and columns print either as JSON or as aligned text tables.

use gridfilter_rs::filter::resolve_path;
use gridfilter_rs::{ColumnDefinition, CurrentFilter};
use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::Value;

/// Widest a table cell is allowed to get.
const MAX_CELL_WIDTH: usize = 24;

/// JSON output for the filter command.
#[derive(Serialize)]
pub struct RowsOutput<'a> {
    pub rows: &'a [Value],
    pub total: usize,
    pub matched: usize,
    pub filters: &'a [CurrentFilter],
}

/// JSON output for a single column.
#[derive(Serialize)]
pub struct ColumnOutput<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub field: &'a str,
    pub filterable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<&'static str>,
}

/// JSON output for the columns command.
#[derive(Serialize)]
pub struct ColumnsListOutput<'a> {
    pub columns: Vec<ColumnOutput<'a>>,
}

/// Truncates a string to a maximum number of characters.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() > max_len {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    } else {
        s.to_string()
    }
}

/// Renders a cell value as plain text.
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Formats filtered rows as JSON.
pub fn format_rows_json(output: &RowsOutput<'_>) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(output)
}

/// Formats filtered rows as a table with one column per definition.
pub fn format_rows_table(
    output: &RowsOutput<'_>,
    columns: &[ColumnDefinition],
    use_colors: bool,
) -> String {
    if output.rows.is_empty() {
        return "No rows matched.\n".to_string();
    }

    let cells: Vec<Vec<String>> = output
        .rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|c| truncate_str(&cell_text(resolve_path(row, c.filter_path())), MAX_CELL_WIDTH))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            cells
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(c.display_name().chars().count()))
                .max()
                .unwrap_or(0)
                .min(MAX_CELL_WIDTH)
        })
        .collect();

    let mut out = String::new();

    let header = join_padded(columns.iter().map(|c| c.display_name().to_string()), &widths);
    if use_colors {
        out.push_str(&format!("{}\n", header.dimmed()));
    } else {
        out.push_str(&header);
        out.push('\n');
    }

    for row in cells {
        out.push_str(&join_padded(row.into_iter(), &widths));
        out.push('\n');
    }

    let summary = format!("{} of {} rows", output.matched, output.total);
    let summary = if output.rows.len() < output.matched {
        format!("{summary} ({} shown)", output.rows.len())
    } else {
        summary
    };
    if use_colors {
        out.push_str(&format!("\n{}\n", summary.dimmed()));
    } else {
        out.push_str(&format!("\n{summary}\n"));
    }

    out
}

fn join_padded(cells: impl Iterator<Item = String>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

/// Formats columns as JSON.
pub fn format_columns_json(columns: &[ColumnDefinition]) -> Result<String, serde_json::Error> {
    let output = ColumnsListOutput {
        columns: columns
            .iter()
            .map(|c| ColumnOutput {
                id: &c.id,
                name: c.display_name(),
                field: c.filter_path(),
                filterable: c.filterable,
                operator: c.default_operator().map(|op| op.as_str()),
            })
            .collect(),
    };
    serde_json::to_string_pretty(&output)
}

/// Formats columns as a table.
pub fn format_columns_table(columns: &[ColumnDefinition], use_colors: bool) -> String {
    if columns.is_empty() {
        return "No columns found.\n".to_string();
    }

    let mut out = String::new();

    let header = format!("{:<20} {:<24} {:<8} {}", "ID", "Field", "Filter", "Operator");
    if use_colors {
        out.push_str(&format!("{}\n", header.dimmed()));
    } else {
        out.push_str(&header);
        out.push('\n');
    }

    for column in columns {
        let filterable = if column.filterable { "yes" } else { "no" };
        let operator = column.default_operator().map(|op| op.as_str()).unwrap_or("");
        let line = format!(
            "{:<20} {:<24} {:<8} {}",
            truncate_str(&column.id, 20),
            truncate_str(column.filter_path(), 24),
            filterable,
            operator
        );
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridfilter_rs::Operator;
    use serde_json::json;

    fn columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("name", "name").with_name("Name"),
            ColumnDefinition::new("city", "location.city"),
        ]
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("short", 10), "short");
        assert_eq!(truncate_str("a much longer value", 10), "a much ...");
        assert_eq!(truncate_str("ééééé", 4), "é...");
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(None), "");
        assert_eq!(cell_text(Some(&json!(null))), "");
        assert_eq!(cell_text(Some(&json!("Ada"))), "Ada");
        assert_eq!(cell_text(Some(&json!(36))), "36");
    }

    #[test]
    fn test_rows_table() {
        let rows = vec![json!({ "name": "Ada", "location": { "city": "London" } })];
        let output = RowsOutput {
            rows: &rows,
            total: 3,
            matched: 1,
            filters: &[],
        };

        let table = format_rows_table(&output, &columns(), false);

        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "Name  city");
        assert_eq!(lines[1], "Ada   London");
        assert_eq!(lines[3], "1 of 3 rows");
    }

    #[test]
    fn test_rows_table_reports_limit() {
        let rows = vec![json!({ "name": "Ada" })];
        let output = RowsOutput {
            rows: &rows,
            total: 3,
            matched: 2,
            filters: &[],
        };

        let table = format_rows_table(&output, &columns(), false);

        assert!(table.ends_with("2 of 3 rows (1 shown)\n"));
    }

    #[test]
    fn test_rows_table_empty() {
        let output = RowsOutput {
            rows: &[],
            total: 3,
            matched: 0,
            filters: &[],
        };
        assert_eq!(format_rows_table(&output, &columns(), false), "No rows matched.\n");
    }

    #[test]
    fn test_rows_json() {
        let rows = vec![json!({ "name": "Ada" })];
        let filters = vec![CurrentFilter::new("name", Operator::Equal, vec![json!("Ada")])];
        let output = RowsOutput {
            rows: &rows,
            total: 2,
            matched: 1,
            filters: &filters,
        };

        let parsed: Value = serde_json::from_str(&format_rows_json(&output).unwrap()).unwrap();

        assert_eq!(
            parsed,
            json!({
                "rows": [{ "name": "Ada" }],
                "total": 2,
                "matched": 1,
                "filters": [{ "columnId": "name", "operator": "EQ", "searchTerms": ["Ada"] }]
            })
        );
    }

    #[test]
    fn test_columns_json() {
        let parsed: Value =
            serde_json::from_str(&format_columns_json(&columns()).unwrap()).unwrap();

        assert_eq!(parsed["columns"][0]["name"], "Name");
        assert_eq!(parsed["columns"][1]["field"], "location.city");
        assert!(parsed["columns"][1].get("operator").is_none());
    }

    #[test]
    fn test_columns_table() {
        let table = format_columns_table(&columns(), false);
        assert!(table.lines().nth(2).unwrap().starts_with("city"));
        assert!(table.contains("location.city"));
        assert_eq!(format_columns_table(&[], false), "No columns found.\n");
    }
}
