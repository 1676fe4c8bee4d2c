//! Filter command implementation.
//!
//! Each `--where` expression is fed through a local-mode coordinator the same
//! way a header filter reports input, and the rows the data view keeps
//! visible are printed.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use gridfilter_rs::{
    ColumnDefinition, CurrentFilter, FilterCallbackArgs, FilterCoordinator, FilterOptions,
    InputEvent, MemoryDataView, MemoryGrid, Operator, TextElement,
};
use serde_json::Value;
use tracing::debug;

use super::columns::{load_rows, resolve_columns};
use super::config::Config;
use super::{find_similar_name, CommandContext, CommandError, Result};
use crate::output::{format_rows_json, format_rows_table, RowsOutput};

/// Default row limit when neither the flag nor the config sets one.
const DEFAULT_LIMIT: usize = 50;

/// A parsed `COLUMN[:OPERATOR]=TERM[,TERM]` expression.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterExpression {
    /// Column id.
    pub column: String,
    /// Explicit operator, if one was given.
    pub operator: Option<Operator>,
    /// Search terms, in input order.
    pub terms: Vec<Value>,
}

impl FilterExpression {
    fn invalid(expression: &str, reason: &str) -> CommandError {
        CommandError::Expression {
            expression: expression.to_string(),
            reason: reason.to_string(),
        }
    }

    /// The terms joined back into the text a user would have typed.
    pub fn input_text(&self) -> String {
        self.terms
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Symbolic operator tokens, longest first.
const SYMBOLIC_OPERATORS: [&str; 7] = [">=", "<=", "<>", "!=", "==", ">", "<"];

/// Splits an operator from its terms.
///
/// A symbolic token may be followed directly by the terms or by `=`, so
/// `>=18` and `>==18` both read as `>=` and `18`. Word tokens such as `GE`
/// or `a*` need the `=` separator.
fn split_operator(rest: &str) -> Option<(Operator, &str)> {
    if let Some(token) = SYMBOLIC_OPERATORS.iter().find(|t| rest.starts_with(**t)) {
        let op = token.parse::<Operator>().ok()?;
        let terms = &rest[token.len()..];
        return Some((op, terms.strip_prefix('=').unwrap_or(terms)));
    }

    let (token, terms) = rest.split_once('=')?;
    if token.is_empty() {
        return None;
    }
    token.parse::<Operator>().ok().map(|op| (op, terms))
}

impl FromStr for FilterExpression {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self> {
        let eq = s.find('=');
        let colon = s.find(':').filter(|&c| eq.map_or(true, |e| c < e));

        let (column, operator, terms) = match (colon, eq) {
            (Some(colon), _) => {
                let rest = &s[colon + 1..];
                let (op, terms) = split_operator(rest).ok_or_else(|| {
                    let token = rest.split('=').next().unwrap_or_default();
                    Self::invalid(s, &format!("unknown operator '{}'", token))
                })?;
                (&s[..colon], Some(op), terms)
            }
            (None, Some(eq)) => (&s[..eq], None, &s[eq + 1..]),
            (None, None) => return Err(Self::invalid(s, "expected COLUMN[:OPERATOR]=TERM")),
        };

        let column = column.trim();
        if column.is_empty() {
            return Err(Self::invalid(s, "missing column"));
        }

        let terms: Vec<Value> = terms
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| Value::String(t.to_string()))
            .collect();
        if terms.is_empty() {
            return Err(Self::invalid(s, "missing search term"));
        }

        Ok(Self {
            column: column.to_string(),
            operator,
            terms,
        })
    }
}

/// Finds an expression's column, suggesting a near match when it is missing.
fn find_column<'a>(columns: &'a [ColumnDefinition], id: &str) -> Result<&'a ColumnDefinition> {
    columns
        .iter()
        .find(|c| c.id == id)
        .ok_or_else(|| CommandError::UnknownColumn {
            column: id.to_string(),
            suggestion: find_similar_name(id, columns.iter().map(|c| c.id.as_str())),
        })
}

/// Rows left after filtering.
#[derive(Debug)]
pub struct FilterOutcome {
    /// Visible rows, in input order.
    pub rows: Vec<Value>,
    /// Number of input rows.
    pub total: usize,
    /// Filters in effect.
    pub filters: Vec<CurrentFilter>,
}

/// Applies expressions to rows through a local-mode coordinator.
pub fn apply_filters(
    rows: Vec<Value>,
    columns: Vec<ColumnDefinition>,
    expressions: &[FilterExpression],
    id_field: &str,
) -> Result<FilterOutcome> {
    let total = rows.len();
    let view = Arc::new(MemoryDataView::new(rows).with_id_field(id_field));
    let coordinator = FilterCoordinator::new(FilterOptions::local());
    coordinator.init(Arc::new(MemoryGrid::new(columns.clone())));
    coordinator.bind(view.clone())?;

    for expression in expressions {
        let column = find_column(&columns, &expression.column)?;
        let element = Arc::new(TextElement::new());
        let metadata = coordinator
            .on_header_rendered(column, element.clone())
            .ok_or_else(|| {
                FilterExpression::invalid(
                    &expression.column,
                    &format!("column '{}' is not filterable", column.id),
                )
            })?;

        let text = expression.input_text();
        element.set_value(text.clone());

        let mut args =
            FilterCallbackArgs::for_column(column).with_search_terms(expression.terms.clone());
        if let Some(operator) = expression.operator {
            args = args.with_operator(operator);
        }
        debug!(column = %column.id, terms = %text, "applying filter");
        metadata.callback(Some(&InputEvent::change(text)), args);
    }

    let outcome = FilterOutcome {
        rows: view.visible_rows().into_iter().cloned().collect(),
        total,
        filters: coordinator.current_local_filters(),
    };
    coordinator.dispose();
    Ok(outcome)
}

/// Options for the filter command.
pub struct FilterCommandOptions<'a> {
    /// Row data.
    pub input: &'a Path,
    /// Raw `--where` expressions.
    pub filters: &'a [String],
    /// Column definition file.
    pub columns: Option<&'a Path>,
    /// Row id field override.
    pub id_field: Option<&'a str>,
    /// Row limit override.
    pub limit: Option<usize>,
    /// Print every row.
    pub all: bool,
}

impl FilterCommandOptions<'_> {
    /// Row limit: `--all` disables it, then the flag, config, default.
    fn effective_limit(&self, config: &Config) -> Option<usize> {
        if self.all {
            return None;
        }
        Some(
            self.limit
                .or(config.output.limit)
                .unwrap_or(DEFAULT_LIMIT),
        )
    }
}

/// Executes the filter command.
pub fn execute(ctx: &CommandContext, config: &Config, opts: &FilterCommandOptions<'_>) -> Result<()> {
    let expressions = opts
        .filters
        .iter()
        .map(|s| s.parse())
        .collect::<Result<Vec<FilterExpression>>>()?;

    let rows = load_rows(opts.input)?;
    let columns = resolve_columns(opts.columns, Some(rows.as_slice()))?;
    let id_field = opts
        .id_field
        .or(config.filter.id_field.as_deref())
        .unwrap_or("id");

    let outcome = apply_filters(rows, columns.clone(), &expressions, id_field)?;
    let matched = outcome.rows.len();
    let shown = match opts.effective_limit(config) {
        Some(limit) => &outcome.rows[..matched.min(limit)],
        None => &outcome.rows[..],
    };

    let output = RowsOutput {
        rows: shown,
        total: outcome.total,
        matched,
        filters: &outcome.filters,
    };

    if ctx.json_output {
        println!("{}", format_rows_json(&output)?);
    } else if !ctx.quiet {
        if ctx.verbose {
            for filter in &outcome.filters {
                eprintln!(
                    "filter: {} {} {}",
                    filter.column_id,
                    filter.operator,
                    serde_json::to_string(&filter.search_terms)?
                );
            }
        }
        print!("{}", format_rows_table(&output, &columns, ctx.use_colors));
    }

    Ok(())
}
