//! Command implementations for the gf CLI.
//!
//! This module contains the actual command handlers that are invoked by the CLI.

pub mod columns;
pub mod completions;
pub mod config;
pub mod filter;

use strsim::levenshtein;

use crate::cli::Cli;

/// Maximum Levenshtein distance to consider a column id as a suggestion.
const MAX_SUGGESTION_DISTANCE: usize = 3;

/// Error type for command execution.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Malformed `--where` expression.
    #[error("invalid filter expression '{expression}': {reason}")]
    Expression { expression: String, reason: String },

    /// Filter engine error.
    #[error("filter error: {0}")]
    Filter(#[from] gridfilter_rs::FilterError),

    /// A filter names a column that does not exist.
    #[error("{}", format_unknown_column(column, suggestion.as_deref()))]
    UnknownColumn {
        column: String,
        suggestion: Option<String>,
    },

    /// Input rows are not usable.
    #[error("invalid input: {0}")]
    Input(String),
}

/// Result type for command execution.
pub type Result<T> = std::result::Result<T, CommandError>;

fn format_unknown_column(column: &str, suggestion: Option<&str>) -> String {
    let base = format!("column '{column}' not found. Run 'gf columns' to list columns.");
    match suggestion {
        Some(s) => format!("{base} Did you mean '{s}'?"),
        None => base,
    }
}

/// Finds the closest column id, if one is near enough to suggest.
pub(crate) fn find_similar_name<'a>(
    query: &str,
    candidates: impl Iterator<Item = &'a str>,
) -> Option<String> {
    let query_lower = query.to_lowercase();

    let (best_match, best_distance) = candidates
        .filter(|name| !name.is_empty())
        .map(|name| (name, levenshtein(&query_lower, &name.to_lowercase())))
        .min_by_key(|(_, d)| *d)?;

    (best_distance <= MAX_SUGGESTION_DISTANCE).then(|| best_match.to_string())
}

/// Context for command execution, containing common dependencies.
pub struct CommandContext {
    /// Whether to output JSON.
    pub json_output: bool,
    /// Whether to use colors.
    pub use_colors: bool,
    /// Whether to be quiet (errors only).
    pub quiet: bool,
    /// Whether to be verbose.
    pub verbose: bool,
}

impl CommandContext {
    /// Creates a new command context from CLI arguments and the loaded config.
    pub fn from_cli(cli: &Cli, config: &config::Config) -> Self {
        Self {
            json_output: cli.json,
            use_colors: !cli.no_color && config.output.color.unwrap_or(true),
            quiet: cli.quiet,
            verbose: cli.verbose,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_similar_name() {
        let ids = ["firstName", "lastName", "age"];
        assert_eq!(
            find_similar_name("firstname", ids.iter().copied()),
            Some("firstName".to_string())
        );
        assert_eq!(
            find_similar_name("frstName", ids.iter().copied()),
            Some("firstName".to_string())
        );
        assert_eq!(find_similar_name("salary", ids.iter().copied()), None);
    }

    #[test]
    fn test_unknown_column_message() {
        let err = CommandError::UnknownColumn {
            column: "frstName".to_string(),
            suggestion: Some("firstName".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "column 'frstName' not found. Run 'gf columns' to list columns. Did you mean 'firstName'?"
        );
    }
}
