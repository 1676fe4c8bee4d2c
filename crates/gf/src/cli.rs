//! CLI argument parsing using clap derive macros.
//!
//! This module defines the command-line interface for the gf CLI.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// gf - Filter JSON rows by column
#[derive(Parser, Debug)]
#[command(name = "gf")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colors in output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Filter rows of a JSON file
    #[command(alias = "f")]
    Filter {
        /// JSON file holding an array of row objects ("-" for stdin)
        input: PathBuf,

        /// Column filter, COLUMN[:OPERATOR]=TERM[,TERM] (repeatable)
        #[arg(short = 'w', long = "where", action = clap::ArgAction::Append)]
        filters: Vec<String>,

        /// TOML file with [[columns]] definitions (default: inferred from the first row)
        #[arg(short, long)]
        columns: Option<PathBuf>,

        /// Field that identifies rows (default: "id")
        #[arg(long)]
        id_field: Option<String>,

        /// Maximum rows to print
        #[arg(long)]
        limit: Option<usize>,

        /// Print every matching row
        #[arg(long, conflicts_with = "limit")]
        all: bool,
    },

    /// List the columns rows can be filtered on
    Columns {
        /// JSON file holding an array of row objects ("-" for stdin)
        input: Option<PathBuf>,

        /// TOML file with [[columns]] definitions
        #[arg(short, long)]
        columns: Option<PathBuf>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },

    /// Generate shell completions
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Key (output.color, output.limit, filter.id_field)
        key: String,
        /// Value
        value: String,
    },

    /// Show config file path
    Path,
}

/// Supported shells for completions
#[derive(ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_filter_command() {
        let cli = Cli::try_parse_from([
            "gf",
            "filter",
            "rows.json",
            "-w",
            "firstName:a*=Jo",
            "--where",
            "age=>=18",
            "--limit",
            "5",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Filter {
                input,
                filters,
                limit,
                all,
                ..
            }) => {
                assert_eq!(input, PathBuf::from("rows.json"));
                assert_eq!(filters, vec!["firstName:a*=Jo", "age=>=18"]);
                assert_eq!(limit, Some(5));
                assert!(!all);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_limit_conflicts_with_all() {
        let result = Cli::try_parse_from(["gf", "filter", "rows.json", "--limit", "5", "--all"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["gf", "-q", "-v", "config"]);
        assert!(result.is_err());
    }
}
