//! Command dispatch module for routing CLI commands to their handlers.

use crate::cli::{Cli, Commands, ConfigCommands, Shell};
use crate::commands::columns::ColumnsOptions;
use crate::commands::config::{Config, ConfigSetOptions};
use crate::commands::filter::FilterCommandOptions;
use crate::commands::{self, CommandContext, CommandError, Result};

/// A parsed command, borrowing its arguments from the CLI.
pub enum Dispatch<'a> {
    Filter(FilterCommandOptions<'a>),
    Columns(ColumnsOptions<'a>),
    Config(&'a Option<ConfigCommands>),
    Completions(&'a Shell),
    Help,
}

impl<'a> Dispatch<'a> {
    /// Creates a dispatch from the CLI command.
    pub fn from_cli(cli: &'a Cli) -> Self {
        match &cli.command {
            Some(Commands::Filter {
                input,
                filters,
                columns,
                id_field,
                limit,
                all,
            }) => Self::Filter(FilterCommandOptions {
                input,
                filters,
                columns: columns.as_deref(),
                id_field: id_field.as_deref(),
                limit: *limit,
                all: *all,
            }),
            Some(Commands::Columns { input, columns }) => Self::Columns(ColumnsOptions {
                input: input.as_deref(),
                columns: columns.as_deref(),
            }),
            Some(Commands::Config { command }) => Self::Config(command),
            Some(Commands::Completions { shell }) => Self::Completions(shell),
            None => Self::Help,
        }
    }

    /// Runs the command.
    pub fn execute(&self, ctx: &CommandContext, config: &Config) -> Result<()> {
        match self {
            Self::Filter(opts) => commands::filter::execute(ctx, config, opts),
            Self::Columns(opts) => commands::columns::execute(ctx, opts),
            Self::Config(command) => dispatch_config(ctx, command),
            Self::Completions(shell) => {
                commands::completions::execute(shell).map_err(CommandError::Io)
            }
            Self::Help => {
                if !ctx.quiet {
                    println!("gf - filter JSON rows by column");
                    println!("Use --help for usage information");
                }
                Ok(())
            }
        }
    }
}

/// Dispatch config subcommands.
fn dispatch_config(ctx: &CommandContext, command: &Option<ConfigCommands>) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::execute_show(ctx),
        Some(ConfigCommands::Set { key, value }) => {
            let opts = ConfigSetOptions {
                key: key.clone(),
                value: value.clone(),
            };
            commands::config::execute_set(ctx, &opts)
        }
        Some(ConfigCommands::Path) => commands::config::execute_path(ctx),
    }
}
