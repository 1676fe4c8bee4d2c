use clap::Parser;
use std::process::ExitCode;
use tracing::warn;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod dispatch;
mod output;

use cli::Cli;
use commands::config::{load_config, Config};
use commands::{CommandContext, CommandError};
use dispatch::Dispatch;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "GF_LOG";

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.json {
                let error_json = serde_json::json!({
                    "error": {
                        "code": error_code(&e),
                        "message": e.to_string(),
                    }
                });
                eprintln!("{error_json:#}");
            } else {
                eprintln!("Error: {e}");
            }
            error_exit_code(&e)
        }
    }
}

fn run(cli: &Cli) -> commands::Result<()> {
    // An unreadable config still lets `gf config set` rewrite it.
    let config = load_config().unwrap_or_else(|e| {
        warn!(error = %e, "ignoring unreadable config");
        Config::default()
    });
    let ctx = CommandContext::from_cli(cli, &config);
    Dispatch::from_cli(cli).execute(&ctx, &config)
}

/// Log filter: `--verbose` wins, then `GF_LOG`, then `RUST_LOG`.
fn log_filter(cli: &Cli) -> EnvFilter {
    if cli.verbose {
        return EnvFilter::new("debug");
    }
    std::env::var(LOG_ENV)
        .or_else(|_| std::env::var("RUST_LOG"))
        .map(EnvFilter::new)
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

fn init_logging(cli: &Cli) {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .with_ansi(!cli.no_color)
        .with_writer(std::io::stderr)
        .compact()
        .with_env_filter(log_filter(cli))
        .init();
}

/// Returns the error code string for JSON output.
fn error_code(e: &CommandError) -> &'static str {
    match e {
        CommandError::Config(_) => "CONFIG_ERROR",
        CommandError::Io(_) => "IO_ERROR",
        CommandError::Json(_) => "JSON_ERROR",
        CommandError::Toml(_) => "TOML_ERROR",
        CommandError::Expression { .. } => "EXPRESSION_ERROR",
        CommandError::Filter(_) => "FILTER_ERROR",
        CommandError::UnknownColumn { .. } => "UNKNOWN_COLUMN",
        CommandError::Input(_) => "INPUT_ERROR",
    }
}

/// Returns the exit code for an error.
fn error_exit_code(e: &CommandError) -> ExitCode {
    match e {
        CommandError::Expression { .. } | CommandError::UnknownColumn { .. } => ExitCode::from(2),
        CommandError::Io(_) => ExitCode::from(3),
        CommandError::Json(_) | CommandError::Toml(_) | CommandError::Input(_) => {
            ExitCode::from(4)
        }
        CommandError::Config(_) => ExitCode::from(5),
        CommandError::Filter(_) => ExitCode::from(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = CommandError::UnknownColumn {
            column: "x".to_string(),
            suggestion: None,
        };
        assert_eq!(error_code(&err), "UNKNOWN_COLUMN");

        let err = CommandError::Expression {
            expression: "x".to_string(),
            reason: "bad".to_string(),
        };
        assert_eq!(error_code(&err), "EXPRESSION_ERROR");

        let err = CommandError::Config("bad".to_string());
        assert_eq!(error_code(&err), "CONFIG_ERROR");
    }
}
