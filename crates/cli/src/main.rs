// Tunebook CLI - headless fakebook index operations

mod books;
mod diff;
mod exit_codes;
mod offsets;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use tunebook_config::Settings;

use exit_codes::{EXIT_STORE, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "tbook")]
#[command(about = "Fakebook index reconciliation and sheet-offset tools")]
#[command(version)]
struct Cli {
    /// Library database (overrides the configured location)
    #[arg(long, global = true, env = "TUNEBOOK_DB", value_name = "FILE")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare resolved page numbers for each title across index sources
    #[command(after_help = "\
Examples:
  tbook diff --all --summary
  tbook diff --book 'Real Book Vol 1' --verbose
  tbook diff --all --page-summary
  tbook diff --all --json > result.json
  tbook diff --all --csv mismatches.csv")]
    Diff(diff::DiffArgs),

    /// List canonical books known to the library
    #[command(after_help = "\
Examples:
  tbook books
  tbook books --contains 'real book'")]
    Books {
        /// Substring search across every canonical name
        #[arg(long, value_name = "FRAGMENT")]
        contains: Option<String>,
    },

    /// Sheet-offset table maintenance and lookups
    Offsets {
        #[command(subcommand)]
        command: offsets::OffsetsCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let settings = Settings::load();
    let database = cli.database.unwrap_or_else(|| settings.database_path());

    let result = match cli.command {
        None => {
            eprintln!("Usage: tbook <command> [options]");
            eprintln!("       tbook --help for more information");
            Ok(())
        }
        Some(Commands::Diff(args)) => diff::cmd_diff(&database, &settings, &args),
        Some(Commands::Books { contains }) => books::cmd_books(&database, contains.as_deref()),
        Some(Commands::Offsets { command }) => {
            offsets::cmd_offsets(&database, &settings, command)
        }
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {hint}");
            }
            ExitCode::from(err.code)
        }
    }
}

/// Structured command failure: exit code plus stderr message.
#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self {
            code: EXIT_USAGE,
            message: msg.into(),
            hint: None,
        }
    }

    pub fn store(err: tunebook_store::StoreError) -> Self {
        Self {
            code: EXIT_STORE,
            message: err.to_string(),
            hint: None,
        }
    }
}
