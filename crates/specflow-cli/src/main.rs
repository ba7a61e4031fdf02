//! Specflow CLI.
//!
//! Thin command-line front end over the specification store, state manager,
//! dependency resolver, recovery manager, and change watcher. Every command
//! prints a machine-readable JSON result on stdout; failures carry the typed
//! error kind so scripts can branch without parsing prose.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::Cli;

/// Process exit codes, stable across releases.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Success = 0,
    GeneralError = 1,
    NotFound = 2,
    IoError = 3,
    Conflict = 4,
    ValidationError = 5,
    Corruption = 6,
    Staleness = 7,
}

impl From<Exit> for ExitCode {
    fn from(exit: Exit) -> Self {
        ExitCode::from(exit as u8)
    }
}

impl From<&specflow_core::Error> for Exit {
    fn from(err: &specflow_core::Error) -> Self {
        match err.kind() {
            "not_found" => Exit::NotFound,
            "io_failure" => Exit::IoError,
            "conflict" => Exit::Conflict,
            "validation" => Exit::ValidationError,
            "corruption" => Exit::Corruption,
            "staleness" => Exit::Staleness,
            _ => Exit::GeneralError,
        }
    }
}

fn init_tracing(cli: &Cli) {
    let level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match commands::run(&cli) {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value).unwrap_or_default());
            Exit::Success.into()
        }
        Err(err) => {
            let exit = Exit::from(&err);
            let report = serde_json::json!({
                "ok": false,
                "kind": err.kind(),
                "message": err.to_string(),
            });
            println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
            exit.into()
        }
    }
}
