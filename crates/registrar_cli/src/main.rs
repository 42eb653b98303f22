//! `registrar` command-line entry point.
//!
//! # Responsibility
//! - Resolve configuration from `.env`, the environment and flags.
//! - Print one JSON document on stdout per successful command.
//! - Print a JSON error on stderr and exit with a kind-specific code.

mod args;
mod commands;
mod errors;

use args::Cli;
use clap::Parser;
use errors::{CliError, CliResult};
use log::error;
use registrar_core::{init_logging, open_db, RegistrarConfig};
use serde_json::{json, Value};
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    match run(cli) {
        Ok(output) => {
            if let Err(err) = write_stdout(&output) {
                report(&CliError::Io(err));
            }
        }
        Err(err) => report(&err),
    }
}

fn run(cli: Cli) -> CliResult<Value> {
    // Missing .env is fine; explicit variables and flags still apply.
    dotenvy::dotenv().ok();

    let config = RegistrarConfig::from_env()?.with_overrides(
        cli.global.db,
        cli.global.log_level.as_deref(),
        cli.global.log_dir,
    )?;
    if let Some(log_dir) = &config.log_dir {
        init_logging(config.log_level, log_dir)?;
    }

    let conn = open_db(&config.db_path)?;
    commands::execute(&conn, cli.command)
}

fn write_stdout(output: &Value) -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, output)?;
    writeln!(stdout)?;
    stdout.flush()
}

fn report(err: &CliError) -> ! {
    error!(
        "event=cli_command module=cli status=error error_code={}",
        err.error_code()
    );
    let body = json!({
        "error_code": err.error_code(),
        "status": err.status(),
        "message": err.to_string(),
    });
    eprintln!("{body}");
    std::process::exit(err.exit_code());
}
