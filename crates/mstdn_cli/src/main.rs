//! mstdn CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments or declined confirmation
//! - 3: Configuration incomplete
//! - 4: Missing dependency (stack deployed out of order)
//! - 5: Persistence error

use std::process::ExitCode;

use clap::Parser;
use mstdn_stack::{ErrorKind, StackError};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const CONFIGURATION_INCOMPLETE: u8 = 3;
    pub const MISSING_DEPENDENCY: u8 = 4;
    pub const PERSISTENCE_ERROR: u8 = 5;
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "mstdn=debug" } else { "mstdn=info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,{}", default_level)));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    let result = match cli.command {
        Commands::Config(args) => commands::config::execute(args, &cli.workspace),
        Commands::Render(args) => commands::render::execute(args, &cli.workspace),
        Commands::Register(args) => commands::register::execute(args, &cli.workspace),
        Commands::Registry => commands::registry::execute(&cli.workspace),
        Commands::Check(args) => commands::check::execute(args, &cli.workspace),
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    if e.downcast_ref::<commands::config::Declined>().is_some() {
        return ExitCodes::INVALID_ARGS;
    }

    match e.downcast_ref::<StackError>().map(StackError::kind) {
        Some(ErrorKind::ConfigurationIncomplete) => ExitCodes::CONFIGURATION_INCOMPLETE,
        Some(ErrorKind::MissingDependency) => ExitCodes::MISSING_DEPENDENCY,
        Some(ErrorKind::Persistence) => ExitCodes::PERSISTENCE_ERROR,
        Some(ErrorKind::Provisioning) | Some(ErrorKind::BuilderMisuse) | None => ExitCodes::GENERAL_ERROR,
    }
}
