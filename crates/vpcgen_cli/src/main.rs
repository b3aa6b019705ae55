//! vpcgen CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid configuration
//! - 3: Missing external resource
//! - 4: Data provider error

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vpcgen_iac::IacError;

mod commands;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_CONFIG: u8 = 2;
    pub const MISSING_RESOURCE: u8 = 3;
    pub const PROVIDER_ERROR: u8 = 4;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    // RUST_LOG wins over the flags.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    let result = match cli.command {
        Commands::Plan(args) => commands::plan::execute(args).await,
        Commands::Validate(args) => commands::validate::execute(args).await,
        Commands::Generate(args) => commands::generate::execute(args).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(categorize_error(&e))
        }
    }
}

/// Map an error to its exit code.
fn categorize_error(e: &anyhow::Error) -> u8 {
    match e.downcast_ref::<IacError>() {
        Some(err) if err.is_configuration() => ExitCodes::INVALID_CONFIG,
        Some(IacError::InvalidRouteTarget(_)) => ExitCodes::INVALID_CONFIG,
        Some(IacError::MissingResource(_)) | Some(IacError::UnavailableService { .. }) => {
            ExitCodes::MISSING_RESOURCE
        }
        Some(IacError::Provider(_)) => ExitCodes::PROVIDER_ERROR,
        Some(_) => ExitCodes::GENERAL_ERROR,
        None if e.downcast_ref::<vpcgen_plan::PlanError>().is_some() => ExitCodes::INVALID_CONFIG,
        None => ExitCodes::GENERAL_ERROR,
    }
}
