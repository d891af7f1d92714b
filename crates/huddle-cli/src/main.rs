//! huddle: command-line driver for the channel lifecycle manager.
//!
//! Loads the TOML config, installs tracing and runs one join, publish and
//! leave cycle, printing channel events as JSON lines.

mod cli;
mod session;
mod settings;

use std::process::ExitCode;

use huddle_common::Result;
use huddle_config::HuddleConfig;
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::EnvFilter;

use crate::cli::Args;

fn load_config(args: &Args) -> Result<HuddleConfig> {
    let config = match &args.config {
        Some(path) => {
            let config = huddle_config::load_from_path(path)?;
            huddle_config::validation::validate(&config)?;
            config
        }
        None => huddle_config::load_config()?,
    };
    Ok(config)
}

fn init_tracing(args: &Args, config: &HuddleConfig) {
    let directive = match &args.log_level {
        Some(level) => format!("huddle={level}"),
        None => config.logging.filter_directive(),
    };
    let directive: Directive = directive
        .parse()
        .unwrap_or_else(|_| LevelFilter::INFO.into());

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("huddle: {e}");
            return ExitCode::FAILURE;
        }
    };

    if args.print_config {
        println!("{}", huddle_config::config_to_json(&config));
        return ExitCode::SUCCESS;
    }

    init_tracing(&args, &config);
    tracing::info!("huddle v{} starting", env!("CARGO_PKG_VERSION"));

    match session::run(&args, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "session failed");
            eprintln!("huddle: {e}");
            ExitCode::FAILURE
        }
    }
}
