//! Laravel API analyzer - Command-line tool.
//!
//! Analyzes a Laravel project's route files, controllers, form requests and
//! resources without running the application, and prints what it recovered
//! as YAML or JSON.
//!
//! # Usage
//!
//! ```bash
//! openapi-from-laravel [OPTIONS] <PROJECT_PATH>
//! ```
//!
//! # Examples
//!
//! Write a YAML report:
//! ```bash
//! openapi-from-laravel ./my-laravel-app -o analysis.yaml
//! ```
//!
//! JSON, without caching, stopping at the first failure:
//! ```bash
//! openapi-from-laravel ./my-laravel-app -f json --no-cache --fail-fast
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use openapi_from_laravel::cli;

fn main() -> Result<()> {
    let args_for_verbose = cli::CliArgs::parse();

    let log_level = if args_for_verbose.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .parse_default_env()
        .init();

    info!("Laravel API analyzer starting...");

    let args = cli::parse_args_from_parsed(args_for_verbose)?;

    cli::run(args)?;

    info!("Analysis report generated successfully");

    Ok(())
}
