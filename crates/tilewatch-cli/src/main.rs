// SPDX-License-Identifier: Apache-2.0

//! tilewatch - keep an eye on API Catalog tiles.
//!
//! A CLI that polls the API Catalog of an API Mediation Layer gateway and
//! shows tile status as it changes.

mod cli;
mod commands;
mod errors;
mod logging;
mod output;
mod table;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tilewatch_core::config;
use tracing::debug;

use crate::cli::{Cli, OutputContext};

#[tokio::main]
async fn main() -> ExitCode {
    let Cli {
        output,
        quiet,
        verbose,
        base_url,
        command,
    } = Cli::parse();
    logging::init_logging(verbose);

    let output_ctx = OutputContext::from_cli(output, quiet, verbose);

    let result: anyhow::Result<()> = async move {
        let mut config = config::load_config().context("Failed to load configuration")?;
        debug!("Configuration loaded successfully");

        // Apply CLI overrides to config
        if let Some(base_url) = base_url {
            debug!("Overriding catalog base URL to: {base_url}");
            config.catalog.base_url = base_url;
        }

        commands::run(command, output_ctx, &config).await
    }
    .await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let formatted = errors::format_error(&e);
            eprintln!("Error: {formatted}");
            errors::exit_code(&e)
        }
    }
}
