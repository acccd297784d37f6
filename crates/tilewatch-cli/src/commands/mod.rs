// SPDX-License-Identifier: Apache-2.0

//! Command handlers for tilewatch CLI.

pub mod completion;
pub mod config;
pub mod fetch;
pub mod types;
pub mod watch;

use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tilewatch_core::AppConfig;

use crate::cli::{CompletionCommand, ConfigCommand, Commands, OutputContext};
use crate::output;

/// Creates a styled spinner (only if interactive).
pub(crate) fn maybe_spinner(ctx: &OutputContext, message: &str) -> Option<ProgressBar> {
    if ctx.is_interactive() {
        let s = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            s.set_style(style);
        }
        s.set_message(message.to_string());
        s.enable_steady_tick(Duration::from_millis(100));
        Some(s)
    } else {
        None
    }
}

/// Dispatch to the appropriate command handler.
pub async fn run(command: Commands, ctx: OutputContext, config: &AppConfig) -> Result<()> {
    match command {
        Commands::Watch { service_id, count } => {
            watch::run(service_id.as_deref(), count, &ctx, config).await
        }

        Commands::Fetch { service_id } => {
            let spinner = maybe_spinner(&ctx, "Fetching tiles...");
            let result = fetch::run(service_id.as_deref(), config).await;
            if let Some(s) = spinner {
                s.finish_and_clear();
            }
            output::render(&result?, &ctx)
        }

        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommand::Show => output::render(&config::show(config), &ctx),
            ConfigCommand::Path => {
                config::path();
                Ok(())
            }
        },

        Commands::Completion(completion_cmd) => match completion_cmd {
            CompletionCommand::Generate { shell } => completion::run_generate(shell),
            CompletionCommand::Install { shell, dry_run } => {
                completion::run_install(shell, dry_run)
            }
        },
    }
}
