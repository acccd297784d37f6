// SPDX-License-Identifier: Apache-2.0

//! Streaming presentation of poller events for `watch`.
//!
//! Text mode keeps one transient status line for retries and prints a tile
//! table on every successful refresh. JSON mode writes one compact object
//! per line; YAML mode writes one document per event.

use std::io::{self, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tilewatch_core::PollEvent;

use super::tiles::tile_table;
use crate::cli::{OutputContext, OutputFormat};
use crate::commands::types::WatchEvent;

/// Status line shown while a cycle is being retried.
pub(crate) fn retry_message(attempt: u32, max_retries: u32) -> String {
    format!("Request to display tiles failed. Retrying {attempt}/{max_retries}")
}

/// Renders a stream of [`PollEvent`]s.
pub struct WatchView {
    ctx: OutputContext,
    status: Option<ProgressBar>,
}

impl WatchView {
    /// Create a view for the given output settings.
    pub fn new(ctx: &OutputContext) -> Self {
        Self {
            ctx: ctx.clone(),
            status: None,
        }
    }

    /// Render one event to stdout.
    pub fn show(&mut self, event: &PollEvent) -> Result<()> {
        let mut stdout = io::stdout().lock();
        self.show_to(&mut stdout, event)
    }

    /// Render one event to `w`.
    pub fn show_to(&mut self, w: &mut dyn Write, event: &PollEvent) -> Result<()> {
        match self.ctx.format {
            OutputFormat::Json => {
                let line = serde_json::to_string(&WatchEvent {
                    at: Utc::now(),
                    event,
                })
                .context("Failed to serialize event to JSON")?;
                writeln!(w, "{line}")?;
            }
            OutputFormat::Yaml => {
                let doc = serde_saphyr::to_string(&WatchEvent {
                    at: Utc::now(),
                    event,
                })
                .context("Failed to serialize event to YAML")?;
                writeln!(w, "---")?;
                write!(w, "{doc}")?;
            }
            OutputFormat::Text => self.show_text(w, event)?,
        }
        w.flush()?;
        Ok(())
    }

    fn show_text(&mut self, w: &mut dyn Write, event: &PollEvent) -> io::Result<()> {
        match event {
            PollEvent::Retrying {
                attempt,
                max_retries,
            } => {
                let message = retry_message(*attempt, *max_retries);
                if self.ctx.is_interactive() {
                    self.status_line().set_message(message);
                } else if !self.ctx.quiet {
                    writeln!(w, "{}", style(message).yellow())?;
                }
            }
            PollEvent::Success { tiles } => {
                self.clear_status();
                writeln!(w)?;
                writeln!(
                    w,
                    "{}",
                    style(format!("Tiles at {}", Utc::now().format("%H:%M:%S"))).bold()
                )?;
                writeln!(w, "{}", tile_table(tiles))?;
            }
            PollEvent::Stopped => {
                self.clear_status();
                if !self.ctx.quiet {
                    writeln!(w, "{}", style("Stopped").dim())?;
                }
            }
            // Reported by the caller as the command's error.
            PollEvent::Failure { .. } | PollEvent::AuthenticationFailure { .. } => {
                self.clear_status();
            }
        }
        Ok(())
    }

    fn status_line(&mut self) -> &ProgressBar {
        self.status.get_or_insert_with(|| {
            let bar = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.yellow} {msg}")
            {
                bar.set_style(style);
            }
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        })
    }

    fn clear_status(&mut self) {
        if let Some(bar) = self.status.take() {
            bar.finish_and_clear();
        }
    }

    /// Remove any status line left on screen.
    pub fn finish(&mut self) {
        self.clear_status();
    }
}
