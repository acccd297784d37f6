// SPDX-License-Identifier: Apache-2.0

use console::style;
use std::io::{self, Write};

use crate::cli::OutputContext;
use crate::commands::types::ConfigResult;

use super::Renderable;

impl Renderable for ConfigResult<'_> {
    fn render_text(&self, w: &mut dyn Write, _ctx: &OutputContext) -> io::Result<()> {
        let file_note = if self.file_exists {
            style("").dim()
        } else {
            style(" (not found, using defaults)").dim()
        };
        writeln!(w, "{} {}{}", style("Config file:").bold(), self.path, file_note)?;
        writeln!(w)?;

        let catalog = &self.config.catalog;
        writeln!(w, "{}", style("[catalog]").cyan())?;
        writeln!(w, "  base_url             = {}", catalog.base_url)?;
        writeln!(w, "  timeout_seconds      = {}", catalog.timeout_seconds)?;
        writeln!(w, "  accept_invalid_certs = {}", catalog.accept_invalid_certs)?;
        writeln!(
            w,
            "  auth_token           = {}",
            if self.auth_token_set { "<set>" } else { "<unset>" }
        )?;
        writeln!(w)?;

        let polling = &self.config.polling;
        writeln!(w, "{}", style("[polling]").cyan())?;
        writeln!(w, "  update_period_ms         = {}", polling.update_period_ms)?;
        writeln!(w, "  debounce_ms              = {}", polling.debounce_ms)?;
        writeln!(w, "  max_retries              = {}", polling.max_retries)?;
        writeln!(w, "  scaling_ms               = {}", polling.scaling_ms)?;
        writeln!(
            w,
            "  terminating_status_codes = {:?}",
            polling.terminating_status_codes
        )?;
        writeln!(
            w,
            "  excluded_server_codes    = {:?}",
            polling.excluded_server_codes
        )?;
        Ok(())
    }
}
