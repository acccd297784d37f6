// SPDX-License-Identifier: Apache-2.0

use console::style;
use std::io::{self, Write};
use tilewatch_core::Tile;

use crate::cli::OutputContext;
use crate::commands::types::TilesResult;
use crate::table::TablePrinter;

use super::Renderable;

/// Width cap for the title column.
const TITLE_WIDTH: usize = 40;

fn styled_status(status: Option<&str>) -> String {
    match status {
        Some(s) if s.eq_ignore_ascii_case("UP") => style(s).green().to_string(),
        Some(s) if s.eq_ignore_ascii_case("DOWN") => style(s).red().to_string(),
        Some(s) if s.eq_ignore_ascii_case("WARNING") => style(s).yellow().to_string(),
        Some(s) => s.to_string(),
        None => style("-").dim().to_string(),
    }
}

/// Tile table shared by `fetch` and `watch`.
pub(crate) fn tile_table(tiles: &[Tile]) -> String {
    let mut table = TablePrinter::new(4).with_max_width(1, TITLE_WIDTH);
    table.add_row(&[
        style("ID").bold().to_string(),
        style("TITLE").bold().to_string(),
        style("STATUS").bold().to_string(),
        style("SERVICES").bold().to_string(),
    ]);
    for tile in tiles {
        let services = match tile.active_services {
            Some(active) => format!("{active}/{}", tile.service_count()),
            None => tile.service_count().to_string(),
        };
        table.add_row(&[
            style(tile.id.as_deref().unwrap_or("-")).cyan().to_string(),
            tile.title.clone().unwrap_or_default(),
            styled_status(tile.status.as_deref()),
            services,
        ]);
    }
    table.render()
}

impl Renderable for TilesResult {
    fn render_text(&self, w: &mut dyn Write, _ctx: &OutputContext) -> io::Result<()> {
        writeln!(w)?;
        writeln!(w, "{}", tile_table(&self.tiles))?;
        writeln!(
            w,
            "{}",
            style(format!(
                "{} tile(s) at {}",
                self.tiles.len(),
                self.fetched_at.format("%H:%M:%S")
            ))
            .dim()
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(id: &str, status: &str) -> Tile {
        Tile {
            id: Some(id.to_string()),
            title: Some(format!("{id} title")),
            status: Some(status.to_string()),
            total_services: Some(3),
            active_services: Some(2),
            ..Tile::default()
        }
    }

    #[test]
    fn test_tile_table_lists_each_tile() {
        console::set_colors_enabled(false);
        let table = tile_table(&[tile("apicatalog", "UP"), tile("discovery", "DOWN")]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ID"));
        assert!(lines[1].contains("apicatalog"));
        assert!(lines[1].contains("2/3"));
        assert!(lines[2].contains("DOWN"));
    }

    #[test]
    fn test_tile_table_handles_missing_fields() {
        console::set_colors_enabled(false);
        let table = tile_table(&[Tile::default()]);
        assert!(table.lines().nth(1).is_some_and(|l| l.starts_with('-')));
    }
}
