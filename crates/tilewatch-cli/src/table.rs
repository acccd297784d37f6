// SPDX-License-Identifier: Apache-2.0

//! Lightweight table printer for consistent formatting.

use std::fmt::Write;

use console::{Alignment, measure_text_width, pad_str, truncate_str};

/// A simple table printer for rendering rows with consistent column alignment.
///
/// Widths are measured without ANSI escapes, so cells may be styled.
pub struct TablePrinter {
    /// Column widths for alignment.
    column_widths: Vec<usize>,
    /// Optional width caps per column.
    max_widths: Vec<Option<usize>>,
    /// Rows of data.
    rows: Vec<Vec<String>>,
}

impl TablePrinter {
    /// Create a new table printer with the given column count.
    pub fn new(column_count: usize) -> Self {
        Self {
            column_widths: vec![0; column_count],
            max_widths: vec![None; column_count],
            rows: Vec::new(),
        }
    }

    /// Cap a column's width; longer cells are truncated with an ellipsis.
    #[must_use]
    pub fn with_max_width(mut self, column: usize, width: usize) -> Self {
        if let Some(slot) = self.max_widths.get_mut(column) {
            *slot = Some(width);
        }
        self
    }

    /// Add a row to the table, updating column widths as needed.
    pub fn add_row<S: AsRef<str>>(&mut self, cells: &[S]) {
        let cells: Vec<String> = cells
            .iter()
            .enumerate()
            .map(|(i, cell)| match self.max_widths.get(i).copied().flatten() {
                Some(max) => truncate_str(cell.as_ref(), max, "...").into_owned(),
                None => cell.as_ref().to_string(),
            })
            .collect();
        for (i, cell) in cells.iter().enumerate() {
            if i < self.column_widths.len() {
                self.column_widths[i] = self.column_widths[i].max(measure_text_width(cell));
            }
        }
        self.rows.push(cells);
    }

    /// Render the table as a formatted string.
    pub fn render(&self) -> String {
        let mut output = String::new();

        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                let last = i + 1 == row.len();
                if i < self.column_widths.len() && !last {
                    let width = self.column_widths[i];
                    let _ = write!(output, "{}  ", pad_str(cell, width, Alignment::Left, None));
                } else {
                    output.push_str(cell);
                }
            }
            output.push('\n');
        }

        output
    }
}
