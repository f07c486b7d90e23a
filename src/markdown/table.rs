//! Pipe-table rendering.

use std::fmt::Write as _;

use crate::docs::{ElementKind, Table};

use super::converter::TabConverter;

impl TabConverter<'_> {
    /// Flatten a table into a Markdown pipe table.
    ///
    /// The first row always becomes the header; shorter data rows are
    /// right-padded to the header's column count, and longer rows keep all
    /// their cells. Pipes and newlines in cell text are escaped so no cell
    /// can break the table grammar. Inline images inside cells still
    /// register download requests.
    pub(super) fn render_table(&mut self, table: &Table) {
        if table.table_rows.is_empty() {
            return;
        }

        let mut rows: Vec<Vec<String>> = Vec::with_capacity(table.table_rows.len());
        for row in &table.table_rows {
            let mut cells = Vec::with_capacity(row.table_cells.len());
            for cell in &row.table_cells {
                let mut text = String::new();
                for element in &cell.content {
                    if let ElementKind::Paragraph(p) = element.kind() {
                        text.push_str(self.render_elements(&p.elements).trim());
                    }
                }
                cells.push(text.replace('|', "\\|").replace('\n', " "));
            }
            rows.push(cells);
        }

        let header = &rows[0];
        writeln!(self.out, "| {} |", header.join(" | ")).ok();

        let separator = vec!["---"; header.len()];
        writeln!(self.out, "| {} |", separator.join(" | ")).ok();

        let width = header.len();
        for row in &rows[1..] {
            let mut padded = row.clone();
            // Pad short rows only; a row wider than the header keeps all
            // its cells.
            if padded.len() < width {
                padded.resize(width, String::new());
            }
            writeln!(self.out, "| {} |", padded.join(" | ")).ok();
        }
        self.out.push('\n');
    }
}
