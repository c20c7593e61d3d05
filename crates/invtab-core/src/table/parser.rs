//! Line parser mapping OCR text lines onto table rows.

use tracing::trace;

use crate::models::row::{PageSummary, TableRow};

use super::patterns::ROW_PATTERN;

/// Parses single lines of recognized text into [`TableRow`]s.
///
/// A line either matches the full row layout or is rejected; there are no
/// partial rows. Rejection is the common case (headers, footers, noise) and
/// is never an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowParser;

impl RowParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse one line. Returns `None` unless the whole line has the row shape.
    pub fn parse_line(&self, line: &str) -> Option<TableRow> {
        let caps = ROW_PATTERN.captures(line)?;
        let field = |i: usize| caps.get(i).map_or(String::new(), |m| m.as_str().to_string());

        Some(TableRow {
            item: field(1),
            description: field(2),
            ncm: field(3),
            unit: field(4),
            quantity: field(5),
            r1: field(6),
            r2: field(7),
            amount: field(8),
        })
    }

    /// Parse every line of one page of text, in line order.
    ///
    /// Lines are trimmed and empty lines skipped before parsing. The summary
    /// counts the lines that reached the parser and the rows produced.
    pub fn parse_page(&self, number: u32, text: &str) -> (PageSummary, Vec<TableRow>) {
        let mut summary = PageSummary {
            number,
            ..PageSummary::default()
        };
        let mut rows = Vec::new();

        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            summary.lines += 1;
            match self.parse_line(line) {
                Some(row) => rows.push(row),
                None => trace!("page {}: skipped line {:?}", number, line),
            }
        }

        summary.rows = rows.len();
        (summary, rows)
    }
}

/// Parse one line with the default parser.
pub fn parse_line(line: &str) -> Option<TableRow> {
    RowParser::new().parse_line(line)
}

/// Parse all lines of a text block with the default parser.
pub fn parse_lines(text: &str) -> Vec<TableRow> {
    RowParser::new().parse_page(0, text).1
}
