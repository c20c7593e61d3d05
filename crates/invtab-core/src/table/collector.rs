//! Accumulates parsed rows across the pages of one document.

use tracing::debug;

use crate::error::ExtractionError;
use crate::models::row::{PageSummary, TableRow};

/// Append-only collector of table rows in document order.
#[derive(Debug, Default)]
pub struct RowCollector {
    rows: Vec<TableRow>,
    pages: Vec<PageSummary>,
}

impl RowCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the rows of the next page.
    ///
    /// Pages must be pushed in document order; rows are never reordered.
    pub fn push_page(&mut self, summary: PageSummary, rows: Vec<TableRow>) {
        debug!(
            "Page {}: {} of {} lines matched",
            summary.number, summary.rows, summary.lines
        );
        self.pages.push(summary);
        self.rows.extend(rows);
    }

    /// Number of rows collected so far.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Finish collection.
    ///
    /// An empty collection is reported as [`ExtractionError::NoRows`] so that a
    /// header-only table is never mistaken for a successful extraction.
    pub fn finish(self) -> Result<(Vec<TableRow>, Vec<PageSummary>), ExtractionError> {
        if self.rows.is_empty() {
            return Err(ExtractionError::NoRows);
        }
        Ok((self.rows, self.pages))
    }
}
