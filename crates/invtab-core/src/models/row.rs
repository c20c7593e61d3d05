//! Table row data models.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One data row of the invoice table, exactly as recognized.
///
/// Every field is kept as the text captured from the OCR line; no numeric
/// conversion happens here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    /// Two-digit item number.
    pub item: String,

    /// Free-text description of the goods.
    pub description: String,

    /// NCM tariff code (`dddd.dd.dd`).
    pub ncm: String,

    /// Unit of measure (two or three uppercase letters).
    pub unit: String,

    /// Quantity as printed.
    pub quantity: String,

    /// First rate column.
    pub r1: String,

    /// Second rate column.
    pub r2: String,

    /// Line amount.
    pub amount: String,
}

impl TableRow {
    /// Fields in column order.
    pub fn fields(&self) -> [&str; 8] {
        [
            &self.item,
            &self.description,
            &self.ncm,
            &self.unit,
            &self.quantity,
            &self.r1,
            &self.r2,
            &self.amount,
        ]
    }
}

/// Per-page parsing statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageSummary {
    /// Page number (1-indexed).
    pub number: u32,
    /// Non-empty lines presented to the parser.
    pub lines: usize,
    /// Lines that matched the row layout.
    pub rows: usize,
}

/// Rows extracted from one document, in page order then line order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extraction {
    /// Source document.
    pub source: PathBuf,
    /// Extracted rows.
    pub rows: Vec<TableRow>,
    /// Statistics for every processed page.
    pub pages: Vec<PageSummary>,
}

impl Extraction {
    /// Total non-empty lines seen across all pages.
    pub fn total_lines(&self) -> usize {
        self.pages.iter().map(|p| p.lines).sum()
    }
}
