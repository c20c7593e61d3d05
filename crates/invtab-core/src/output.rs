//! CSV output for extracted table rows.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::OutputError;
use crate::models::row::TableRow;

/// Column header written as the first CSV line.
///
/// The spelling of `DISCRIPTION` is part of the file format consumed
/// downstream and must not be corrected.
pub const COLUMNS: [&str; 8] = [
    "Item",
    "DISCRIPTION",
    "NCM",
    "Unit",
    "Quantity",
    "R1",
    "R2",
    "Amount",
];

/// Suffix appended to the input stem when naming the output file.
pub const DEFAULT_SUFFIX: &str = "_ocr_result";

/// Result type for output operations.
pub type Result<T> = std::result::Result<T, OutputError>;

/// Output path for `input`: same directory and stem, `suffix` appended, `.csv` extension.
///
/// `invoices/march.pdf` becomes `invoices/march_ocr_result.csv`.
pub fn output_path_for(input: &Path, suffix: &str) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .ok_or_else(|| OutputError::InvalidPath(input.to_path_buf()))?;

    let mut name = stem.to_os_string();
    name.push(suffix);
    name.push(".csv");

    Ok(input.with_file_name(name))
}

/// Writes table rows as comma-separated UTF-8 text with the fixed header.
pub struct TableWriter<W: Write> {
    inner: csv::Writer<W>,
}

impl<W: Write> TableWriter<W> {
    /// Wrap a writer and emit the header line.
    pub fn new(writer: W) -> Result<Self> {
        let mut inner = csv::Writer::from_writer(writer);
        inner.write_record(COLUMNS)?;
        Ok(Self { inner })
    }

    /// Write one row.
    pub fn write_row(&mut self, row: &TableRow) -> Result<()> {
        self.inner.write_record(row.fields())?;
        Ok(())
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.inner.into_inner().map_err(|e| {
            OutputError::Io(std::io::Error::new(e.error().kind(), e.error().to_string()))
        })
    }
}

/// Write `rows` to the CSV file at `path`, replacing any existing file.
///
/// The table is written to a temporary file beside `path` and renamed into
/// place, so a failed write never leaves a truncated CSV behind.
pub fn write_table(rows: &[TableRow], path: &Path) -> Result<()> {
    write_atomically(path, |out| {
        let mut writer = TableWriter::new(out)?;
        for row in rows {
            writer.write_row(row)?;
        }
        writer.into_inner()?;
        Ok(())
    })?;

    info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::Builder::new()
        .prefix(".invtab-")
        .suffix(".csv.tmp")
        .tempfile_in(dir)?;

    {
        let mut out = std::io::BufWriter::new(temp.as_file_mut());
        write(&mut out)?;
        out.flush()?;
    }

    // Dropping `temp` on the error paths above removes it.
    temp.persist(path).map_err(|e| OutputError::Io(e.error))?;
    Ok(())
}

/// Render `rows` as CSV text.
pub fn to_csv_string(rows: &[TableRow]) -> Result<String> {
    let mut writer = TableWriter::new(Vec::new())?;
    for row in rows {
        writer.write_row(row)?;
    }
    let data = writer.into_inner()?;
    String::from_utf8(data).map_err(|e| {
        OutputError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })
}
