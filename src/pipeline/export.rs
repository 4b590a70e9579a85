//! CSV export of a (transformed) dataset.

use crate::dataset::{Cell, Dataset};
use crate::error::{EngineError, Result};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use serde::Serialize;
use std::path::Path;

const DEFAULT_FILE_NAME: &str = "dataset.csv";

/// CSV text ready to be saved by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvExport {
    pub csv: String,
    /// Byte length of `csv`
    pub size: usize,
    pub file_name: String,
}

/// Writes the header and rows. Fields are quoted only when they contain a
/// comma, quote or line break; null and non-finite numbers are empty fields.
pub fn to_csv(dataset: &Dataset, name: Option<&str>) -> Result<CsvExport> {
    if dataset.width() == 0 {
        return Ok(CsvExport {
            csv: String::new(),
            size: 0,
            file_name: export_file_name(name),
        });
    }

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(dataset.columns())?;
    for row in dataset.rows() {
        writer.write_record(row.iter().map(export_field))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| EngineError::Other(format!("Failed to finish CSV export: {e}")))?;
    let csv = String::from_utf8(bytes)
        .map_err(|e| EngineError::Other(format!("CSV export is not UTF-8: {e}")))?;

    tracing::info!("Exported {} rows ({} bytes)", dataset.len(), csv.len());
    Ok(CsvExport {
        size: csv.len(),
        csv,
        file_name: export_file_name(name),
    })
}

fn export_field(cell: &Cell) -> String {
    match cell {
        Cell::Number(x) if !x.is_finite() => String::new(),
        other => other.as_text(),
    }
}

/// `sales.xlsx` becomes `sales.csv`; no name gives `dataset.csv`.
pub fn export_file_name(name: Option<&str>) -> String {
    let stem = name
        .map(Path::new)
        .and_then(Path::file_stem)
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty());
    stem.map_or_else(|| DEFAULT_FILE_NAME.to_owned(), |s| format!("{s}.csv"))
}
