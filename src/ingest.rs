//! Ingestion: turns raw input into a [`Dataset`].
//!
//! Files are routed by extension or MIME type to the delimited-text,
//! spreadsheet or JSON readers; anything unrecognised is tried as delimited
//! text. Pasted clipboard content is probed for an HTML table, then JSON,
//! then tab- or comma-delimited text.
//!
//! ```
//! use tabstat::ingest;
//!
//! let ds = ingest::ingest_paste("name\tscore\nann\t3\n", None)?;
//! assert_eq!(ds.columns(), ["name", "score"]);
//! assert_eq!(ds.len(), 1);
//! # Ok::<(), tabstat::error::EngineError>(())
//! ```

pub mod delimited;
pub mod html;
pub mod json;
pub mod spreadsheet;

use crate::dataset::Dataset;
use crate::error::{EngineError, Result};
use serde::Serialize;

/// Reader a file was handed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestMode {
    Csv,
    Xlsx,
    Json,
}

/// Progress notification emitted while a file is being read.
/// `percent` is `None` when the total amount of work is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub mode: IngestMode,
    pub percent: Option<u8>,
}

impl Progress {
    pub fn indeterminate(mode: IngestMode) -> Self {
        Self {
            mode,
            percent: None,
        }
    }
}

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Where a file should go, judged by its name and optional MIME type.
/// `None` means the type is unrecognised and delimited text is only a guess.
pub fn route(name: &str, content_type: Option<&str>) -> Option<IngestMode> {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();
    let mime = content_type.unwrap_or_default().to_lowercase();

    if ext == "csv" || mime.contains("text/csv") {
        Some(IngestMode::Csv)
    } else if SPREADSHEET_EXTENSIONS.contains(&ext.as_str()) || mime.contains("sheet") {
        Some(IngestMode::Xlsx)
    } else if ext == "json" || mime.contains("application/json") {
        Some(IngestMode::Json)
    } else {
        None
    }
}

/// Reads an uploaded file.
///
/// # Errors
///
/// Parse failures of a recognised type are returned as they are. An
/// unrecognised file that also fails as delimited text is reported as
/// [`EngineError::UnsupportedFormat`].
pub fn ingest_file(
    name: &str,
    content_type: Option<&str>,
    bytes: &[u8],
    chunk_bytes: usize,
    on_progress: &mut dyn FnMut(Progress),
) -> Result<Dataset> {
    let mode = route(name, content_type);
    tracing::info!(
        "Ingesting '{}' ({} bytes) as {:?}",
        name,
        bytes.len(),
        mode
    );

    let dataset = match mode {
        Some(IngestMode::Csv) => delimited::read_file(bytes, chunk_bytes, on_progress)?,
        Some(IngestMode::Xlsx) => {
            on_progress(Progress::indeterminate(IngestMode::Xlsx));
            spreadsheet::read(bytes)?
        }
        Some(IngestMode::Json) => {
            on_progress(Progress::indeterminate(IngestMode::Json));
            json::read(bytes)?
        }
        None => delimited::read_file(bytes, chunk_bytes, on_progress).map_err(|e| {
            EngineError::UnsupportedFormat(format!(
                "'{name}' is not a recognised file type and could not be read as delimited text ({e})"
            ))
        })?,
    };

    tracing::info!(
        "Ingested {} rows x {} columns from '{}'",
        dataset.len(),
        dataset.width(),
        name
    );
    Ok(dataset)
}

/// Reads pasted clipboard content. `html` is the clipboard's HTML flavour,
/// when the source offered one.
pub fn ingest_paste(text: &str, html: Option<&str>) -> Result<Dataset> {
    if let Some(markup) = html.filter(|h| h.contains("<table")) {
        tracing::debug!("Paste contains an HTML table");
        return html::read_table(markup);
    }

    if json::looks_like_json(text) {
        tracing::debug!("Paste looks like JSON");
        return json::read(text.as_bytes());
    }

    let delimiter = if text.contains('\t') { b'\t' } else { b',' };
    delimited::read_text(text, delimiter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Cell;

    #[test]
    fn test_route() {
        assert_eq!(route("sales.CSV", None), Some(IngestMode::Csv));
        assert_eq!(route("blob", Some("text/csv")), Some(IngestMode::Csv));
        assert_eq!(route("book.xlsx", None), Some(IngestMode::Xlsx));
        assert_eq!(route("book.ods", None), Some(IngestMode::Xlsx));
        assert_eq!(
            route(
                "upload",
                Some("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet")
            ),
            Some(IngestMode::Xlsx)
        );
        assert_eq!(route("rows.json", None), Some(IngestMode::Json));
        assert_eq!(route("notes.txt", Some("text/plain")), None);
        assert_eq!(route("noextension", None), None);
    }

    #[test]
    fn test_unknown_type_falls_back_to_delimited() -> anyhow::Result<()> {
        let mut events = Vec::new();
        let ds = ingest_file("data.txt", None, b"a,b\n1,2\n", 1024, &mut |p| events.push(p))?;
        assert_eq!(ds.columns(), ["a", "b"]);
        assert_eq!(events.last().and_then(|p| p.percent), Some(100));
        Ok(())
    }

    #[test]
    fn test_unknown_type_failure_is_unsupported() {
        let bytes = [0xff, 0xfe, 0x00, 0x81, b'\n', 0xc3];
        let err = ingest_file("blob.bin", None, &bytes, 1024, &mut |_| {}).unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedFormat(_)), "got {err:?}");
    }

    #[test]
    fn test_json_file_reports_indeterminate_progress() -> anyhow::Result<()> {
        let mut events = Vec::new();
        let ds = ingest_file(
            "rows.json",
            None,
            br#"{"data": [{"x": 1}, {"x": 2}]}"#,
            1024,
            &mut |p| events.push(p),
        )?;
        assert_eq!(ds.len(), 2);
        assert_eq!(events, vec![Progress::indeterminate(IngestMode::Json)]);
        Ok(())
    }

    #[test]
    fn test_paste_prefers_html_table() -> anyhow::Result<()> {
        let html = "<table><tr><th>k</th></tr><tr><td>v</td></tr></table>";
        let ds = ingest_paste("k\nignored", Some(html))?;
        assert_eq!(ds.columns(), ["k"]);
        assert_eq!(ds.get(0, "k"), Some(&Cell::text("v")));
        Ok(())
    }

    #[test]
    fn test_paste_json_and_comma_text() -> anyhow::Result<()> {
        let ds = ingest_paste(" [{\"a\": 1}] ", None)?;
        assert_eq!(ds.get(0, "a"), Some(&Cell::Number(1.0)));

        let ds = ingest_paste("a,b\n1,2\n", Some("<p>no table</p>"))?;
        assert_eq!(ds.columns(), ["a", "b"]);
        assert_eq!(ds.get(0, "b"), Some(&Cell::text("2")));
        Ok(())
    }

    #[test]
    fn test_paste_invalid_json_is_parse_error() {
        let err = ingest_paste("[1, 2", None);
        // not bracket-bounded, so read as delimited text instead
        assert!(err.is_ok());

        let err = ingest_paste("{\"a\": }", None).unwrap_err();
        assert!(matches!(err, EngineError::Parse(_)), "got {err:?}");
    }
}
