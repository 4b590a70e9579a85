//! Delimited text (CSV, TSV) reader.
//!
//! The first non-blank record is the header. Fields are kept as text; typing
//! happens later in the pipeline or the profiler.

use super::{IngestMode, Progress};
use crate::dataset::{Cell, Dataset, Row};
use crate::error::Result;
use csv::{ReaderBuilder, StringRecord};
use std::collections::HashSet;

/// Reads an uploaded delimited file, reporting progress every `chunk_bytes`
/// of consumed input and once more at the end.
pub fn read_file(
    bytes: &[u8],
    chunk_bytes: usize,
    on_progress: &mut dyn FnMut(Progress),
) -> Result<Dataset> {
    let mut tracker = ProgressTracker {
        total: bytes.len(),
        chunk: chunk_bytes.max(1),
        next: chunk_bytes.max(1),
        sink: on_progress,
    };
    let dataset = read(bytes, b',', Some(&mut tracker))?;
    tracker.finish();
    Ok(dataset)
}

/// Reads pasted text with an explicit delimiter. No progress is reported.
pub fn read_text(text: &str, delimiter: u8) -> Result<Dataset> {
    read(text.as_bytes(), delimiter, None)
}

struct ProgressTracker<'a> {
    total: usize,
    chunk: usize,
    next: usize,
    sink: &'a mut dyn FnMut(Progress),
}

impl ProgressTracker<'_> {
    fn advance(&mut self, processed: usize) {
        if processed >= self.next {
            (self.sink)(Progress {
                mode: IngestMode::Csv,
                percent: percent(processed, self.total),
            });
            self.next = processed + self.chunk;
        }
    }

    fn finish(&mut self) {
        (self.sink)(Progress {
            mode: IngestMode::Csv,
            percent: percent(self.total, self.total),
        });
    }
}

fn percent(processed: usize, total: usize) -> Option<u8> {
    if total == 0 {
        return None;
    }
    let pct = (processed as f64 / total as f64 * 100.0).round().min(100.0);
    Some(pct as u8)
}

fn read(bytes: &[u8], delimiter: u8, mut tracker: Option<&mut ProgressTracker<'_>>) -> Result<Dataset> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(bytes);

    let mut columns: Option<Vec<String>> = None;
    let mut rows: Vec<Row> = Vec::new();
    let mut long_rows = 0usize;
    let mut record = StringRecord::new();

    while reader.read_record(&mut record)? {
        if let Some(t) = tracker.as_deref_mut() {
            t.advance(reader.position().byte() as usize);
        }
        if record.iter().all(str::is_empty) {
            continue;
        }

        let Some(width) = columns.as_ref().map(Vec::len) else {
            columns = Some(unique_headers(&record));
            continue;
        };
        if record.len() > width {
            long_rows += 1;
        }
        let row = (0..width)
            .map(|i| record.get(i).map_or(Cell::Null, Cell::text))
            .collect();
        rows.push(row);
    }

    if long_rows > 0 {
        tracing::warn!("{long_rows} row(s) had more fields than the header; extra fields were dropped");
    }

    Ok(Dataset::new(columns.unwrap_or_default(), rows))
}

/// Header names with duplicates disambiguated as `name_1`, `name_2`, ...
fn unique_headers(record: &StringRecord) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(record.len());
    for (i, raw) in record.iter().enumerate() {
        let base = if i == 0 {
            raw.trim_start_matches('\u{feff}')
        } else {
            raw
        };
        let mut name = base.to_owned();
        let mut n = 1;
        while seen.contains(&name) {
            name = format!("{base}_{n}");
            n += 1;
        }
        seen.insert(name.clone());
        out.push(name);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_lines_and_ragged_rows() -> anyhow::Result<()> {
        let ds = read_text("a,b,c\n1,2,3\n\n4,5\n6,7,8,9\n", b',')?;
        assert_eq!(ds.columns(), ["a", "b", "c"]);
        assert_eq!(ds.len(), 3);
        assert!(ds.get(1, "c").is_some_and(Cell::is_null));
        assert_eq!(ds.get(2, "c"), Some(&Cell::text("8")));
        Ok(())
    }

    #[test]
    fn test_empty_fields_stay_text() -> anyhow::Result<()> {
        let ds = read_text("a,b\n,x\n", b',')?;
        assert_eq!(ds.get(0, "a"), Some(&Cell::text("")));
        Ok(())
    }

    #[test]
    fn test_duplicate_headers() -> anyhow::Result<()> {
        let ds = read_text("x,x,y,x\n1,2,3,4\n", b',')?;
        assert_eq!(ds.columns(), ["x", "x_1", "y", "x_2"]);
        Ok(())
    }

    #[test]
    fn test_tab_delimited_with_quotes() -> anyhow::Result<()> {
        let ds = read_text("name\tnote\n\"Lee, J\"\t\"said \"\"hi\"\"\"\n", b'\t')?;
        assert_eq!(ds.get(0, "name"), Some(&Cell::text("Lee, J")));
        assert_eq!(ds.get(0, "note"), Some(&Cell::text("said \"hi\"")));
        Ok(())
    }

    #[test]
    fn test_progress_reports_chunks_and_completion() -> anyhow::Result<()> {
        let mut text = String::from("id,value\n");
        for i in 0..100 {
            text.push_str(&format!("{i},{}\n", i * 2));
        }
        let mut events = Vec::new();
        let ds = read_file(text.as_bytes(), 64, &mut |p| events.push(p))?;

        assert_eq!(ds.len(), 100);
        assert!(events.len() > 2);
        assert!(events.iter().all(|p| p.mode == IngestMode::Csv));
        assert_eq!(events.last().and_then(|p| p.percent), Some(100));
        let pcts: Vec<u8> = events.iter().filter_map(|p| p.percent).collect();
        assert!(pcts.windows(2).all(|w| w[0] <= w[1]));
        Ok(())
    }

    #[test]
    fn test_empty_input() -> anyhow::Result<()> {
        let mut events = Vec::new();
        let ds = read_file(b"", 64, &mut |p| events.push(p))?;
        assert!(ds.is_empty());
        assert_eq!(ds.width(), 0);
        assert_eq!(events, vec![Progress::indeterminate(IngestMode::Csv)]);
        Ok(())
    }
}
