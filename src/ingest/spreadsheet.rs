//! Spreadsheet reader (xlsx, xlsm, xlsb, xls, ods). Only the first worksheet
//! is read.

use crate::dataset::{Cell, Dataset, Row};
use crate::error::{EngineError, Result};
use calamine::{Data, DataType as _, Reader as _, open_workbook_auto_from_rs};
use std::collections::HashSet;
use std::io::Cursor;

pub fn read(bytes: &[u8]) -> Result<Dataset> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| EngineError::UnsupportedFormat("workbook has no worksheets".to_owned()))??;

    let grid: Vec<Vec<Cell>> = range
        .rows()
        .map(|row| row.iter().map(normalize_cell).collect())
        .collect();
    Ok(from_grid(grid))
}

/// Spreadsheet value as a cell. Empty cells are the empty string so that
/// every row carries every column.
pub fn normalize_cell(value: &Data) -> Cell {
    match value {
        Data::Empty => Cell::text(""),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) => Cell::text(s.as_str()),
        Data::Bool(b) => Cell::text(b.to_string()),
        // serial day number, as the sheet stores it
        Data::DateTime(_) => value.as_f64().map_or_else(|| Cell::text(value.to_string()), Cell::Number),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::text(s.as_str()),
        Data::Error(e) => Cell::text(e.to_string()),
    }
}

/// Builds a dataset from a cell grid whose first row is the header.
fn from_grid(grid: Vec<Vec<Cell>>) -> Dataset {
    let mut rows = grid.into_iter();
    let Some(header) = rows.next() else {
        return Dataset::default();
    };
    let columns = header_names(&header);

    let data: Vec<Row> = rows
        .filter(|row| !row.iter().all(is_blank))
        .map(|mut row| {
            row.resize(columns.len(), Cell::text(""));
            row
        })
        .collect();

    Dataset::new(columns, data)
}

fn is_blank(cell: &Cell) -> bool {
    match cell {
        Cell::Null => true,
        Cell::Text(s) => s.trim().is_empty(),
        Cell::Number(_) => false,
    }
}

/// Header cell text; blank headers become `__EMPTY`, `__EMPTY_1`, ... and
/// repeated names get `_1`, `_2` suffixes.
fn header_names(header: &[Cell]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut blanks = 0usize;
    header
        .iter()
        .map(|cell| {
            let base = if is_blank(cell) {
                let name = if blanks == 0 {
                    "__EMPTY".to_owned()
                } else {
                    format!("__EMPTY_{blanks}")
                };
                blanks += 1;
                name
            } else {
                cell.as_text()
            };
            let mut name = base.clone();
            let mut n = 1;
            while seen.contains(&name) {
                name = format!("{base}_{n}");
                n += 1;
            }
            seen.insert(name.clone());
            name
        })
        .collect()
}
