//! HTML table reader for pasted clipboard markup.

use crate::dataset::{Cell, Dataset, Row};
use crate::error::{EngineError, Result};
use scraper::{ElementRef, Html, Selector};

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| EngineError::Parse(format!("bad selector '{css}': {e}")))
}

/// Reads the first `<table>`. The first row supplies the headers (blank ones
/// become `col1`, `col2`, ...); cells missing from shorter rows are empty text.
pub fn read_table(markup: &str) -> Result<Dataset> {
    let doc = Html::parse_fragment(markup);
    let table_sel = selector("table")?;
    let row_sel = selector("tr")?;
    let cell_sel = selector("th, td")?;

    let Some(table) = doc.select(&table_sel).next() else {
        return Ok(Dataset::default());
    };

    let mut trs = table.select(&row_sel);
    let Some(header_row) = trs.next() else {
        return Ok(Dataset::default());
    };

    let columns: Vec<String> = header_row
        .select(&cell_sel)
        .enumerate()
        .map(|(i, cell)| {
            let name = cell_text(cell).trim().to_owned();
            if name.is_empty() {
                format!("col{}", i + 1)
            } else {
                name
            }
        })
        .collect();

    let rows: Vec<Row> = trs
        .map(|tr| {
            let mut cells: Vec<Cell> = tr.select(&cell_sel).map(|c| Cell::text(cell_text(c))).collect();
            cells.resize(columns.len(), Cell::text(""));
            cells
        })
        .collect();

    tracing::debug!("HTML table: {} columns, {} rows", columns.len(), rows.len());
    Ok(Dataset::new(columns, rows))
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_and_missing_cells() -> anyhow::Result<()> {
        let html = r"
            <meta charset='utf-8'>
            <table>
              <thead><tr><th> Name </th><th></th><th>Score</th></tr></thead>
              <tbody>
                <tr><td>Ann</td><td>x</td><td>3</td></tr>
                <tr><td>Bo</td></tr>
              </tbody>
            </table>";
        let ds = read_table(html)?;

        assert_eq!(ds.columns(), ["Name", "col2", "Score"]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.get(0, "Score"), Some(&Cell::text("3")));
        assert_eq!(ds.get(1, "Score"), Some(&Cell::text("")));
        Ok(())
    }

    #[test]
    fn test_cell_text_is_not_trimmed() -> anyhow::Result<()> {
        let ds = read_table("<table><tr><td>k</td></tr><tr><td> <b>v</b> </td></tr></table>")?;
        assert_eq!(ds.get(0, "k"), Some(&Cell::text(" v ")));
        Ok(())
    }

    #[test]
    fn test_no_rows() -> anyhow::Result<()> {
        let ds = read_table("<table></table>")?;
        assert!(ds.is_empty());
        Ok(())
    }
}
