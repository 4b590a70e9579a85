//! Per-column profiles and duplicate detection.

use crate::dataset::{Cell, Dataset};
use crate::utils;
use serde::Serialize;
use std::collections::HashSet;

/// Share of non-null values that must agree for a column to take a type.
pub const TYPE_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Number,
    Date,
    Category,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Date => "date",
            Self::Category => "category",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnProfile {
    #[serde(skip)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ColumnKind,
    pub count: usize,
    pub non_null: usize,
    pub nulls: usize,
    /// Percentage of nulls, 2 decimals
    pub null_pct: f64,
    /// Distinct non-null values by text form
    pub unique: usize,
}

/// Profiles one column of the sample.
pub fn analyse_column(sample: &Dataset, idx: usize) -> ColumnProfile {
    let mut non_null = 0usize;
    let mut numeric = 0usize;
    let mut dates = 0usize;
    let mut distinct = HashSet::new();

    for cell in sample.column_cells(idx) {
        if cell.is_missing() {
            continue;
        }
        non_null += 1;
        let text = cell.as_text();
        if cell.as_finite().is_some() {
            numeric += 1;
        } else if utils::looks_like_date(&text) {
            dates += 1;
        }
        distinct.insert(text);
    }

    let count = sample.len();
    let nulls = count - non_null;
    let threshold = non_null as f64 * TYPE_THRESHOLD;
    // an all-null column has 0 >= 0 and types as number
    let kind = if numeric as f64 >= threshold {
        ColumnKind::Number
    } else if dates as f64 >= threshold {
        ColumnKind::Date
    } else {
        ColumnKind::Category
    };

    ColumnProfile {
        name: sample.columns()[idx].clone(),
        kind,
        count,
        non_null,
        nulls,
        null_pct: if count == 0 {
            0.0
        } else {
            utils::round_to(nulls as f64 / count as f64 * 100.0, 2)
        },
        unique: distinct.len(),
    }
}

/// Whether at least 70% of the column's non-null values are finite numbers.
/// A column with no non-null values is not numeric.
pub fn is_numeric_column(sample: &Dataset, idx: usize) -> bool {
    let mut non_null = 0usize;
    let mut numeric = 0usize;
    for cell in sample.column_cells(idx).filter(|c| !c.is_missing()) {
        non_null += 1;
        if cell.as_finite().is_some() {
            numeric += 1;
        }
    }
    non_null > 0 && numeric as f64 >= non_null as f64 * TYPE_THRESHOLD
}

/// Number of distinct row contents that occur more than once.
pub fn count_duplicates(sample: &Dataset) -> usize {
    let mut seen = HashSet::new();
    let mut dup = HashSet::new();
    for row in sample.rows() {
        let key = row_key(row);
        if !seen.insert(key.clone()) {
            dup.insert(key);
        }
    }
    dup.len()
}

fn row_key(row: &[Cell]) -> String {
    serde_json::to_string(row).unwrap_or_else(|_| format!("{row:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(cells: Vec<Cell>) -> Dataset {
        Dataset::new(vec!["c".to_owned()], cells.into_iter().map(|c| vec![c]).collect())
    }

    #[test]
    fn test_numeric_with_some_noise() {
        let ds = single(vec![
            Cell::text("1"),
            Cell::text("2.5"),
            Cell::Number(3.0),
            Cell::text("x"),
            Cell::Null,
        ]);
        let p = analyse_column(&ds, 0);
        assert_eq!(p.kind, ColumnKind::Number);
        assert_eq!(p.count, 5);
        assert_eq!(p.non_null, 4);
        assert_eq!(p.nulls, 1);
        assert_eq!(p.null_pct, 20.0);
        assert_eq!(p.unique, 4);
    }

    #[test]
    fn test_dates_and_categories() {
        let dates = single(vec![Cell::text("2024-01-01"), Cell::text("2024-02-01"), Cell::text("")]);
        assert_eq!(analyse_column(&dates, 0).kind, ColumnKind::Date);

        let cats = single(vec![Cell::text("red"), Cell::text("blue"), Cell::text("1")]);
        assert_eq!(analyse_column(&cats, 0).kind, ColumnKind::Category);
        assert!(!is_numeric_column(&cats, 0));
    }

    #[test]
    fn test_null_pct_rounding() {
        let ds = single(vec![Cell::Null, Cell::text("a"), Cell::text("b")]);
        assert_eq!(analyse_column(&ds, 0).null_pct, 33.33);
    }

    #[test]
    fn test_all_null_column() {
        let ds = single(vec![Cell::Null, Cell::text("")]);
        assert_eq!(analyse_column(&ds, 0).kind, ColumnKind::Number);
        assert!(!is_numeric_column(&ds, 0));
    }

    #[test]
    fn test_count_duplicates() {
        let ds = Dataset::new(
            vec!["a".to_owned(), "b".to_owned()],
            vec![
                vec![Cell::Number(1.0), Cell::text("x")],
                vec![Cell::Number(1.0), Cell::text("x")],
                vec![Cell::Number(1.0), Cell::text("x")],
                vec![Cell::text("1"), Cell::text("x")],
                vec![Cell::Number(2.0), Cell::Null],
                vec![Cell::Number(2.0), Cell::Null],
            ],
        );
        assert_eq!(count_duplicates(&ds), 2);
    }
}
