//! Canonical tabular shape shared by every engine component.
//!
//! A [`Dataset`] keeps the column names once and stores each row as a vector of
//! [`Cell`]s aligned to those columns, so every row always exposes the full
//! column set. Absent values are [`Cell::Null`], never missing entries.
//!
//! On the wire a dataset is `{rows: [{column: value, ...}], columns, count}`;
//! it can be read back from either that shape or a bare array of row objects.

use crate::error::{EngineError, Result};
use crate::utils;
use serde::ser::{SerializeMap as _, SerializeSeq as _};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// A single cell value.
#[derive(Debug, Clone, Default)]
pub enum Cell {
    #[default]
    Null,
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Null, empty text or a NaN number.
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.is_empty(),
            Self::Number(x) => x.is_nan(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Falsy in the loose sense used by date casting: null, empty, 0 or NaN.
    pub fn is_falsy(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.is_empty(),
            Self::Number(x) => *x == 0.0 || x.is_nan(),
        }
    }

    /// String form. Null becomes the empty string.
    pub fn as_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Number(x) => utils::format_number(*x),
            Self::Text(s) => s.clone(),
        }
    }

    /// Strict numeric view: numbers as-is, text only if it is a plain numeric
    /// literal. Used by profiling and hypothesis tests.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Null => None,
            Self::Number(x) => Some(*x),
            Self::Text(s) => utils::parse_number(s),
        }
    }

    /// Finite strict numeric value, if any.
    pub fn as_finite(&self) -> Option<f64> {
        self.as_number().filter(|x| x.is_finite())
    }

    /// Loose numeric coercion used by recipe stages. Never fails, yields NaN.
    pub fn to_num(&self) -> f64 {
        match self {
            Self::Null => f64::NAN,
            Self::Number(x) if x.is_finite() => *x,
            Self::Number(_) => f64::NAN,
            Self::Text(s) => utils::to_num(s),
        }
    }

    /// Converts a JSON value. Booleans become text, nested values are kept as
    /// their JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Text(b.to_string()),
            Value::Number(n) => n.as_f64().map_or(Self::Null, Self::Number),
            Value::String(s) => Self::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => Self::Text(value.to_string()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Number(x) => serde_json::Number::from_f64(*x).map_or(Value::Null, Value::Number),
            Self::Text(s) => Value::String(s.clone()),
        }
    }
}

/// NaN never equals anything, including itself.
impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl From<f64> for Cell {
    fn from(x: f64) -> Self {
        Self::Number(x)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Number(x) if x.is_finite() => serializer.serialize_f64(*x),
            // JSON has no NaN; non-finite numbers go out as null
            Self::Number(_) => serializer.serialize_none(),
            Self::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for Cell {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_json(&value))
    }
}

pub type Row = Vec<Cell>;

/// Ordered rows over an ordered, duplicate-free set of column names.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "DatasetRepr")]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Dataset {
    /// Builds a dataset, padding short rows with nulls and dropping extra cells.
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Cell::Null);
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Builds a dataset from JSON row objects. Columns are the keys of the
    /// first row in insertion order; keys that only appear in later rows are
    /// dropped and keys missing from later rows become null.
    pub fn from_records(records: &[Map<String, Value>]) -> Self {
        let columns: Vec<String> = records
            .first()
            .map(|first| first.keys().cloned().collect())
            .unwrap_or_default();

        let mut dropped = 0usize;
        let rows = records
            .iter()
            .map(|record| {
                dropped += record.keys().filter(|k| !columns.contains(k)).count();
                columns
                    .iter()
                    .map(|c| record.get(c).map_or(Cell::Null, Cell::from_json))
                    .collect()
            })
            .collect();

        if dropped > 0 {
            tracing::warn!(
                "{dropped} value(s) belong to keys absent from the first row and were dropped"
            );
        }

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Index of `name`, or a [`EngineError::MissingColumn`].
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| EngineError::MissingColumn(name.to_owned()))
    }

    /// Cells of one column, top to bottom.
    pub fn column_cells(&self, idx: usize) -> impl Iterator<Item = &Cell> + '_ {
        self.rows.iter().map(move |row| &row[idx])
    }

    /// Value of `name` in row `row`, or `None` when the column does not exist.
    pub fn get(&self, row: usize, name: &str) -> Option<&Cell> {
        let idx = self.column_index(name)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// Index of `name`, appending a null-filled column when it is absent.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.column_index(name) {
            return idx;
        }
        self.columns.push(name.to_owned());
        for row in &mut self.rows {
            row.push(Cell::Null);
        }
        self.columns.len() - 1
    }

    pub fn remove_column(&mut self, name: &str) -> Option<Vec<Cell>> {
        let idx = self.column_index(name)?;
        self.columns.remove(idx);
        Some(self.rows.iter_mut().map(|row| row.remove(idx)).collect())
    }

    pub fn rows_mut(&mut self) -> &mut [Row] {
        &mut self.rows
    }

    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&[String], &Row) -> bool,
    {
        let columns = &self.columns;
        self.rows.retain(|row| keep(columns, row));
    }

    pub fn truncate(&mut self, len: usize) {
        self.rows.truncate(len);
    }

    /// Replaces the column layout, building each new row from the old one.
    pub(crate) fn reshape<F>(&mut self, columns: Vec<String>, mut build: F)
    where
        F: FnMut(&Row) -> Row,
    {
        self.rows = self.rows.iter().map(|row| build(row)).collect();
        self.columns = columns;
    }

    /// New dataset with the same columns and the rows at `indices`.
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// Row as a JSON object, in column order.
    pub fn record(&self, row: usize) -> Map<String, Value> {
        self.columns
            .iter()
            .zip(&self.rows[row])
            .map(|(c, v)| (c.clone(), v.to_json()))
            .collect()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DatasetRepr {
    Records(Vec<Map<String, Value>>),
    Table {
        rows: Vec<Map<String, Value>>,
        #[serde(default)]
        columns: Option<Vec<String>>,
    },
}

impl TryFrom<DatasetRepr> for Dataset {
    type Error = String;

    fn try_from(repr: DatasetRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            DatasetRepr::Records(records) => Ok(Self::from_records(&records)),
            DatasetRepr::Table { rows, columns: None } => Ok(Self::from_records(&rows)),
            DatasetRepr::Table {
                rows,
                columns: Some(columns),
            } => {
                let mut seen = std::collections::HashSet::new();
                if let Some(dup) = columns.iter().find(|c| !seen.insert(c.as_str())) {
                    return Err(format!("duplicate column name '{dup}'"));
                }
                let cells = rows
                    .iter()
                    .map(|record| {
                        columns
                            .iter()
                            .map(|c| record.get(c).map_or(Cell::Null, Cell::from_json))
                            .collect()
                    })
                    .collect();
                Ok(Self::new(columns, cells))
            }
        }
    }
}

struct RecordsRef<'a>(&'a Dataset);

struct RecordRef<'a> {
    columns: &'a [String],
    row: &'a Row,
}

impl Serialize for RecordRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (c, v) in self.columns.iter().zip(self.row) {
            map.serialize_entry(c, v)?;
        }
        map.end()
    }
}

impl Serialize for RecordsRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for row in &self.0.rows {
            seq.serialize_element(&RecordRef {
                columns: &self.0.columns,
                row,
            })?;
        }
        seq.end()
    }
}

impl Serialize for Dataset {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("rows", &RecordsRef(self))?;
        map.serialize_entry("columns", &self.columns)?;
        map.serialize_entry("count", &self.len())?;
        map.end()
    }
}
