//! Recipe interpreter.
//!
//! Applies a [`Recipe`] to a copy of a dataset, stage by stage in priority
//! order. Per-row and per-column problems degrade to sentinels (empty text,
//! NaN) and never abort the run.

use super::expr;
use super::spec::{CapMethod, CapRule, CastType, Derivation, Entries, Operator, Predicate, Recipe, Stage};
use crate::dataset::{Cell, Dataset, Row};
use crate::stats;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Summary of one recipe run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub rows_before: usize,
    pub rows_after: usize,
    pub columns_before: usize,
    pub columns_after: usize,
    pub stages_applied: usize,
    pub duration: std::time::Duration,
}

impl RunReport {
    pub fn summary(&self) -> String {
        format!(
            "Recipe applied: {} rows ({} → {}), {} columns ({} → {}), {} stages, {:.3}s",
            change(self.rows_before, self.rows_after),
            self.rows_before,
            self.rows_after,
            change(self.columns_before, self.columns_after),
            self.columns_before,
            self.columns_after,
            self.stages_applied,
            self.duration.as_secs_f64()
        )
    }
}

fn change(before: usize, after: usize) -> &'static str {
    match after.cmp(&before) {
        std::cmp::Ordering::Greater => "added",
        std::cmp::Ordering::Less => "removed",
        std::cmp::Ordering::Equal => "unchanged",
    }
}

/// Applies `recipe` to a copy of `input`. The input is never modified.
pub fn apply(input: &Dataset, recipe: &Recipe) -> Dataset {
    run(input, recipe).0
}

/// Like [`apply`], also returning a [`RunReport`].
pub fn run(input: &Dataset, recipe: &Recipe) -> (Dataset, RunReport) {
    let start = std::time::Instant::now();
    let mut ds = input.clone();

    let ordered = recipe.ordered();
    for stage in &ordered {
        tracing::debug!("Applying stage '{}'", stage.name());
        apply_stage(stage, &mut ds);
    }

    let report = RunReport {
        rows_before: input.len(),
        rows_after: ds.len(),
        columns_before: input.width(),
        columns_after: ds.width(),
        stages_applied: ordered.len(),
        duration: start.elapsed(),
    };
    tracing::info!("{}", report.summary());
    (ds, report)
}

fn apply_stage(stage: &Stage, ds: &mut Dataset) {
    match stage {
        Stage::Rename(mapping) => rename(ds, mapping),
        Stage::Select(columns) => select(ds, columns),
        Stage::Trim(columns) => trim(ds, columns),
        Stage::TypeCast(casts) => {
            for (column, cast) in casts.iter() {
                type_cast(ds, column, *cast);
            }
        }
        Stage::Fillna(defaults) => {
            for (column, value) in defaults.iter() {
                fill_missing(ds, column, value);
            }
        }
        Stage::Dropna(columns) => drop_missing(ds, columns),
        Stage::Filter(predicates) => filter(ds, predicates),
        Stage::Cap(rules) => {
            for (column, rule) in rules.iter() {
                cap(ds, column, rule);
            }
        }
        Stage::Derive(derivations) => {
            for derivation in derivations {
                derive(ds, derivation);
            }
        }
        Stage::Onehot(columns) => {
            for column in columns {
                one_hot(ds, column);
            }
        }
        Stage::Scale(spec) => {
            for column in &spec.standardize {
                standardize(ds, column);
            }
        }
    }
}

/// Renames columns. When two columns land on the same name the later value
/// wins and the column keeps the earlier position.
fn rename(ds: &mut Dataset, mapping: &Entries<String>) {
    if mapping.is_empty() {
        return;
    }
    let mut columns: Vec<String> = Vec::with_capacity(ds.width());
    let mut target = Vec::with_capacity(ds.width());
    for old in ds.columns() {
        let new = mapping
            .get(old)
            .filter(|n| !n.is_empty())
            .unwrap_or(old);
        let idx = columns.iter().position(|c| c == new).unwrap_or_else(|| {
            columns.push(new.clone());
            columns.len() - 1
        });
        target.push(idx);
    }

    let width = columns.len();
    ds.reshape(columns, |row| {
        let mut out = vec![Cell::Null; width];
        for (cell, &idx) in row.iter().zip(&target) {
            out[idx] = cell.clone();
        }
        out
    });
}

/// Keeps the listed columns in listed order; unknown names become null
/// columns. An empty list leaves the dataset alone.
fn select(ds: &mut Dataset, wanted: &[String]) {
    if wanted.is_empty() {
        return;
    }
    let mut seen = HashSet::new();
    let columns: Vec<String> = wanted.iter().filter(|c| seen.insert(c.as_str())).cloned().collect();
    let sources: Vec<Option<usize>> = columns.iter().map(|c| ds.column_index(c)).collect();
    ds.reshape(columns, |row| {
        sources
            .iter()
            .map(|src| src.map_or(Cell::Null, |i| row[i].clone()))
            .collect()
    });
}

fn trim(ds: &mut Dataset, columns: &[String]) {
    for column in columns {
        let Some(idx) = ds.column_index(column) else {
            continue;
        };
        for row in ds.rows_mut() {
            if !row[idx].is_null() {
                row[idx] = Cell::text(row[idx].as_text().trim());
            }
        }
    }
}

fn type_cast(ds: &mut Dataset, column: &str, cast: CastType) {
    let idx = ds.ensure_column(column);
    for row in ds.rows_mut() {
        let cell = &row[idx];
        row[idx] = match cast {
            CastType::Number => Cell::Number(cell.to_num()),
            CastType::String => Cell::text(cell.as_text()),
            CastType::Date if cell.is_falsy() => Cell::text(""),
            CastType::Date => Cell::text(cell.as_text()),
        };
    }
}

fn fill_missing(ds: &mut Dataset, column: &str, value: &Value) {
    let idx = ds.ensure_column(column);
    let fill = Cell::from_json(value);
    for row in ds.rows_mut() {
        if row[idx].is_missing() {
            row[idx] = fill.clone();
        }
    }
}

/// Drops rows missing a value in any listed column. A column the dataset
/// does not have counts as missing everywhere.
fn drop_missing(ds: &mut Dataset, columns: &[String]) {
    if columns.is_empty() {
        return;
    }
    let indices: Vec<Option<usize>> = columns.iter().map(|c| ds.column_index(c)).collect();
    ds.retain_rows(|_, row| {
        indices
            .iter()
            .all(|idx| idx.is_some_and(|i| !row[i].is_missing()))
    });
}

fn filter(ds: &mut Dataset, predicates: &[Predicate]) {
    if predicates.is_empty() {
        return;
    }
    let bound: Vec<(Option<usize>, &Predicate)> = predicates
        .iter()
        .map(|p| (ds.column_index(&p.column), p))
        .collect();
    let absent = Cell::Null;
    ds.retain_rows(|_, row| {
        bound.iter().all(|(idx, p)| {
            let cell = idx.map_or(&absent, |i| &row[i]);
            predicate_holds(cell, p.operator, &p.value)
        })
    });
}

/// Equality compares text forms; ordering compares loose numbers, so NaN on
/// either side is false. `in` needs a list operand.
fn predicate_holds(cell: &Cell, op: Operator, target: &Value) -> bool {
    match op {
        Operator::Eq => cell.as_text() == Cell::from_json(target).as_text(),
        Operator::Ne => cell.as_text() != Cell::from_json(target).as_text(),
        Operator::Gt => cell.to_num() > Cell::from_json(target).to_num(),
        Operator::Ge => cell.to_num() >= Cell::from_json(target).to_num(),
        Operator::Lt => cell.to_num() < Cell::from_json(target).to_num(),
        Operator::Le => cell.to_num() <= Cell::from_json(target).to_num(),
        Operator::In => match target {
            Value::Array(items) => items.iter().any(|item| Cell::from_json(item) == *cell),
            _ => false,
        },
    }
}

fn finite_values(ds: &Dataset, idx: usize) -> Vec<(usize, f64)> {
    ds.column_cells(idx)
        .map(Cell::to_num)
        .enumerate()
        .filter(|(_, x)| x.is_finite())
        .collect()
}

fn cap(ds: &mut Dataset, column: &str, rule: &CapRule) {
    let Some(idx) = ds.column_index(column) else {
        return;
    };
    let finite = finite_values(ds, idx);
    if finite.len() < 3 {
        tracing::debug!("cap: '{column}' has fewer than 3 finite values, skipped");
        return;
    }
    let values: Vec<f64> = finite.iter().map(|(_, x)| *x).collect();

    let (lo, hi) = match rule.method {
        CapMethod::Iqr => {
            let q1 = stats::quantile(&values, 0.25);
            let q3 = stats::quantile(&values, 0.75);
            let spread = rule.mult.unwrap_or(1.5) * (q3 - q1);
            (q1 - spread, q3 + spread)
        }
        CapMethod::Zscore => {
            let m = stats::mean(&values);
            let s = nonzero_or_one(stats::sample_stdev(&values));
            let k = rule.k.unwrap_or(3.0);
            (m - k * s, m + k * s)
        }
    };

    let rows = ds.rows_mut();
    for (row_idx, x) in finite {
        rows[row_idx][idx] = Cell::Number(x.max(lo).min(hi));
    }
}

/// Standard deviations of zero (or NaN) fall back to 1.
fn nonzero_or_one(s: f64) -> f64 {
    if s == 0.0 || s.is_nan() { 1.0 } else { s }
}

fn derive(ds: &mut Dataset, derivation: &Derivation) {
    let parsed = expr::parse(&derivation.expr);
    if let Err(e) = &parsed {
        tracing::debug!("derive '{}': {} (column set to NaN)", derivation.name, e);
    }

    let bindings: Vec<(String, Option<usize>)> = match &parsed {
        Ok(e) => e
            .columns()
            .into_iter()
            .map(|name| (name.to_owned(), ds.column_index(name)))
            .collect(),
        Err(_) => Vec::new(),
    };

    let out = ds.ensure_column(&derivation.name);
    for row in ds.rows_mut() {
        let value = match &parsed {
            Ok(e) => {
                let values: HashMap<&str, f64> = bindings
                    .iter()
                    .map(|(name, idx)| (name.as_str(), idx.map_or(f64::NAN, |i| row[i].to_num())))
                    .collect();
                e.eval_with(&values)
            }
            Err(_) => f64::NAN,
        };
        row[out] = Cell::Number(value);
    }
}

/// Replaces `column` with one `column__value` indicator per distinct text
/// value, in first-seen order. A column the dataset lacks is skipped.
fn one_hot(ds: &mut Dataset, column: &str) {
    let Some(idx) = ds.column_index(column) else {
        tracing::debug!("onehot: '{column}' not present, skipped");
        return;
    };

    let labels: Vec<String> = ds.column_cells(idx).map(Cell::as_text).collect();
    let mut categories: Vec<&str> = Vec::new();
    let mut seen = HashSet::new();
    for label in &labels {
        if seen.insert(label.as_str()) {
            categories.push(label);
        }
    }

    let targets: Vec<usize> = categories
        .iter()
        .map(|k| ds.ensure_column(&format!("{column}__{k}")))
        .collect();
    for (row, label) in ds.rows_mut().iter_mut().zip(&labels) {
        for (&target, k) in targets.iter().zip(&categories) {
            row[target] = Cell::Number(if label == k { 1.0 } else { 0.0 });
        }
    }
    ds.remove_column(column);
}

fn standardize(ds: &mut Dataset, column: &str) {
    let Some(idx) = ds.column_index(column) else {
        return;
    };
    let finite = finite_values(ds, idx);
    if finite.len() < 2 {
        return;
    }
    let values: Vec<f64> = finite.iter().map(|(_, x)| *x).collect();
    let m = stats::mean(&values);
    let s = nonzero_or_one(stats::sample_stdev(&values));

    let rows: &mut [Row] = ds.rows_mut();
    for (row_idx, x) in finite {
        rows[row_idx][idx] = Cell::Number((x - m) / s);
    }
}
