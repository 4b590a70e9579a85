//! Closed-form hypothesis tests over dataset columns.
//!
//! - [`ttest`]: one-sample, paired and Welch independent t-tests
//! - [`normality`]: Jarque–Bera
//! - [`levene`]: Brown–Forsythe variance homogeneity
//!
//! Referencing a column the dataset does not have is a hard error. Too few
//! usable observations is not: the result then carries an `error` string in
//! place of the statistics. p-values come from the approximations in
//! [`crate::stats::distributions`] and will differ slightly from exact
//! reference implementations.

pub mod levene;
pub mod normality;
pub mod ttest;

pub use levene::{LeveneRequest, LeveneResult, levene};
pub use normality::{NormalityRequest, NormalityResult, jarque_bera};
pub use ttest::{Alternative, TTestMode, TTestRequest, TTestResult, ttest};

use crate::dataset::Dataset;
use crate::error::Result;

/// Finite strict-numeric values of a column, top to bottom.
pub(crate) fn finite_values(dataset: &Dataset, column: &str) -> Result<Vec<f64>> {
    let idx = dataset.require_column(column)?;
    Ok(dataset.column_cells(idx).filter_map(|c| c.as_finite()).collect())
}

pub(crate) fn too_few(min: usize) -> String {
    format!("Not enough observations (at least {min} needed).")
}
