//! Pairwise associations: Pearson correlation between numeric columns and
//! one-way ANOVA of numeric columns grouped by categorical ones.

use crate::dataset::Dataset;
use crate::stats::{self, distributions};
use crate::utils;
use serde::Serialize;
use std::collections::HashMap;

/// How many pairs of each kind the profile reports.
pub const TOP_N: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrPair {
    pub x: String,
    pub y: String,
    /// Pearson r, 3 decimals
    pub r: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnovaPair {
    pub cat: String,
    pub y: String,
    #[serde(rename = "F")]
    pub f: f64,
    /// Upper-tail p, rounded to 2 significant digits
    pub p: f64,
}

/// Correlations over every unordered pair of `numeric` columns, using rows
/// where both values are finite. Pairs with fewer than 3 such rows or an
/// undefined r are left out. Sorted by |r| descending, at most [`TOP_N`].
pub fn top_correlations(sample: &Dataset, numeric: &[usize]) -> Vec<CorrPair> {
    let mut pairs = Vec::new();
    for (a, &i) in numeric.iter().enumerate() {
        for &j in &numeric[a + 1..] {
            let (xs, ys): (Vec<f64>, Vec<f64>) = sample
                .rows()
                .iter()
                .filter_map(|row| Some((row[i].as_finite()?, row[j].as_finite()?)))
                .unzip();
            if xs.len() < 3 {
                continue;
            }
            let r = stats::pearson(&xs, &ys);
            if !r.is_finite() {
                continue;
            }
            pairs.push(CorrPair {
                x: sample.columns()[i].clone(),
                y: sample.columns()[j].clone(),
                r: utils::round_to(r, 3),
            });
        }
    }
    pairs.sort_by(|a, b| b.r.abs().total_cmp(&a.r.abs()));
    pairs.truncate(TOP_N);
    pairs
}

/// One-way ANOVA for each (categorical, numeric) column pair. Groups with
/// fewer than two finite values are dropped; a pair qualifies when at least
/// two groups remain. Sorted by p ascending, at most [`TOP_N`].
pub fn top_anova(sample: &Dataset, categorical: &[usize], numeric: &[usize]) -> Vec<AnovaPair> {
    let mut results = Vec::new();
    for &c in categorical {
        for &y in numeric {
            if c == y {
                continue;
            }
            let mut groups = group_values(sample, c, y);
            groups.retain(|g| g.len() >= 2);
            if groups.len() < 2 {
                continue;
            }

            let anova = stats::one_way_anova(&groups);
            let p = distributions::f_upper_tail(anova.f, anova.df_between, anova.df_within);
            if !anova.f.is_finite() || !p.is_finite() {
                continue;
            }
            results.push(AnovaPair {
                cat: sample.columns()[c].clone(),
                y: sample.columns()[y].clone(),
                f: utils::round_to(anova.f, 3),
                p: utils::round_exponential(p, 1),
            });
        }
    }
    results.sort_by(|a, b| a.p.total_cmp(&b.p));
    results.truncate(TOP_N);
    results
}

/// Finite values of column `y`, grouped by the text of column `cat` in
/// first-seen order.
fn group_values(sample: &Dataset, cat: usize, y: usize) -> Vec<Vec<f64>> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Vec<f64>> = Vec::new();
    for row in sample.rows() {
        let slot = *index.entry(row[cat].as_text()).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        if let Some(v) = row[y].as_finite() {
            groups[slot].push(v);
        }
    }
    groups
}
