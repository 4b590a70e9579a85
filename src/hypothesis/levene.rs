//! Levene's test for equal variances, Brown–Forsythe variant: a one-way
//! ANOVA on absolute deviations from each group's median.

use crate::dataset::Dataset;
use crate::error::Result;
use crate::stats::{self, distributions};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const TEST_NAME: &str = "Levene(BF)";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeveneRequest {
    /// Numeric column whose spread is compared
    pub column: String,
    /// Column whose text value assigns rows to groups
    pub group: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeveneResult {
    pub test: &'static str,
    #[serde(flatten)]
    pub stats: Option<LeveneStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeveneStats {
    pub k: usize,
    pub n: usize,
    #[serde(rename = "F")]
    pub f: f64,
    /// `1 / (1 + F)` approximation
    pub p: f64,
    pub df1: usize,
    pub df2: usize,
}

/// Runs the test. Groups with fewer than two finite values are dropped
/// first; at least two groups must remain.
pub fn levene(dataset: &Dataset, req: &LeveneRequest) -> Result<LeveneResult> {
    let value_idx = dataset.require_column(&req.column)?;
    let group_idx = dataset.require_column(&req.group)?;

    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Vec<f64>> = Vec::new();
    for row in dataset.rows() {
        let Some(v) = row[value_idx].as_finite() else {
            continue;
        };
        let slot = *index.entry(row[group_idx].as_text()).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(v);
    }
    groups.retain(|g| g.len() >= 2);

    if groups.len() < 2 {
        return Ok(LeveneResult {
            test: TEST_NAME,
            stats: None,
            error: Some("At least 2 groups with 2 or more values are needed.".to_owned()),
        });
    }

    let deviations: Vec<Vec<f64>> = groups
        .iter()
        .map(|g| {
            let med = stats::median(g);
            g.iter().map(|v| (v - med).abs()).collect()
        })
        .collect();
    let anova = stats::one_way_anova(&deviations);
    tracing::debug!(
        "{TEST_NAME} '{}' by '{}': k={}, F={:.4}",
        req.column,
        req.group,
        anova.groups,
        anova.f
    );

    Ok(LeveneResult {
        test: TEST_NAME,
        stats: Some(LeveneStats {
            k: anova.groups,
            n: anova.observations,
            f: anova.f,
            p: distributions::f_tail_approx(anova.f),
            df1: anova.groups - 1,
            df2: anova.observations - anova.groups,
        }),
        error: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Cell;

    fn dataset(rows: &[(&str, f64)]) -> Dataset {
        Dataset::new(
            vec!["grp".to_owned(), "val".to_owned()],
            rows.iter()
                .map(|(g, v)| vec![Cell::text(*g), Cell::Number(*v)])
                .collect(),
        )
    }

    fn request() -> LeveneRequest {
        LeveneRequest {
            column: "val".to_owned(),
            group: "grp".to_owned(),
        }
    }

    #[test]
    fn test_unequal_spread() -> anyhow::Result<()> {
        let ds = dataset(&[
            ("a", 1.0),
            ("a", 2.0),
            ("a", 3.0),
            ("b", 10.0),
            ("b", 20.0),
            ("b", 30.0),
            // singleton group is dropped
            ("c", 5.0),
        ]);
        let res = levene(&ds, &request())?;
        let s = res.stats.expect("computed");
        assert_eq!((s.k, s.n, s.df1, s.df2), (2, 6, 1, 4));
        // deviations [1,0,1] vs [10,0,10]: SSB 54, SSW 67.33
        assert!((s.f - 54.0 / (202.0 / 3.0 / 4.0)).abs() < 1e-9, "F = {}", s.f);
        assert!((s.p - 1.0 / (1.0 + s.f)).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_null_group_label_and_skipped_values() -> anyhow::Result<()> {
        let ds = Dataset::new(
            vec!["grp".to_owned(), "val".to_owned()],
            vec![
                vec![Cell::text("a"), Cell::Number(1.0)],
                vec![Cell::text("a"), Cell::Number(3.0)],
                vec![Cell::text("b"), Cell::Number(2.0)],
                vec![Cell::Null, Cell::Number(4.0)],
                vec![Cell::text(""), Cell::Number(8.0)],
                vec![Cell::text("b"), Cell::text("oops")],
            ],
        );

        let res = levene(&ds, &request())?;
        // groups "a" and "" qualify, "b" has one finite value
        assert_eq!(res.stats.map(|s| (s.k, s.n)), Some((2, 4)));
        Ok(())
    }

    #[test]
    fn test_single_group_is_soft_error() -> anyhow::Result<()> {
        let res = levene(&dataset(&[("a", 1.0), ("a", 2.0), ("b", 3.0)]), &request())?;
        assert!(res.stats.is_none());
        let value = serde_json::to_value(&res)?;
        assert_eq!(value["test"], "Levene(BF)");
        assert!(value["error"].is_string());
        Ok(())
    }

    #[test]
    fn test_missing_group_column() {
        let req = LeveneRequest {
            column: "val".to_owned(),
            group: "region".to_owned(),
        };
        assert!(levene(&dataset(&[("a", 1.0)]), &req).is_err());
    }
}
