//! Student t-tests.
//!
//! | Mode | Statistic | df |
//! |---|---|---|
//! | one-sample | `(mean − μ₀) / (s / √n)` | `n − 1` |
//! | paired | one-sample on the differences of each column's finite values, truncated to the shorter column, μ₀ = 0 | `n − 1` |
//! | independent | Welch: `(meanA − meanB) / √(varA/nA + varB/nB)` | Welch–Satterthwaite |

use super::{finite_values, too_few};
use crate::dataset::Dataset;
use crate::error::{EngineError, Result};
use crate::stats::{self, distributions};
use serde::{Deserialize, Serialize};

const MIN_OBSERVATIONS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TTestMode {
    OneSample,
    Paired,
    Independent,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Alternative {
    #[default]
    TwoSided,
    Greater,
    Less,
}

impl Alternative {
    /// One-sided p-values halve the two-sided one in the hypothesised
    /// direction and take its complement otherwise.
    pub fn adjust(self, p_two: f64, t: f64) -> f64 {
        match self {
            Self::TwoSided => p_two,
            Self::Greater if t > 0.0 => p_two / 2.0,
            Self::Less if t < 0.0 => p_two / 2.0,
            Self::Greater | Self::Less => 1.0 - p_two / 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TTestRequest {
    pub mode: TTestMode,
    #[serde(default)]
    pub col_a: Option<String>,
    #[serde(default)]
    pub col_b: Option<String>,
    #[serde(default)]
    pub one_col: Option<String>,
    /// Hypothesised mean for one-sample tests
    #[serde(default)]
    pub mu: f64,
    #[serde(default)]
    pub alternative: Alternative,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TTestResult {
    #[serde(rename = "type")]
    pub mode: TTestMode,
    #[serde(flatten)]
    pub stats: Option<TTestStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TTestStats {
    pub n_a: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_b: Option<usize>,
    pub t: f64,
    pub p: f64,
    pub df: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mu: Option<f64>,
    #[serde(rename = "equal_var", skip_serializing_if = "Option::is_none")]
    pub equal_var: Option<bool>,
    pub alternative: Alternative,
}

impl TTestResult {
    fn insufficient(mode: TTestMode, min: usize) -> Self {
        Self {
            mode,
            stats: None,
            error: Some(too_few(min)),
        }
    }
}

fn required<'a>(field: &'a Option<String>, name: &str, mode: TTestMode) -> Result<&'a str> {
    field
        .as_deref()
        .ok_or_else(|| EngineError::Other(format!("{mode:?} t-test requires '{name}'")))
}

/// Runs the requested t-test.
///
/// # Errors
///
/// [`EngineError::MissingColumn`] when a referenced column is absent, or an
/// error when the mode's column arguments are not supplied.
pub fn ttest(dataset: &Dataset, req: &TTestRequest) -> Result<TTestResult> {
    let result = match req.mode {
        TTestMode::OneSample => {
            let values = finite_values(dataset, required(&req.one_col, "oneCol", req.mode)?)?;
            one_sample(&values, req.mu, req.alternative)
        }
        TTestMode::Paired => {
            // each column keeps its own finite values; pairs stop at the shorter one
            let a = finite_values(dataset, required(&req.col_a, "colA", req.mode)?)?;
            let b = finite_values(dataset, required(&req.col_b, "colB", req.mode)?)?;
            let diffs: Vec<f64> = a.iter().zip(&b).map(|(x, y)| x - y).collect();
            paired(&diffs, req.alternative)
        }
        TTestMode::Independent => {
            let a = finite_values(dataset, required(&req.col_a, "colA", req.mode)?)?;
            let b = finite_values(dataset, required(&req.col_b, "colB", req.mode)?)?;
            welch(&a, &b, req.alternative)
        }
    };
    tracing::debug!("t-test {:?}: {:?}", req.mode, result.stats.as_ref().map(|s| (s.t, s.p)));
    Ok(result)
}

fn t_and_p(mean_diff: f64, se: f64, df: f64, alternative: Alternative) -> (f64, f64) {
    let t = mean_diff / se;
    let p = alternative.adjust(distributions::two_sided_p(t, df), t);
    (t, p)
}

pub fn one_sample(values: &[f64], mu: f64, alternative: Alternative) -> TTestResult {
    let n = values.len();
    if n < MIN_OBSERVATIONS {
        return TTestResult::insufficient(TTestMode::OneSample, MIN_OBSERVATIONS);
    }
    let se = stats::sample_stdev(values) / (n as f64).sqrt();
    let df = (n - 1) as f64;
    let (t, p) = t_and_p(stats::mean(values) - mu, se, df, alternative);

    TTestResult {
        mode: TTestMode::OneSample,
        stats: Some(TTestStats {
            n_a: n,
            n_b: None,
            t,
            p,
            df,
            mu: Some(mu),
            equal_var: None,
            alternative,
        }),
        error: None,
    }
}

/// Paired test on precomputed differences `a − b`.
pub fn paired(diffs: &[f64], alternative: Alternative) -> TTestResult {
    let n = diffs.len();
    if n < MIN_OBSERVATIONS {
        return TTestResult::insufficient(TTestMode::Paired, MIN_OBSERVATIONS);
    }
    let se = stats::sample_stdev(diffs) / (n as f64).sqrt();
    let df = (n - 1) as f64;
    let (t, p) = t_and_p(stats::mean(diffs), se, df, alternative);

    TTestResult {
        mode: TTestMode::Paired,
        stats: Some(TTestStats {
            n_a: n,
            n_b: Some(n),
            t,
            p,
            df,
            mu: None,
            equal_var: None,
            alternative,
        }),
        error: None,
    }
}

/// Welch's unequal-variance test.
pub fn welch(a: &[f64], b: &[f64], alternative: Alternative) -> TTestResult {
    let (na, nb) = (a.len(), b.len());
    if na < MIN_OBSERVATIONS || nb < MIN_OBSERVATIONS {
        return TTestResult::insufficient(TTestMode::Independent, MIN_OBSERVATIONS);
    }
    let (na_f, nb_f) = (na as f64, nb as f64);
    let va = stats::sample_variance(a);
    let vb = stats::sample_variance(b);
    let sa = va / na_f;
    let sb = vb / nb_f;

    let df = (sa + sb).powi(2) / (va.powi(2) / (na_f.powi(2) * (na_f - 1.0)) + vb.powi(2) / (nb_f.powi(2) * (nb_f - 1.0)));
    let (t, p) = t_and_p(stats::mean(a) - stats::mean(b), (sa + sb).sqrt(), df, alternative);

    TTestResult {
        mode: TTestMode::Independent,
        stats: Some(TTestStats {
            n_a: na,
            n_b: Some(nb),
            t,
            p,
            df,
            mu: None,
            equal_var: Some(false),
            alternative,
        }),
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Cell;
    use serde_json::json;

    fn stats_of(result: &TTestResult) -> &TTestStats {
        result.stats.as_ref().expect("test computed")
    }

    #[test]
    fn test_welch_reference() {
        let res = welch(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0], Alternative::TwoSided);
        let s = stats_of(&res);
        assert!((s.t + 3.674).abs() < 1e-3, "t = {}", s.t);
        assert!((s.df - 4.0).abs() < 1e-9, "df = {}", s.df);
        assert!(s.p > 0.0 && s.p < 0.05);
        assert_eq!(s.equal_var, Some(false));
    }

    #[test]
    fn test_one_sample_and_alternatives() {
        let values = [5.1, 4.9, 5.3, 5.2, 5.0, 5.4];
        let two = one_sample(&values, 5.0, Alternative::TwoSided);
        let greater = one_sample(&values, 5.0, Alternative::Greater);
        let less = one_sample(&values, 5.0, Alternative::Less);

        let t = stats_of(&two).t;
        assert!(t > 0.0);
        assert_eq!(stats_of(&two).df, 5.0);
        assert!((stats_of(&greater).p - stats_of(&two).p / 2.0).abs() < 1e-12);
        assert!((stats_of(&less).p - (1.0 - stats_of(&two).p / 2.0)).abs() < 1e-12);
    }

    #[test]
    fn test_insufficient_is_soft() -> anyhow::Result<()> {
        let res = one_sample(&[1.0], 0.0, Alternative::TwoSided);
        assert!(res.stats.is_none());
        assert_eq!(
            serde_json::to_value(&res)?,
            json!({"type": "one-sample", "error": "Not enough observations (at least 2 needed)."})
        );
        Ok(())
    }

    fn paired_request(alternative: Alternative) -> TTestRequest {
        TTestRequest {
            mode: TTestMode::Paired,
            col_a: Some("before".into()),
            col_b: Some("after".into()),
            one_col: None,
            mu: 0.0,
            alternative,
        }
    }

    #[test]
    fn test_paired_truncates_to_shorter_column() -> anyhow::Result<()> {
        let ds = Dataset::new(
            vec!["before".into(), "after".into()],
            vec![
                vec![Cell::Number(1.0), Cell::Null],
                vec![Cell::Null, Cell::Number(2.0)],
                vec![Cell::Number(3.0), Cell::Null],
                vec![Cell::Null, Cell::Number(5.0)],
            ],
        );
        let res = ttest(&ds, &paired_request(Alternative::TwoSided))?;
        let s = stats_of(&res);
        assert_eq!((s.n_a, s.n_b), (2, Some(2)));
        // pairs (1, 2) and (3, 5): differences -1, -2
        assert!((s.t + 3.0).abs() < 1e-9, "t = {}", s.t);
        assert_eq!(s.df, 1.0);
        Ok(())
    }

    #[test]
    fn test_paired_drops_tail_of_longer_column() -> anyhow::Result<()> {
        let ds = Dataset::new(
            vec!["before".into(), "after".into()],
            vec![
                vec![Cell::Number(10.0), Cell::Number(12.0)],
                vec![Cell::Number(11.0), Cell::Number(14.0)],
                vec![Cell::Number(9.0), Cell::Number(10.0)],
                vec![Cell::Null, Cell::Number(99.0)],
            ],
        );
        let res = ttest(&ds, &paired_request(Alternative::Less))?;
        let s = stats_of(&res);
        assert_eq!((s.n_a, s.n_b), (3, Some(3)));
        // differences -2, -3, -1: mean -2, sd 1
        assert!((s.t + 2.0 * 3f64.sqrt()).abs() < 1e-9);
        assert!(s.p < 0.5);
        Ok(())
    }

    #[test]
    fn test_missing_column_is_hard_error() {
        let ds = Dataset::new(vec!["a".into()], vec![vec![Cell::Number(1.0)]]);
        let req: TTestRequest = serde_json::from_value(json!({
            "mode": "independent", "colA": "a", "colB": "nope"
        }))
        .expect("valid request");
        let err = ttest(&ds, &req).unwrap_err();
        assert!(matches!(err, EngineError::MissingColumn(ref c) if c == "nope"));

        let req: TTestRequest = serde_json::from_value(json!({"mode": "one-sample"})).expect("valid request");
        assert!(ttest(&ds, &req).is_err());
    }

    #[test]
    fn test_serialized_fields() -> anyhow::Result<()> {
        let res = welch(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0], Alternative::TwoSided);
        let value = serde_json::to_value(&res)?;
        assert_eq!(value["type"], "independent");
        assert_eq!(value["nA"], 3);
        assert_eq!(value["nB"], 3);
        assert_eq!(value["equal_var"], false);
        assert_eq!(value["alternative"], "two-sided");
        assert!(value.get("error").is_none());
        assert!(value.get("mu").is_none());
        Ok(())
    }
}
