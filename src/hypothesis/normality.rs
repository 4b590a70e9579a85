//! Jarque–Bera normality test.

use super::{finite_values, too_few};
use crate::dataset::Dataset;
use crate::error::Result;
use crate::stats::{self, distributions};
use serde::{Deserialize, Serialize};

pub const TEST_NAME: &str = "Jarque–Bera";

/// Below this many finite values the skewness and kurtosis corrections are
/// undefined or meaningless.
const MIN_OBSERVATIONS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalityRequest {
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalityResult {
    pub column: String,
    pub test: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<usize>,
    #[serde(rename = "JB", skip_serializing_if = "Option::is_none")]
    pub jb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Tests the finite values of `req.column` for normality.
///
/// `JB = n/6 · (S² + K²/4)` with bias-corrected sample skewness `S` and
/// excess kurtosis `K`; `p = 1 − χ²₂(JB)`.
pub fn jarque_bera(dataset: &Dataset, req: &NormalityRequest) -> Result<NormalityResult> {
    let values = finite_values(dataset, &req.column)?;
    let mut result = NormalityResult {
        column: req.column.clone(),
        test: TEST_NAME,
        n: None,
        jb: None,
        p: None,
        error: None,
    };

    let n = values.len();
    if n < MIN_OBSERVATIONS {
        result.error = Some(too_few(MIN_OBSERVATIONS));
        return Ok(result);
    }

    let jb = statistic(&values);
    result.n = Some(n);
    result.jb = Some(jb);
    result.p = Some(1.0 - distributions::chi_square_cdf(jb, 2.0));
    tracing::debug!("{TEST_NAME} on '{}': n={n}, JB={jb:.4}", req.column);
    Ok(result)
}

fn statistic(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let m = stats::mean(values);
    let sd = stats::sample_stdev(values);

    let (mut s3, mut s4) = (0.0, 0.0);
    for v in values {
        let z = (v - m) / sd;
        s3 += z.powi(3);
        s4 += z.powi(4);
    }

    let skew = n / ((n - 1.0) * (n - 2.0)) * s3;
    let kurt = n * (n + 1.0) / ((n - 1.0) * (n - 2.0) * (n - 3.0)) * s4
        - 3.0 * (n - 1.0).powi(2) / ((n - 2.0) * (n - 3.0));
    n / 6.0 * (skew * skew + kurt * kurt / 4.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Cell;
    use crate::error::EngineError;

    fn column(values: impl IntoIterator<Item = f64>) -> Dataset {
        Dataset::new(
            vec!["x".to_owned()],
            values.into_iter().map(|v| vec![Cell::Number(v)]).collect(),
        )
    }

    fn request() -> NormalityRequest {
        NormalityRequest { column: "x".to_owned() }
    }

    #[test]
    fn test_symmetric_sample_not_rejected() -> anyhow::Result<()> {
        let res = jarque_bera(&column((1..=20_i32).map(f64::from)), &request())?;
        assert_eq!(res.n, Some(20));
        assert!(res.p.is_some_and(|p| p > 0.05), "{res:?}");
        Ok(())
    }

    #[test]
    fn test_skewed_sample_rejected() -> anyhow::Result<()> {
        let mut values = vec![0.0; 9];
        values.push(100.0);
        let res = jarque_bera(&column(values), &request())?;
        assert!(res.jb.is_some_and(|jb| jb > 50.0), "{res:?}");
        assert!(res.p.is_some_and(|p| p < 0.01));
        Ok(())
    }

    #[test]
    fn test_too_few_values() -> anyhow::Result<()> {
        let mut rows: Vec<Vec<Cell>> = (1..=7_i32).map(|v| vec![Cell::Number(f64::from(v))]).collect();
        rows.push(vec![Cell::text("n/a")]);
        let ds = Dataset::new(vec!["x".to_owned()], rows);
        let res = jarque_bera(&ds, &request())?;
        assert!(res.n.is_none());
        assert_eq!(res.error.as_deref(), Some("Not enough observations (at least 8 needed)."));

        let value = serde_json::to_value(&res)?;
        assert_eq!(value["test"], "Jarque–Bera");
        assert!(value.get("JB").is_none());
        Ok(())
    }

    #[test]
    fn test_unknown_column() {
        let err = jarque_bera(&column([1.0]), &NormalityRequest { column: "y".to_owned() }).unwrap_err();
        assert!(matches!(err, EngineError::MissingColumn(_)));
    }
}
