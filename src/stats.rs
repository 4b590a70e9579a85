//! Descriptive statistics and one-way ANOVA shared by the transform,
//! profiling and hypothesis-testing modules.
//!
//! All functions take plain `f64` slices that the caller has already filtered
//! to finite values. Degenerate input (empty slices, zero variance) produces
//! NaN or infinity rather than panicking; callers filter those out before
//! ranking or reporting.

pub mod distributions;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance (n - 1 denominator, clamped to at least 1).
pub fn sample_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    ss / (values.len().saturating_sub(1).max(1)) as f64
}

pub fn sample_stdev(values: &[f64]) -> f64 {
    sample_variance(values).sqrt()
}

/// Quantile with linear interpolation between closest ranks, position
/// `(n - 1) * q` in the sorted values.
pub fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    quantile_sorted(&sorted, q)
}

fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = (sorted.len() - 1) as f64 * q;
    let base = pos.floor() as usize;
    let rest = pos - base as f64;
    match sorted.get(base + 1) {
        Some(next) => sorted[base] + rest * (next - sorted[base]),
        None => sorted[base],
    }
}

pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        f64::midpoint(sorted[mid - 1], sorted[mid])
    }
}

/// Pearson correlation of two equally long series. NaN when either series
/// has zero variance or fewer than two points.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return f64::NAN;
    }
    let (x, y) = (&x[..n], &y[..n]);
    let mx = mean(x);
    let my = mean(y);
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y) {
        let dx = a - mx;
        let dy = b - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    let denom = (sxx * syy).sqrt();
    if denom == 0.0 {
        return f64::NAN;
    }
    sxy / denom
}

/// Result of a one-way analysis of variance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OneWayAnova {
    pub f: f64,
    pub df_between: f64,
    pub df_within: f64,
    /// Number of groups (k)
    pub groups: usize,
    /// Total observations (n)
    pub observations: usize,
}

/// One-way ANOVA over the given groups:
/// `SSB = Σ nᵢ(meanᵢ − grand)²`, `SSW = Σ Σ (xᵢⱼ − meanᵢ)²`,
/// `F = (SSB / (k − 1)) / (SSW / (n − k))`.
pub fn one_way_anova(groups: &[Vec<f64>]) -> OneWayAnova {
    let k = groups.len();
    let n: usize = groups.iter().map(Vec::len).sum();
    let all: Vec<f64> = groups.iter().flatten().copied().collect();
    let grand = mean(&all);

    let mut ssb = 0.0;
    let mut ssw = 0.0;
    for g in groups {
        let m = mean(g);
        ssb += g.len() as f64 * (m - grand).powi(2);
        ssw += g.iter().map(|x| (x - m).powi(2)).sum::<f64>();
    }

    let df_between = k as f64 - 1.0;
    let df_within = n as f64 - k as f64;
    let f = (ssb / df_between) / (ssw / df_within);

    OneWayAnova {
        f,
        df_between,
        df_within,
        groups: k,
        observations: n,
    }
}
