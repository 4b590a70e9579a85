//! Closed-form CDF approximations used for p-values.
//!
//! These are portable approximations, not exact distribution functions:
//!
//! | Function | Approximation |
//! |---|---|
//! | [`normal_cdf`] | Abramowitz & Stegun 26.2.17 polynomial (abs. error < 7.5e-8) |
//! | [`t_cdf`] | normal CDF of the variance-corrected score `t·√(df/(df−2))` |
//! | [`chi_square_cdf`] | Wilson–Hilferty cube-root normal transform |
//! | [`f_tail_approx`] | `1 / (1 + F)`, a crude upper-tail stand-in |
//!
//! [`f_upper_tail`] is the one exact function here (regularized incomplete
//! beta via `statrs`); profiling ranks ANOVA associations with it.

use statrs::distribution::{ContinuousCDF as _, FisherSnedecor};

/// Standard normal CDF.
pub fn normal_cdf(x: f64) -> f64 {
    let t = 1.0 / (1.0 + 0.231_641_9 * x.abs());
    let d = 0.398_942_3 * (-x * x / 2.0).exp();
    let p = d
        * t
        * (0.319_381_5 + t * (-0.356_563_8 + t * (1.781_478 + t * (-1.821_256 + t * 1.330_274))));
    if x >= 0.0 { 1.0 - p } else { p }
}

/// Student t CDF approximated through the normal CDF. Degrees of freedom at
/// or below 2 are clamped so the correction factor stays defined.
pub fn t_cdf(t: f64, df: f64) -> f64 {
    let z = t * (df.max(1.0) / (df - 2.0).max(1.0)).sqrt();
    normal_cdf(z)
}

/// Chi-square CDF with `k` degrees of freedom (Wilson–Hilferty).
pub fn chi_square_cdf(x: f64, k: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    let z = ((x / k).cbrt() - (1.0 - 2.0 / (9.0 * k))) / (2.0 / (9.0 * k)).sqrt();
    normal_cdf(z)
}

/// Upper-tail probability for an F statistic approximated as `1 / (1 + F)`,
/// clamped to `[0, 1]`. Non-finite or negative F gives 1.
pub fn f_tail_approx(f: f64) -> f64 {
    if !f.is_finite() || f < 0.0 {
        return 1.0;
    }
    (1.0 / (1.0 + f)).clamp(0.0, 1.0)
}

/// Exact upper-tail probability `P(X > f)` of the F distribution.
/// Returns NaN when the degrees of freedom are not positive or `f` is not finite.
pub fn f_upper_tail(f: f64, df1: f64, df2: f64) -> f64 {
    if !f.is_finite() || f < 0.0 {
        return f64::NAN;
    }
    match FisherSnedecor::new(df1, df2) {
        Ok(dist) => dist.sf(f),
        Err(_) => f64::NAN,
    }
}

/// Two-sided p-value for a t statistic.
pub fn two_sided_p(t: f64, df: f64) -> f64 {
    2.0 * (1.0 - t_cdf(t.abs(), df))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_cdf_reference_points() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-7);
        assert!((normal_cdf(1.96) - 0.975).abs() < 1e-4);
        assert!((normal_cdf(-1.96) - 0.025).abs() < 1e-4);
        assert!(normal_cdf(8.0) > 0.999_999);
    }

    #[test]
    fn test_t_cdf_uses_variance_correction() {
        // df = 4: z = t * sqrt(4 / 2)
        let expected = normal_cdf(1.0 * 2f64.sqrt());
        assert!((t_cdf(1.0, 4.0) - expected).abs() < 1e-12);
        // df <= 2 clamps to the uncorrected normal
        assert!((t_cdf(1.0, 2.0) - normal_cdf(1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_chi_square_cdf() {
        assert_eq!(chi_square_cdf(0.0, 2.0), 0.0);
        // exact value for k = 2 is 1 - exp(-x / 2)
        let exact = 1.0 - (-5.991_f64 / 2.0).exp();
        assert!((chi_square_cdf(5.991, 2.0) - exact).abs() < 0.01);
    }

    #[test]
    fn test_f_tails() {
        assert!((f_tail_approx(1.0) - 0.5).abs() < 1e-12);
        assert_eq!(f_tail_approx(f64::INFINITY), 1.0);
        assert_eq!(f_tail_approx(-1.0), 1.0);

        let p = f_upper_tail(27.0, 2.0, 6.0);
        assert!(p > 0.0 && p < 0.01, "p = {p}");
        assert!(f_upper_tail(f64::NAN, 2.0, 6.0).is_nan());
        assert!(f_upper_tail(1.0, 0.0, 6.0).is_nan());
    }
}
