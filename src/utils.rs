//! Small helpers shared by the engine modules: number formatting and rounding,
//! numeric and date parsing, and row caps.

use crate::dataset::Dataset;
use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Text form of a number as a browser would print it: integers without a
/// trailing `.0`, `NaN`, `Infinity` and `-Infinity` for the non-finite values.
pub fn format_number(x: f64) -> String {
    if x.is_nan() {
        "NaN".to_owned()
    } else if x.is_infinite() {
        if x > 0.0 {
            "Infinity".to_owned()
        } else {
            "-Infinity".to_owned()
        }
    } else if x == 0.0 {
        // -0 prints as 0
        "0".to_owned()
    } else {
        format!("{x}")
    }
}

/// Rounds to a fixed number of decimals. Non-finite input is returned unchanged.
pub fn round_to(x: f64, decimals: i32) -> f64 {
    if !x.is_finite() {
        return x;
    }
    let factor = 10f64.powi(decimals);
    (x * factor).round() / factor
}

/// Rounds to scientific notation with `digits` digits after the mantissa's
/// decimal point (`0.000123456`, 2 -> `0.000123`).
pub fn round_exponential(x: f64, digits: usize) -> f64 {
    if !x.is_finite() || x == 0.0 {
        return x;
    }
    format!("{x:.digits$e}").parse().unwrap_or(x)
}

/// Strict numeric parse: surrounding whitespace is ignored, the rest must be a
/// plain decimal literal. Empty text is not a number.
pub fn parse_number(text: &str) -> Option<f64> {
    let t = text.trim();
    if t.is_empty() {
        return None;
    }
    // Rust accepts "inf" and "nan" spellings that are not numbers in tabular data.
    if t.bytes().any(|b| matches!(b, b'i' | b'I' | b'n' | b'N')) {
        return match t {
            "Infinity" | "+Infinity" => Some(f64::INFINITY),
            "-Infinity" => Some(f64::NEG_INFINITY),
            _ => None,
        };
    }
    t.parse::<f64>().ok()
}

/// Loose numeric coercion used by recipe stages: thousands separators and
/// spaces are stripped first, anything that does not end up finite is NaN.
pub fn to_num(text: &str) -> f64 {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',' && *c != ' ').collect();
    match parse_number(&cleaned) {
        Some(x) if x.is_finite() => x,
        _ => f64::NAN,
    }
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d %b %Y", "%b %d, %Y", "%B %d, %Y", "%Y%m%d"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Whether the text reads as a calendar date or timestamp.
pub fn looks_like_date(text: &str) -> bool {
    let t = text.trim();
    if t.len() < 6 {
        return false;
    }
    DateTime::parse_from_rfc3339(t).is_ok()
        || DateTime::parse_from_rfc2822(t).is_ok()
        || DATETIME_FORMATS
            .iter()
            .any(|f| NaiveDateTime::parse_from_str(t, f).is_ok())
        || DATE_FORMATS
            .iter()
            .any(|f| NaiveDate::parse_from_str(t, f).is_ok())
}

/// Keeps the first `limit` rows. Callers use this to bound work before
/// dispatching (5,000 rows for previews, 200,000 for chart preparation).
pub fn cap_rows(mut dataset: Dataset, limit: usize) -> Dataset {
    if dataset.len() > limit {
        tracing::debug!("Capping dataset from {} to {} rows", dataset.len(), limit);
        dataset.truncate(limit);
    }
    dataset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1.0), "1");
        assert_eq!(format_number(1.5), "1.5");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_rounding() {
        assert_eq!(round_to(0.999_96, 3), 1.0);
        assert_eq!(round_to(-0.123_45, 2), -0.12);
        assert!(round_to(f64::NAN, 3).is_nan());
        assert_eq!(round_exponential(0.000_123_456, 2), 0.000_123);
        assert_eq!(round_exponential(0.0, 2), 0.0);
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(" 12 "), Some(12.0));
        assert_eq!(parse_number("1e3"), Some(1000.0));
        assert_eq!(parse_number(".5"), Some(0.5));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("nan"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("1,000"), None);
        assert_eq!(parse_number("abc"), None);
    }

    #[test]
    fn test_to_num() {
        assert_eq!(to_num("1,234.5"), 1234.5);
        assert_eq!(to_num(" 7 "), 7.0);
        assert!(to_num("").is_nan());
        assert!(to_num("seven").is_nan());
        assert!(to_num("Infinity").is_nan());
    }

    #[test]
    fn test_looks_like_date() {
        assert!(looks_like_date("2024-03-01"));
        assert!(looks_like_date("2024-03-01T10:15:00Z"));
        assert!(looks_like_date("03/01/2024"));
        assert!(looks_like_date("1 Mar 2024"));
        assert!(!looks_like_date("Seoul"));
        assert!(!looks_like_date("12"));
    }
}
