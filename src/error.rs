//! Centralized error handling for the tabstat engine.
//!
//! Failures come in two tiers. Hard failures (malformed input, unsupported file
//! types, unparseable JSON, missing columns, invalid recipes) are returned as
//! `Err(EngineError)` and end up in a `{ok: false, error}` response. Soft
//! conditions such as an underpowered sample are never errors; they are carried
//! as data (`warnings` lists or per-result `error` strings).
//!
//! ```
//! use tabstat::error::{EngineError, ResultExt as _};
//!
//! fn parse(text: &str) -> tabstat::error::Result<serde_json::Value> {
//!     serde_json::from_str(text).context("Pasted JSON is invalid")
//! }
//!
//! assert!(parse("{").is_err());
//! let err = EngineError::MissingColumn("price".to_owned());
//! assert_eq!(err.to_string(), "Column not found: price");
//! ```

use std::fmt;

/// Main error type for engine operations.
#[derive(Debug)]
pub enum EngineError {
    /// I/O errors (reading input files, sockets)
    Io(std::io::Error),

    /// Input could not be parsed into rows (bad JSON, broken delimited text, bad HTML)
    Parse(String),

    /// File type could not be handled, even after the delimited-text fallback
    UnsupportedFormat(String),

    /// Recipe is structurally invalid (unknown stage, wrong shape)
    InvalidRecipe(String),

    /// A request referenced a column the dataset does not have
    MissingColumn(String),

    /// Remote statistics service failure
    Remote(String),

    /// Configuration errors
    Config(String),

    /// Generic error with context
    Other(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Parse(msg) => write!(f, "Parse error: {msg}"),
            Self::UnsupportedFormat(msg) => write!(f, "Unsupported format: {msg}"),
            Self::InvalidRecipe(msg) => write!(f, "Invalid recipe: {msg}"),
            Self::MissingColumn(name) => write!(f, "Column not found: {name}"),
            Self::Remote(msg) => write!(f, "Statistics service error: {msg}"),
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(format!("JSON error: {err}"))
    }
}

impl From<csv::Error> for EngineError {
    fn from(err: csv::Error) -> Self {
        Self::Parse(format!("Delimited text error: {err}"))
    }
}

impl From<calamine::Error> for EngineError {
    fn from(err: calamine::Error) -> Self {
        Self::UnsupportedFormat(format!("Spreadsheet error: {err}"))
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        Self::Remote(err.to_string())
    }
}

// Responses carry failures as plain strings.
impl From<EngineError> for String {
    fn from(err: EngineError) -> Self {
        err.to_string()
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Extension trait to add context to results.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, msg: impl Into<String>) -> Result<T>;

    /// Add context using a closure (lazy evaluation).
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<EngineError>,
{
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| wrap(msg.into(), e.into()))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| wrap(f(), e.into()))
    }
}

/// Prefixes the message while keeping the error's tier, so a parse failure with
/// context is still reported as a parse failure.
fn wrap(msg: String, err: EngineError) -> EngineError {
    match err {
        EngineError::Io(e) => EngineError::Io(std::io::Error::new(e.kind(), format!("{msg}: {e}"))),
        EngineError::Parse(inner) => EngineError::Parse(format!("{msg}: {inner}")),
        EngineError::UnsupportedFormat(inner) => {
            EngineError::UnsupportedFormat(format!("{msg}: {inner}"))
        }
        EngineError::InvalidRecipe(inner) => EngineError::InvalidRecipe(format!("{msg}: {inner}")),
        EngineError::Remote(inner) => EngineError::Remote(format!("{msg}: {inner}")),
        EngineError::Config(inner) => EngineError::Config(format!("{msg}: {inner}")),
        other => EngineError::Other(format!("{msg}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::InvalidRecipe("unknown stage 'pivot'".to_owned());
        assert_eq!(err.to_string(), "Invalid recipe: unknown stage 'pivot'");
    }

    #[test]
    fn test_error_conversion_to_string() {
        let err = EngineError::MissingColumn("age".to_owned());
        let s: String = err.into();
        assert_eq!(s, "Column not found: age");
    }

    #[test]
    fn test_result_context_keeps_tier() {
        let result: std::result::Result<serde_json::Value, serde_json::Error> =
            serde_json::from_str("[1, 2");
        let result: Result<serde_json::Value> = result.context("Failed to read pasted JSON");

        match result {
            Err(EngineError::Parse(msg)) => {
                assert!(msg.starts_with("Failed to read pasted JSON"), "got {msg}");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_io_context() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file.txt",
        ));

        let result: Result<()> = result.context("Failed to read file");
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read file")
        );
    }
}
