//! JSON reader: a top-level array of row objects, or an object whose `data`
//! field is such an array.

use crate::dataset::Dataset;
use crate::error::{EngineError, Result, ResultExt as _};
use serde_json::{Map, Value};

const SHAPE_ERROR: &str = "JSON must be an array of objects";

pub fn read(bytes: &[u8]) -> Result<Dataset> {
    let value: Value = serde_json::from_slice(bytes).context("Invalid JSON")?;
    let records = normalize(value)?;
    Ok(Dataset::from_records(&records))
}

/// Bracket- or brace-bounded after trimming.
pub fn looks_like_json(text: &str) -> bool {
    let t = text.trim();
    (t.starts_with('[') && t.ends_with(']')) || (t.starts_with('{') && t.ends_with('}'))
}

fn normalize(value: Value) -> Result<Vec<Map<String, Value>>> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("data") {
            Some(Value::Array(items)) => items,
            _ => return Err(EngineError::Parse(SHAPE_ERROR.to_owned())),
        },
        _ => return Err(EngineError::Parse(SHAPE_ERROR.to_owned())),
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => Ok(map),
            _ => Err(EngineError::Parse(SHAPE_ERROR.to_owned())),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Cell;

    #[test]
    fn test_array_and_data_wrapper() -> anyhow::Result<()> {
        let ds = read(br#"[{"b": 1, "a": "x"}, {"a": "y"}]"#)?;
        assert_eq!(ds.columns(), ["b", "a"]);
        assert!(ds.get(1, "b").is_some_and(Cell::is_null));

        let ds = read(br#"{"meta": 1, "data": [{"k": true}]}"#)?;
        assert_eq!(ds.get(0, "k"), Some(&Cell::text("true")));
        Ok(())
    }

    #[test]
    fn test_shape_errors() {
        let inputs: [&[u8]; 4] = [b"{\"rows\": []}", b"42", b"[1, 2]", b"{\"data\": {}}"];
        for input in inputs {
            let err = read(input).unwrap_err();
            assert_eq!(err.to_string(), format!("Parse error: {SHAPE_ERROR}"));
        }
    }

    #[test]
    fn test_empty_array() -> anyhow::Result<()> {
        let ds = read(b"[]")?;
        assert!(ds.is_empty());
        assert!(ds.columns().is_empty());
        Ok(())
    }

    #[test]
    fn test_looks_like_json() {
        assert!(looks_like_json("  [1]\n"));
        assert!(looks_like_json("{}"));
        assert!(!looks_like_json("a,b"));
        assert!(!looks_like_json("[a, b"));
    }
}
