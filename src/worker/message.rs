//! Messages exchanged with a worker.
//!
//! ```text
//! request   {"operation": "profile", "payload": {"rows": [...], "sampleSize": 500}}
//! progress  {"ok": true, "progress": {"mode": "csv", "percent": 40}}
//! success   {"ok": true, "data": {...}}
//! failure   {"ok": false, "error": "Column not found: price"}
//! ```

use crate::dataset::Dataset;
use crate::error::{EngineError, Result};
use crate::hypothesis::{LeveneRequest, NormalityRequest, TTestRequest};
use crate::ingest::Progress;
use crate::pipeline::Recipe;
use serde::ser::SerializeMap as _;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// One task for a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", content = "payload", rename_all = "kebab-case")]
pub enum Request {
    IngestFile(IngestFilePayload),
    IngestPaste(IngestPastePayload),
    TransformApply(TransformPayload),
    TransformExport(ExportPayload),
    Profile(ProfilePayload),
    TestTtest(TTestPayload),
    TestNormality(NormalityPayload),
    TestLevene(LevenePayload),
}

impl Request {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| EngineError::Parse(format!("invalid request: {e}")))
    }

    pub fn operation(&self) -> &'static str {
        match self {
            Self::IngestFile(_) => "ingest-file",
            Self::IngestPaste(_) => "ingest-paste",
            Self::TransformApply(_) => "transform-apply",
            Self::TransformExport(_) => "transform-export",
            Self::Profile(_) => "profile",
            Self::TestTtest(_) => "test-ttest",
            Self::TestNormality(_) => "test-normality",
            Self::TestLevene(_) => "test-levene",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestFilePayload {
    pub name: String,
    #[serde(default)]
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestPastePayload {
    pub text: String,
    /// HTML flavour of the clipboard, when offered
    #[serde(default)]
    pub html: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformPayload {
    pub rows: Dataset,
    #[serde(default)]
    pub recipe: Recipe,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportPayload {
    pub rows: Dataset,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePayload {
    pub rows: Dataset,
    /// Falls back to the configured sample size
    #[serde(default)]
    pub sample_size: Option<usize>,
    #[serde(default)]
    pub numeric_hint: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TTestPayload {
    pub rows: Dataset,
    #[serde(flatten)]
    pub test: TTestRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalityPayload {
    pub rows: Dataset,
    #[serde(flatten)]
    pub test: NormalityRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevenePayload {
    pub rows: Dataset,
    #[serde(flatten)]
    pub test: LeveneRequest,
}

/// Final answer to a [`Request`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn success(data: Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
        }
    }

    /// The payload on success, the error text otherwise.
    pub fn into_result(self) -> std::result::Result<Value, String> {
        if self.ok {
            Ok(self.data.unwrap_or(Value::Null))
        } else {
            Err(self.error.unwrap_or_default())
        }
    }
}

impl From<Result<Value>> for Response {
    fn from(result: Result<Value>) -> Self {
        match result {
            Ok(data) => Self::success(data),
            Err(e) => Self::failure(e),
        }
    }
}

/// What travels back over a worker's channel: any number of progress
/// notifications, then exactly one response.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Progress(Progress),
    Done(Response),
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Progress(progress) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("ok", &true)?;
                map.serialize_entry("progress", progress)?;
                map.end()
            }
            Self::Done(response) => response.serialize(serializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hypothesis::TTestMode;
    use crate::ingest::IngestMode;
    use serde_json::json;

    #[test]
    fn test_request_shapes() -> anyhow::Result<()> {
        let req: Request = serde_json::from_value(json!({
            "operation": "test-ttest",
            "payload": {
                "rows": [{"a": 1, "b": 2}],
                "mode": "paired",
                "colA": "a",
                "colB": "b",
                "alternative": "greater"
            }
        }))?;
        assert_eq!(req.operation(), "test-ttest");
        let Request::TestTtest(payload) = req else {
            panic!("wrong variant");
        };
        assert_eq!(payload.test.mode, TTestMode::Paired);
        assert_eq!(payload.rows.columns(), ["a", "b"]);

        let req = Request::from_json(
            r#"{"operation": "profile", "payload": {"rows": {"rows": [{"x": 1}], "columns": ["x"]}}}"#,
        )?;
        assert!(matches!(req, Request::Profile(ProfilePayload { sample_size: None, .. })));
        Ok(())
    }

    #[test]
    fn test_unknown_operation() {
        let err = Request::from_json(r#"{"operation": "train-model", "payload": {}}"#).unwrap_err();
        assert!(matches!(err, EngineError::Parse(_)));
    }

    #[test]
    fn test_bad_recipe_rejected_with_request() {
        let err = Request::from_json(
            r#"{"operation": "transform-apply", "payload": {"rows": [], "recipe": {"explode": []}}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("explode"), "{err}");
    }

    #[test]
    fn test_message_serialization() -> anyhow::Result<()> {
        let progress = Message::Progress(Progress {
            mode: IngestMode::Csv,
            percent: Some(40),
        });
        assert_eq!(
            serde_json::to_value(&progress)?,
            json!({"ok": true, "progress": {"mode": "csv", "percent": 40}})
        );

        let done = Message::Done(Response::failure("boom"));
        assert_eq!(serde_json::to_value(&done)?, json!({"ok": false, "error": "boom"}));

        let ok = Response::success(json!({"count": 0}));
        assert_eq!(serde_json::to_value(&ok)?, json!({"ok": true, "data": {"count": 0}}));
        assert_eq!(ok.into_result(), Ok(json!({"count": 0})));
        Ok(())
    }
}
