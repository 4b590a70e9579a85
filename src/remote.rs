//! Client for the optional remote statistics service.
//!
//! The service takes `{op, rows, args, options}` at `POST /stat/run` and
//! answers with `{ok, data}` or `{ok: false, message, code}`. Nothing in the
//! local engine depends on it.

use crate::config::StatServiceConfig;
use crate::dataset::Dataset;
use crate::error::{EngineError, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret as _, SecretString};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::time::Duration;

const API_KEY_HEADER: &str = "X-API-Key";

/// Body of a `POST /stat/run` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatRequest {
    pub op: String,
    pub rows: Vec<Map<String, Value>>,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub args: Value,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub options: Value,
}

impl StatRequest {
    pub fn new(op: impl Into<String>, dataset: &Dataset) -> Self {
        Self {
            op: op.into(),
            rows: (0..dataset.len()).map(|i| dataset.record(i)).collect(),
            args: Value::Null,
            options: Value::Null,
        }
    }

    pub fn with_args(mut self, args: Value) -> Self {
        self.args = args;
        self
    }

    pub fn with_options(mut self, options: Value) -> Self {
        self.options = options;
        self
    }
}

/// Options of an ordinary least squares fit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OlsOptions {
    pub add_intercept: bool,
    /// Dummy-encode categorical regressors
    pub dummy: bool,
    pub drop_first: bool,
    /// Robust covariance type, `HC1` or `HC3`
    pub robust: Option<String>,
}

impl Default for OlsOptions {
    fn default() -> Self {
        Self {
            add_intercept: true,
            dummy: true,
            drop_first: true,
            robust: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatClient {
    client: Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl StatClient {
    pub fn new(config: &StatServiceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header(API_KEY_HEADER, key.expose_secret()),
            None => builder,
        }
    }

    /// Which optional backends the service has available.
    pub async fn capabilities(&self) -> Result<Value> {
        let url = format!("{}/stat/capabilities", self.base_url);
        tracing::debug!("GET {url}");
        let response = self.authorize(self.client.get(&url)).send().await?;
        let status = response.status();
        let body = response.text().await?;
        parse_envelope(status, &body, "stat capability check failed")
    }

    pub async fn run(&self, request: &StatRequest) -> Result<Value> {
        let url = format!("{}/stat/run", self.base_url);
        tracing::info!("Remote {} on {} rows", request.op, request.rows.len());
        let response = self.authorize(self.client.post(&url)).json(request).send().await?;
        let status = response.status();
        let body = response.text().await?;
        parse_envelope(status, &body, &format!("stat {} failed", request.op))
    }

    pub async fn describe(&self, dataset: &Dataset, top_n_cat: usize) -> Result<Value> {
        let request = StatRequest::new("describe", dataset).with_options(json!({ "topNCat": top_n_cat }));
        self.run(&request).await
    }

    pub async fn corr(&self, dataset: &Dataset, top_n_pairs: usize) -> Result<Value> {
        let request = StatRequest::new("corr", dataset).with_options(json!({ "topNPairs": top_n_pairs }));
        self.run(&request).await
    }

    pub async fn ols(&self, dataset: &Dataset, y: &str, x: &[String], options: &OlsOptions) -> Result<Value> {
        let request = StatRequest::new("ols", dataset)
            .with_args(json!({ "y": y, "x": x }))
            .with_options(serde_json::to_value(options)?);
        self.run(&request).await
    }
}

/// Unwraps a service envelope.
///
/// A non-success status gives `fallback`; `{ok: false}` gives its `message`
/// (or `fallback`) with ` [code]` appended when a code is present. Otherwise
/// the `data` field is returned, or the whole body if there is none.
pub fn parse_envelope(status: StatusCode, body: &str, fallback: &str) -> Result<Value> {
    if !status.is_success() {
        tracing::warn!("Statistics service answered {status}");
        return Err(EngineError::Remote(fallback.to_owned()));
    }

    let mut value: Value = serde_json::from_str(body)
        .map_err(|e| EngineError::Remote(format!("{fallback}: response is not JSON ({e})")))?;

    if value.get("ok") == Some(&Value::Bool(false)) {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .unwrap_or(fallback);
        let code = match value.get("code") {
            Some(Value::String(c)) if !c.is_empty() => format!(" [{c}]"),
            Some(Value::Number(n)) => format!(" [{n}]"),
            _ => String::new(),
        };
        return Err(EngineError::Remote(format!("{message}{code}")));
    }

    Ok(match value.get_mut("data") {
        Some(data) => data.take(),
        None => value,
    })
}
