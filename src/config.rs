use crate::error::{EngineError, Result};
use secrecy::{ExposeSecret as _, SecretString};
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_SAMPLE_SIZE: usize = crate::profiling::DEFAULT_SAMPLE_SIZE;
pub const DEFAULT_CSV_CHUNK_BYTES: usize = 256 * 1024;
pub const DEFAULT_PREVIEW_ROW_CAP: usize = 5_000;
pub const DEFAULT_VIZ_ROW_CAP: usize = 200_000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_SAMPLE_SIZE: &str = "TABSTAT_SAMPLE_SIZE";
pub const ENV_STAT_URL: &str = "TABSTAT_STAT_URL";
pub const ENV_API_KEY: &str = "TABSTAT_API_KEY";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Rows drawn for profiling when the request does not say
    pub sample_size: usize,
    /// Delimited input is read in chunks of this size, one progress event per chunk
    pub csv_chunk_bytes: usize,
    /// Row cap for table previews
    pub preview_row_cap: usize,
    /// Row cap for chart data
    pub viz_row_cap: usize,
    /// Optional remote statistics service
    pub stat_service: Option<StatServiceConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_size: DEFAULT_SAMPLE_SIZE,
            csv_chunk_bytes: DEFAULT_CSV_CHUNK_BYTES,
            preview_row_cap: DEFAULT_PREVIEW_ROW_CAP,
            viz_row_cap: DEFAULT_VIZ_ROW_CAP,
            stat_service: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatServiceConfig {
    pub base_url: String,
    #[serde(default, deserialize_with = "deserialize_api_key")]
    pub api_key: Option<SecretString>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn deserialize_api_key<'de, D>(deserializer: D) -> std::result::Result<Option<SecretString>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let key = Option::<String>::deserialize(deserializer)?;
    Ok(key.filter(|k| !k.is_empty()).map(|k| SecretString::new(k.into())))
}

impl StatServiceConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        let key: String = key.into();
        self.api_key = Some(SecretString::new(key.into()));
        self
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_ref().map(|k| k.expose_secret())
    }
}

impl EngineConfig {
    /// Parses a JSON config document. Missing fields keep their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| EngineError::Config(format!("invalid config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.sample_size == 0 {
            return Err(EngineError::Config("sample_size must be positive".to_owned()));
        }
        if self.csv_chunk_bytes == 0 {
            return Err(EngineError::Config("csv_chunk_bytes must be positive".to_owned()));
        }
        if let Some(service) = &self.stat_service
            && service.base_url.trim().is_empty()
        {
            return Err(EngineError::Config("stat_service.base_url is empty".to_owned()));
        }
        Ok(())
    }

    /// Applies `TABSTAT_*` overrides, reading variables through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(raw) = lookup(ENV_SAMPLE_SIZE) {
            self.sample_size = raw
                .trim()
                .parse()
                .ok()
                .filter(|&n: &usize| n > 0)
                .ok_or_else(|| EngineError::Config(format!("{ENV_SAMPLE_SIZE} must be a positive integer, got '{raw}'")))?;
        }

        if let Some(url) = lookup(ENV_STAT_URL).filter(|u| !u.trim().is_empty()) {
            match &mut self.stat_service {
                Some(service) => service.base_url = url,
                None => self.stat_service = Some(StatServiceConfig::new(url)),
            }
        }

        if let Some(key) = lookup(ENV_API_KEY).filter(|k| !k.is_empty()) {
            match &mut self.stat_service {
                Some(service) => service.api_key = Some(SecretString::new(key.into())),
                None => tracing::warn!("{ENV_API_KEY} is set but no statistics service URL is configured"),
            }
        }
        Ok(())
    }
}

/// Loads the engine configuration: defaults, then the JSON file at `path`
/// if one is given, then environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let mut config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| EngineError::Config(format!("cannot read {}: {e}", path.display())))?;
            EngineConfig::from_json(&text)?
        }
        None => EngineConfig::default(),
    };
    config.apply_env(|key| std::env::var(key).ok())?;
    config.validate()?;

    tracing::debug!(
        "Config: sample_size={}, csv_chunk_bytes={}, stat_service={}",
        config.sample_size,
        config.csv_chunk_bytes,
        config
            .stat_service
            .as_ref()
            .map_or("none", |s| s.base_url.as_str())
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.sample_size, 1000);
        assert_eq!(config.csv_chunk_bytes, 262_144);
        assert_eq!(config.preview_row_cap, 5000);
        assert_eq!(config.viz_row_cap, 200_000);
        assert!(config.stat_service.is_none());
    }

    #[test]
    fn test_partial_json_keeps_defaults() -> anyhow::Result<()> {
        let config = EngineConfig::from_json(
            r#"{"sample_size": 250, "stat_service": {"base_url": "http://stats.local", "api_key": "k-1"}}"#,
        )?;
        assert_eq!(config.sample_size, 250);
        assert_eq!(config.csv_chunk_bytes, DEFAULT_CSV_CHUNK_BYTES);

        let service = config.stat_service.as_ref().expect("service configured");
        assert_eq!(service.api_key(), Some("k-1"));
        assert_eq!(service.timeout_secs, 30);
        assert!(!format!("{service:?}").contains("k-1"));
        Ok(())
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            EngineConfig::from_json(r#"{"sample_size": 0}"#),
            Err(EngineError::Config(_))
        ));
        assert!(matches!(EngineConfig::from_json("{"), Err(EngineError::Config(_))));

        let mut config = EngineConfig::default();
        let err = config.apply_env(env(&[(ENV_SAMPLE_SIZE, "lots")])).unwrap_err();
        assert!(err.to_string().contains(ENV_SAMPLE_SIZE));
    }

    #[test]
    fn test_env_overrides() -> anyhow::Result<()> {
        let mut config = EngineConfig::default();
        config.apply_env(env(&[
            (ENV_SAMPLE_SIZE, " 40 "),
            (ENV_STAT_URL, "http://127.0.0.1:9000"),
            (ENV_API_KEY, "secret"),
        ]))?;
        assert_eq!(config.sample_size, 40);
        let service = config.stat_service.expect("service from env");
        assert_eq!(service.base_url, "http://127.0.0.1:9000");
        assert_eq!(service.api_key(), Some("secret"));
        Ok(())
    }

    #[test]
    fn test_api_key_without_url_is_ignored() -> anyhow::Result<()> {
        let mut config = EngineConfig::default();
        config.apply_env(env(&[(ENV_API_KEY, "secret")]))?;
        assert!(config.stat_service.is_none());
        Ok(())
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config(Some(Path::new("/nonexistent/tabstat.json"))).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }
}
