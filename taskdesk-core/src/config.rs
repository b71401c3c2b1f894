//! Configuration management
//!
//! `settings.json` in the taskdesk directory:
//! ```json
//! {
//!   "api": { "baseUrl": "http://localhost:8000/api/v1" }
//! }
//! ```
//! Keys this crate doesn't know about are preserved on save.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::adapters::http::DEFAULT_API_URL;

pub const SETTINGS_FILE: &str = "settings.json";

/// Environment variable that overrides the configured API URL
pub const API_URL_ENV: &str = "TASKDESK_API_URL";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    api: ApiSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    base_url: Option<String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Where the effective API URL came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiUrlSource {
    Default,
    Settings,
    Environment,
}

/// Effective configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API root every request is resolved against
    pub api_url: String,
    pub api_url_source: ApiUrlSource,
    /// Value stored in settings.json, if any
    stored_api_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_url_source: ApiUrlSource::Default,
            stored_api_url: None,
        }
    }
}

impl Config {
    /// Load config from the taskdesk directory, honoring `TASKDESK_API_URL`
    pub fn load(dir: &Path) -> Result<Self> {
        Self::load_with_override(dir, std::env::var(API_URL_ENV).ok())
    }

    fn load_with_override(dir: &Path, env_url: Option<String>) -> Result<Self> {
        let raw = read_settings(dir)?;
        let stored_api_url = raw.api.base_url.filter(|u| !u.trim().is_empty());

        let env_url = env_url.filter(|u| !u.trim().is_empty());

        let (api_url, api_url_source) = match (env_url, &stored_api_url) {
            (Some(url), _) => (url, ApiUrlSource::Environment),
            (None, Some(url)) => (url.clone(), ApiUrlSource::Settings),
            (None, None) => (DEFAULT_API_URL.to_string(), ApiUrlSource::Default),
        };

        Ok(Self {
            api_url,
            api_url_source,
            stored_api_url,
        })
    }

    /// Save to the taskdesk directory, keeping settings this crate doesn't manage
    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let mut settings = read_settings(dir)?;
        settings.api.base_url = self.stored_api_url.clone();

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(dir.join(SETTINGS_FILE), content)?;
        Ok(())
    }

    /// Persistently point the client at another backend
    ///
    /// An environment override, if present, still wins for this process.
    pub fn set_api_url(&mut self, url: &str) -> Result<()> {
        let parsed = Url::parse(url).with_context(|| format!("Invalid API URL '{}'", url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!("API URL must use http or https, got '{}'", parsed.scheme());
        }

        let url = url.trim_end_matches('/').to_string();
        self.stored_api_url = Some(url.clone());
        if self.api_url_source != ApiUrlSource::Environment {
            self.api_url = url;
            self.api_url_source = ApiUrlSource::Settings;
        }
        Ok(())
    }
}

fn read_settings(dir: &Path) -> Result<SettingsFile> {
    let settings_path = dir.join(SETTINGS_FILE);
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&settings_path)
        .with_context(|| format!("Failed to read {}", settings_path.display()))?;
    Ok(serde_json::from_str(&content).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_without_settings() {
        let dir = tempdir().unwrap();
        let config = Config::load_with_override(dir.path(), None).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.api_url_source, ApiUrlSource::Default);
    }

    #[test]
    fn test_set_url_roundtrip_preserves_unknown_keys() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"theme": "dark", "api": {"retries": 0}}"#,
        )
        .unwrap();

        let mut config = Config::load_with_override(dir.path(), None).unwrap();
        config.set_api_url("https://tasks.example.com/api/v1/").unwrap();
        config.save(dir.path()).unwrap();

        let reloaded = Config::load_with_override(dir.path(), None).unwrap();
        assert_eq!(reloaded.api_url, "https://tasks.example.com/api/v1");
        assert_eq!(reloaded.api_url_source, ApiUrlSource::Settings);

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join(SETTINGS_FILE)).unwrap())
                .unwrap();
        assert_eq!(raw["theme"], "dark");
        assert_eq!(raw["api"]["retries"], 0);
        assert_eq!(raw["api"]["baseUrl"], "https://tasks.example.com/api/v1");
    }

    #[test]
    fn test_environment_overrides_settings() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"api": {"baseUrl": "http://stored:8000/api/v1"}}"#,
        )
        .unwrap();

        let mut config =
            Config::load_with_override(dir.path(), Some("http://env:9000/api/v1".into())).unwrap();
        assert_eq!(config.api_url, "http://env:9000/api/v1");
        assert_eq!(config.api_url_source, ApiUrlSource::Environment);

        config.set_api_url("http://other:8000/api/v1").unwrap();
        assert_eq!(config.api_url, "http://env:9000/api/v1");
    }

    #[test]
    fn test_rejects_non_http_url() {
        let mut config = Config::default();
        assert!(config.set_api_url("ftp://example.com").is_err());
        assert!(config.set_api_url("not a url").is_err());
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_corrupt_settings_fall_back_to_defaults() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "{broken").unwrap();
        let config = Config::load_with_override(dir.path(), None).unwrap();
        assert_eq!(config.api_url_source, ApiUrlSource::Default);
    }
}
