use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_NAME: &str = "ideaflow";
const CONFIG_FILE: &str = "config.json";
const SESSION_FILE: &str = "session.json";

pub const ENV_API_URL: &str = "IDEAFLOW_API_URL";
pub const ENV_TIMEOUT_MS: &str = "IDEAFLOW_TIMEOUT_MS";
pub const ENV_LOGIN_PATH: &str = "IDEAFLOW_LOGIN_PATH";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the backend API
    pub api_url: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    /// Where protected views send signed-out users
    pub login_path: String,
    /// Overrides the default session file location
    pub token_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            timeout_ms: 120_000,
            login_path: crate::guard::DEFAULT_LOGIN_PATH.to_string(),
            token_path: None,
        }
    }
}

impl Config {
    /// Load configuration from the user's config directory, then apply
    /// environment overrides.
    /// Falls back to defaults if the file is missing or fails to parse.
    pub fn load() -> Self {
        let mut config = match Self::try_load() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config, using defaults: {:#}", e);
                Self::default()
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    fn try_load() -> Result<Self> {
        Self::from_file(&get_config_path()?)
    }

    /// Read a config file; a missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).context("Failed to read config file")?;

        let config = serde_json::from_str(&content).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Apply overrides from `lookup` (normally the process environment).
    /// Unparseable values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api_url = url.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => self.timeout_ms = ms,
                _ => tracing::warn!("Ignoring invalid {}: {:?}", ENV_TIMEOUT_MS, raw),
            }
        }
        if let Some(path) = lookup(ENV_LOGIN_PATH).filter(|v| !v.trim().is_empty()) {
            self.login_path = path.trim().to_string();
        }
    }

    /// Save the current configuration to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Location of the persisted session token.
    pub fn token_path(&self) -> Result<PathBuf> {
        match &self.token_path {
            Some(path) => Ok(path.clone()),
            None => app_file(SESSION_FILE),
        }
    }
}

fn get_config_path() -> Result<PathBuf> {
    app_file(CONFIG_FILE)
}

fn app_file(name: &str) -> Result<PathBuf> {
    let mut path =
        config_dir().ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    path.push(APP_NAME);
    path.push(name);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();

        assert_eq!(config.api_url, "http://localhost:8000");
        assert_eq!(config.timeout(), Duration::from_secs(120));
        assert_eq!(config.login_path, "/login");
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut config = Config {
            api_url: "http://from-file".to_string(),
            ..Config::default()
        };
        config.apply_overrides(env(&[
            (ENV_API_URL, "https://api.example.com"),
            (ENV_TIMEOUT_MS, "5000"),
        ]));

        assert_eq!(config.api_url, "https://api.example.com");
        assert_eq!(config.timeout_ms, 5000);
        assert_eq!(config.login_path, "/login");
    }

    #[test]
    fn invalid_timeout_is_ignored() {
        let mut config = Config::default();
        config.apply_overrides(env(&[(ENV_TIMEOUT_MS, "soon")]));

        assert_eq!(config.timeout_ms, 120_000);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();

        let config = Config::from_file(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "api_url": "http://staging:9000" }"#).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.api_url, "http://staging:9000");
        assert_eq!(config.timeout_ms, 120_000);
    }

    #[test]
    fn saved_config_reloads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            token_path: Some(dir.path().join("session.json")),
            ..Config::default()
        };

        config.save_to(&path).unwrap();
        assert_eq!(Config::from_file(&path).unwrap(), config);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(Config::from_file(&path).is_err());
    }
}
