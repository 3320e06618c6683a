//! Client configuration
//!
//! Sources, later ones win:
//! - `{config_dir}/pvedash/client.toml`
//! - `PVEDASH_PROXY_URL` / `PVEDASH_API_KEY`
//! - command-line flags (applied in `main`)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the proxy, e.g. `http://localhost:3001/api`
    pub proxy_url: String,
    pub api_key: Option<String>,
    pub poll_interval_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            proxy_url: "http://localhost:3001/api".to_string(),
            api_key: None,
            poll_interval_secs: 30,
            request_timeout_secs: 50,
        }
    }
}

impl ClientConfig {
    /// Load config from OS-specific location
    pub async fn load() -> Result<Self> {
        let mut config = match Self::config_file_path() {
            Ok(path) => Self::load_from(&path).await?,
            Err(_) => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Missing file means defaults
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("PVEDASH_PROXY_URL").filter(|v| !v.is_empty()) {
            self.proxy_url = url;
        }
        if let Some(key) = lookup("PVEDASH_API_KEY").filter(|v| !v.is_empty()) {
            self.api_key = Some(key);
        }
    }

    /// Get OS-specific config file path
    pub fn config_file_path() -> Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;

        path.push("pvedash");
        path.push("client.toml");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.poll_interval_secs, 30);
        assert!(config.api_key.is_none());
    }

    #[tokio::test]
    async fn test_load_partial_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("client.toml");
        std::fs::write(&path, "proxy_url = \"http://dash:3001\"\npoll_interval_secs = 10\n").unwrap();

        let config = ClientConfig::load_from(&path).await.unwrap();
        assert_eq!(config.proxy_url, "http://dash:3001");
        assert_eq!(config.poll_interval_secs, 10);
        assert_eq!(config.request_timeout_secs, 50);
    }

    #[tokio::test]
    async fn test_missing_file_and_env_override() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = ClientConfig::load_from(&dir.path().join("none.toml")).await.unwrap();
        assert_eq!(config, ClientConfig::default());

        config.apply_env(|key| match key {
            "PVEDASH_PROXY_URL" => Some("http://other:9000".into()),
            "PVEDASH_API_KEY" => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.proxy_url, "http://other:9000");
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_config_file_path() {
        if let Ok(path) = ClientConfig::config_file_path() {
            assert!(path.ends_with("pvedash/client.toml"));
        }
    }
}
