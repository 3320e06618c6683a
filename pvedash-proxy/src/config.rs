/**
 * CONFIGURATION PROXY - Chargement YAML + surcharge par variables d'environnement
 *
 * RÔLE : Construit la `ProxyConfig` à partir d'un fichier optionnel (`proxy.yaml`)
 * puis des variables d'environnement, qui ont toujours le dernier mot.
 *
 * SÉCURITÉ :
 * - Aucun secret par défaut : le token upstream est obligatoire
 * - La vérification TLS est active par défaut, `PROXMOX_INSECURE_TLS=true` la coupe
 */

use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error("cannot build upstream HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ProxyConfig {
    pub listen_port: u16,
    pub cors_origin: String,
    /// Clé exigée dans `x-api-key` si définie (hors /health)
    pub api_key: Option<String>,
    pub upstream: UpstreamConf,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct UpstreamConf {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    /// Format Proxmox complet : `user@realm!tokenid=secret`
    pub token: String,
    pub insecure_tls: bool,
    pub timeout_secs: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen_port: 3001,
            cors_origin: "http://localhost:3000".into(),
            api_key: None,
            upstream: UpstreamConf::default(),
        }
    }
}

impl Default for UpstreamConf {
    fn default() -> Self {
        Self {
            scheme: "https".into(),
            host: String::new(),
            port: 8006,
            token: String::new(),
            insecure_tls: false,
            timeout_secs: 45,
        }
    }
}

impl UpstreamConf {
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}/api2/json", self.scheme, self.host, self.port)
    }
}

impl ProxyConfig {
    /// Applique les variables d'environnement par-dessus la config fichier.
    /// `lookup` est injectable pour les tests (sinon `std::env::var`).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("PROXMOX_HOST") { self.upstream.host = v; }
        if let Some(v) = get("PROXMOX_PORT") { self.upstream.port = parse_num("PROXMOX_PORT", &v)?; }
        if let Some(v) = get("PROXMOX_SCHEME") { self.upstream.scheme = v; }
        if let Some(v) = get("PROXMOX_API_TOKEN") { self.upstream.token = v; }
        if let Some(v) = get("PROXMOX_INSECURE_TLS") { self.upstream.insecure_tls = parse_bool("PROXMOX_INSECURE_TLS", &v)?; }
        if let Some(v) = get("PROXMOX_TIMEOUT_SECS") { self.upstream.timeout_secs = parse_num("PROXMOX_TIMEOUT_SECS", &v)?; }
        if let Some(v) = get("PORT") { self.listen_port = parse_num("PORT", &v)?; }
        if let Some(v) = get("CORS_ORIGIN") { self.cors_origin = v; }
        if let Some(v) = get("PVEDASH_API_KEY") { self.api_key = Some(v); }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upstream.host.trim().is_empty() {
            return Err(ConfigError::Missing("PROXMOX_HOST"));
        }
        if self.upstream.token.trim().is_empty() {
            return Err(ConfigError::Missing("PROXMOX_API_TOKEN"));
        }
        if !matches!(self.upstream.scheme.as_str(), "http" | "https") {
            return Err(ConfigError::Invalid { key: "PROXMOX_SCHEME", value: self.upstream.scheme.clone() });
        }
        if self.upstream.timeout_secs == 0 {
            return Err(ConfigError::Invalid { key: "PROXMOX_TIMEOUT_SECS", value: "0".into() });
        }
        Ok(())
    }
}

fn parse_num<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid { key, value: value.to_string() })
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid { key, value: value.to_string() }),
    }
}

/// Lit le fichier YAML s'il existe ; absent ou vide = valeurs par défaut.
pub async fn load_file(path: &Path) -> Result<ProxyConfig, ConfigError> {
    if !path.exists() {
        tracing::info!("[config] pas de {}, usage config par défaut + env", path.display());
        return Ok(ProxyConfig::default());
    }
    let txt = fs::read_to_string(path).await.map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    if txt.trim().is_empty() {
        return Ok(ProxyConfig::default());
    }
    Ok(serde_yaml::from_str(&txt)?)
}

pub async fn load_config() -> Result<ProxyConfig, ConfigError> {
    let path = std::env::var("PVEDASH_PROXY_CONFIG").unwrap_or_else(|_| "proxy.yaml".into());
    let mut cfg = load_file(Path::new(&path)).await?;
    cfg.apply_env(|key| std::env::var(key).ok())?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_secure_and_secretless() {
        let cfg = ProxyConfig::default();
        assert!(!cfg.upstream.insecure_tls);
        assert!(cfg.upstream.token.is_empty());
        assert_eq!(cfg.upstream.port, 8006);
        assert_eq!(cfg.listen_port, 3001);
        assert!(matches!(cfg.validate(), Err(ConfigError::Missing("PROXMOX_HOST"))));
    }

    #[test]
    fn test_env_overrides() {
        let mut cfg = ProxyConfig::default();
        cfg.apply_env(env(&[
            ("PROXMOX_HOST", "pve.lan"),
            ("PROXMOX_PORT", "8443"),
            ("PROXMOX_API_TOKEN", "root@pam!dash=abc"),
            ("PROXMOX_INSECURE_TLS", "true"),
            ("PORT", "4000"),
            ("CORS_ORIGIN", "https://dash.lan"),
        ]))
        .unwrap();

        assert_eq!(cfg.upstream.base_url(), "https://pve.lan:8443/api2/json");
        assert!(cfg.upstream.insecure_tls);
        assert_eq!(cfg.listen_port, 4000);
        assert_eq!(cfg.cors_origin, "https://dash.lan");
        assert!(cfg.api_key.is_none());
        cfg.validate().unwrap();
    }

    #[test]
    fn test_missing_token_is_rejected() {
        let mut cfg = ProxyConfig::default();
        cfg.apply_env(env(&[("PROXMOX_HOST", "pve.lan")])).unwrap();
        assert!(matches!(cfg.validate(), Err(ConfigError::Missing("PROXMOX_API_TOKEN"))));
    }

    #[test]
    fn test_invalid_values() {
        let mut cfg = ProxyConfig::default();
        let err = cfg.apply_env(env(&[("PROXMOX_PORT", "huit")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PROXMOX_PORT", .. }));

        let err = cfg.apply_env(env(&[("PROXMOX_INSECURE_TLS", "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PROXMOX_INSECURE_TLS", .. }));
    }

    #[tokio::test]
    async fn test_yaml_file_then_env() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("proxy.yaml");
        std::fs::write(
            &path,
            "listen_port: 3100\nupstream:\n  host: pve-file\n  token: file-token\n  timeout_secs: 10\n",
        )
        .unwrap();

        let mut cfg = load_file(&path).await.unwrap();
        assert_eq!(cfg.listen_port, 3100);
        assert_eq!(cfg.upstream.host, "pve-file");
        assert_eq!(cfg.upstream.port, 8006);

        cfg.apply_env(env(&[("PROXMOX_HOST", "pve-env")])).unwrap();
        assert_eq!(cfg.upstream.host, "pve-env");
        assert_eq!(cfg.upstream.token, "file-token");
        cfg.validate().unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let cfg = load_file(&dir.path().join("absent.yaml")).await.unwrap();
        assert_eq!(cfg.listen_port, 3001);
    }
}
