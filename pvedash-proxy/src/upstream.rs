/**
 * CLIENT UPSTREAM - Appels HTTP vers l'API REST Proxmox VE
 *
 * RÔLE :
 * Unique point de sortie réseau du proxy. Chaque méthode = un GET upstream,
 * décodage de l'enveloppe `{data}` et normalisation des erreurs.
 *
 * FONCTIONNEMENT :
 * - Header `Authorization: PVEAPIToken=...` posé une fois sur le client
 * - Timeout fixe par appel, aucun retry
 * - Vérification TLS désactivable uniquement par configuration explicite
 */

use crate::config::{ConfigError, UpstreamConf};
use crate::error::UpstreamError;
use crate::models::{Envelope, GuestKind, UpstreamGuest, UpstreamNode, UpstreamVersion};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: String,
    timeout_secs: u64,
}

impl UpstreamClient {
    pub fn new(conf: &UpstreamConf) -> Result<Self, ConfigError> {
        let mut auth = HeaderValue::from_str(&format!("PVEAPIToken={}", conf.token))
            .map_err(|_| ConfigError::Invalid { key: "PROXMOX_API_TOKEN", value: "<redacted>".into() })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        if conf.insecure_tls {
            warn!(
                "[upstream] TLS certificate verification DISABLED for {} (PROXMOX_INSECURE_TLS=true)",
                conf.host
            );
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(conf.timeout_secs))
            .danger_accept_invalid_certs(conf.insecure_tls)
            .build()?;

        Ok(Self {
            http,
            base_url: conf.base_url(),
            timeout_secs: conf.timeout_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /cluster/resources?type=vm`
    pub async fn cluster_guests(&self) -> Result<Vec<UpstreamGuest>, UpstreamError> {
        Ok(self.get("/cluster/resources", &[("type", "vm")]).await?.unwrap_or_default())
    }

    /// `GET /nodes`
    pub async fn nodes(&self) -> Result<Vec<UpstreamNode>, UpstreamError> {
        Ok(self.get("/nodes", &[]).await?.unwrap_or_default())
    }

    /// `GET /nodes/{node}/{qemu|lxc}/{vmid}/config`
    pub async fn guest_config(
        &self,
        node: &str,
        vmid: u32,
        kind: GuestKind,
    ) -> Result<serde_json::Value, UpstreamError> {
        let path = format!("/nodes/{node}/{}/{vmid}/config", kind.as_str());
        Ok(self.get(&path, &[]).await?.unwrap_or(serde_json::Value::Null))
    }

    /// `GET /nodes/{node}/{qemu|lxc}/{vmid}/status/current`
    pub async fn guest_status(
        &self,
        node: &str,
        vmid: u32,
        kind: GuestKind,
    ) -> Result<serde_json::Value, UpstreamError> {
        let path = format!("/nodes/{node}/{}/{vmid}/status/current", kind.as_str());
        Ok(self.get(&path, &[]).await?.unwrap_or(serde_json::Value::Null))
    }

    /// `GET /version`
    pub async fn version(&self) -> Result<UpstreamVersion, UpstreamError> {
        self.get("/version", &[])
            .await?
            .ok_or_else(|| UpstreamError::Malformed("empty version payload".into()))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<T>, UpstreamError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("[upstream] GET {url}");

        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                code: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;
        let envelope: Envelope<T> = serde_json::from_slice(&body)
            .map_err(|e| UpstreamError::Malformed(format!("{path}: {e}")))?;
        Ok(envelope.data)
    }

    fn transport_error(&self, err: reqwest::Error) -> UpstreamError {
        if err.is_timeout() {
            UpstreamError::Timeout(self.timeout_secs)
        } else {
            UpstreamError::Unreachable(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_from_config() {
        let conf = UpstreamConf {
            host: "pve.lan".into(),
            token: "root@pam!dash=secret".into(),
            ..UpstreamConf::default()
        };
        let client = UpstreamClient::new(&conf).unwrap();
        assert_eq!(client.base_url(), "https://pve.lan:8006/api2/json");
    }

    #[test]
    fn test_token_with_newline_is_rejected() {
        let conf = UpstreamConf {
            host: "pve.lan".into(),
            token: "bad\ntoken".into(),
            ..UpstreamConf::default()
        };
        assert!(matches!(
            UpstreamClient::new(&conf),
            Err(ConfigError::Invalid { key: "PROXMOX_API_TOKEN", .. })
        ));
    }
}
