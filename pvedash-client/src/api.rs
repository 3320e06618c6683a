//! HTTP client for the PVEDash proxy API

use chrono::{DateTime, Utc};
use pvedash_proxy::{Host, VirtualMachine, VmFilter};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("cannot reach proxy: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{0}")]
    Api(String),
}

/// Proxy response envelope: `{success, count?, data?, error?}`
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(default = "Option::default")]
    data: Option<T>,
    #[serde(default)]
    error: Option<String>,
}

/// Everything one poll cycle retrieves
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub vms: Vec<VirtualMachine>,
    pub hosts: Vec<Host>,
    pub labels: Vec<String>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct ProxyClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl ProxyClient {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub async fn fetch_vms(&self, filter: &VmFilter) -> Result<Vec<VirtualMachine>, ClientError> {
        self.get("/vms", &filter.to_query()).await
    }

    pub async fn fetch_hosts(&self) -> Result<Vec<Host>, ClientError> {
        self.get("/nodes", &[]).await
    }

    pub async fn fetch_labels(&self) -> Result<Vec<String>, ClientError> {
        self.get("/tags", &[]).await
    }

    /// Unfiltered VMs, hosts and labels, fetched concurrently.
    /// Any failure fails the whole snapshot.
    pub async fn fetch_snapshot(&self) -> Result<Snapshot, ClientError> {
        let unfiltered = VmFilter::default();
        let (vms, hosts, labels) = tokio::try_join!(
            self.fetch_vms(&unfiltered),
            self.fetch_hosts(),
            self.fetch_labels(),
        )?;
        Ok(Snapshot {
            vms,
            hosts,
            labels,
            fetched_at: Utc::now(),
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {} {:?}", url, query);

        let mut request = self.http.get(&url).query(query);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        let parsed: ApiResponse<T> = match serde_json::from_slice(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => return Err(ClientError::Api(format!("HTTP {status}"))),
            Err(e) => return Err(ClientError::Api(format!("unexpected response from {path}: {e}"))),
        };

        if !parsed.success || !status.is_success() {
            return Err(ClientError::Api(
                parsed.error.unwrap_or_else(|| format!("HTTP {status}")),
            ));
        }
        parsed
            .data
            .ok_or_else(|| ClientError::Api(format!("response from {path} has no data")))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pvedash_devkit::{start_mixed_cluster, Failure, UpstreamStub};
    use pvedash_proxy::config::{ProxyConfig, UpstreamConf};
    use pvedash_proxy::LabelFilter;
    use std::net::SocketAddr;

    /// Real proxy router in front of the stub, on an ephemeral port
    pub(crate) async fn spawn_proxy(stub: &UpstreamStub, api_key: Option<&str>) -> SocketAddr {
        let cfg = ProxyConfig {
            api_key: api_key.map(str::to_string),
            upstream: UpstreamConf {
                scheme: "http".into(),
                host: stub.host(),
                port: stub.port(),
                token: "root@pam!test=secret".into(),
                insecure_tls: false,
                timeout_secs: 2,
            },
            ..ProxyConfig::default()
        };
        let app = pvedash_proxy::http::app(&cfg).unwrap();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        addr
    }

    pub(crate) fn client_for(addr: SocketAddr, api_key: Option<&str>) -> ProxyClient {
        ProxyClient::new(
            &format!("http://{addr}/api/"),
            api_key.map(str::to_string),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_snapshot() {
        let stub = start_mixed_cluster().await.unwrap();
        let addr = spawn_proxy(&stub, None).await;
        let client = client_for(addr, None);

        let snapshot = client.fetch_snapshot().await.unwrap();
        assert_eq!(snapshot.vms.len(), 6);
        assert_eq!(snapshot.hosts.len(), 2);
        assert_eq!(snapshot.labels, vec!["dev", "prod", "web"]);
    }

    #[tokio::test]
    async fn test_server_side_filters_are_sent() {
        let stub = start_mixed_cluster().await.unwrap();
        let addr = spawn_proxy(&stub, None).await;
        let client = client_for(addr, None);

        let filter = VmFilter {
            host: Some("host1".into()),
            status: Some("running".into()),
            labels: LabelFilter::parse_csv("prod,web"),
        };
        let vms = client.fetch_vms(&filter).await.unwrap();
        assert_eq!(vms.iter().map(|v| v.vmid).collect::<Vec<_>>(), vec![100]);
    }

    #[tokio::test]
    async fn test_proxy_error_message_is_surfaced() {
        let stub = start_mixed_cluster().await.unwrap();
        stub.fail_route("/nodes", Failure::Status(500));
        let addr = spawn_proxy(&stub, None).await;
        let client = client_for(addr, None);

        let err = client.fetch_snapshot().await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to fetch nodes: HTTP 500: Internal Server Error");
    }

    #[tokio::test]
    async fn test_api_key_is_sent() {
        let stub = start_mixed_cluster().await.unwrap();
        let addr = spawn_proxy(&stub, Some("k3y")).await;

        let err = client_for(addr, None).fetch_hosts().await.unwrap_err();
        assert_eq!(err.to_string(), "HTTP 401 Unauthorized");

        let hosts = client_for(addr, Some("k3y")).fetch_hosts().await.unwrap();
        assert_eq!(hosts.len(), 2);
    }

    #[tokio::test]
    async fn test_proxy_down() {
        let closed = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = closed.local_addr().unwrap();
        drop(closed);

        let err = client_for(addr, None).fetch_labels().await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
    }
}
