/*!
Faux serveur Proxmox VE pour tests sans cluster

Sert `/api2/json/...` sur 127.0.0.1 (port éphémère), à partir de fixtures
modifiables à chaud. Enregistre chaque requête reçue (chemin, query,
header Authorization) pour les assertions.
*/

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::Response;
use axum::Router;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub type Shared<T> = Arc<Mutex<T>>;

/// Panne injectée sur toutes les routes
#[derive(Debug, Clone, PartialEq)]
pub enum Failure {
    /// Répond ce code HTTP avec `{"data": null}`
    Status(u16),
    /// Répond 200 avec un corps qui n'est pas du JSON
    MalformedBody,
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
}

#[derive(Default)]
struct StubState {
    guests: Vec<Value>,
    nodes: Vec<Value>,
    // (node, kind, vmid) -> payload
    configs: HashMap<(String, String, u32), Value>,
    statuses: HashMap<(String, String, u32), Value>,
    failure: Option<Failure>,
    // préfixe de chemin -> panne (prioritaire sur `failure`)
    route_failures: Vec<(String, Failure)>,
    delay: Option<Duration>,
    requests: Vec<RecordedRequest>,
}

pub struct UpstreamStub {
    addr: SocketAddr,
    state: Shared<StubState>,
    handle: JoinHandle<()>,
}

impl UpstreamStub {
    pub async fn start() -> anyhow::Result<Self> {
        let state: Shared<StubState> = Arc::new(Mutex::new(StubState::default()));
        let app = Router::new().fallback(handle).with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                log::error!("[stub] server stopped: {e}");
            }
        });
        log::info!("🧪 [STUB] Proxmox upstream on http://{addr}/api2/json");

        Ok(Self { addr, state, handle })
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/api2/json", self.addr)
    }

    pub fn set_guests(&self, guests: Vec<Value>) {
        self.state.lock().guests = guests;
    }

    pub fn set_nodes(&self, nodes: Vec<Value>) {
        self.state.lock().nodes = nodes;
    }

    pub fn set_guest_config(&self, node: &str, kind: &str, vmid: u32, config: Value) {
        self.state.lock().configs.insert((node.into(), kind.into(), vmid), config);
    }

    pub fn set_guest_status(&self, node: &str, kind: &str, vmid: u32, status: Value) {
        self.state.lock().statuses.insert((node.into(), kind.into(), vmid), status);
    }

    pub fn fail_with(&self, failure: Failure) {
        self.state.lock().failure = Some(failure);
    }

    /// Panne limitée aux chemins commençant par `prefix` (relatif à /api2/json)
    pub fn fail_route(&self, prefix: &str, failure: Failure) {
        self.state.lock().route_failures.push((prefix.to_string(), failure));
    }

    pub fn clear_failures(&self) {
        let mut state = self.state.lock();
        state.failure = None;
        state.route_failures.clear();
    }

    pub fn set_delay(&self, delay: Duration) {
        self.state.lock().delay = Some(delay);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().requests.clone()
    }

    /// Nombre de requêtes reçues dont le chemin commence par `prefix`
    pub fn request_count(&self, prefix: &str) -> usize {
        self.state.lock().requests.iter().filter(|r| r.path.starts_with(prefix)).count()
    }
}

impl Drop for UpstreamStub {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle(State(state): State<Shared<StubState>>, uri: Uri, headers: HeaderMap) -> Response {
    let path = uri.path().strip_prefix("/api2/json").unwrap_or(uri.path()).to_string();

    let (delay, failure, payload) = {
        let mut st = state.lock();
        st.requests.push(RecordedRequest {
            path: path.clone(),
            query: uri.query().map(str::to_string),
            authorization: headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        });
        let failure = st
            .route_failures
            .iter()
            .find(|(prefix, _)| path.starts_with(prefix.as_str()))
            .map(|(_, f)| f.clone())
            .or_else(|| st.failure.clone());
        (st.delay, failure, lookup(&st, &path))
    };

    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    match (failure, payload) {
        (Some(Failure::Status(code)), _) => respond(
            StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            json!({ "data": null }).to_string(),
        ),
        (Some(Failure::MalformedBody), _) => respond(StatusCode::OK, "<html>not json</html>".into()),
        (None, Some(data)) => respond(StatusCode::OK, json!({ "data": data }).to_string()),
        (None, None) => respond(StatusCode::NOT_FOUND, json!({ "data": null }).to_string()),
    }
}

fn lookup(st: &StubState, path: &str) -> Option<Value> {
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    match segments.as_slice() {
        ["cluster", "resources"] => Some(Value::Array(st.guests.clone())),
        ["nodes"] => Some(Value::Array(st.nodes.clone())),
        ["version"] => Some(json!({ "version": "8.2.4", "release": "8.2", "repoid": "stub" })),
        ["nodes", node, kind, vmid, "config"] => {
            let key = (node.to_string(), kind.to_string(), vmid.parse().ok()?);
            st.configs.get(&key).cloned()
        }
        ["nodes", node, kind, vmid, "status", "current"] => {
            let key = (node.to_string(), kind.to_string(), vmid.parse().ok()?);
            st.statuses.get(&key).cloned()
        }
        _ => None,
    }
}

fn respond(status: StatusCode, body: String) -> Response {
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap_or_else(|_| Response::new(Body::empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{mixed_guests, GuestFixture};

    #[tokio::test]
    async fn test_serves_fixtures_and_records() {
        let stub = UpstreamStub::start().await.unwrap();
        stub.set_guests(mixed_guests());

        let body: Value = reqwest::Client::new()
            .get(format!("{}/cluster/resources?type=vm", stub.base_url()))
            .header("Authorization", "PVEAPIToken=t")
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body["data"].as_array().unwrap().len(), 6);
        let requests = stub.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path, "/cluster/resources");
        assert_eq!(requests[0].query.as_deref(), Some("type=vm"));
        assert_eq!(requests[0].authorization.as_deref(), Some("PVEAPIToken=t"));
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let stub = UpstreamStub::start().await.unwrap();
        stub.set_guests(vec![GuestFixture::qemu(1, "a", "n").build()]);
        stub.fail_with(Failure::Status(503));

        let resp = reqwest::get(format!("{}/cluster/resources", stub.base_url())).await.unwrap();
        assert_eq!(resp.status().as_u16(), 503);

        stub.clear_failures();
        stub.fail_route("/nodes", Failure::MalformedBody);
        let resp = reqwest::get(format!("{}/cluster/resources", stub.base_url())).await.unwrap();
        assert_eq!(resp.status().as_u16(), 200);
        let text = reqwest::get(format!("{}/nodes", stub.base_url())).await.unwrap().text().await.unwrap();
        assert!(serde_json::from_str::<Value>(&text).is_err());
    }

    #[tokio::test]
    async fn test_unknown_guest_is_404() {
        let stub = UpstreamStub::start().await.unwrap();
        stub.set_guest_config("host1", "qemu", 100, json!({ "cores": 2 }));

        let ok = reqwest::get(format!("{}/nodes/host1/qemu/100/config", stub.base_url())).await.unwrap();
        assert_eq!(ok.status().as_u16(), 200);
        let missing = reqwest::get(format!("{}/nodes/host1/lxc/100/config", stub.base_url())).await.unwrap();
        assert_eq!(missing.status().as_u16(), 404);
        assert_eq!(stub.request_count("/nodes/host1"), 2);
    }
}
