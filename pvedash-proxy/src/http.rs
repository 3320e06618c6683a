/**
 * API REST PVEDASH - Surface HTTP du proxy
 *
 * RÔLE :
 * Expose les VMs, noeuds et labels du cluster au dashboard, en JSON.
 *
 * FONCTIONNEMENT :
 * - Serveur Axum, routes montées à la racine ET sous /api
 * - Réponses `{success, count, data}` ; erreurs `{success: false, error}`
 * - Middleware de log par requête (id uuid + statut + latence)
 * - CORS limité à une origine configurée
 *
 * SÉCURITÉ :
 * - Si PVEDASH_API_KEY est défini, header x-api-key obligatoire sauf /health
 */

use crate::config::{ConfigError, ProxyConfig};
use crate::error::ProxyError;
use crate::filter::{VmFilter, VmQuery};
use crate::health::{HealthTracker, ProxyHealth};
use crate::models::{GuestDetail, GuestKind, Host, VirtualMachine};
use crate::service::ClusterService;
use crate::upstream::UpstreamClient;
use axum::extract::{Path, Query, Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub service: ClusterService,
    pub health: HealthTracker,
    pub api_key: Option<String>,
}

impl AppState {
    pub fn from_config(cfg: &ProxyConfig) -> Result<Self, ConfigError> {
        let upstream = UpstreamClient::new(&cfg.upstream)?;
        Ok(Self {
            service: ClusterService::new(upstream),
            health: HealthTracker::new(),
            api_key: cfg.api_key.clone(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub success: bool,
    pub count: usize,
    pub data: Vec<T>,
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(data: Vec<T>) -> Self {
        Self { success: true, count: data.len(), data }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DetailResponse {
    pub success: bool,
    pub data: GuestDetail,
}

#[derive(Debug, Deserialize)]
struct DetailParams {
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Router complet à partir de la config (utilisé par main et les tests).
pub fn app(cfg: &ProxyConfig) -> Result<Router, ConfigError> {
    let state = AppState::from_config(cfg)?;
    Ok(build_router(state, cors_layer(&cfg.cors_origin)?))
}

pub fn cors_layer(origin: &str) -> Result<CorsLayer, ConfigError> {
    let origin = HeaderValue::from_str(origin)
        .map_err(|_| ConfigError::Invalid { key: "CORS_ORIGIN", value: origin.to_string() })?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::HeaderName::from_static("x-api-key")])
        .allow_credentials(true))
}

pub fn build_router(app_state: AppState, cors: CorsLayer) -> Router {
    let api = Router::new()
        .route("/health", get(get_health))
        .route("/health/upstream", get(get_upstream_health))
        .route("/vms", get(list_vms))
        .route("/vms/{node}/{vmid}", get(get_vm))
        .route("/nodes", get(list_nodes))
        .route("/tags", get(list_tags));

    Router::new()
        .merge(api.clone())
        .nest("/api", api)
        // routes connues seulement : un chemin inconnu reste un 404
        .route_layer(middleware::from_fn_with_state(app_state.clone(), require_api_key))
        .layer(middleware::from_fn(log_requests))
        .layer(cors)
        .with_state(app_state)
}

async fn require_api_key(State(app): State<AppState>, req: Request, next: Next) -> Result<Response, StatusCode> {
    let Some(expected) = app.api_key.as_deref() else {
        return Ok(next.run(req).await);
    };

    // Health check toujours accessible
    let path = req.uri().path();
    if path.starts_with("/health") || path.starts_with("/api/health") {
        return Ok(next.run(req).await);
    }

    let ok = req
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == expected)
        .unwrap_or(false);

    if !ok {
        warn!("[http] unauthorized request on {}", path);
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(next.run(req).await)
}

async fn log_requests(req: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    info!("[http] {request_id} {method} {path}");
    let response = next.run(req).await;
    info!(
        "[http] {request_id} {} in {}ms",
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}

// GET /health
async fn get_health(State(app): State<AppState>) -> Json<ProxyHealth> {
    Json(app.health.get_health())
}

// GET /health/upstream (diagnostic, toujours 200)
async fn get_upstream_health(State(app): State<AppState>) -> Json<serde_json::Value> {
    match app.service.probe_upstream().await {
        Ok(v) => Json(serde_json::json!({ "success": true, "version": v.version, "release": v.release })),
        Err(e) => Json(serde_json::json!({ "success": false, "error": e.to_string() })),
    }
}

// GET /vms?node=&status=&tags=a,b
async fn list_vms(
    State(app): State<AppState>,
    Query(query): Query<VmQuery>,
) -> Result<Json<ListResponse<VirtualMachine>>, ProxyError> {
    let filter = VmFilter::from(query);
    let vms = app.service.list_virtual_machines(&filter).await?;
    Ok(Json(vms.into()))
}

// GET /vms/{node}/{vmid}?type=qemu|lxc
async fn get_vm(
    State(app): State<AppState>,
    Path((node, vmid)): Path<(String, String)>,
    Query(params): Query<DetailParams>,
) -> Result<Json<DetailResponse>, ProxyError> {
    if !is_valid_node_name(&node) {
        return Err(ProxyError::BadRequest(format!("invalid node name: {node}")));
    }
    let vmid: u32 = vmid
        .parse()
        .map_err(|_| ProxyError::BadRequest(format!("invalid vmid: {vmid}")))?;
    let raw_kind = params.kind.as_deref().unwrap_or("qemu");
    let kind = GuestKind::parse(raw_kind)
        .ok_or_else(|| ProxyError::BadRequest(format!("invalid type: {raw_kind} (expected qemu or lxc)")))?;

    let data = app.service.get_guest_detail(&node, vmid, kind).await?;
    Ok(Json(DetailResponse { success: true, data }))
}

// GET /nodes
async fn list_nodes(State(app): State<AppState>) -> Result<Json<ListResponse<Host>>, ProxyError> {
    Ok(Json(app.service.list_hosts().await?.into()))
}

// GET /tags
async fn list_tags(State(app): State<AppState>) -> Result<Json<ListResponse<String>>, ProxyError> {
    Ok(Json(app.service.list_distinct_labels().await?.into()))
}

/// Noms de noeud Proxmox : alphanumérique, `-` et `.`
fn is_valid_node_name(node: &str) -> bool {
    !node.is_empty()
        && !node.starts_with('.')
        && node.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}
