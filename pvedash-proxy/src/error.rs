//! Erreurs du proxy : taxonomie upstream + normalisation HTTP.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Ce qui peut mal tourner pendant un appel vers l'API du cluster.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("upstream unreachable: {0}")]
    Unreachable(String),
    #[error("upstream timed out after {0}s")]
    Timeout(u64),
    #[error("HTTP {code}: {reason}")]
    Status { code: u16, reason: String },
    #[error("malformed upstream body: {0}")]
    Malformed(String),
}

/// Erreur visible par les clients du proxy.
/// Toute panne upstream devient `Upstream`, avec le contexte de l'opération.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("{context}: {source}")]
    Upstream {
        context: &'static str,
        #[source]
        source: UpstreamError,
    },
    #[error("{0}")]
    BadRequest(String),
}

impl ProxyError {
    pub fn upstream(context: &'static str) -> impl FnOnce(UpstreamError) -> ProxyError {
        move |source| ProxyError::Upstream { context, source }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            ProxyError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let code = self.status_code();
        if code.is_server_error() {
            tracing::error!("[proxy] {}", self);
        }
        let body = serde_json::json!({ "success": false, "error": self.to_string() });
        (code, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_carries_upstream_status() {
        let err = ProxyError::upstream("Failed to fetch VMs")(UpstreamError::Status {
            code: 401,
            reason: "Unauthorized".into(),
        });
        assert_eq!(err.to_string(), "Failed to fetch VMs: HTTP 401: Unauthorized");
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_bad_request_status() {
        let err = ProxyError::BadRequest("invalid vmid: abc".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "invalid vmid: abc");
    }
}
