use pvedash_devkit::UpstreamStub;
use pvedash_proxy::config::{ProxyConfig, UpstreamConf};
use pvedash_proxy::http;
use std::net::SocketAddr;
use tokio::net::TcpListener;

pub const TOKEN: &str = "root@pam!dash=00000000-test";

pub fn config_for(stub: &UpstreamStub) -> ProxyConfig {
    ProxyConfig {
        upstream: UpstreamConf {
            scheme: "http".into(),
            host: stub.host(),
            port: stub.port(),
            token: TOKEN.into(),
            insecure_tls: false,
            timeout_secs: 2,
        },
        ..ProxyConfig::default()
    }
}

/// Lance le vrai router du proxy sur un port éphémère.
pub async fn spawn_proxy(cfg: &ProxyConfig) -> SocketAddr {
    let app = http::app(cfg).expect("router");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    addr
}
