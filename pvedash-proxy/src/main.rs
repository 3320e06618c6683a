/**
 * PVEDASH PROXY - Point d'entrée du serveur
 *
 * RÔLE : Charge la config (.env, proxy.yaml, env), initialise les logs,
 * construit le router et sert l'API jusqu'à Ctrl-C.
 */

use anyhow::Context;
use pvedash_proxy::{config::load_config, http};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Charger les variables d'environnement depuis .env (si présent)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = load_config().await.context("invalid proxy configuration")?;
    info!("[proxy] upstream {}", cfg.upstream.base_url());

    let app = http::app(&cfg).context("cannot build HTTP router")?;

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.listen_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;
    info!("[proxy] listening on http://{addr} (CORS origin {})", cfg.cors_origin);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("[proxy] shutting down");
        })
        .await?;
    Ok(())
}
