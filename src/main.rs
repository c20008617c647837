mod config;
mod handlers;
mod middleware;
mod models;
mod routes;
mod services;
mod utils;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use config::{AppState, BucketPolicy, Config};
use dotenvy::dotenv;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use crate::middleware::rate_limiter::{spawn_purge_task, RateLimiter};
use crate::services::s3_service::S3Service;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = Config::init().context("failed to load configuration")?;
    tracing::info!("Starting presign service with {:?}", cfg);

    // 1. Storage signer, built once and shared by every request
    let s3_service = S3Service::new(&cfg).await;
    tracing::info!("S3 signer ready for {}", cfg.s3_endpoint_url());

    // 2. Request guards
    let rate_limiter = Arc::new(
        RateLimiter::new(
            cfg.rate_limit_max_requests,
            Duration::from_secs(cfg.rate_limit_window_secs),
        )
        .with_max_clients(cfg.rate_limit_max_clients)
        .trust_forwarded_for(cfg.trust_forwarded_for),
    );
    spawn_purge_task(rate_limiter.clone());

    if cfg.allowed_buckets.is_empty() {
        tracing::warn!("PRESIGN_ALLOWED_BUCKETS is empty; any bucket may be signed");
    }

    let state = AppState {
        presigner: Arc::new(s3_service),
        bucket_policy: Arc::new(BucketPolicy::new(cfg.allowed_buckets.clone())),
        rate_limiter,
    };

    // 3. Router
    let app = routes::create_routes(state.clone()).with_state(state);

    // 4. Serve
    let addr: SocketAddr = format!("{}:{}", cfg.server_host, cfg.server_port)
        .parse()
        .context("invalid HOST/PORT")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    // peer addresses feed the rate limiter
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutting down...");
}
