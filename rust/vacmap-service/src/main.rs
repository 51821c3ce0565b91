use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{fmt, EnvFilter};
use vacmap_core::MapCache;
use vacmap_service::{build_router, AppState, Config};

fn init_tracing(cfg: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));
    if cfg.log_json {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Config::from_env()?;
    init_tracing(&cfg);

    let cache_cfg = cfg.cache.clone();
    let cache = tokio::task::spawn_blocking(move || MapCache::new(cache_cfg))
        .await
        .context("cache init task failed")?
        .context("opening map directories")?;
    let app = build_router(AppState { cache: Arc::new(cache) });

    let addr = cfg.addr();
    tracing::info!(core_version = %vacmap_core::version(), addr = %addr, "starting vacmap-service");
    let listener = tokio::net::TcpListener::bind(&addr).await.with_context(|| format!("bind {addr}"))?;
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
