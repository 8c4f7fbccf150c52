use anyhow::Context;
use axum::serve;
use tokio::net::TcpListener;
use tracing::info;

use school_enrollment::backend::{create_router, initialize_backend};
use school_enrollment::config::AppConfig;
use school_enrollment::logging::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load()?;
    let app_state = initialize_backend(&config)?;
    let router = create_router(app_state, &config);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("Records API listening on {}", config.bind_addr);
    serve(listener, router).await.context("Records API server error")?;
    Ok(())
}
