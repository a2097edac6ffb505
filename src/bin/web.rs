use std::sync::Arc;

use anyhow::{Context, Result};
use sports_tracker::web::{create_router, AppState};
use sports_tracker::Tracker;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt::init();

    let tracker = Tracker::from_env().context("Invalid tracker configuration")?;
    let registry = tracker.registry.clone();
    let app = create_router(AppState::new(Arc::clone(&tracker.scheduler)));

    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("web server listening on http://{}", addr);
    println!("Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
            info!("shutting down, cancelling monitors");
            registry.shutdown().await;
        })
        .await
        .context("Server error")?;

    Ok(())
}
