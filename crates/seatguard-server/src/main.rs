//! seatguard license server
//!
//! - Config: `SEATGUARD_CONFIG` (default `seatguard.yaml`), strict parse + validate
//! - HTTP: verify, heartbeat, admin events, health checks, metrics
//! - Background sweeper on its own task
//! - Graceful shutdown on ctrl-c: readiness drains first, then the sweeper stops

use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use seatguard_server::{app_state::AppState, config, router, seats};

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "seatguard-server exited with error");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::var("SEATGUARD_CONFIG").unwrap_or_else(|_| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::load_from_file(&path)?;
    let listen = cfg.server.listen_addr()?;

    let (notifier, notices) = seats::ChannelNotifier::new(cfg.sessions.notice_queue);
    let drain = seats::spawn_notice_drain(notices);

    let state = AppState::new(cfg, Arc::new(notifier))?;
    let sweeper = state.spawn_sweeper();
    let app = router::build_router(state.clone());

    tracing::info!(%listen, config = %path, "seatguard-server starting");
    let listener = tokio::net::TcpListener::bind(listen).await?;

    let draining = state.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "ctrl-c handler failed, shutting down");
            }
            tracing::info!("shutdown requested, draining");
            draining.begin_drain();
        })
        .await?;

    sweeper.shutdown().await;
    // Last notifier handle goes with the state; the drain task then finishes.
    drop(state);
    if let Err(e) = drain.await {
        tracing::warn!(error = %e, "notice drain ended abnormally");
    }

    tracing::info!("seatguard-server stopped");
    Ok(())
}
