//! # Scoring Gateway — HTTP scoring service for trading signals
//!
//! ## Architecture Overview
//!
//! ```text
//!  ┌──────────────┐   POST /score                 ┌──────────────────────┐
//!  │  Client /    │ ─────────────────────────────▶│                      │
//!  │  Dashboard   │   POST /api/v1/trade/*        │   Strategy Registry  │
//!  └──────────────┘                               │   composite ·        │
//!                                                 │   breakout · trend · │
//!  ┌──────────────┐   trade.raw                   │   mean_reversion     │
//!  │  Trading bot │ ─────────────▶ [Consumer] ───▶│                      │
//!  └──────────────┘                    │          └──────────────────────┘
//!                                      │                     ▲
//!                      trade.score ◀───┘          candles    │
//!                                                 ┌──────────┴───────────┐
//!                                                 │ Market (API / synth) │
//!                                                 └──────────────────────┘
//! ```
//!
//! ## Environment Variables
//!
//! See [`config`] for the full table. `RUST_LOG` overrides the tracing
//! filter (default `scoring_gateway=debug,tower_http=info`).

use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod app;
mod bus;
mod config;
mod consumer;
mod error;
mod extract;
mod indicators;
mod market;
mod models;
mod routes;
mod state;
mod strategy;

use config::GatewayConfig;
use state::build_state;

// ─── Entry Point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Load .env (optional — CI/prod can use real env vars) ──────────────
    dotenvy::dotenv().ok();

    // ── 2. Initialise structured logging ─────────────────────────────────────
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env()
            .add_directive("scoring_gateway=debug".parse()?)
            .add_directive("tower_http=info".parse()?))
        .init();

    info!(
        r#"

  ╔═══════════════════════════════════════════════╗
  ║        SCORING GATEWAY — Trading Signals      ║
  ║        Rust + Axum  ·  Score & Consume        ║
  ╚═══════════════════════════════════════════════╝"#
    );

    // ── 3. Config + shared state ─────────────────────────────────────────────
    let config = GatewayConfig::from_env()?;
    let addr = config.bind_addr;
    let state = build_state(config);

    info!(
        market = state.config.market_url.as_deref().unwrap_or("synthetic"),
        bus = state.bus.broker(),
        kafka_broker = %state.config.kafka_broker,
        "Configuration loaded"
    );

    // ── 4. Message bus (the gateway still serves HTTP if it is down) ─────────
    if let Err(e) = state.bus.start().await {
        error!(error = %e, "Message bus failed to start — consumer will idle");
    }

    // ── 5. Trade consumer ────────────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let consumer = tokio::spawn(consumer::run_trade_consumer(state.clone(), shutdown_rx));

    // ── 6. Serve until Ctrl-C / SIGTERM ──────────────────────────────────────
    let app = app::build_router(state.clone());
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(?addr, "🚀 Scoring gateway starting");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // ── 7. Drain background work ─────────────────────────────────────────────
    let _ = shutdown_tx.send(true);
    if let Err(e) = consumer.await {
        error!(error = %e, "Trade consumer task failed");
    }
    state.bus.stop().await;

    info!("👋 Scoring gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
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
    info!("Shutdown signal received");
}
