//! # routes::system
//!
//! | Method | Path             | Description                                |
//! |--------|------------------|--------------------------------------------|
//! | GET    | `/`              | Service banner                             |
//! | GET    | `/health`        | Liveness + message bus status              |
//! | GET    | `/api/v1/status` | Component status, counters, uptime         |
//! | GET    | `/test`          | Smoke-test endpoint                        |

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde_json::{json, Value};

use crate::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/",              get(root))
        .route("/health",        get(health))
        .route("/api/v1/status", get(status))
        .route("/test",          get(smoke_test))
}

/// GET /
async fn root() -> Json<Value> {
    Json(json!({
        "message":   "Trading signal scoring gateway",
        "status":    "running",
        "version":   env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now(),
    }))
}

fn bus_status(state: &SharedState) -> &'static str {
    if state.bus.is_connected() { "connected" } else { "disconnected" }
}

/// GET /health — always `healthy` while the process serves requests
async fn health(State(state): State<SharedState>) -> Json<Value> {
    Json(json!({
        "status":       "healthy",
        "kafka_broker": state.bus.broker(),
        "kafka_status": bus_status(&state),
        "timestamp":    Utc::now(),
    }))
}

/// GET /api/v1/status
async fn status(State(state): State<SharedState>) -> Json<Value> {
    Json(json!({
        "status": "success",
        "services": {
            "gateway": "running",
            "kafka":   bus_status(&state),
        },
        "scores_served": state.scores_served(),
        "uptime_secs":   state.uptime_secs(),
        "timestamp":     Utc::now(),
    }))
}

/// GET /test
async fn smoke_test() -> Json<Value> {
    Json(json!({
        "status":    "ok",
        "message":   "scoring gateway is working",
        "timestamp": Utc::now(),
    }))
}
