//! # routes::trade
//!
//! Score a trade signal from the bot against recent market candles.
//!
//! | Method | Path                           | Scorer                      |
//! |--------|--------------------------------|-----------------------------|
//! | POST   | `/api/v1/trade/score`          | composite (reported in %)   |
//! | POST   | `/api/v1/trade/breakout`       | six-stage breakout          |
//! | POST   | `/api/v1/trade/trend`          | six-stage trend following   |
//! | POST   | `/api/v1/trade/mean_reversion` | six-stage mean reversion    |
//!
//! The signal itself carries no candles; they come from [`crate::market`].
//! `metadata` is passed to the scorer as its parameters.

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use tracing::info;

use crate::error::AppError;
use crate::extract::ValidJson;
use crate::models::trade::TradeScoreResponse;
use crate::models::TradeRequest;
use crate::state::SharedState;
use crate::strategy::{BreakoutScorer, Evaluation, MeanReversionScorer, Strategy, TrendScorer};

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/api/v1/trade/score",          post(trade_score))
        .route("/api/v1/trade/breakout",       post(trade_breakout))
        .route("/api/v1/trade/trend",          post(trade_trend))
        .route("/api/v1/trade/mean_reversion", post(trade_mean_reversion))
}

type Report = fn(TradeRequest, &str, Evaluation) -> TradeScoreResponse;

async fn score_trade(
    state: &SharedState,
    trade: TradeRequest,
    strategy: Arc<dyn Strategy>,
    report: Report,
) -> Result<Json<TradeScoreResponse>, AppError> {
    let candles = state.market.candles_for_trade(&trade.pair, trade.price).await?;
    let eval = strategy.evaluate(&candles, &trade.metadata)?;
    state.record_score();

    let response = report(trade, strategy.name(), eval);
    info!(
        pair     = %response.symbol,
        strategy = %response.strategy,
        score    = response.total_score,
        signal   = ?response.signal,
        "📈 Trade scored"
    );
    Ok(Json(response))
}

/// POST /api/v1/trade/score
async fn trade_score(
    State(state): State<SharedState>,
    ValidJson(trade): ValidJson<TradeRequest>,
) -> Result<Json<TradeScoreResponse>, AppError> {
    let strategy = state.strategies.composite();
    score_trade(&state, trade, strategy, TradeScoreResponse::percent).await
}

/// POST /api/v1/trade/breakout
async fn trade_breakout(
    State(state): State<SharedState>,
    ValidJson(trade): ValidJson<TradeRequest>,
) -> Result<Json<TradeScoreResponse>, AppError> {
    let strategy = state.strategies.resolve(BreakoutScorer::NAME)?;
    score_trade(&state, trade, strategy, TradeScoreResponse::native).await
}

/// POST /api/v1/trade/trend
async fn trade_trend(
    State(state): State<SharedState>,
    ValidJson(trade): ValidJson<TradeRequest>,
) -> Result<Json<TradeScoreResponse>, AppError> {
    let strategy = state.strategies.resolve(TrendScorer::NAME)?;
    score_trade(&state, trade, strategy, TradeScoreResponse::native).await
}

/// POST /api/v1/trade/mean_reversion
async fn trade_mean_reversion(
    State(state): State<SharedState>,
    ValidJson(trade): ValidJson<TradeRequest>,
) -> Result<Json<TradeScoreResponse>, AppError> {
    let strategy = state.strategies.resolve(MeanReversionScorer::NAME)?;
    score_trade(&state, trade, strategy, TradeScoreResponse::native).await
}
