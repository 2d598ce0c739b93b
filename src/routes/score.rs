//! # routes::score
//!
//! `POST /score` — score a caller-supplied candle history with a named
//! strategy.
//!
//! Schema problems (missing fields, bad candles, unsorted history) → 422.
//! Domain problems (unknown strategy, too few candles) → 400.

use axum::{extract::State, routing::post, Json, Router};
use tracing::info;

use crate::error::AppError;
use crate::extract::ValidJson;
use crate::models::{ScoreRequest, ScoreResponse};
use crate::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new().route("/score", post(score))
}

async fn score(
    State(state): State<SharedState>,
    ValidJson(request): ValidJson<ScoreRequest>,
) -> Result<Json<ScoreResponse>, AppError> {
    let strategy = state.strategies.resolve(&request.strategy_name)?;
    let params = request.parameters.clone().unwrap_or_default();
    let eval = strategy.evaluate(&request.candles, &params)?;
    state.record_score();

    let response = ScoreResponse::from_evaluation(&request, strategy.name(), eval);
    info!(
        symbol   = %response.symbol,
        strategy = %response.strategy,
        candles  = request.candles.len(),
        score    = response.score,
        "🎯 Score computed"
    );
    Ok(Json(response))
}
