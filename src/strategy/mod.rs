//! # strategy
//!
//! Scoring strategies and the registry that resolves them by name.
//!
//! A [`Strategy`] turns a candle history into an [`Evaluation`]. Two scales
//! exist side by side:
//!
//! - [`Scale::Unit`]: the composite breakout scorer, weighted sum in `[0, 1]`
//! - [`Scale::Points`]: the six-stage scorers, `0 ..= 100`
//!
//! [`Evaluation::normalized_score`] folds both onto `[0, 1]` for `/score`.

pub mod breakout;
pub mod composite;
pub mod mean_reversion;
pub mod trend;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::indicators;
use crate::models::{Candle, Parameters};

pub use breakout::BreakoutScorer;
pub use composite::CompositeScorer;
pub use mean_reversion::MeanReversionScorer;
pub use trend::TrendScorer;

/// Smallest history any scorer accepts.
pub const MIN_CANDLES: usize = 20;

// ─── Signal ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl Signal {
    /// Thresholds of the six-stage scorers: ≥ 80 buy, ≥ 60 hold, else sell.
    pub fn from_points(total: f64) -> Self {
        if total >= 80.0 {
            Signal::Buy
        } else if total >= 60.0 {
            Signal::Hold
        } else {
            Signal::Sell
        }
    }
}

// ─── Evaluation ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    /// `[0, 1]`
    Unit,
    /// `0 ..= 100`
    Points,
}

#[derive(Debug, Clone)]
pub struct Evaluation {
    pub total_score: f64,
    pub scale:       Scale,
    pub signal:      Signal,
    pub confidence:  f64,
    pub sub_scores:  BTreeMap<String, f64>,
    pub indicators:  BTreeMap<String, f64>,
    pub reasoning:   String,
}

impl Evaluation {
    /// Builds a six-stage evaluation from its stage points.
    pub fn from_stages(label: &str, stages: &[Stage], indicators: BTreeMap<String, f64>) -> Self {
        let total: f64 = stages.iter().map(|s| s.points).sum();
        let highlights: Vec<&str> = stages
            .iter()
            .filter(|s| s.points >= s.highlight_at)
            .map(|s| s.highlight)
            .collect();
        let summary = if highlights.is_empty() {
            "needs improvement overall".to_string()
        } else {
            highlights.join(", ")
        };

        Self {
            total_score: total,
            scale:       Scale::Points,
            signal:      Signal::from_points(total),
            confidence:  (total / 100.0).min(1.0),
            sub_scores:  stages
                .iter()
                .map(|s| (format!("{}_score", s.name), s.points))
                .collect(),
            indicators,
            reasoning:   format!("{label} score {total:.1} - {summary}"),
        }
    }

    /// Score on `[0, 1]`, whatever the native scale.
    pub fn normalized_score(&self) -> f64 {
        match self.scale {
            Scale::Unit   => self.total_score,
            Scale::Points => self.total_score / 100.0,
        }
    }
}

// ─── Six-stage scoring ────────────────────────────────────────────────────────

/// One stage of a six-stage scorer.
#[derive(Debug, Clone, Copy)]
pub struct Stage {
    pub name:         &'static str,
    pub points:       f64,
    /// Reasoning mentions `highlight` once `points` reaches this.
    pub highlight_at: f64,
    pub highlight:    &'static str,
}

impl Stage {
    pub fn new(name: &'static str, points: f64, highlight_at: f64, highlight: &'static str) -> Self {
        Self { name, points, highlight_at, highlight }
    }
}

/// Stages that need fills and a live position to judge (entry, exit,
/// follow-up). Scored at their baseline until execution data is wired in.
pub(crate) fn baseline_stages() -> [Stage; 3] {
    [
        Stage::new("entry",    15.0, 15.0, "entry timing adequate"),
        Stage::new("exit",      7.0, 10.0, "exit plan in place"),
        Stage::new("followup",  4.0,  5.0, "follow-up plan in place"),
    ]
}

/// Risk stage: stop distance (`stop_multiple` × ATR) against the ideal band
/// for the style, plus baseline account-risk (3) and stop-placement (2) points.
pub(crate) fn risk_stage(stop_multiple: f64, ideal: (f64, f64), fair: (f64, f64)) -> Stage {
    let stop = if (ideal.0..=ideal.1).contains(&stop_multiple) {
        7.0
    } else if (fair.0..=fair.1).contains(&stop_multiple) {
        4.0
    } else {
        1.0
    };
    Stage::new("risk", stop + 3.0 + 2.0, 10.0, "risk management adequate")
}

/// Last volume over its 20-bar average (1.0 when undefined).
pub(crate) fn volume_ratio(candles: &[Candle]) -> f64 {
    let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();
    match (indicators::sma(&volumes, 20), volumes.last()) {
        (Some(avg), Some(last)) if avg > 0.0 => last / avg,
        _ => 1.0,
    }
}

/// `max(0, min(n, 30) − 20) / 10 · 7`: rewards 20–30 bars of structure.
pub(crate) fn history_length_points(bars: usize) -> f64 {
    (bars.min(30) as f64 - 20.0).max(0.0) / 10.0 * 7.0
}

// ─── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("at least {required} candles are required, got {actual}")]
    InsufficientCandles { required: usize, actual: usize },

    #[error("unknown strategy '{0}'")]
    UnknownStrategy(String),
}

// ─── Strategy trait ───────────────────────────────────────────────────────────

pub trait Strategy: Send + Sync {
    /// Canonical name reported in responses.
    fn name(&self) -> &'static str;

    fn min_candles(&self) -> usize {
        MIN_CANDLES
    }

    /// Scores `candles` (already sorted oldest → newest, length checked).
    fn score(&self, candles: &[Candle], params: &Parameters) -> Evaluation;

    /// Sorts, checks the history length and scores.
    fn evaluate(&self, candles: &[Candle], params: &Parameters) -> Result<Evaluation, StrategyError> {
        let required = self.min_candles();
        if candles.len() < required {
            return Err(StrategyError::InsufficientCandles { required, actual: candles.len() });
        }
        let mut sorted = candles.to_vec();
        sorted.sort_by_key(|c| c.timestamp);
        Ok(self.score(&sorted, params))
    }
}

// ─── Registry ─────────────────────────────────────────────────────────────────

/// Case-insensitive name → strategy lookup.
pub struct StrategyRegistry {
    entries: Vec<(Vec<String>, Arc<dyn Strategy>)>,
}

impl StrategyRegistry {
    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn register(&mut self, aliases: &[&str], strategy: Arc<dyn Strategy>) {
        let aliases = aliases.iter().map(|a| a.to_ascii_lowercase()).collect();
        self.entries.push((aliases, strategy));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Strategy>> {
        let wanted = name.trim().to_ascii_lowercase();
        self.entries
            .iter()
            .find(|(aliases, _)| aliases.iter().any(|a| *a == wanted))
            .map(|(_, s)| Arc::clone(s))
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Strategy>, StrategyError> {
        self.get(name)
            .ok_or_else(|| StrategyError::UnknownStrategy(name.to_string()))
    }

    /// The composite scorer, used when a caller names no strategy.
    pub fn composite(&self) -> Arc<dyn Strategy> {
        self.get(CompositeScorer::NAME)
            .unwrap_or_else(|| Arc::new(CompositeScorer))
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(&[CompositeScorer::NAME, "composite"], Arc::new(CompositeScorer));
        registry.register(&["breakout", "BreakoutZones"], Arc::new(BreakoutScorer));
        registry.register(&[TrendScorer::NAME, "trend"], Arc::new(TrendScorer));
        registry.register(
            &[MeanReversionScorer::NAME, "mean_reversion"],
            Arc::new(MeanReversionScorer),
        );
        registry
    }
}

/// Rounds to `places` decimals.
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Inserts `value` only when it is finite.
pub(crate) fn put_finite(map: &mut BTreeMap<String, f64>, key: &str, value: Option<f64>) {
    if let Some(v) = value.filter(|v| v.is_finite()) {
        map.insert(key.to_string(), v);
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use crate::models::{Candle, Timeframe};

    /// `count` 5-minute candles, close = `f(i)`, ±0.5% wicks.
    pub fn series(count: usize, f: impl Fn(usize) -> f64) -> Vec<Candle> {
        (0..count)
            .map(|i| {
                let close = f(i);
                Candle {
                    timestamp: 1_700_000_000_000 + i as i64 * 300_000,
                    open:      close,
                    high:      close * 1.005,
                    low:       close * 0.995,
                    close,
                    volume:    1000.0 + 10.0 * i as f64,
                    symbol:    "BTC/USDT".into(),
                    timeframe: Timeframe::FiveMinutes,
                }
            })
            .collect()
    }
}
