//! # strategy::mean_reversion
//!
//! Six-stage mean-reversion scorer (0–100). Rewards a stretched market:
//! price far from its EMA20 in ATR terms, oscillators at extremes and
//! volume drying up.

use std::collections::BTreeMap;

use crate::indicators;
use crate::models::{Candle, Parameters};
use crate::strategy::{
    baseline_stages, put_finite, risk_stage, volume_ratio, Evaluation, Stage, Strategy,
};

/// A bar is "extreme" when its close sits more than this far from EMA20.
const EXTREME_BAR_DISTANCE: f64 = 0.02;

/// Reversal pattern (6), divergence (4) and band re-entry (2) baselines.
const TRIGGER_BASELINE: f64 = 6.0 + 4.0 + 2.0;

pub struct MeanReversionScorer;

impl MeanReversionScorer {
    pub const NAME: &'static str = "MeanReversionStrategy";
}

impl Strategy for MeanReversionScorer {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn score(&self, candles: &[Candle], _params: &Parameters) -> Evaluation {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let ema20 = indicators::ema_series(&closes, 20);
        let atr = indicators::atr(candles, 14).unwrap_or(0.0);
        let rsi = indicators::rsi(&closes, 14);
        let cci = indicators::cci(candles, 14);

        let distance = match (closes.last(), ema20.last()) {
            (Some(c), Some(e)) if atr > 0.0 => (c - e).abs() / atr,
            _ => 0.0,
        };

        let [entry, exit, followup] = baseline_stages();
        let stages = [
            Stage::new(
                "overheat",
                overheat_points(distance, rsi, cci, &closes, &ema20),
                10.0,
                "overextension identified",
            ),
            Stage::new("trigger", trigger_points(candles), 20.0, "reversal trigger confirmed"),
            entry,
            risk_stage(0.75, (0.5, 1.0), (1.0, 1.5)),
            exit,
            followup,
        ];

        let mut ind = BTreeMap::new();
        put_finite(&mut ind, "close", closes.last().copied());
        put_finite(&mut ind, "ema_20", ema20.last().copied());
        put_finite(&mut ind, "atr_distance", Some(distance));
        put_finite(&mut ind, "rsi", rsi);
        put_finite(&mut ind, "cci", cci);

        Evaluation::from_stages("Mean reversion", &stages, ind)
    }
}

// ─── Overheat (15) ────────────────────────────────────────────────────────────

fn overheat_points(
    distance: f64,
    rsi: Option<f64>,
    cci: Option<f64>,
    closes: &[f64],
    ema20: &[f64],
) -> f64 {
    let stretch = if distance >= 3.0 {
        7.0
    } else if distance >= 2.0 {
        5.0
    } else if distance >= 1.5 {
        3.0
    } else {
        0.0
    };

    let rsi = rsi.unwrap_or(50.0);
    let cci = cci.unwrap_or(0.0);
    let extremes = [rsi > 70.0 || rsi < 30.0, cci > 100.0 || cci < -100.0]
        .iter()
        .filter(|hit| **hit)
        .count();
    let oscillators = match extremes {
        2 => 4.0,
        1 => 2.0,
        _ => 0.0,
    };

    let bars = extreme_run(closes, ema20).min(3) as f64 / 3.0 * 4.0;

    stretch + oscillators + bars
}

/// Run length of extreme bars, starting at the oldest of the last five.
fn extreme_run(closes: &[f64], ema20: &[f64]) -> usize {
    let start = closes.len().saturating_sub(5);
    closes[start..]
        .iter()
        .zip(&ema20[start..])
        .take_while(|(c, e)| (*c - *e).abs() > *c * EXTREME_BAR_DISTANCE)
        .count()
}

// ─── Trigger (25) ─────────────────────────────────────────────────────────────

fn trigger_points(candles: &[Candle]) -> f64 {
    let exhaustion = match volume_ratio(candles) {
        r if r <= 0.7 => 4.0,
        r if r <= 0.9 => 2.0,
        _ => 0.0,
    };
    TRIGGER_BASELINE + exhaustion
}
