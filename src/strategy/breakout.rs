//! # strategy::breakout
//!
//! Six-stage breakout scorer (0–100).
//!
//! | Stage    | Max | Measured                                               |
//! |----------|-----|--------------------------------------------------------|
//! | zone     | 15  | history length, resistance retests, ATR contraction    |
//! | trigger  | 25  | close over prior high in ATRs, volume, band expansion  |
//! | entry    | 20  | baseline                                               |
//! | risk     | 15  | stop distance 1.5 × ATR                                |
//! | exit     | 15  | baseline                                               |
//! | followup | 10  | baseline                                               |

use std::collections::BTreeMap;

use crate::indicators;
use crate::models::{Candle, Parameters};
use crate::strategy::{
    baseline_stages, history_length_points, put_finite, risk_stage, volume_ratio, Evaluation,
    Stage, Strategy,
};

/// Bars between the "now" and "before" windows of the contraction checks.
const LOOKBACK_SHIFT: usize = 20;

pub struct BreakoutScorer;

impl BreakoutScorer {
    pub const NAME: &'static str = "breakout";
}

impl Strategy for BreakoutScorer {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn score(&self, candles: &[Candle], _params: &Parameters) -> Evaluation {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let atr = indicators::atr(candles, 14).unwrap_or(0.0);

        let [entry, exit, followup] = baseline_stages();
        let stages = [
            Stage::new("zone", zone_points(candles), 10.0, "zone well defined"),
            Stage::new("trigger", trigger_points(candles, &closes, atr), 20.0, "breakout trigger confirmed"),
            entry,
            risk_stage(1.5, (1.0, 2.0), (0.5, 3.0)),
            exit,
            followup,
        ];

        let mut ind = BTreeMap::new();
        put_finite(&mut ind, "close", closes.last().copied());
        put_finite(&mut ind, "atr", Some(atr));
        put_finite(&mut ind, "volume_ratio", Some(volume_ratio(candles)));
        put_finite(&mut ind, "bb_width", indicators::bollinger_width(&closes));

        Evaluation::from_stages("Breakout", &stages, ind)
    }
}

// ─── Zone (15) ────────────────────────────────────────────────────────────────

fn zone_points(candles: &[Candle]) -> f64 {
    let length = history_length_points(candles.len());

    let highs: Vec<f64> = candles.iter().map(|c| c.high).collect();
    let retests = indicators::sma_series(&highs, 5)
        .iter()
        .zip(&highs)
        .filter(|(avg, high)| avg.is_some_and(|a| **high > a))
        .count()
        .min(3);
    let retest = retests as f64 / 3.0 * 5.0;

    let contraction = match atr_ratio(candles) {
        r if r <= 0.70 => 3.0,
        r if r <= 0.90 => 2.0,
        _ => 0.0,
    };

    length + retest + contraction
}

/// Current ATR over the ATR of the history minus its last 20 bars.
fn atr_ratio(candles: &[Candle]) -> f64 {
    let now = indicators::atr(candles, 14).unwrap_or(0.0);
    let before = if candles.len() > LOOKBACK_SHIFT {
        indicators::atr(&candles[..candles.len() - LOOKBACK_SHIFT], 14).unwrap_or(0.0)
    } else {
        now
    };
    if before > 0.0 { now / before } else { 1.0 }
}

// ─── Trigger (25) ─────────────────────────────────────────────────────────────

fn trigger_points(candles: &[Candle], closes: &[f64], atr: f64) -> f64 {
    let close = closes.last().copied().unwrap_or_default();
    let highs: Vec<f64> = candles.iter().map(|c| c.high).collect();

    // resistance = 20-bar high as of the previous bar
    let strength = highs
        .split_last()
        .and_then(|(_, prior)| indicators::highest(prior, 20))
        .filter(|_| atr > 0.0)
        .map(|resistance| (close - resistance) / atr);
    let breakout = match strength {
        Some(s) if s >= 1.0 => 10.0,
        Some(s) if s >= 0.5 => 8.0,
        Some(s) if s > 0.0 => 5.0,
        _ => 0.0,
    };

    let volume = match volume_ratio(candles) {
        r if r >= 2.0 => 8.0,
        r if r >= 1.5 => 6.0,
        r if r >= 1.2 => 4.0,
        _ => 0.0,
    };

    let width_now = indicators::bollinger_width(closes).unwrap_or(0.0);
    let width_before = if closes.len() > LOOKBACK_SHIFT {
        indicators::bollinger_width(&closes[..closes.len() - LOOKBACK_SHIFT]).unwrap_or(0.0)
    } else {
        width_now
    };
    let expansion = if width_before > 0.0 { width_now / width_before } else { 1.0 };
    let bands = if expansion >= 1.5 {
        6.0
    } else if expansion >= 1.3 {
        4.0
    } else {
        0.0
    };

    let cci = indicators::cci(candles, 14).unwrap_or(0.0);
    let hist = indicators::macd_histogram(closes).unwrap_or(0.0);
    let momentum = if cci > 0.0 && hist > 0.0 { 1.0 } else { 0.0 };

    breakout + volume + bands + momentum
}
