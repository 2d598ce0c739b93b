//! # strategy::trend
//!
//! Six-stage trend-following scorer (0–100).
//!
//! | Stage    | Max | Measured                                      |
//! |----------|-----|-----------------------------------------------|
//! | trend    | 15  | history length, MA20 slope, higher lows       |
//! | trigger  | 25  | ADX, volume, MA fan, RSI + MACD agreement     |
//! | entry    | 20  | baseline                                      |
//! | risk     | 15  | stop distance 1.5 × ATR                       |
//! | exit     | 15  | baseline                                      |
//! | followup | 10  | baseline                                      |

use std::collections::BTreeMap;

use crate::indicators;
use crate::models::{Candle, Parameters};
use crate::strategy::{
    baseline_stages, history_length_points, put_finite, risk_stage, volume_ratio, Evaluation,
    Stage, Strategy,
};

/// Points granted for MA fan alignment until the fan itself is measured.
const MA_FAN_BASELINE: f64 = 4.0;

pub struct TrendScorer;

impl TrendScorer {
    pub const NAME: &'static str = "TrendStrategy";
}

impl Strategy for TrendScorer {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn score(&self, candles: &[Candle], _params: &Parameters) -> Evaluation {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let adx = indicators::adx(candles, 14);
        let rsi = indicators::rsi(&closes, 14);

        let [entry, exit, followup] = baseline_stages();
        let stages = [
            Stage::new("trend", trend_points(candles, &closes), 10.0, "trend well defined"),
            Stage::new("trigger", trigger_points(candles, &closes, adx, rsi), 20.0, "trend trigger confirmed"),
            entry,
            risk_stage(1.5, (1.0, 2.0), (0.5, 3.0)),
            exit,
            followup,
        ];

        let mut ind = BTreeMap::new();
        put_finite(&mut ind, "close", closes.last().copied());
        put_finite(&mut ind, "adx", adx);
        put_finite(&mut ind, "rsi", rsi);
        put_finite(&mut ind, "ma20_slope", ma_slope(&closes));
        put_finite(&mut ind, "volume_ratio", Some(volume_ratio(candles)));

        Evaluation::from_stages("Trend", &stages, ind)
    }
}

// ─── Trend (15) ───────────────────────────────────────────────────────────────

fn trend_points(candles: &[Candle], closes: &[f64]) -> f64 {
    let length = history_length_points(candles.len());

    let slope = match ma_slope(closes) {
        Some(s) if s >= 0.04 => 5.0,
        Some(s) if s >= 0.02 => 3.0,
        _ => 1.0,
    };

    let structure = higher_lows(candles).min(3) as f64;

    length + slope + structure
}

/// One-bar relative change of the 20-bar SMA.
fn ma_slope(closes: &[f64]) -> Option<f64> {
    let (_, prior) = closes.split_last()?;
    let now = indicators::sma(closes, 20)?;
    let before = indicators::sma(prior, 20)?;
    (before != 0.0).then(|| (now - before) / before)
}

/// Bars where the 5-bar rolling low rose over the previous bar's.
fn higher_lows(candles: &[Candle]) -> usize {
    let lows: Vec<f64> = candles.iter().map(|c| c.low).collect();
    let rolling: Vec<Option<f64>> = (1..=lows.len())
        .map(|end| indicators::lowest(&lows[..end], 5))
        .collect();
    rolling
        .windows(2)
        .filter(|w| matches!((w[0], w[1]), (Some(a), Some(b)) if b > a))
        .count()
}

// ─── Trigger (25) ─────────────────────────────────────────────────────────────

fn trigger_points(candles: &[Candle], closes: &[f64], adx: Option<f64>, rsi: Option<f64>) -> f64 {
    let strength = match adx {
        Some(a) if a >= 35.0 => 10.0,
        Some(a) if a >= 25.0 => 7.0,
        Some(a) if a >= 20.0 => 4.0,
        _ => 0.0,
    };

    let volume = match volume_ratio(candles) {
        r if r >= 2.0 => 8.0,
        r if r >= 1.5 => 6.0,
        r if r >= 1.2 => 4.0,
        _ => 0.0,
    };

    let rsi = rsi.unwrap_or(50.0);
    let hist = indicators::macd_histogram(closes).unwrap_or(0.0);
    let momentum = if rsi > 50.0 && hist > 0.0 { 1.0 } else { 0.0 };

    strength + volume + MA_FAN_BASELINE + momentum
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::testutil::series;
    use crate::strategy::Signal;

    fn eval(candles: &[Candle]) -> Evaluation {
        TrendScorer.evaluate(candles, &Parameters::new()).unwrap()
    }

    #[test]
    fn steady_uptrend_beats_flat_market() {
        let flat = eval(&series(60, |_| 100.0));
        let up = eval(&series(60, |i| 100.0 * 1.01_f64.powi(i as i32)));
        assert!(up.total_score > flat.total_score);
        assert_eq!(up.sub_scores["trend_score"], 7.0 + 1.0 + 3.0);
    }

    #[test]
    fn higher_lows_counts_rising_floor() {
        let up = series(10, |i| 100.0 + i as f64);
        // rolling low defined from bar 4; it rises on each of the 5 following bars
        assert_eq!(higher_lows(&up), 5);
        assert_eq!(higher_lows(&series(10, |_| 100.0)), 0);
    }

    #[test]
    fn slope_needs_twenty_one_bars() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        assert_eq!(ma_slope(&closes), None);
        let closes: Vec<f64> = (0..21).map(|i| 100.0 + i as f64).collect();
        assert!(ma_slope(&closes).unwrap() > 0.0);
    }

    #[test]
    fn flat_market_is_a_sell() {
        let e = eval(&series(20, |_| 100.0));
        // slope undefined (1) + fan baseline (4) + 38 baseline points
        assert_eq!(e.total_score, 43.0);
        assert_eq!(e.signal, Signal::Sell);
    }
}
