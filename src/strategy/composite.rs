//! # strategy::composite
//!
//! **Composite breakout scorer**: eight indicator sub-scores, each on
//! `[0, 1]`, blended by fixed weights.
//!
//! | Sub-score    | Weight | Looks at                                  |
//! |--------------|--------|-------------------------------------------|
//! | bollinger    | 0.20   | close vs. upper 20/2 band                 |
//! | rsi          | 0.15   | RSI(14) inside the 30–70 comfort zone     |
//! | volume       | 0.15   | last volume vs. 20-bar average            |
//! | ma           | 0.15   | SMA5 vs. SMA20, close vs. SMA5            |
//! | momentum     | 0.10   | 5-bar rate of change                      |
//! | breakout     | 0.10   | close vs. recent high                     |
//! | volatility   | 0.10   | ATR(14) / close, sweet spot 1–3 %         |
//! | trend        | 0.05   | regression slope of the last 20 closes    |

use std::collections::BTreeMap;

use tracing::debug;

use crate::indicators;
use crate::models::{Candle, Parameters};
use crate::strategy::{put_finite, round_to, Evaluation, Scale, Signal, Strategy};

const WEIGHTS: [(&str, f64); 8] = [
    ("bollinger",  0.20),
    ("rsi",        0.15),
    ("volume",     0.15),
    ("ma",         0.15),
    ("momentum",   0.10),
    ("breakout",   0.10),
    ("volatility", 0.10),
    ("trend",      0.05),
];

const DEFAULT_LOOKBACK: usize = 20;

pub struct CompositeScorer;

impl CompositeScorer {
    pub const NAME: &'static str = "BreakoutStrategy";
}

/// Latest indicator readings shared by the sub-scores.
struct Snapshot {
    close:        f64,
    bands:        Option<indicators::Bollinger>,
    rsi:          Option<f64>,
    volume_ratio: Option<f64>,
}

impl Strategy for CompositeScorer {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn score(&self, candles: &[Candle], params: &Parameters) -> Evaluation {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let highs: Vec<f64> = candles.iter().map(|c| c.high).collect();
        let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();
        let close = closes.last().copied().unwrap_or_default();

        let lookback = params
            .get("lookback_period")
            .and_then(|v| v.as_u64())
            .map(|v| (v as usize).clamp(2, candles.len()))
            .unwrap_or(DEFAULT_LOOKBACK);

        let snap = Snapshot {
            close,
            bands: indicators::bollinger(&closes, 20, 2.0),
            rsi: indicators::rsi(&closes, 14),
            volume_ratio: indicators::sma(&volumes, 20)
                .filter(|avg| *avg > 0.0)
                .map(|avg| volumes[volumes.len() - 1] / avg),
        };

        let raw = [
            bollinger_score(&snap),
            rsi_score(snap.rsi),
            volume_score(snap.volume_ratio.unwrap_or(1.0)),
            ma_score(close, indicators::sma(&closes, 5), indicators::sma(&closes, 20)),
            momentum_score(indicators::pct_change(&closes, 5)),
            breakout_level_score(close, indicators::highest(&highs, lookback)),
            volatility_score(indicators::atr(candles, 14), close),
            trend_score(indicators::linear_slope(&closes, 20)),
        ];
        let scores: Vec<f64> = raw.iter().map(|s| s.clamp(0.0, 1.0)).collect();

        let total: f64 = WEIGHTS.iter().zip(&scores).map(|((_, w), s)| w * s).sum();
        let signal = signal_for(total);
        let confidence = total.abs().min(1.0) * (candles.len() as f64 / 100.0).min(1.0);

        debug!(total, ?signal, bars = candles.len(), "composite evaluated");

        let sub_scores = WEIGHTS
            .iter()
            .zip(&scores)
            .map(|((name, _), s)| (format!("{name}_score"), round_to(*s, 4)))
            .collect();

        Evaluation {
            total_score: round_to(total, 4),
            scale:       Scale::Unit,
            signal,
            confidence:  round_to(confidence.min(1.0), 4),
            sub_scores,
            indicators:  indicator_map(&snap, indicators::sma(&closes, 20)),
            reasoning:   reasoning(&scores),
        }
    }
}

fn signal_for(total: f64) -> Signal {
    if total > 0.7 {
        Signal::Buy
    } else if total < -0.3 {
        Signal::Sell
    } else {
        Signal::Hold
    }
}

// ─── Sub-scores ───────────────────────────────────────────────────────────────

fn bollinger_score(snap: &Snapshot) -> f64 {
    let Some(bands) = snap.bands else { return 0.0 };
    let close = snap.close;

    let mut score = if close > bands.upper {
        ((close - bands.upper) / bands.upper * 10.0).min(1.0)
    } else {
        let proximity = 1.0 - (close - bands.upper).abs() / bands.upper;
        (proximity * 0.8).max(0.0)
    };

    let half_width = bands.upper - bands.middle;
    if half_width > 0.0 {
        let position = (close - bands.middle) / half_width;
        if position > 0.8 {
            score *= 1.2;
        } else if position < 0.2 {
            score *= 0.5;
        }
    }
    score
}

fn rsi_score(rsi: Option<f64>) -> f64 {
    match rsi {
        Some(r) if (30.0..=70.0).contains(&r) => 1.0 - (r - 50.0).abs() / 50.0,
        Some(r) if r > 70.0 => 1.0 - (r - 70.0) / 30.0,
        Some(r) => 1.0 - (30.0 - r) / 30.0,
        None => 0.0,
    }
}

fn volume_score(ratio: f64) -> f64 {
    if ratio > 1.5 {
        ((ratio - 1.5) * 2.0).min(1.0)
    } else if ratio > 1.0 {
        (ratio - 1.0) * 2.0
    } else {
        ratio
    }
}

fn ma_score(close: f64, sma5: Option<f64>, sma20: Option<f64>) -> f64 {
    let (Some(fast), Some(slow)) = (sma5, sma20) else { return 0.0 };
    if fast <= 0.0 || slow <= 0.0 {
        return 0.0;
    }

    let score = if fast > slow {
        ((fast / slow - 1.0) * 10.0).min(1.0)
    } else {
        (1.0 - (slow / fast - 1.0) * 5.0).max(0.0)
    };

    if close > fast {
        score * 1.2
    } else {
        score * 0.8
    }
}

fn momentum_score(change: Option<f64>) -> f64 {
    match change {
        Some(m) if m > 0.05 => (m * 10.0).min(1.0),
        Some(m) if m > 0.0 => m * 10.0,
        Some(m) => (1.0 + m * 10.0).max(0.0),
        None => 0.0,
    }
}

fn breakout_level_score(close: f64, recent_high: Option<f64>) -> f64 {
    let Some(high) = recent_high.filter(|h| *h > 0.0) else { return 0.0 };
    if close > high {
        ((close - high) / high * 20.0).min(1.0)
    } else {
        let proximity = 1.0 - (close - high).abs() / high;
        (proximity * 0.5).max(0.0)
    }
}

fn volatility_score(atr: Option<f64>, close: f64) -> f64 {
    let Some(atr) = atr else { return 0.0 };
    if close <= 0.0 {
        return 0.0;
    }
    let ratio = atr / close;
    if (0.01..=0.03).contains(&ratio) {
        1.0
    } else if ratio < 0.01 {
        ratio * 100.0
    } else {
        (1.0 - (ratio - 0.03) * 20.0).max(0.0)
    }
}

fn trend_score(slope: Option<f64>) -> f64 {
    match slope {
        Some(s) if s > 0.0 => (s / 100.0).min(1.0),
        Some(s) => (1.0 + s / 100.0).max(0.0),
        None => 0.5,
    }
}

// ─── Output ───────────────────────────────────────────────────────────────────

fn indicator_map(snap: &Snapshot, sma20: Option<f64>) -> BTreeMap<String, f64> {
    let mut map = BTreeMap::new();
    put_finite(&mut map, "close", Some(snap.close));
    put_finite(&mut map, "rsi", snap.rsi);
    put_finite(&mut map, "bb_upper", snap.bands.map(|b| b.upper));
    put_finite(&mut map, "bb_lower", snap.bands.map(|b| b.lower));
    put_finite(&mut map, "sma_20", sma20);
    put_finite(&mut map, "volume_ratio", snap.volume_ratio);
    map
}

/// Scores in `WEIGHTS` order.
fn reasoning(scores: &[f64]) -> String {
    const PHRASES: [(Option<&str>, Option<&str>); 8] = [
        (Some("price breaking the upper Bollinger band"), Some("price near the lower Bollinger band")),
        (Some("RSI in a healthy range"),                  Some("RSI overbought/oversold")),
        (Some("volume expanding"),                        Some("volume too thin")),
        (Some("moving averages rising"),                  Some("moving averages falling")),
        (Some("strong upward momentum"),                  Some("weak momentum")),
        (Some("recent high broken"),                      None),
        (Some("healthy volatility"),                      Some("excessive volatility")),
        (Some("uptrend"),                                 Some("downtrend")),
    ];

    let reasons: Vec<&str> = PHRASES
        .iter()
        .zip(scores)
        .filter_map(|((high, low), s)| {
            if *s > 0.7 {
                *high
            } else if *s < 0.3 {
                *low
            } else {
                None
            }
        })
        .collect();

    if reasons.is_empty() {
        "neutral market conditions".to_string()
    } else {
        reasons.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::testutil::series;

    fn eval(candles: &[Candle]) -> Evaluation {
        CompositeScorer.evaluate(candles, &Parameters::new()).unwrap()
    }

    #[test]
    fn weights_sum_to_one() {
        let sum: f64 = WEIGHTS.iter().map(|(_, w)| w).sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn sub_scores_are_bounded_and_total_is_on_unit_scale() {
        let candles = series(60, |i| 100.0 * (1.0 + 0.02 * (i as f64 * 0.7).sin()));
        let e = eval(&candles);
        assert_eq!(e.scale, Scale::Unit);
        assert_eq!(e.sub_scores.len(), 8);
        for v in e.sub_scores.values() {
            assert!((0.0..=1.0).contains(v));
        }
        assert!((0.0..=1.0).contains(&e.total_score));
        assert_eq!(e.normalized_score(), e.total_score);
    }

    #[test]
    fn confidence_scales_with_history() {
        let short = eval(&series(20, |i| 100.0 + i as f64));
        let long = eval(&series(100, |i| 100.0 + i as f64 * 5.0));
        let expected_short = round_to(short.total_score.abs() * 0.2, 4);
        assert!((short.confidence - expected_short).abs() < 1e-3);
        assert!((long.confidence - long.total_score).abs() < 1e-3);
    }

    #[test]
    fn indicators_are_reported() {
        let e = eval(&series(30, |i| 100.0 + i as f64));
        for key in ["close", "rsi", "bb_upper", "bb_lower", "sma_20", "volume_ratio"] {
            assert!(e.indicators.contains_key(key), "missing {key}");
        }
        assert_eq!(e.indicators["close"], 129.0);
    }

    #[test]
    fn flat_market_omits_undefined_rsi() {
        let e = eval(&series(30, |_| 100.0));
        assert!(!e.indicators.contains_key("rsi"));
        assert_eq!(e.sub_scores["rsi_score"], 0.0);
    }

    #[test]
    fn signal_thresholds() {
        assert_eq!(signal_for(0.71), Signal::Buy);
        assert_eq!(signal_for(0.7), Signal::Hold);
        assert_eq!(signal_for(0.0), Signal::Hold);
        assert_eq!(signal_for(-0.31), Signal::Sell);
    }

    #[test]
    fn sub_score_shapes() {
        assert_eq!(volume_score(0.5), 0.5);
        assert!((volume_score(1.25) - 0.5).abs() < 1e-12);
        assert_eq!(volume_score(3.0), 1.0);

        assert_eq!(rsi_score(Some(50.0)), 1.0);
        assert_eq!(rsi_score(Some(100.0)), 0.0);
        assert_eq!(rsi_score(Some(0.0)), 0.0);

        assert_eq!(volatility_score(Some(2.0), 100.0), 1.0);
        assert!((volatility_score(Some(0.5), 100.0) - 0.5).abs() < 1e-12);

        assert_eq!(trend_score(None), 0.5);
        assert_eq!(trend_score(Some(-200.0)), 0.0);
    }

    #[test]
    fn breakout_above_recent_high() {
        assert_eq!(breakout_level_score(110.0, Some(100.0)), 1.0);
        assert!((breakout_level_score(100.0, Some(100.0)) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn neutral_reasoning_when_nothing_stands_out() {
        assert_eq!(reasoning(&[0.5; 8]), "neutral market conditions");
        let text = reasoning(&[0.9, 0.5, 0.1, 0.5, 0.5, 0.5, 0.5, 0.5]);
        assert_eq!(text, "price breaking the upper Bollinger band, volume too thin");
    }
}
