//! # indicators
//!
//! Rolling-window technical indicators over plain `f64` slices.
//!
//! Every function looks at the **last** bar of the input and returns `None`
//! when the window is not yet full or the value is undefined (e.g. zero
//! variance). Callers decide how to score a missing value.
//!
//! Conventions:
//! - standard deviation is the sample deviation (n − 1)
//! - EMA is the bias-adjusted form, `Σ(1−α)^i·x_{t−i} / Σ(1−α)^i`, `α = 2/(span+1)`
//! - the first true range has no previous close and falls back to `high − low`

use crate::models::Candle;

// ─── Moving averages ──────────────────────────────────────────────────────────

/// Simple moving average of the last `period` values.
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    window(values, period).map(mean)
}

/// SMA evaluated at every index (`None` until the window fills).
pub fn sma_series(values: &[f64], period: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| sma(&values[..=i], period))
        .collect()
}

/// Sample standard deviation of the last `period` values.
pub fn sample_std(values: &[f64], period: usize) -> Option<f64> {
    if period < 2 {
        return None;
    }
    let w = window(values, period)?;
    let m = mean(w);
    let var = w.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (period as f64 - 1.0);
    Some(var.sqrt())
}

/// Bias-adjusted exponential moving average, one value per input.
pub fn ema_series(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let decay = 1.0 - alpha;
    let mut num = 0.0;
    let mut den = 0.0;
    values
        .iter()
        .map(|&x| {
            num = x + decay * num;
            den = 1.0 + decay * den;
            num / den
        })
        .collect()
}

// ─── Bands / ranges ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bollinger {
    pub upper:  f64,
    pub middle: f64,
    pub lower:  f64,
}

/// Bollinger bands (SMA ± `k`·σ) over the last `period` closes.
pub fn bollinger(closes: &[f64], period: usize, k: f64) -> Option<Bollinger> {
    let middle = sma(closes, period)?;
    let std = sample_std(closes, period)?;
    Some(Bollinger {
        upper: middle + k * std,
        middle,
        lower: middle - k * std,
    })
}

/// Relative band width `(upper − lower) / middle` for 20/2 bands.
pub fn bollinger_width(closes: &[f64]) -> Option<f64> {
    let bands = bollinger(closes, 20, 2.0)?;
    if bands.middle == 0.0 {
        return None;
    }
    Some((bands.upper - bands.lower) / bands.middle)
}

pub fn highest(values: &[f64], period: usize) -> Option<f64> {
    window(values, period).map(|w| w.iter().copied().fold(f64::MIN, f64::max))
}

pub fn lowest(values: &[f64], period: usize) -> Option<f64> {
    window(values, period).map(|w| w.iter().copied().fold(f64::MAX, f64::min))
}

/// True range per bar.
pub fn true_ranges(candles: &[Candle]) -> Vec<f64> {
    candles
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let hl = c.high - c.low;
            match i.checked_sub(1).map(|p| candles[p].close) {
                Some(prev_close) => hl
                    .max((c.high - prev_close).abs())
                    .max((c.low - prev_close).abs()),
                None => hl,
            }
        })
        .collect()
}

/// Average true range (simple mean of the last `period` true ranges).
pub fn atr(candles: &[Candle], period: usize) -> Option<f64> {
    sma(&true_ranges(candles), period)
}

// ─── Oscillators ──────────────────────────────────────────────────────────────

/// RSI with simple-mean gains/losses over the last `period` changes.
///
/// A window with only gains reads 100; a flat window is undefined.
pub fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }
    let tail = &closes[closes.len() - period - 1..];
    let (mut gain, mut loss) = (0.0, 0.0);
    for w in tail.windows(2) {
        let delta = w[1] - w[0];
        if delta > 0.0 {
            gain += delta;
        } else {
            loss -= delta;
        }
    }
    gain /= period as f64;
    loss /= period as f64;

    if loss == 0.0 {
        return (gain > 0.0).then_some(100.0);
    }
    let rs = gain / loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

/// Commodity Channel Index on the typical price.
pub fn cci(candles: &[Candle], period: usize) -> Option<f64> {
    let typical: Vec<f64> = candles.iter().map(Candle::typical_price).collect();
    let w = window(&typical, period)?;
    let m = mean(w);
    let mad = w.iter().map(|v| (v - m).abs()).sum::<f64>() / period as f64;
    if mad == 0.0 {
        return None;
    }
    let last = *w.last()?;
    Some((last - m) / (0.015 * mad))
}

/// MACD(12, 26, 9) histogram at the last bar.
pub fn macd_histogram(closes: &[f64]) -> Option<f64> {
    if closes.is_empty() {
        return None;
    }
    let fast = ema_series(closes, 12);
    let slow = ema_series(closes, 26);
    let macd: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let signal = ema_series(&macd, 9);
    Some(macd.last()? - signal.last()?)
}

/// Average directional index.
///
/// Directional movement is taken as the raw bar-to-bar change of highs and
/// lows; a side only counts when it dominates the other.
pub fn adx(candles: &[Candle], period: usize) -> Option<f64> {
    let n = candles.len();
    if period == 0 || n < 2 * period - 1 {
        return None;
    }

    let mut plus_dm = vec![0.0; n];
    let mut minus_dm = vec![0.0; n];
    for i in 1..n {
        let up = candles[i].high - candles[i - 1].high;
        let down = candles[i].low - candles[i - 1].low;
        plus_dm[i] = if up > down { up } else { 0.0 };
        minus_dm[i] = if down > plus_dm[i] { down } else { 0.0 };
    }

    let tr = true_ranges(candles);
    let dx: Vec<Option<f64>> = (0..n)
        .map(|i| {
            let atr = sma(&tr[..=i], period)?;
            if atr == 0.0 {
                return None;
            }
            let plus_di = 100.0 * sma(&plus_dm[..=i], period)? / atr;
            let minus_di = 100.0 * sma(&minus_dm[..=i], period)? / atr;
            let sum = plus_di + minus_di;
            (sum != 0.0).then(|| 100.0 * (plus_di - minus_di).abs() / sum)
        })
        .collect();

    let tail = window(&dx, period)?;
    let values: Option<Vec<f64>> = tail.iter().copied().collect();
    values.map(|v| mean(&v))
}

// ─── Trend / momentum ─────────────────────────────────────────────────────────

/// Least-squares slope of the last `period` values against their index.
pub fn linear_slope(values: &[f64], period: usize) -> Option<f64> {
    if period < 2 {
        return None;
    }
    let w = window(values, period)?;
    let n = period as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = mean(w);
    let (mut cov, mut var) = (0.0, 0.0);
    for (i, y) in w.iter().enumerate() {
        let dx = i as f64 - x_mean;
        cov += dx * (y - y_mean);
        var += dx * dx;
    }
    Some(cov / var)
}

/// Fractional change between the last value and the one `periods` bars back.
pub fn pct_change(values: &[f64], periods: usize) -> Option<f64> {
    let last = *values.last()?;
    let base = *values.get(values.len().checked_sub(periods + 1)?)?;
    if base == 0.0 {
        return None;
    }
    Some(last / base - 1.0)
}

// ─── helpers ──────────────────────────────────────────────────────────────────

fn window<T>(values: &[T], period: usize) -> Option<&[T]> {
    if period == 0 || values.len() < period {
        return None;
    }
    Some(&values[values.len() - period..])
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Timeframe;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn ramp(count: usize) -> Vec<Candle> {
        (0..count)
            .map(|i| {
                let p = 100.0 + i as f64;
                Candle {
                    timestamp: i as i64 * 300_000,
                    open: p,
                    high: p + 1.0,
                    low: p - 1.0,
                    close: p,
                    volume: 1000.0,
                    symbol: "BTC/USDT".into(),
                    timeframe: Timeframe::FiveMinutes,
                }
            })
            .collect()
    }

    #[test]
    fn sma_needs_a_full_window() {
        assert_eq!(sma(&[1.0, 2.0], 3), None);
        assert!(approx(sma(&[1.0, 2.0, 3.0, 4.0], 3).unwrap(), 3.0));
    }

    #[test]
    fn sample_std_uses_n_minus_one() {
        let std = sample_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0], 8).unwrap();
        assert!(approx(std, (32.0_f64 / 7.0).sqrt()));
    }

    #[test]
    fn adjusted_ema_starts_at_first_value() {
        let e = ema_series(&[10.0, 20.0], 3);
        assert!(approx(e[0], 10.0));
        // alpha = 0.5 → (20 + 0.5·10) / (1 + 0.5)
        assert!(approx(e[1], 25.0 / 1.5));
    }

    #[test]
    fn rsi_edges() {
        let rising: Vec<f64> = (0..20).map(|i| i as f64).collect();
        assert_eq!(rsi(&rising, 14), Some(100.0));
        assert_eq!(rsi(&[5.0; 20], 14), None);

        let zigzag: Vec<f64> = (0..20).map(|i| if i % 2 == 0 { 10.0 } else { 11.0 }).collect();
        let value = rsi(&zigzag, 14).unwrap();
        assert!(approx(value, 50.0));
    }

    #[test]
    fn true_range_uses_previous_close() {
        let candles = ramp(3);
        let tr = true_ranges(&candles);
        assert!(approx(tr[0], 2.0));
        assert!(approx(tr[1], 2.0));
        assert!(approx(atr(&candles, 3).unwrap(), 2.0));
    }

    #[test]
    fn slope_of_a_line() {
        let line: Vec<f64> = (0..30).map(|i| 3.0 * i as f64 + 7.0).collect();
        assert!(approx(linear_slope(&line, 20).unwrap(), 3.0));
    }

    #[test]
    fn pct_change_looks_back() {
        let v = [100.0, 101.0, 102.0, 103.0, 104.0, 110.0];
        assert!(approx(pct_change(&v, 5).unwrap(), 0.1));
        assert_eq!(pct_change(&v, 6), None);
    }

    #[test]
    fn flat_series_has_undefined_cci() {
        let mut candles = ramp(20);
        for c in &mut candles {
            c.high = 101.0;
            c.low = 99.0;
            c.close = 100.0;
        }
        assert_eq!(cci(&candles, 14), None);
    }

    #[test]
    fn adx_needs_two_windows() {
        assert_eq!(adx(&ramp(20), 14), None);
        let value = adx(&ramp(60), 14).unwrap();
        assert!(value.is_finite());
        assert!((0.0..=100.0).contains(&value));
    }

    #[test]
    fn macd_positive_in_uptrend() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i * i) as f64).collect();
        assert!(macd_histogram(&closes).unwrap() > 0.0);
    }
}
