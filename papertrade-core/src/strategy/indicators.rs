//! Indicator math shared by the strategy implementations.
//!
//! Every function takes the full close series and returns a vector aligned to
//! it, with `f64::NAN` in warmup slots before the indicator has enough data.

/// Simple moving average. Lookback: `period - 1` candles of warmup.
pub fn sma(closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 || n < period {
        return out;
    }
    let mut sum: f64 = closes[..period].iter().sum();
    out[period - 1] = sum / period as f64;
    for i in period..n {
        sum += closes[i] - closes[i - period];
        out[i] = sum / period as f64;
    }
    out
}

/// Exponential moving average seeded with an SMA over the first `period` values.
pub fn ema(closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 || n < period {
        return out;
    }
    let seed: f64 = closes[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = seed;
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut prev = seed;
    for i in period..n {
        prev = alpha * closes[i] + (1.0 - alpha) * prev;
        out[i] = prev;
    }
    out
}

/// Relative Strength Index with Wilder smoothing.
///
/// Edge cases: no losses in the window → 100, no gains → 0, no movement → 50.
pub fn rsi(closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 || n < period + 1 {
        return out;
    }

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let ch = closes[i] - closes[i - 1];
        if ch > 0.0 {
            avg_gain += ch;
        } else {
            avg_loss -= ch;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    out[period] = rsi_value(avg_gain, avg_loss);

    let alpha = 1.0 / period as f64;
    for i in (period + 1)..n {
        let ch = closes[i] - closes[i - 1];
        let gain = if ch > 0.0 { ch } else { 0.0 };
        let loss = if ch < 0.0 { -ch } else { 0.0 };
        avg_gain = alpha * gain + (1.0 - alpha) * avg_gain;
        avg_loss = alpha * loss + (1.0 - alpha) * avg_loss;
        out[i] = rsi_value(avg_gain, avg_loss);
    }
    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

/// Rolling population standard deviation, aligned like `sma`.
pub fn rolling_std(closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    let mut out = vec![f64::NAN; n];
    if period < 2 || n < period {
        return out;
    }
    for i in (period - 1)..n {
        let window = &closes[i + 1 - period..=i];
        let mean = window.iter().sum::<f64>() / period as f64;
        let var = window.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / period as f64;
        out[i] = var.sqrt();
    }
    out
}

/// MACD line, signal line, and histogram.
///
/// Returns three aligned vectors. The signal line starts `signal - 1` values
/// after the first valid MACD value.
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let n = closes.len();
    let fast_ema = ema(closes, fast);
    let slow_ema = ema(closes, slow);

    let mut line = vec![f64::NAN; n];
    for i in 0..n {
        if !fast_ema[i].is_nan() && !slow_ema[i].is_nan() {
            line[i] = fast_ema[i] - slow_ema[i];
        }
    }

    // EMA of the MACD line, seeded over its first `signal` valid values.
    let mut sig = vec![f64::NAN; n];
    let first = line.iter().position(|v| !v.is_nan());
    if let Some(start) = first {
        if n - start >= signal {
            let seed_end = start + signal;
            let seed: f64 = line[start..seed_end].iter().sum::<f64>() / signal as f64;
            sig[seed_end - 1] = seed;
            let alpha = 2.0 / (signal as f64 + 1.0);
            let mut prev = seed;
            for i in seed_end..n {
                prev = alpha * line[i] + (1.0 - alpha) * prev;
                sig[i] = prev;
            }
        }
    }

    let mut hist = vec![f64::NAN; n];
    for i in 0..n {
        if !line[i].is_nan() && !sig[i].is_nan() {
            hist[i] = line[i] - sig[i];
        }
    }
    (line, sig, hist)
}
