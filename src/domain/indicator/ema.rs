//! Exponential Moving Average.
//!
//! k = 2/(n+1), seeded with the first value (no SMA seed), then
//! EMA[i] = k*C[i] + (1-k)*EMA[i-1]. Defined from the first bar.

pub fn calculate_ema(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 {
        return vec![f64::NAN; values.len()];
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;

    for &value in values {
        let ema = match prev {
            None => value,
            Some(p) => k * value + (1.0 - k) * p,
        };
        out.push(ema);
        prev = Some(ema);
    }

    out
}
