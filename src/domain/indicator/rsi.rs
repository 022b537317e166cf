//! RSI (Relative Strength Index).
//!
//! Average gain/loss are trailing simple means over n bars (no Wilder
//! smoothing) of max(delta, 0) and max(-delta, 0). The first bar has no
//! previous close and contributes a zero gain and loss.
//!
//! Formula: RSI = 100 - (100 / (1 + RS)), RS = avg_gain / avg_loss.
//! If avg_loss == 0: RS = 0, so RSI = 0 (not 100).
//!
//! Warmup: first (n-1) values are NaN.

pub fn calculate_rsi(closes: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; closes.len()];
    if period == 0 || closes.len() < period {
        return out;
    }

    let mut gains = Vec::with_capacity(closes.len());
    let mut losses = Vec::with_capacity(closes.len());
    gains.push(0.0);
    losses.push(0.0);
    for w in closes.windows(2) {
        let delta = w[1] - w[0];
        gains.push(delta.max(0.0));
        losses.push((-delta).max(0.0));
    }

    let n = period as f64;
    for i in (period - 1)..closes.len() {
        let start = i + 1 - period;
        let avg_gain = gains[start..=i].iter().sum::<f64>() / n;
        let avg_loss = losses[start..=i].iter().sum::<f64>() / n;

        let rs = if avg_loss == 0.0 { 0.0 } else { avg_gain / avg_loss };
        out[i] = 100.0 - 100.0 / (1.0 + rs);
    }

    out
}
