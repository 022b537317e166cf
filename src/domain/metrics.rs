//! Performance metrics and trade statistics.

use crate::domain::simulation::{Trade, TradeType};

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Risk/return figures derived from an equity curve, at full precision.
#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub total_return_pct: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown_pct: f64,
}

impl Metrics {
    pub fn compute(equity_curve: &[f64]) -> Self {
        let (initial, last) = match (equity_curve.first(), equity_curve.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => {
                return Metrics {
                    total_return_pct: 0.0,
                    sharpe_ratio: 0.0,
                    max_drawdown_pct: 0.0,
                };
            }
        };

        let total_return_pct = if initial > 0.0 {
            (last / initial - 1.0) * 100.0
        } else {
            0.0
        };

        Metrics {
            total_return_pct,
            sharpe_ratio: compute_sharpe(equity_curve),
            max_drawdown_pct: compute_max_drawdown(equity_curve),
        }
    }
}

/// Daily simple returns; a step from a non-positive value counts as 0.
pub fn daily_returns(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| {
            let prev = w[0];
            let curr = w[1];
            if prev > 0.0 { (curr - prev) / prev } else { 0.0 }
        })
        .collect()
}

/// Annualized Sharpe ratio with population standard deviation (divide by N).
fn compute_sharpe(equity_curve: &[f64]) -> f64 {
    let returns = daily_returns(equity_curve);
    if returns.is_empty() {
        return 0.0;
    }

    let n = returns.len() as f64;
    let mean: f64 = returns.iter().sum::<f64>() / n;
    let variance: f64 = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    if stddev > 0.0 {
        mean / stddev * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    }
}

/// Largest peak-to-trough decline as a percentage of the running peak.
fn compute_max_drawdown(equity_curve: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;

    for &equity in equity_curve {
        if equity > peak {
            peak = equity;
        }
        if peak > 0.0 {
            let dd = (peak - equity) / peak * 100.0;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }

    max_dd
}

/// Round to cents / two decimal places for the result document.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Round-trip statistics from a BUY/SELL trade log.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeStats {
    pub round_trips: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate_pct: f64,
    pub open_position: bool,
}

impl TradeStats {
    pub fn from_trades(trades: &[Trade]) -> Self {
        let mut round_trips = 0usize;
        let mut wins = 0usize;
        let mut losses = 0usize;
        let mut open_buy: Option<&Trade> = None;

        for trade in trades {
            match (trade.trade_type, open_buy) {
                (TradeType::Buy, _) => open_buy = Some(trade),
                (TradeType::Sell, Some(buy)) => {
                    round_trips += 1;
                    let pnl = trade.value - buy.value;
                    if pnl > 0.0 {
                        wins += 1;
                    } else if pnl < 0.0 {
                        losses += 1;
                    }
                    open_buy = None;
                }
                (TradeType::Sell, None) => {}
            }
        }

        let win_rate_pct = if round_trips > 0 {
            wins as f64 / round_trips as f64 * 100.0
        } else {
            0.0
        };

        TradeStats {
            round_trips,
            wins,
            losses,
            win_rate_pct,
            open_position: open_buy.is_some(),
        }
    }
}
