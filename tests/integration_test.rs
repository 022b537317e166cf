//! End-to-end tests for the backtest engine.
//!
//! Tests cover:
//! - Decisions use only the previous bar (no lookahead)
//! - Short history and date-filter outcomes
//! - The alternating-price scenario and cash accounting
//! - Result document shape
//! - Strategy documents flowing into a run
//! - Data source fallback and invalid price bars

mod common;

use algoblocks::adapters::csv_adapter::CsvAdapter;
use algoblocks::adapters::fallback_adapter::FallbackDataAdapter;
use algoblocks::adapters::sample_data_adapter::SampleDataAdapter;
use algoblocks::domain::backtest::{run_backtest, simulate, BacktestResult};
use algoblocks::domain::block_parser::parse_strategy_document;
use algoblocks::domain::metrics::TradeStats;
use algoblocks::domain::simulation::{Trade, TradeType, WARMUP_BARS};
use algoblocks::ports::data_port::DataPort;
use common::*;
use std::fs;
use tempfile::TempDir;

mod lookahead {
    use super::*;

    #[test]
    fn mutating_the_decision_bar_leaves_its_decision_alone() {
        let bars = bars_from_closes("2024-01-01", &alternating_closes(50));
        let decision_day = bars[WARMUP_BARS].date();

        // Bar 20's high now sits far above SMA_5. The step-20 decision reads
        // bar 19, so only the following step may react.
        let mut mutated = bars.clone();
        mutated[WARMUP_BARS].high = 10_000.0;
        mutated[WARMUP_BARS].volume = 1;

        let strategy = high_cross_strategy(5);
        let config = sample_config("TEST");
        let baseline = run_backtest(&bars, &strategy, &config).trades;
        let changed = run_backtest(&mutated, &strategy, &config).trades;

        let upto = |trades: &[Trade]| {
            trades
                .iter()
                .filter(|t| t.date <= decision_day)
                .cloned()
                .collect::<Vec<_>>()
        };
        assert!(!upto(&baseline).is_empty());
        assert_eq!(upto(&baseline), upto(&changed));
        assert_eq!(baseline[0].trade_type, TradeType::Buy);
        assert_eq!(baseline[0].date, decision_day);

        // The next step does read the mutated high: the baseline sells, the
        // mutated run keeps holding.
        let next_day = bars[WARMUP_BARS + 1].date();
        assert!(baseline
            .iter()
            .any(|t| t.date == next_day && t.trade_type == TradeType::Sell));
        assert!(changed.iter().all(|t| t.date != next_day));
    }

    #[test]
    fn appending_a_bar_keeps_earlier_trades() {
        let closes = alternating_closes(41);
        let strategy = sma_cross_strategy(5);

        let short = simulate(&bars_from_closes("2024-01-01", &closes[..40]), &strategy, 10_000.0);
        let long = simulate(&bars_from_closes("2024-01-01", &closes), &strategy, 10_000.0);

        assert!(long.outcome.trades.len() >= short.outcome.trades.len());
        assert_eq!(
            &long.outcome.trades[..short.outcome.trades.len()],
            short.outcome.trades.as_slice()
        );
        assert_eq!(
            &long.outcome.equity_curve[..short.outcome.equity_curve.len()],
            short.outcome.equity_curve.as_slice()
        );
    }

    #[test]
    fn a_spike_on_the_trade_bar_is_not_seen() {
        // Bar 20 spikes far above SMA_5, but the decision at bar 20 reads
        // bar 19, which sits below its average.
        let mut closes = vec![100.0; 19];
        closes.push(90.0);
        closes.push(500.0);
        closes.extend(std::iter::repeat_n(500.0, 9));

        let strategy = sma_cross_strategy(5);
        let run = simulate(&bars_from_closes("2024-01-01", &closes), &strategy, 10_000.0);

        let first = &run.outcome.trades[0];
        assert_eq!(first.trade_type, TradeType::Buy);
        assert_eq!(first.date, date(2024, 1, 22));
    }
}

mod insufficient_data {
    use super::*;

    #[test]
    fn fewer_than_thirty_bars() {
        let bars = bars_from_closes("2024-01-01", &alternating_closes(29));
        let result = run_backtest(&bars, &sma_cross_strategy(5), &sample_config("TEST"));

        assert_eq!(result.total_trades, 0);
        assert_eq!(result.equity_curve, vec![10_000.0]);
        assert_eq!(result.final_equity, 10_000.0);
        assert_eq!(result.sharpe_ratio, 0.0);
        assert_eq!(
            result.error.as_deref(),
            Some("Insufficient historical data for TEST")
        );
    }

    #[test]
    fn date_filter_leaves_too_few_bars() {
        let bars = bars_from_closes("2024-01-01", &alternating_closes(60));
        let mut config = sample_config("TEST");
        config.start_date = Some(date(2024, 2, 15));

        let result = run_backtest(&bars, &sma_cross_strategy(5), &config);
        assert_eq!(
            result.error.as_deref(),
            Some("Insufficient data after date filtering")
        );
        assert!(result.trades.is_empty());
    }

    #[test]
    fn date_filter_with_enough_bars_runs() {
        let bars = bars_from_closes("2024-01-01", &alternating_closes(60));
        let mut config = sample_config("TEST");
        config.start_date = Some(date(2024, 1, 11));
        config.end_date = Some(date(2024, 2, 9));

        // Jan 11 through Feb 9 inclusive is 30 bars.
        let result = run_backtest(&bars, &sma_cross_strategy(5), &config);
        assert!(result.error.is_none());
        assert_eq!(result.equity_curve.len(), 30 - WARMUP_BARS + 1);
        assert!(result.trades.iter().all(|t| t.date >= date(2024, 1, 11)));
        assert!(result.trades.iter().all(|t| t.date <= date(2024, 2, 9)));
    }
}

mod alternating_scenario {
    use super::*;

    #[test]
    fn buys_low_and_sells_high() {
        let bars = bars_from_closes("2024-01-01", &alternating_closes(50));
        let result = run_backtest(&bars, &sma_cross_strategy(5), &sample_config("TEST"));

        assert!(result.error.is_none());
        assert_eq!(result.equity_curve[0], 10_000.0);
        assert_eq!(result.equity_curve.len(), 50 - WARMUP_BARS + 1);

        // Bar 20 closes at 100 after a 110 bar above SMA_5 = 106.
        let first = &result.trades[0];
        assert_eq!(first.trade_type, TradeType::Buy);
        assert_eq!(first.price, 100.0);
        assert_eq!(first.shares, 100);

        let first_sell = result
            .trades
            .iter()
            .position(|t| t.trade_type == TradeType::Sell)
            .unwrap();
        assert!(first_sell > 0);
        assert_eq!(result.trades[first_sell].price, 110.0);
    }

    #[test]
    fn trades_alternate_and_stats_agree() {
        let bars = bars_from_closes("2024-01-01", &alternating_closes(50));
        let result = run_backtest(&bars, &sma_cross_strategy(5), &sample_config("TEST"));

        for pair in result.trades.windows(2) {
            assert_ne!(pair[0].trade_type, pair[1].trade_type);
        }

        let stats = TradeStats::from_trades(&result.trades);
        assert_eq!(stats.round_trips, result.trades.len() / 2);
        assert_eq!(stats.wins, stats.round_trips);
        assert_eq!(stats.win_rate_pct, 100.0);
        assert!(result.total_return_pct > 0.0);
    }

    #[test]
    fn cash_replays_from_trade_log() {
        let bars = bars_from_closes("2024-01-01", &alternating_closes(51));
        let run = simulate(&bars, &sma_cross_strategy(5), 10_000.0);

        let mut cash = 10_000.0;
        let mut shares = 0i64;
        for trade in &run.outcome.trades {
            match trade.trade_type {
                TradeType::Buy => {
                    cash -= trade.value;
                    shares += trade.shares;
                }
                TradeType::Sell => {
                    cash += trade.value;
                    shares -= trade.shares;
                }
            }
            assert!(cash >= 0.0);
        }

        assert!((cash - run.outcome.cash).abs() < 1e-9);
        assert_eq!(shares, run.outcome.shares_held);

        let last_close = bars.last().unwrap().close;
        let final_equity = *run.outcome.equity_curve.last().unwrap();
        assert!((final_equity - (cash + shares as f64 * last_close)).abs() < 1e-9);
    }

    #[test]
    fn result_document_keys() {
        let bars = bars_from_closes("2024-01-01", &alternating_closes(50));
        let result = run_backtest(&bars, &sma_cross_strategy(5), &sample_config("TEST"));
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["initial_capital"], 10_000.0);
        assert!(json["total_return"].is_number());
        assert!(json["max_drawdown"].is_number());
        assert!(json.get("error").is_none());

        let trade = &json["trades"][0];
        assert_eq!(trade["type"], "BUY");
        assert_eq!(trade["date"], "2024-01-21");
        assert_eq!(trade["shares"], 100);
    }
}

mod strategy_documents {
    use super::*;

    #[test]
    fn block_list_runs_end_to_end() {
        let text = r#"[
            {"type": "indicator", "indicatorType": "SMA", "period": 5},
            {"type": "entry", "conditions": [{"indicator": "close", "operator": ">", "value": "SMA_5"}]},
            {"type": "exit", "conditions": [{"indicator": "close", "operator": "<", "value": "SMA_5"}]}
        ]"#;
        let strategy = parse_strategy_document(text).unwrap();
        assert_eq!(strategy, sma_cross_strategy(5));

        let bars = bars_from_closes("2024-01-01", &alternating_closes(50));
        let result = run_backtest(&bars, &strategy, &sample_config("TEST"));
        assert!(result.total_trades > 0);
    }

    #[test]
    fn rsi_threshold_strategy_on_sample_data() {
        let text = r#"{"blocks": [
            {"type": "indicator", "indicatorType": "RSI", "period": 14},
            {"type": "entry", "conditions": [{"indicator": "RSI_14", "operator": "<", "value": 45}]},
            {"type": "exit", "conditions": [{"indicator": "RSI_14", "operator": ">", "value": 55}]}
        ]}"#;
        let strategy = parse_strategy_document(text).unwrap();
        let bars = SampleDataAdapter::new(date(2024, 6, 28), vec!["AAPL".into()])
            .fetch_bars("AAPL")
            .unwrap();

        let result = run_backtest(&bars, &strategy, &sample_config("AAPL"));
        assert!(result.error.is_none());
        assert_eq!(result.equity_curve.len(), bars.len() - WARMUP_BARS + 1);
        assert!(result.max_drawdown_pct >= 0.0);
        for pair in result.trades.windows(2) {
            assert_ne!(pair[0].trade_type, pair[1].trade_type);
        }
    }

    #[test]
    fn full_strategy_with_macd_columns() {
        let text = r#"{
            "indicators": [{"type": "MACD", "parameters": {"fast_period": 12, "slow_period": 26, "signal_period": 9}}],
            "entry_rules": [{"indicator": "MACD", "operator": ">", "value": "MACD_Signal"}],
            "exit_rules": [{"indicator": "MACD", "operator": "<", "value": "MACD_Signal"}]
        }"#;
        let strategy = parse_strategy_document(text).unwrap();
        let bars = SampleDataAdapter::new(date(2024, 6, 28), vec![])
            .fetch_bars("MSFT")
            .unwrap();

        let result = run_backtest(&bars, &strategy, &sample_config("MSFT"));
        assert!(result.error.is_none());
        assert_eq!(result.total_trades, result.trades.len());
    }
}

mod data_sources {
    use super::*;

    fn csv_port(symbol: &str, content: &str) -> (TempDir, CsvAdapter) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(format!("{symbol}.csv")), content).unwrap();
        let adapter = CsvAdapter::new(dir.path().to_path_buf());
        (dir, adapter)
    }

    fn assert_well_formed(result: &BacktestResult) {
        let json = serde_json::to_value(result).unwrap();
        for key in ["final_equity", "total_return", "sharpe_ratio", "max_drawdown"] {
            assert!(json[key].is_f64(), "{key} is {}", json[key]);
        }
        assert!(result.equity_curve.iter().all(|e| e.is_finite()));
        assert!(result.trades.iter().all(|t| t.price > 0.0 && t.value > 0.0));
    }

    #[test]
    fn zero_close_in_csv_is_dropped_before_the_run() {
        let mut bars = bars_from_closes("2024-01-01", &[100.0; 40]);
        bars[WARMUP_BARS].close = 0.0;
        let (_dir, port) = csv_port("ZERO", &bars_to_csv(&bars));

        let fetched = port.fetch_bars("ZERO").unwrap();
        assert_eq!(fetched.len(), 39);

        let result = run_backtest(&fetched, &buy_and_hold_strategy(), &sample_config("ZERO"));
        assert_well_formed(&result);
        assert_eq!(result.total_trades, 1);
        assert_eq!(result.trades[0].shares, 100);
        assert_eq!(result.final_equity, 10_000.0);
        assert_eq!(result.total_return_pct, 0.0);
    }

    #[test]
    fn malformed_csv_rows_do_not_reach_the_report() {
        let good = bars_from_closes("2024-01-01", &alternating_closes(40));
        let mut content = bars_to_csv(&good);
        content.push_str("2024-02-10,100,90,95,100,1000\n");
        content.push_str("2024-02-11,100,110,90,NaN,1000\n");
        content.push_str("2024-02-12,-3,110,-5,100,1000\n");
        content.push_str("2024-02-13,100,110,90,105,-20\n");
        let (_dir, port) = csv_port("MIXED", &content);

        let fetched = port.fetch_bars("MIXED").unwrap();
        assert_eq!(fetched, good);

        let strategy = sma_cross_strategy(5);
        let config = sample_config("MIXED");
        let result = run_backtest(&fetched, &strategy, &config);
        assert_well_formed(&result);
        assert_eq!(result, run_backtest(&good, &strategy, &config));
    }

    #[test]
    fn invalid_bars_from_any_source_are_absorbed() {
        let mut bars = bars_from_closes("2024-01-01", &[100.0; 45]);
        bars[WARMUP_BARS].close = 0.0;
        bars[WARMUP_BARS + 3].close = f64::NAN;
        bars[WARMUP_BARS + 5].close = -1.0;
        let port = MockDataPort::new().with_bars("RAW", bars);

        let fetched = port.fetch_bars("RAW").unwrap();
        let result = run_backtest(&fetched, &buy_and_hold_strategy(), &sample_config("RAW"));

        assert!(result.error.is_none());
        assert_well_formed(&result);
        assert_eq!(result.equity_curve.len(), 42 - WARMUP_BARS + 1);
        assert_eq!(result.final_equity, 10_000.0);
    }

    #[test]
    fn failing_primary_falls_back_to_sample() {
        let primary = MockDataPort::new().with_error("AAPL", "connection refused");
        let sample = SampleDataAdapter::new(date(2024, 6, 28), vec!["AAPL".into()]);
        let expected = sample.generate("AAPL");

        let adapter = FallbackDataAdapter::new(Box::new(primary), sample);
        assert_eq!(adapter.fetch_bars("AAPL").unwrap(), expected);
    }

    #[test]
    fn primary_data_is_used_when_present() {
        let bars = bars_from_closes("2024-01-01", &alternating_closes(40));
        let primary = MockDataPort::new().with_bars("TEST", bars.clone());
        let sample = SampleDataAdapter::new(date(2024, 6, 28), vec![]);

        let adapter = FallbackDataAdapter::new(Box::new(primary), sample);
        assert_eq!(adapter.fetch_bars("TEST").unwrap(), bars);
        assert_eq!(adapter.list_symbols().unwrap(), vec!["TEST"]);
    }
}
