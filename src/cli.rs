//! CLI definition and dispatch.

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::fallback_adapter::FallbackDataAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::adapters::sample_data_adapter::SampleDataAdapter;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig, BacktestResult};
use crate::domain::block_parser::parse_strategy_document;
use crate::domain::config_validation::{
    check_date_order, load_backtest_config, parse_date, validate_backtest_config, DEFAULT_SYMBOL,
};
use crate::domain::error::AlgoblocksError;
use crate::domain::metrics::TradeStats;
use crate::domain::strategy::Strategy;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "algoblocks", about = "Rule-based strategy backtester")]
pub struct Cli {
    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        strategy: PathBuf,
        /// Write the JSON result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        symbol: Option<String>,
        /// YYYY-MM-DD
        #[arg(long)]
        start: Option<String>,
        /// YYYY-MM-DD
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        capital: Option<f64>,
    },
    /// Normalize a strategy file and print it
    Validate {
        #[arg(short, long)]
        strategy: PathBuf,
    },
    /// List symbols available from the configured data source
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Command line overrides for `[backtest]` values.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub symbol: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub capital: Option<f64>,
}

pub fn run(cli: Cli) -> ExitCode {
    init_logging(cli.verbose);

    let outcome = match cli.command {
        Command::Backtest {
            config,
            strategy,
            output,
            symbol,
            start,
            end,
            capital,
        } => {
            let overrides = Overrides {
                symbol,
                start,
                end,
                capital,
            };
            run_backtest(&config, &strategy, output.as_deref(), &overrides)
        }
        Command::Validate { strategy } => run_validate(&strategy),
        Command::ListSymbols { config } => run_list_symbols(&config),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over `-v`.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Ignore an already-installed subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, AlgoblocksError> {
    eprintln!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

/// Read, normalize and complete a strategy file.
pub fn load_strategy(path: &Path) -> Result<Strategy, AlgoblocksError> {
    let text = fs::read_to_string(path)?;
    let mut strategy = parse_strategy_document(&text)?;
    if strategy.fill_default_rules() {
        info!(
            entry_rules = strategy.entry_rules.len(),
            exit_rules = strategy.exit_rules.len(),
            "filled default rules"
        );
    }
    Ok(strategy)
}

pub fn build_backtest_config(
    adapter: &dyn ConfigPort,
    overrides: &Overrides,
) -> Result<BacktestConfig, AlgoblocksError> {
    let mut config = load_backtest_config(adapter)?;

    if let Some(symbol) = overrides.symbol.as_deref().map(str::trim) {
        if symbol.is_empty() {
            return Err(AlgoblocksError::ConfigInvalid {
                section: "backtest".into(),
                key: "symbol".into(),
                reason: "symbol must not be empty".into(),
            });
        }
        config.symbol = symbol.to_uppercase();
    }
    if let Some(start) = &overrides.start {
        config.start_date = Some(parse_date(start, "backtest", "start_date")?);
    }
    if let Some(end) = &overrides.end {
        config.end_date = Some(parse_date(end, "backtest", "end_date")?);
    }
    if let Some(capital) = overrides.capital {
        if capital <= 0.0 || !capital.is_finite() {
            return Err(AlgoblocksError::ConfigInvalid {
                section: "backtest".into(),
                key: "initial_capital".into(),
                reason: "initial_capital must be positive".into(),
            });
        }
        config.initial_capital = capital;
    }

    check_date_order(config.start_date, config.end_date)?;
    Ok(config)
}

/// Data source from `[data]`: CSV directory (optionally with sample
/// fallback) or the synthetic sample series.
pub fn build_data_port(adapter: &dyn ConfigPort) -> Result<Box<dyn DataPort>, AlgoblocksError> {
    let sample = build_sample_adapter(adapter)?;
    let source = adapter
        .get_string("data", "source")
        .map(|s| s.trim().to_lowercase())
        .unwrap_or_else(|| "sample".to_string());

    match source.as_str() {
        "sample" => Ok(Box::new(sample)),
        "csv" => {
            let dir = adapter
                .get_string("data", "dir")
                .filter(|d| !d.trim().is_empty())
                .ok_or_else(|| AlgoblocksError::ConfigMissing {
                    section: "data".into(),
                    key: "dir".into(),
                })?;
            let csv = CsvAdapter::new(PathBuf::from(dir.trim()));
            if adapter.get_bool("data", "fallback_to_sample", true) {
                Ok(Box::new(FallbackDataAdapter::new(Box::new(csv), sample)))
            } else {
                Ok(Box::new(csv))
            }
        }
        other => Err(AlgoblocksError::ConfigInvalid {
            section: "data".into(),
            key: "source".into(),
            reason: format!("unknown source '{}'", other),
        }),
    }
}

fn build_sample_adapter(adapter: &dyn ConfigPort) -> Result<SampleDataAdapter, AlgoblocksError> {
    let end_date: NaiveDate = match adapter.get_string("data", "sample_end_date") {
        Some(s) if !s.trim().is_empty() => parse_date(&s, "data", "sample_end_date")?,
        _ => Local::now().date_naive(),
    };

    let mut symbols: Vec<String> = adapter
        .get_string("data", "symbols")
        .map(|s| {
            s.split(',')
                .map(|sym| sym.trim().to_uppercase())
                .filter(|sym| !sym.is_empty())
                .collect()
        })
        .unwrap_or_default();
    if symbols.is_empty() {
        symbols.push(
            adapter
                .get_string("backtest", "symbol")
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_SYMBOL.to_string()),
        );
    }

    Ok(SampleDataAdapter::new(end_date, symbols))
}

/// Fetch, run and report. Returns the result document that was emitted.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    strategy: &Strategy,
    config: &BacktestConfig,
    output_path: Option<&Path>,
) -> Result<BacktestResult, AlgoblocksError> {
    let bars = data_port.fetch_bars(&config.symbol)?;
    if bars.is_empty() {
        return Err(AlgoblocksError::NoData {
            symbol: config.symbol.clone(),
        });
    }
    debug!(symbol = %config.symbol, bars = bars.len(), "fetched history");

    eprintln!(
        "Running backtest: {} ({} bars), capital {:.2}",
        config.symbol,
        bars.len(),
        config.initial_capital
    );

    let result = backtest_engine::run_backtest(&bars, strategy, config);
    print_summary(&result);

    let report = JsonReportAdapter::new(true);
    match output_path {
        Some(path) => {
            let path_str = path.to_string_lossy();
            report.write(&result, &path_str)?;
            eprintln!("\nResult written to: {}", path.display());
        }
        None => println!("{}", report.render(&result)?),
    }

    Ok(result)
}

fn print_summary(result: &BacktestResult) {
    if let Some(reason) = &result.error {
        eprintln!("\n{}", reason);
        return;
    }

    let stats = TradeStats::from_trades(&result.trades);

    eprintln!("\n=== Results ===");
    eprintln!("Initial Capital:  {:.2}", result.initial_capital);
    eprintln!("Final Equity:     {:.2}", result.final_equity);
    eprintln!("Total Return:     {:.2}%", result.total_return_pct);
    eprintln!("Sharpe Ratio:     {:.2}", result.sharpe_ratio);
    eprintln!("Max Drawdown:     -{:.2}%", result.max_drawdown_pct);
    eprintln!("Total Trades:     {}", result.total_trades);
    eprintln!("Round Trips:      {}", stats.round_trips);
    eprintln!("Win Rate:         {:.1}%", stats.win_rate_pct);
    if stats.open_position {
        eprintln!("Open Position:    yes");
    }
}

fn run_backtest(
    config_path: &Path,
    strategy_path: &Path,
    output_path: Option<&Path>,
    overrides: &Overrides,
) -> Result<(), AlgoblocksError> {
    let adapter = load_config(config_path)?;
    validate_backtest_config(&adapter)?;

    eprintln!("Loading strategy from {}", strategy_path.display());
    let strategy = load_strategy(strategy_path)?;

    let config = build_backtest_config(&adapter, overrides)?;
    let data_port = build_data_port(&adapter)?;

    run_backtest_pipeline(data_port.as_ref(), &strategy, &config, output_path)?;
    Ok(())
}

fn run_validate(strategy_path: &Path) -> Result<(), AlgoblocksError> {
    eprintln!("Validating strategy: {}", strategy_path.display());
    let strategy = load_strategy(strategy_path)?;

    eprintln!("\nIndicators:");
    for spec in &strategy.indicators {
        eprintln!("  {}", spec);
    }
    eprintln!("\nEntry Rules:");
    for rule in &strategy.entry_rules {
        eprintln!("  {}", rule);
    }
    eprintln!("\nExit Rules:");
    for rule in &strategy.exit_rules {
        eprintln!("  {}", rule);
    }

    let text = serde_json::to_string_pretty(&strategy).map_err(AlgoblocksError::Render)?;
    println!("{}", text);
    eprintln!("\nStrategy is valid.");
    Ok(())
}

fn run_list_symbols(config_path: &Path) -> Result<(), AlgoblocksError> {
    let adapter = load_config(config_path)?;
    validate_backtest_config(&adapter)?;
    let data_port = build_data_port(&adapter)?;

    let symbols = data_port.list_symbols()?;
    if symbols.is_empty() {
        eprintln!("No symbols found");
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    Ok(())
}
