//! CLI definition and dispatch.

use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::adapters::live_execution::LiveExecution;
use crate::adapters::log_notify_adapter::LogNotifyAdapter;
use crate::adapters::paper_broker::PaperBroker;
use crate::domain::backtest::{run_backtest as run_engine, BacktestResult, SymbolSeries};
use crate::domain::error::KvantError;
use crate::domain::execution::SimExecution;
use crate::domain::live::LiveSession;
use crate::domain::optimize::{run_grid_search, OptimizeMetric, ParamGrid};
use crate::domain::settings::Settings;
use crate::domain::strategy::StrategyKind;
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::notify_port::NullNotifier;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "kvant", about = "Algorithmic trading decision core")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay the decision logic over historical data
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory with per-symbol CSV files
        #[arg(short, long, default_value = "data")]
        data_dir: PathBuf,
        /// Write the full result as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Override the configured symbol list
        #[arg(long)]
        symbols: Option<String>,
    },
    /// Run the polling decision loop against the paper broker
    Run {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long, default_value = "data")]
        data_dir: PathBuf,
        /// Stop after this many polling passes (default: run until killed)
        #[arg(long)]
        iterations: Option<u64>,
    },
    /// Grid-search strategy parameters over historical data
    Optimize {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long, default_value = "data")]
        data_dir: PathBuf,
        /// Which stock grid to sweep: trend, reversal or combined
        #[arg(long, default_value = "trend")]
        strategy: String,
        /// Ranking metric: sharpe_ratio, total_return, win_rate, profit_factor
        #[arg(long, default_value = "sharpe_ratio")]
        metric: String,
        /// How many ranked combinations to print
        #[arg(long, default_value_t = 10)]
        top: usize,
        /// Write the full ranked result as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            data_dir,
            output,
            symbols,
        } => run_backtest_command(&config, &data_dir, output.as_deref(), symbols.as_deref()),
        Command::Run {
            config,
            data_dir,
            iterations,
        } => run_live_command(&config, &data_dir, iterations),
        Command::Optimize {
            config,
            data_dir,
            strategy,
            metric,
            top,
            output,
        } => run_optimize_command(
            &config,
            &data_dir,
            &strategy,
            &metric,
            top,
            output.as_deref(),
        ),
        Command::Validate { config } => run_validate(&config),
    }
}

fn load_settings(config_path: &PathBuf) -> Result<Settings, KvantError> {
    let adapter = FileConfigAdapter::from_file(config_path)?;
    Settings::from_config(&adapter)
}

fn fail(err: &KvantError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

fn run_backtest_command(
    config_path: &PathBuf,
    data_dir: &PathBuf,
    output_path: Option<&std::path::Path>,
    symbol_override: Option<&str>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let mut settings = match load_settings(config_path) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    if let Some(raw) = symbol_override {
        settings.symbols = match crate::domain::settings::parse_symbols(raw) {
            Ok(symbols) => symbols,
            Err(e) => return fail(&e),
        };
    }

    eprintln!(
        "Backtesting {} on {} symbol(s), mode {}",
        settings
            .active_strategies
            .iter()
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join("+"),
        settings.symbols.len(),
        settings.strategy_mode
    );

    let data = CsvAdapter::new(data_dir.clone());
    let series = match fetch_all(&data, &settings) {
        Ok(series) => series,
        Err(e) => return fail(&e),
    };

    let mut exec = SimExecution::new(settings.commission_rate);
    let result = match run_engine(&series, &settings, &mut exec, &NullNotifier) {
        Ok(result) => result,
        Err(e) => return fail(&e),
    };

    print_summary(&result);

    if let Some(path) = output_path {
        if let Err(e) = JsonReportAdapter.write(&result, path) {
            return fail(&e);
        }
        eprintln!("Report written to {}", path.display());
    }

    ExitCode::SUCCESS
}

fn fetch_all(
    data: &dyn MarketDataPort,
    settings: &Settings,
) -> Result<Vec<SymbolSeries>, KvantError> {
    let mut series = Vec::with_capacity(settings.symbols.len());
    for symbol in &settings.symbols {
        let bars = data.fetch_bars(
            symbol,
            settings.timeframe,
            NaiveDateTime::MIN,
            NaiveDateTime::MAX,
        )?;
        eprintln!("  {}: {} bars", symbol, bars.len());
        series.push(SymbolSeries {
            symbol: symbol.clone(),
            bars,
        });
    }
    Ok(series)
}

fn print_summary(result: &BacktestResult) {
    let s = &result.summary;
    println!("Initial capital:    {:>12.2}", s.initial_capital);
    println!("Final capital:      {:>12.2}", s.final_capital);
    println!("Total return:       {:>11.2}%", s.total_return * 100.0);
    println!("Annualized return:  {:>11.2}%", s.annualized_return * 100.0);
    println!("Sharpe ratio:       {:>12.2}", s.sharpe_ratio);
    println!("Max drawdown:       {:>11.2}%", s.max_drawdown * 100.0);
    println!(
        "Trades:             {:>12} ({} won / {} lost)",
        s.total_trades, s.trades_won, s.trades_lost
    );
    println!("Win rate:           {:>11.2}%", s.win_rate * 100.0);
    println!("Avg trade duration: {:>9.1} days", s.avg_trade_duration_days);
    println!("Commission paid:    {:>12.2}", s.commission_paid);
    for skipped in &result.skipped {
        println!("Skipped {}: {:?}", skipped.symbol, skipped.reason);
    }
}

fn run_live_command(
    config_path: &PathBuf,
    data_dir: &PathBuf,
    iterations: Option<u64>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let settings = match load_settings(config_path) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    let data = CsvAdapter::new(data_dir.clone());
    let notify = LogNotifyAdapter;
    let broker = PaperBroker::new(settings.commission_rate);
    let mut exec = LiveExecution::new(
        broker,
        Duration::from_secs(settings.order_timeout_secs),
    );

    let interval = Duration::from_secs(settings.update_interval_secs);
    let mut session = LiveSession::new(settings);

    eprintln!(
        "Polling every {}s ({} pass cap); paper broker",
        interval.as_secs(),
        iterations.map_or("no".to_string(), |n| n.to_string()),
    );

    let mut pass = 0u64;
    loop {
        let now = chrono::Local::now().naive_local();
        if let Err(e) = session.poll_once(&data, &mut exec, &notify, now) {
            return fail(&e);
        }
        pass += 1;
        if iterations.is_some_and(|cap| pass >= cap) {
            break;
        }
        std::thread::sleep(interval);
    }

    eprintln!(
        "Stopped after {} pass(es); {} open position(s), capital {:.2}",
        pass,
        session.open_count(),
        session.capital()
    );
    ExitCode::SUCCESS
}

fn run_optimize_command(
    config_path: &PathBuf,
    data_dir: &PathBuf,
    strategy: &str,
    metric: &str,
    top: usize,
    output_path: Option<&std::path::Path>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let mut settings = match load_settings(config_path) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    let (grid, active) = match strategy.trim().to_lowercase().as_str() {
        "trend" => (ParamGrid::trend(), vec![StrategyKind::Trend]),
        "reversal" => (ParamGrid::reversal(), vec![StrategyKind::Reversal]),
        "combined" => (
            ParamGrid::combined(),
            vec![StrategyKind::Trend, StrategyKind::Reversal],
        ),
        other => {
            eprintln!("error: unknown optimization grid: {other}");
            return ExitCode::from(2);
        }
    };
    settings.active_strategies = active;

    let metric: OptimizeMetric = match metric.parse() {
        Ok(m) => m,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };

    let data = CsvAdapter::new(data_dir.clone());
    let series = match fetch_all(&data, &settings) {
        Ok(series) => series,
        Err(e) => return fail(&e),
    };

    let result = match run_grid_search(&series, &settings, &grid, metric) {
        Ok(result) => result,
        Err(e) => return fail(&e),
    };

    println!(
        "Evaluated {}/{} combinations ({} skipped), ranked by {}",
        result.evaluated, result.combinations, result.skipped, result.metric
    );
    for (rank, candidate) in result.ranked.iter().take(top).enumerate() {
        let p = &candidate.params;
        println!(
            "{:>3}. score {:>8.4}  ema {}/{}  rsi {} ({:.0}/{:.0})  bb {}x{:.1}  sl {:.1}%  tp {:.1}%  \
             ({} trades, return {:.2}%)",
            rank + 1,
            candidate.score,
            p.ema_short,
            p.ema_long,
            p.rsi_period,
            p.rsi_oversold,
            p.rsi_overbought,
            p.bollinger_period,
            p.bollinger_std,
            p.stop_loss_percent,
            p.take_profit_percent,
            candidate.summary.total_trades,
            candidate.summary.total_return * 100.0,
        );
    }

    if let Some(path) = output_path {
        let write = || -> Result<(), KvantError> {
            let file = std::fs::File::create(path)?;
            serde_json::to_writer_pretty(std::io::BufWriter::new(file), &result).map_err(|e| {
                KvantError::Data {
                    reason: format!("failed to serialize optimization result: {e}"),
                }
            })
        };
        if let Err(e) = write() {
            return fail(&e);
        }
        eprintln!("Result written to {}", path.display());
    }

    ExitCode::SUCCESS
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    match load_settings(config_path) {
        Ok(settings) => {
            println!(
                "OK: {} symbol(s), strategies {}, mode {}",
                settings.symbols.len(),
                settings
                    .active_strategies
                    .iter()
                    .map(|k| k.to_string())
                    .collect::<Vec<_>>()
                    .join("+"),
                settings.strategy_mode
            );
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}
