//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_allocation_sink::CsvAllocationSink;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::native_indicators::NativeIndicators;
use crate::domain::allocation::Holdings;
use crate::domain::config_validation::{parse_instruments, validate_strategy_config};
use crate::domain::error::PullbackError;
use crate::domain::evaluator::{SignalEvaluator, StepOutcome};
use crate::domain::indicator::VwapWindow;
use crate::domain::policy::{Interval, StrategyPolicy};
use crate::domain::replay::run_replay;
use crate::domain::timeline::{build_timeline, Step};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::MarketDataPort;

#[derive(Parser, Debug)]
#[command(name = "pullback", about = "EMA/VWAP pullback signal evaluator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate the latest step and print target allocations
    Evaluate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        data: Option<PathBuf>,
        /// Current holding as SYMBOL=EXPOSURE (repeatable)
        #[arg(long = "holding", value_parser = parse_holding)]
        holdings: Vec<(String, f64)>,
    },
    /// Replay a recorded history step by step, writing allocations to CSV
    Replay {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        data: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a strategy configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Evaluate {
            config,
            data,
            holdings,
        } => run_evaluate(&config, data.as_deref(), &holdings),
        Command::Replay {
            config,
            data,
            output,
        } => run_replay_command(&config, data.as_deref(), output.as_deref()),
        Command::Validate { config } => run_validate(&config),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            (&e).into()
        }
    }
}

pub fn parse_holding(s: &str) -> Result<(String, f64), String> {
    let (symbol, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected SYMBOL=EXPOSURE, got '{}'", s))?;
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(format!("missing symbol in '{}'", s));
    }
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|e| format!("invalid exposure in '{}': {}", s, e))?;
    Ok((symbol, value))
}

pub fn build_policy(config: &dyn ConfigPort) -> Result<StrategyPolicy, PullbackError> {
    validate_strategy_config(config)?;
    let defaults = StrategyPolicy::default();

    let instruments = match config.get_string("strategy", "instruments") {
        Some(s) => parse_instruments(&s)?,
        None => defaults.instruments,
    };
    let interval = match config.get_string("strategy", "interval") {
        Some(s) => s.parse::<Interval>().map_err(|reason| invalid("interval", reason))?,
        None => defaults.interval,
    };
    let vwap_window = match config.get_string("strategy", "vwap") {
        Some(s) => s.parse::<VwapWindow>().map_err(|reason| invalid("vwap", reason))?,
        None => defaults.vwap_window,
    };

    Ok(StrategyPolicy {
        name: config
            .get_string("strategy", "name")
            .unwrap_or(defaults.name),
        instruments,
        interval,
        allow_short: config.get_bool("strategy", "allow_short", defaults.allow_short),
        entry_size: config.get_double("strategy", "entry_size", defaults.entry_size),
        min_bars: config.get_int("strategy", "min_bars", defaults.min_bars as i64) as usize,
        ema_fast_period: config.get_int("strategy", "ema_fast", defaults.ema_fast_period as i64)
            as usize,
        ema_slow_period: config.get_int("strategy", "ema_slow", defaults.ema_slow_period as i64)
            as usize,
        vwap_window,
        lookback: config.get_int("strategy", "lookback", defaults.lookback as i64) as usize,
    })
}

fn invalid(key: &str, reason: String) -> PullbackError {
    PullbackError::ConfigInvalid {
        section: "strategy".into(),
        key: key.into(),
        reason,
    }
}

pub fn resolve_data_path(data_override: Option<&Path>, config: &dyn ConfigPort) -> PathBuf {
    data_override
        .map(Path::to_path_buf)
        .or_else(|| config.get_string("data", "path").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("data"))
}

/// Loads every tracked instrument and merges them into one timeline.
/// Instruments that fail to load are skipped; if none load, returns `NoData`.
pub fn load_timeline(
    data_port: &dyn MarketDataPort,
    instruments: &[String],
) -> Result<Vec<Step>, PullbackError> {
    let mut series = HashMap::new();
    for instrument in instruments {
        match data_port.fetch_bars(instrument) {
            Ok(bars) if bars.is_empty() => log::warn!("skipping {}: no bars", instrument),
            Ok(bars) => {
                series.insert(instrument.clone(), bars);
            }
            Err(e) => log::warn!("skipping {}: {}", instrument, e),
        }
    }
    if series.is_empty() {
        return Err(PullbackError::NoData {
            instrument: instruments.join(","),
        });
    }
    Ok(build_timeline(&series))
}

pub fn evaluate_latest(
    policy: StrategyPolicy,
    timeline: &[Step],
    holdings: &Holdings,
) -> StepOutcome {
    let start = timeline.len().saturating_sub(policy.lookback.max(1));
    let evaluator = SignalEvaluator::new(policy, NativeIndicators);
    evaluator.evaluate(&timeline[start..], holdings)
}

fn load_config(path: &Path) -> Result<FileConfigAdapter, PullbackError> {
    log::info!("loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

fn run_evaluate(
    config_path: &Path,
    data_override: Option<&Path>,
    holdings: &[(String, f64)],
) -> Result<(), PullbackError> {
    let config = load_config(config_path)?;
    let policy = build_policy(&config)?;
    let data_port = CsvAdapter::new(resolve_data_path(data_override, &config));
    let timeline = load_timeline(&data_port, &policy.instruments)?;

    let holdings = holdings
        .iter()
        .fold(Holdings::new(), |h, (symbol, value)| h.with(symbol, *value));

    let outcome = evaluate_latest(policy, &timeline, &holdings);
    for (instrument, target) in outcome.allocation.iter() {
        if let Some(decision) = outcome.decisions.get(instrument) {
            log::info!("{}: {}", instrument, decision.reason);
        }
        println!("{}={}", instrument, target);
    }
    Ok(())
}

fn run_replay_command(
    config_path: &Path,
    data_override: Option<&Path>,
    output_override: Option<&Path>,
) -> Result<(), PullbackError> {
    let config = load_config(config_path)?;
    let policy = build_policy(&config)?;
    let data_port = CsvAdapter::new(resolve_data_path(data_override, &config));
    let timeline = load_timeline(&data_port, &policy.instruments)?;

    let output = output_override
        .map(Path::to_path_buf)
        .or_else(|| config.get_string("output", "path").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("allocations.csv"));

    log::info!(
        "replaying {} steps for {} ({})",
        timeline.len(),
        policy.instruments.join(","),
        policy.interval
    );
    let evaluator = SignalEvaluator::new(policy, NativeIndicators);
    let mut sink = CsvAllocationSink::from_path(&output)?;
    run_replay(&evaluator, &timeline, &mut sink)?;
    log::info!("allocations written to {}", output.display());
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), PullbackError> {
    let config = load_config(config_path)?;
    let policy = build_policy(&config)?;

    println!("Strategy:     {}", policy.name);
    println!("Instruments:  {}", policy.instruments.join(", "));
    println!("Interval:     {}", policy.interval);
    println!("Allow short:  {}", policy.allow_short);
    println!("Entry size:   {}", policy.entry_size);
    println!("Min bars:     {}", policy.min_bars);
    println!(
        "EMA periods:  {} / {}",
        policy.ema_fast_period, policy.ema_slow_period
    );
    println!("VWAP window:  {}", policy.vwap_window);
    println!("Lookback:     {}", policy.lookback);
    log::info!("configuration is valid");
    Ok(())
}
