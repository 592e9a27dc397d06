//! Configuration validation.
//!
//! Validates all `[strategy]` fields before any bars are loaded.

use crate::domain::error::PullbackError;
use crate::domain::indicator::VwapWindow;
use crate::domain::policy::Interval;
use crate::ports::config_port::ConfigPort;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), PullbackError> {
    validate_instruments(config)?;
    validate_interval(config)?;
    validate_entry_size(config)?;
    validate_ema_periods(config)?;
    validate_min_bars(config)?;
    validate_vwap(config)?;
    validate_lookback(config)?;
    Ok(())
}

fn invalid(key: &str, reason: impl Into<String>) -> PullbackError {
    PullbackError::ConfigInvalid {
        section: "strategy".to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Parses a comma-separated instrument list, rejecting empty and duplicate entries.
pub fn parse_instruments(input: &str) -> Result<Vec<String>, PullbackError> {
    let mut instruments = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(invalid("instruments", "empty entry in instrument list"));
        }
        let instrument = trimmed.to_uppercase();
        if !seen.insert(instrument.clone()) {
            return Err(invalid(
                "instruments",
                format!("duplicate instrument {}", instrument),
            ));
        }
        instruments.push(instrument);
    }

    Ok(instruments)
}

fn validate_instruments(config: &dyn ConfigPort) -> Result<(), PullbackError> {
    match config.get_string("strategy", "instruments") {
        Some(s) if !s.trim().is_empty() => parse_instruments(&s).map(|_| ()),
        _ => Err(PullbackError::ConfigMissing {
            section: "strategy".to_string(),
            key: "instruments".to_string(),
        }),
    }
}

fn validate_interval(config: &dyn ConfigPort) -> Result<(), PullbackError> {
    match config.get_string("strategy", "interval") {
        Some(s) => s.parse::<Interval>().map(|_| ()).map_err(|e| invalid("interval", e)),
        None => Ok(()),
    }
}

/// Reads a numeric key from its raw string so that a malformed value is an
/// error instead of silently falling back to `default`.
fn number<T>(config: &dyn ConfigPort, key: &str, default: T) -> Result<T, PullbackError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match config.get_string("strategy", key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| invalid(key, format!("'{}' is not a number: {}", raw.trim(), e))),
        None => Ok(default),
    }
}

fn validate_entry_size(config: &dyn ConfigPort) -> Result<(), PullbackError> {
    let value: f64 = number(config, "entry_size", 0.10)?;
    if !value.is_finite() || value <= 0.0 || value > 1.0 {
        return Err(invalid("entry_size", "entry_size must be in (0, 1]"));
    }
    Ok(())
}

fn validate_ema_periods(config: &dyn ConfigPort) -> Result<(), PullbackError> {
    let fast: i64 = number(config, "ema_fast", 9)?;
    let slow: i64 = number(config, "ema_slow", 20)?;
    if fast < 1 {
        return Err(invalid("ema_fast", "ema_fast must be at least 1"));
    }
    if slow <= fast {
        return Err(invalid("ema_slow", "ema_slow must be greater than ema_fast"));
    }
    Ok(())
}

fn validate_min_bars(config: &dyn ConfigPort) -> Result<(), PullbackError> {
    let min_bars: i64 = number(config, "min_bars", 50)?;
    let slow: i64 = number(config, "ema_slow", 20)?;
    if min_bars < slow {
        return Err(invalid(
            "min_bars",
            format!("min_bars must be at least ema_slow ({})", slow),
        ));
    }
    Ok(())
}

fn validate_vwap(config: &dyn ConfigPort) -> Result<(), PullbackError> {
    match config.get_string("strategy", "vwap") {
        Some(s) => s.parse::<VwapWindow>().map(|_| ()).map_err(|e| invalid("vwap", e)),
        None => Ok(()),
    }
}

fn validate_lookback(config: &dyn ConfigPort) -> Result<(), PullbackError> {
    let lookback: i64 = number(config, "lookback", 500)?;
    let min_bars: i64 = number(config, "min_bars", 50)?;
    if lookback < min_bars {
        return Err(invalid(
            "lookback",
            format!("lookback must be at least min_bars ({})", min_bars),
        ));
    }
    Ok(())
}
