#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
pub use pullback::domain::bar::Bar;
use pullback::domain::error::{IndicatorError, PullbackError};
use pullback::domain::evaluator::StepOutcome;
use pullback::domain::indicator::VwapWindow;
use pullback::domain::timeline::{build_timeline, BarWindow, Step};
use pullback::ports::allocation_port::AllocationSink;
use pullback::ports::data_port::MarketDataPort;
use pullback::ports::indicator_port::IndicatorPort;
use std::collections::HashMap;

/// What the scripted indicator service returns for one instrument.
#[derive(Debug, Clone, Copy)]
pub enum Script {
    Values { fast: f64, slow: f64, vwap: f64 },
    Fail,
    Panic,
}

/// Indicator service with fixed per-instrument answers, keyed by the
/// window's instrument. Periods other than `fast_period` are the slow EMA.
pub struct ScriptedIndicators {
    pub fast_period: usize,
    pub scripts: HashMap<String, Script>,
}

impl ScriptedIndicators {
    pub fn new() -> Self {
        Self {
            fast_period: 9,
            scripts: HashMap::new(),
        }
    }

    pub fn with(mut self, instrument: &str, script: Script) -> Self {
        self.scripts.insert(instrument.to_string(), script);
        self
    }

    pub fn values(self, instrument: &str, fast: f64, slow: f64, vwap: f64) -> Self {
        self.with(instrument, Script::Values { fast, slow, vwap })
    }

    fn script(&self, window: &BarWindow) -> Result<(f64, f64, f64), IndicatorError> {
        match self.scripts.get(window.instrument()) {
            Some(Script::Values { fast, slow, vwap }) => Ok((*fast, *slow, *vwap)),
            Some(Script::Fail) | None => Err(IndicatorError::InsufficientData {
                required: 1,
                available: 0,
            }),
            Some(Script::Panic) => panic!("indicator backend crashed"),
        }
    }
}

impl IndicatorPort for ScriptedIndicators {
    fn ema(&self, window: &BarWindow, period: usize) -> Result<f64, IndicatorError> {
        let (fast, slow, _) = self.script(window)?;
        Ok(if period == self.fast_period { fast } else { slow })
    }

    fn vwap(&self, window: &BarWindow, _vwap_window: VwapWindow) -> Result<f64, IndicatorError> {
        self.script(window).map(|(_, _, vwap)| vwap)
    }
}

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, instrument: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(instrument.to_string(), bars);
        self
    }

    pub fn with_error(mut self, instrument: &str, reason: &str) -> Self {
        self.errors.insert(instrument.to_string(), reason.to_string());
        self
    }
}

impl MarketDataPort for MockDataPort {
    fn fetch_bars(&self, instrument: &str) -> Result<Vec<Bar>, PullbackError> {
        if let Some(reason) = self.errors.get(instrument) {
            return Err(PullbackError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(instrument).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub submitted: Vec<(NaiveDateTime, StepOutcome)>,
    pub finished: bool,
}

impl AllocationSink for RecordingSink {
    fn submit(&mut self, timestamp: NaiveDateTime, outcome: &StepOutcome) -> Result<(), PullbackError> {
        self.submitted.push((timestamp, outcome.clone()));
        Ok(())
    }

    fn finish(&mut self) -> Result<(), PullbackError> {
        self.finished = true;
        Ok(())
    }
}

pub fn session_start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 4)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
}

/// One-minute bars with close moving linearly from `start_price` by `step`.
pub fn generate_bars(count: usize, start_price: f64, step: f64) -> Vec<Bar> {
    (0..count)
        .map(|i| {
            let close = start_price + i as f64 * step;
            Bar {
                timestamp: session_start() + Duration::minutes(i as i64),
                open: close,
                high: close + 0.5,
                low: close - 0.5,
                close,
                volume: 1000,
            }
        })
        .collect()
}

/// Replaces the close of the final bar.
pub fn with_last_close(mut bars: Vec<Bar>, close: f64) -> Vec<Bar> {
    if let Some(last) = bars.last_mut() {
        last.close = close;
        last.open = close;
        last.high = close + 0.5;
        last.low = close - 0.5;
    }
    bars
}

pub fn timeline(series: &[(&str, Vec<Bar>)]) -> Vec<Step> {
    let map: HashMap<String, Vec<Bar>> = series
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    build_timeline(&map)
}

pub fn instruments(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
