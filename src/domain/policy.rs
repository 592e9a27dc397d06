//! Strategy policy and scheduling interval.

use crate::domain::indicator::VwapWindow;
use chrono::Duration;
use std::fmt;
use std::str::FromStr;

/// Bar granularity the platform schedules the strategy at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interval {
    OneMinute,
    TwoMinutes,
    FiveMinutes,
    FifteenMinutes,
    ThirtyMinutes,
    OneHour,
    FourHours,
    OneDay,
}

impl Interval {
    pub const ALL: [Interval; 8] = [
        Interval::OneMinute,
        Interval::TwoMinutes,
        Interval::FiveMinutes,
        Interval::FifteenMinutes,
        Interval::ThirtyMinutes,
        Interval::OneHour,
        Interval::FourHours,
        Interval::OneDay,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::OneMinute => "1min",
            Interval::TwoMinutes => "2min",
            Interval::FiveMinutes => "5min",
            Interval::FifteenMinutes => "15min",
            Interval::ThirtyMinutes => "30min",
            Interval::OneHour => "1hour",
            Interval::FourHours => "4hour",
            Interval::OneDay => "1day",
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            Interval::OneMinute => Duration::minutes(1),
            Interval::TwoMinutes => Duration::minutes(2),
            Interval::FiveMinutes => Duration::minutes(5),
            Interval::FifteenMinutes => Duration::minutes(15),
            Interval::ThirtyMinutes => Duration::minutes(30),
            Interval::OneHour => Duration::hours(1),
            Interval::FourHours => Duration::hours(4),
            Interval::OneDay => Duration::days(1),
        }
    }

    pub fn is_intraday(&self) -> bool {
        *self != Interval::OneDay
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        Interval::ALL
            .iter()
            .copied()
            .find(|i| i.as_str() == s)
            .ok_or_else(|| {
                let accepted: Vec<_> = Interval::ALL.iter().map(|i| i.as_str()).collect();
                format!("unknown interval '{}' (expected one of {})", s, accepted.join(", "))
            })
    }
}

/// Everything that parameterises the entry/exit rules.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyPolicy {
    pub name: String,
    pub instruments: Vec<String>,
    pub interval: Interval,
    pub allow_short: bool,
    /// Absolute exposure taken on entry; shorts enter at `-entry_size`.
    pub entry_size: f64,
    pub min_bars: usize,
    pub ema_fast_period: usize,
    pub ema_slow_period: usize,
    pub vwap_window: VwapWindow,
    /// Maximum number of steps handed to the evaluator by the replay driver.
    pub lookback: usize,
}

impl Default for StrategyPolicy {
    fn default() -> Self {
        Self {
            name: "EMA/VWAP Pullback".to_string(),
            instruments: vec!["SPY".to_string()],
            interval: Interval::OneMinute,
            allow_short: false,
            entry_size: 0.10,
            min_bars: 50,
            ema_fast_period: 9,
            ema_slow_period: 20,
            vwap_window: VwapWindow::Rolling(1),
            lookback: 500,
        }
    }
}
