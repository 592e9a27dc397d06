//! Volume Weighted Average Price indicator.
//!
//! VWAP = sum(typical_price * volume) / sum(volume) over either the trailing
//! N bars or every bar of the current calendar session so far. A point is
//! invalid when the rolling window is not yet full or its volume is zero.

use crate::domain::bar::Bar;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VwapWindow {
    /// The most recent N bars.
    Rolling(usize),
    /// Bars sharing the current bar's calendar date.
    Session,
}

impl Default for VwapWindow {
    fn default() -> Self {
        VwapWindow::Rolling(1)
    }
}

impl fmt::Display for VwapWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VwapWindow::Rolling(n) => write!(f, "rolling:{}", n),
            VwapWindow::Session => write!(f, "session"),
        }
    }
}

impl FromStr for VwapWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        if s == "session" {
            return Ok(VwapWindow::Session);
        }
        match s.strip_prefix("rolling:") {
            Some(n) => match n.trim().parse::<usize>() {
                Ok(0) => Err("rolling VWAP length must be at least 1".to_string()),
                Ok(n) => Ok(VwapWindow::Rolling(n)),
                Err(_) => Err(format!("invalid rolling VWAP length '{}'", n.trim())),
            },
            None => Err(format!(
                "unknown VWAP window '{}' (expected 'session' or 'rolling:N')",
                s
            )),
        }
    }
}

pub fn calculate_vwap(bars: &[Bar], window: VwapWindow) -> IndicatorSeries {
    let values = match window {
        VwapWindow::Rolling(length) => rolling(bars, length),
        VwapWindow::Session => session(bars),
    };
    IndicatorSeries {
        indicator_type: IndicatorType::Vwap(window),
        values,
    }
}

fn rolling(bars: &[Bar], length: usize) -> Vec<IndicatorPoint> {
    if length == 0 {
        return Vec::new();
    }

    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            if i + 1 < length {
                return IndicatorPoint {
                    timestamp: bar.timestamp,
                    valid: false,
                    value: 0.0,
                };
            }
            let (pv, vol) = bars[i + 1 - length..=i]
                .iter()
                .fold((0.0, 0.0), |(pv, vol), b| {
                    (pv + b.typical_price() * b.volume as f64, vol + b.volume as f64)
                });
            point(bar, pv, vol)
        })
        .collect()
}

fn session(bars: &[Bar]) -> Vec<IndicatorPoint> {
    let mut values = Vec::with_capacity(bars.len());
    let mut pv = 0.0;
    let mut vol = 0.0;
    let mut current_date = None;

    for bar in bars {
        let date = bar.timestamp.date();
        if current_date != Some(date) {
            current_date = Some(date);
            pv = 0.0;
            vol = 0.0;
        }
        pv += bar.typical_price() * bar.volume as f64;
        vol += bar.volume as f64;
        values.push(point(bar, pv, vol));
    }

    values
}

fn point(bar: &Bar, pv: f64, vol: f64) -> IndicatorPoint {
    if vol > 0.0 {
        IndicatorPoint {
            timestamp: bar.timestamp,
            valid: true,
            value: pv / vol,
        }
    } else {
        IndicatorPoint {
            timestamp: bar.timestamp,
            valid: false,
            value: 0.0,
        }
    }
}
