//! Indicator snapshot and the boolean conditions derived from it.

use crate::domain::error::SignalError;

/// Validated indicator values at the current step. Every field is finite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorSnapshot {
    pub close: f64,
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub vwap: f64,
}

impl IndicatorSnapshot {
    pub fn new(close: f64, ema_fast: f64, ema_slow: f64, vwap: f64) -> Result<Self, SignalError> {
        for (field, value) in [
            ("ema_fast", ema_fast),
            ("ema_slow", ema_slow),
            ("vwap", vwap),
            ("close", close),
        ] {
            if !value.is_finite() {
                return Err(SignalError::InvalidNumericResult { field, value });
            }
        }
        Ok(Self {
            close,
            ema_fast,
            ema_slow,
            vwap,
        })
    }

    pub fn conditions(&self) -> Conditions {
        let IndicatorSnapshot {
            close,
            ema_fast,
            ema_slow,
            vwap,
        } = *self;
        Conditions {
            uptrend: close > vwap && ema_fast > ema_slow,
            downtrend: close < vwap && ema_fast < ema_slow,
            long_pullback: close < ema_fast && close > ema_slow,
            short_pullback: close > ema_fast && close < ema_slow,
        }
    }

    /// Long stop: close fell through the slow EMA.
    pub fn long_stop_hit(&self) -> bool {
        self.close < self.ema_slow
    }

    pub fn short_stop_hit(&self) -> bool {
        self.close > self.ema_slow
    }

    pub fn long_trend_broken(&self) -> bool {
        self.close < self.vwap || self.ema_fast < self.ema_slow
    }

    pub fn short_trend_broken(&self) -> bool {
        self.close > self.vwap || self.ema_fast > self.ema_slow
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conditions {
    pub uptrend: bool,
    pub downtrend: bool,
    pub long_pullback: bool,
    pub short_pullback: bool,
}

impl Conditions {
    pub fn long_entry(&self) -> bool {
        self.uptrend && self.long_pullback
    }

    pub fn short_entry(&self) -> bool {
        self.downtrend && self.short_pullback
    }
}
