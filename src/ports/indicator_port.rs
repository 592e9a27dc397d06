//! Indicator service port trait.
//!
//! Each call returns the indicator's value at the window's most recent bar,
//! or an explicit failure. Implementations may still hand back a non-finite
//! number; callers validate before use.

use crate::domain::error::IndicatorError;
use crate::domain::indicator::VwapWindow;
use crate::domain::timeline::BarWindow;

pub trait IndicatorPort {
    fn ema(&self, window: &BarWindow, period: usize) -> Result<f64, IndicatorError>;
    fn vwap(&self, window: &BarWindow, vwap_window: VwapWindow) -> Result<f64, IndicatorError>;
}
