//! Indicator service backed by the in-crate EMA and VWAP series.

use crate::domain::error::IndicatorError;
use crate::domain::indicator::ema::calculate_ema;
use crate::domain::indicator::vwap::calculate_vwap;
use crate::domain::indicator::VwapWindow;
use crate::domain::timeline::BarWindow;
use crate::ports::indicator_port::IndicatorPort;

#[derive(Debug, Clone, Copy, Default)]
pub struct NativeIndicators;

impl IndicatorPort for NativeIndicators {
    fn ema(&self, window: &BarWindow, period: usize) -> Result<f64, IndicatorError> {
        if period == 0 {
            return Err(IndicatorError::InvalidPeriod(period));
        }
        if window.len() < period {
            return Err(IndicatorError::InsufficientData {
                required: period,
                available: window.len(),
            });
        }
        calculate_ema(window.bars(), period)
            .latest_valid()
            .ok_or(IndicatorError::InsufficientData {
                required: period,
                available: window.len(),
            })
    }

    fn vwap(&self, window: &BarWindow, vwap_window: VwapWindow) -> Result<f64, IndicatorError> {
        match vwap_window {
            VwapWindow::Rolling(0) => return Err(IndicatorError::InvalidPeriod(0)),
            VwapWindow::Rolling(n) if window.len() < n => {
                return Err(IndicatorError::InsufficientData {
                    required: n,
                    available: window.len(),
                });
            }
            _ => {}
        }
        if window.is_empty() {
            return Err(IndicatorError::InsufficientData {
                required: 1,
                available: 0,
            });
        }
        calculate_vwap(window.bars(), vwap_window)
            .latest_valid()
            .ok_or(IndicatorError::ZeroVolume)
    }
}
