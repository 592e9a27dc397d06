//! Signal evaluator and position manager.
//!
//! Once per step, each tracked instrument is taken through the same gates:
//! history sufficiency, indicator computation, numeric validity. Only a
//! snapshot that clears all three reaches the entry/exit table. Any failure
//! resolves to holding the current exposure for that instrument alone.
//!
//! The evaluator keeps no state between steps. Whether an instrument is
//! invested is read from the holdings passed in.

use crate::domain::allocation::{is_flat, Holdings, TargetAllocation};
use crate::domain::error::{IndicatorError, SignalError};
use crate::domain::indicator::IndicatorType;
use crate::domain::policy::StrategyPolicy;
use crate::domain::signal::IndicatorSnapshot;
use crate::domain::timeline::{BarWindow, Step};
use crate::ports::indicator_port::IndicatorPort;
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

#[derive(Debug, Clone, PartialEq)]
pub enum DecisionReason {
    Hold(SignalError),
    EnterLong,
    EnterShort,
    RemainFlat,
    StopLoss,
    TrendBreak,
    Maintain,
    /// Holding sign not allowed by policy; flattened.
    PolicyCorrection,
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionReason::Hold(err) => write!(f, "hold ({})", err),
            DecisionReason::EnterLong => f.write_str("enter long"),
            DecisionReason::EnterShort => f.write_str("enter short"),
            DecisionReason::RemainFlat => f.write_str("remain flat"),
            DecisionReason::StopLoss => f.write_str("stop loss"),
            DecisionReason::TrendBreak => f.write_str("trend break"),
            DecisionReason::Maintain => f.write_str("maintain"),
            DecisionReason::PolicyCorrection => f.write_str("policy correction"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub holding: Option<f64>,
    pub target: f64,
    pub reason: DecisionReason,
}

impl Decision {
    fn hold(holding: Option<f64>, err: SignalError) -> Self {
        Self {
            holding,
            target: holding.unwrap_or(0.0),
            reason: DecisionReason::Hold(err),
        }
    }
}

/// Allocation plus the per-instrument decisions that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub allocation: TargetAllocation,
    pub decisions: BTreeMap<String, Decision>,
}

pub struct SignalEvaluator<I> {
    policy: StrategyPolicy,
    indicators: I,
}

impl<I: IndicatorPort> SignalEvaluator<I> {
    pub fn new(policy: StrategyPolicy, indicators: I) -> Self {
        Self { policy, indicators }
    }

    pub fn policy(&self) -> &StrategyPolicy {
        &self.policy
    }

    /// Target exposure for every tracked instrument given `steps` (most recent
    /// last) and the platform's current holdings.
    pub fn run(&self, steps: &[Step], holdings: &Holdings) -> TargetAllocation {
        self.evaluate(steps, holdings).allocation
    }

    pub fn evaluate(&self, steps: &[Step], holdings: &Holdings) -> StepOutcome {
        let mut decisions = BTreeMap::new();
        let mut targets = HashMap::new();

        for instrument in &self.policy.instruments {
            let window = BarWindow::from_steps(steps, instrument);
            let decision = self.evaluate_window(instrument, window.as_ref(), holdings.get(instrument));
            targets.insert(instrument.clone(), decision.target);
            decisions.insert(instrument.clone(), decision);
        }

        StepOutcome {
            allocation: TargetAllocation::assemble(&self.policy.instruments, targets, holdings),
            decisions,
        }
    }

    /// Decision for one instrument. Never fails; errors become holds.
    pub fn evaluate_window(
        &self,
        instrument: &str,
        window: Option<&BarWindow>,
        holding: Option<f64>,
    ) -> Decision {
        let snapshot = match self.snapshot(window) {
            Ok(s) => s,
            Err(err) => {
                match &err {
                    SignalError::InsufficientHistory { .. } | SignalError::MissingLatestBar => {
                        log::debug!("{}: holding, {}", instrument, err)
                    }
                    _ => log::warn!("{}: holding, {}", instrument, err),
                }
                return Decision::hold(holding, err);
            }
        };

        let (target, reason) = self.transition(&snapshot, holding.unwrap_or(0.0));
        match reason {
            DecisionReason::EnterLong | DecisionReason::EnterShort => log::info!(
                "{}: {} at {:.2} (ema_fast={:.2} ema_slow={:.2} vwap={:.2}) -> {}",
                instrument,
                reason,
                snapshot.close,
                snapshot.ema_fast,
                snapshot.ema_slow,
                snapshot.vwap,
                target
            ),
            DecisionReason::StopLoss => log::info!(
                "{}: stop loss at {:.2}, stop level {:.2}",
                instrument,
                snapshot.close,
                snapshot.ema_slow
            ),
            DecisionReason::TrendBreak => {
                log::info!("{}: trend break exit at {:.2}", instrument, snapshot.close)
            }
            DecisionReason::PolicyCorrection => log::warn!(
                "{}: holding {} not allowed by policy (allow_short={}), flattening",
                instrument,
                holding.unwrap_or(0.0),
                self.policy.allow_short
            ),
            _ => log::trace!("{}: {}", instrument, reason),
        }

        Decision {
            holding,
            target,
            reason,
        }
    }

    fn snapshot(&self, window: Option<&BarWindow>) -> Result<IndicatorSnapshot, SignalError> {
        let minimum = self.policy.min_bars;
        let window = window.ok_or(SignalError::InsufficientHistory { bars: 0, minimum })?;
        if window.len() < minimum {
            return Err(SignalError::InsufficientHistory {
                bars: window.len(),
                minimum,
            });
        }
        let latest = window.latest().ok_or(SignalError::MissingLatestBar)?;

        let fast = self.policy.ema_fast_period;
        let slow = self.policy.ema_slow_period;
        let vwap_window = self.policy.vwap_window;

        let ema_fast = guarded(IndicatorType::Ema(fast), || self.indicators.ema(window, fast))?;
        let ema_slow = guarded(IndicatorType::Ema(slow), || self.indicators.ema(window, slow))?;
        let vwap = guarded(IndicatorType::Vwap(vwap_window), || {
            self.indicators.vwap(window, vwap_window)
        })?;

        IndicatorSnapshot::new(latest.close, ema_fast, ema_slow, vwap)
    }

    fn transition(&self, s: &IndicatorSnapshot, holding: f64) -> (f64, DecisionReason) {
        if is_flat(holding) {
            let conditions = s.conditions();
            if conditions.long_entry() {
                return (self.policy.entry_size, DecisionReason::EnterLong);
            }
            if self.policy.allow_short && conditions.short_entry() {
                return (-self.policy.entry_size, DecisionReason::EnterShort);
            }
            return (0.0, DecisionReason::RemainFlat);
        }

        if holding < 0.0 && !self.policy.allow_short {
            return (0.0, DecisionReason::PolicyCorrection);
        }

        let long = holding > 0.0;
        let stop = if long { s.long_stop_hit() } else { s.short_stop_hit() };
        if stop {
            return (0.0, DecisionReason::StopLoss);
        }
        let broken = if long {
            s.long_trend_broken()
        } else {
            s.short_trend_broken()
        };
        if broken {
            return (0.0, DecisionReason::TrendBreak);
        }
        (holding, DecisionReason::Maintain)
    }
}

/// Runs one indicator call, turning both errors and panics into a
/// [`SignalError::IndicatorComputation`].
fn guarded<F>(indicator: IndicatorType, call: F) -> Result<f64, SignalError>
where
    F: FnOnce() -> Result<f64, IndicatorError>,
{
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(SignalError::IndicatorComputation {
            indicator: indicator.to_string(),
            reason: err.to_string(),
        }),
        Err(payload) => Err(SignalError::IndicatorComputation {
            indicator: indicator.to_string(),
            reason: format!("panicked: {}", panic_message(payload.as_ref())),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
