//! Step-by-step paper replay over a recorded timeline.
//!
//! At step `i` the evaluator sees the last `lookback` steps ending at `i`.
//! Holdings for the next step are the previous step's allocation, i.e. the
//! sink is assumed to reach every target exactly. Nothing is filled or priced.

use crate::domain::allocation::Holdings;
use crate::domain::error::PullbackError;
use crate::domain::evaluator::{DecisionReason, SignalEvaluator};
use crate::domain::timeline::Step;
use crate::ports::allocation_port::AllocationSink;
use crate::ports::indicator_port::IndicatorPort;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub steps: usize,
    pub entries: usize,
    pub exits: usize,
    pub holds: usize,
    /// Intraday steps further from their predecessor than one interval.
    pub gaps: usize,
}

pub fn run_replay<I: IndicatorPort>(
    evaluator: &SignalEvaluator<I>,
    timeline: &[Step],
    sink: &mut dyn AllocationSink,
) -> Result<ReplaySummary, PullbackError> {
    let policy = evaluator.policy();
    let lookback = policy.lookback.max(1);
    let mut holdings = Holdings::new();
    let mut summary = ReplaySummary::default();

    for (i, step) in timeline.iter().enumerate() {
        if i > 0 && policy.interval.is_intraday() {
            let prev = timeline[i - 1].timestamp;
            if prev.date() == step.timestamp.date()
                && step.timestamp - prev > policy.interval.duration()
            {
                summary.gaps += 1;
                log::debug!(
                    "gap in bars: {} -> {} exceeds {}",
                    prev,
                    step.timestamp,
                    policy.interval
                );
            }
        }

        let start = (i + 1).saturating_sub(lookback);
        let outcome = evaluator.evaluate(&timeline[start..=i], &holdings);

        for decision in outcome.decisions.values() {
            match decision.reason {
                DecisionReason::EnterLong | DecisionReason::EnterShort => summary.entries += 1,
                DecisionReason::StopLoss
                | DecisionReason::TrendBreak
                | DecisionReason::PolicyCorrection => summary.exits += 1,
                DecisionReason::Hold(_) => summary.holds += 1,
                DecisionReason::RemainFlat | DecisionReason::Maintain => {}
            }
        }

        sink.submit(step.timestamp, &outcome)?;
        holdings = Holdings::from(&outcome.allocation);
        summary.steps += 1;
    }

    sink.finish()?;
    log::info!(
        "replayed {} steps: {} entries, {} exits, {} holds, {} gaps",
        summary.steps,
        summary.entries,
        summary.exits,
        summary.holds,
        summary.gaps
    );
    Ok(summary)
}
