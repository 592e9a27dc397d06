//! Allocation sink port trait.

use crate::domain::error::PullbackError;
use crate::domain::evaluator::StepOutcome;
use chrono::NaiveDateTime;

/// Receives the evaluator's output once per step.
pub trait AllocationSink {
    fn submit(&mut self, timestamp: NaiveDateTime, outcome: &StepOutcome) -> Result<(), PullbackError>;

    fn finish(&mut self) -> Result<(), PullbackError> {
        Ok(())
    }
}
