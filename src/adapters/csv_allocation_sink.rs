//! CSV allocation sink: one row per instrument per step.

use crate::domain::error::PullbackError;
use crate::domain::evaluator::StepOutcome;
use crate::ports::allocation_port::AllocationSink;
use chrono::NaiveDateTime;
use std::fs::File;
use std::io::Write;
use std::path::Path;

const HEADER: [&str; 5] = ["timestamp", "instrument", "holding", "target", "reason"];

pub struct CsvAllocationSink<W: Write> {
    writer: csv::Writer<W>,
}

fn csv_error(e: csv::Error) -> PullbackError {
    PullbackError::Data {
        reason: format!("CSV write error: {}", e),
    }
}

impl CsvAllocationSink<File> {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, PullbackError> {
        let file = File::create(path)?;
        Self::new(file)
    }
}

impl<W: Write> CsvAllocationSink<W> {
    pub fn new(inner: W) -> Result<Self, PullbackError> {
        let mut writer = csv::Writer::from_writer(inner);
        writer.write_record(HEADER).map_err(csv_error)?;
        Ok(Self { writer })
    }

    #[cfg(test)]
    fn into_inner(self) -> Result<W, PullbackError> {
        self.writer.into_inner().map_err(|e| PullbackError::Data {
            reason: format!("CSV flush error: {}", e),
        })
    }
}

impl<W: Write> AllocationSink for CsvAllocationSink<W> {
    fn submit(&mut self, timestamp: NaiveDateTime, outcome: &StepOutcome) -> Result<(), PullbackError> {
        let ts = timestamp.format("%Y-%m-%d %H:%M:%S").to_string();
        for (instrument, target) in outcome.allocation.iter() {
            let decision = outcome.decisions.get(instrument);
            let holding = decision
                .and_then(|d| d.holding)
                .map(|h| h.to_string())
                .unwrap_or_default();
            let reason = decision.map(|d| d.reason.to_string()).unwrap_or_default();
            let target = target.to_string();
            self.writer
                .write_record([
                    ts.as_str(),
                    instrument,
                    holding.as_str(),
                    target.as_str(),
                    reason.as_str(),
                ])
                .map_err(csv_error)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), PullbackError> {
        self.writer.flush()?;
        Ok(())
    }
}
