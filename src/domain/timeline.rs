//! Step timeline and per-instrument bar windows.
//!
//! A timeline is the chronological union of every instrument's bar timestamps.
//! Each [`Step`] carries the bars of the instruments that traded at that time,
//! so an instrument can be missing from any given step.

use crate::domain::bar::Bar;
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone)]
pub struct Step {
    pub timestamp: NaiveDateTime,
    pub bars: HashMap<String, Bar>,
}

impl Step {
    pub fn get(&self, instrument: &str) -> Option<&Bar> {
        self.bars.get(instrument)
    }
}

pub fn build_timeline(series: &HashMap<String, Vec<Bar>>) -> Vec<Step> {
    let mut by_time: BTreeMap<NaiveDateTime, HashMap<String, Bar>> = BTreeMap::new();
    for (instrument, bars) in series {
        for bar in bars {
            by_time
                .entry(bar.timestamp)
                .or_default()
                .insert(instrument.clone(), bar.clone());
        }
    }
    by_time
        .into_iter()
        .map(|(timestamp, bars)| Step { timestamp, bars })
        .collect()
}

/// Chronological bars for one instrument, most recent last.
#[derive(Debug, Clone)]
pub struct BarWindow {
    instrument: String,
    bars: Vec<Bar>,
    latest_present: bool,
}

impl BarWindow {
    /// A window whose last bar belongs to the current step.
    pub fn new(instrument: impl Into<String>, bars: Vec<Bar>) -> Self {
        let latest_present = !bars.is_empty();
        Self {
            instrument: instrument.into(),
            bars,
            latest_present,
        }
    }

    /// Collects `instrument`'s bars across `steps`. Returns `None` when the
    /// instrument never appears.
    pub fn from_steps(steps: &[Step], instrument: &str) -> Option<Self> {
        let bars: Vec<Bar> = steps
            .iter()
            .filter_map(|step| step.get(instrument).cloned())
            .collect();
        if bars.is_empty() {
            return None;
        }
        let latest_present = steps
            .last()
            .is_some_and(|step| step.bars.contains_key(instrument));
        Some(Self {
            instrument: instrument.to_string(),
            bars,
            latest_present,
        })
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// The bar for the current step, if the instrument traded in it.
    pub fn latest(&self) -> Option<&Bar> {
        if self.latest_present {
            self.bars.last()
        } else {
            None
        }
    }
}
