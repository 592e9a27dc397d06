//! Holdings snapshot and target allocation.

use std::collections::{BTreeMap, HashMap};

/// Exposures at or below this magnitude count as flat.
pub const FLAT_EPSILON: f64 = 1e-9;

pub fn is_flat(exposure: f64) -> bool {
    exposure.abs() <= FLAT_EPSILON
}

/// Current signed exposure per instrument, as reported by the platform.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Holdings {
    exposures: HashMap<String, f64>,
}

impl Holdings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, instrument: &str, exposure: f64) -> Self {
        self.set(instrument, exposure);
        self
    }

    pub fn set(&mut self, instrument: &str, exposure: f64) {
        self.exposures.insert(instrument.to_string(), exposure);
    }

    /// Known exposure for `instrument`. Non-finite values count as unknown.
    pub fn get(&self, instrument: &str) -> Option<f64> {
        self.exposures
            .get(instrument)
            .copied()
            .filter(|v| v.is_finite())
    }

    /// Target for "keep what you have": the known exposure, else flat.
    pub fn hold_target(&self, instrument: &str) -> f64 {
        self.get(instrument).unwrap_or(0.0)
    }
}

impl From<&TargetAllocation> for Holdings {
    fn from(allocation: &TargetAllocation) -> Self {
        Self {
            exposures: allocation
                .iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }
}

/// Desired exposure for every tracked instrument for the upcoming step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetAllocation {
    targets: BTreeMap<String, f64>,
}

impl TargetAllocation {
    /// Builds an allocation covering exactly `instruments`. Instruments absent
    /// from `targets` keep their current holding; extra entries are dropped.
    pub fn assemble(
        instruments: &[String],
        mut targets: HashMap<String, f64>,
        holdings: &Holdings,
    ) -> Self {
        let targets = instruments
            .iter()
            .map(|instrument| {
                let target = targets
                    .remove(instrument)
                    .unwrap_or_else(|| holdings.hold_target(instrument));
                (instrument.clone(), target)
            })
            .collect();
        Self { targets }
    }

    pub fn get(&self, instrument: &str) -> Option<f64> {
        self.targets.get(instrument).copied()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn instruments(&self) -> impl Iterator<Item = &str> {
        self.targets.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.targets.iter().map(|(k, v)| (k.as_str(), *v))
    }
}
