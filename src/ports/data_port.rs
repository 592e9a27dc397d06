//! Market data port trait.

use crate::domain::bar::Bar;
use crate::domain::error::PullbackError;

pub trait MarketDataPort {
    /// Full bar history for `instrument`, oldest first.
    fn fetch_bars(&self, instrument: &str) -> Result<Vec<Bar>, PullbackError>;
}
