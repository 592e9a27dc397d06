//! CSV file market data adapter.
//!
//! One file per instrument, `<INSTRUMENT>.csv`, with the header
//! `timestamp,open,high,low,close,volume`.

use crate::domain::bar::Bar;
use crate::domain::error::PullbackError;
use crate::ports::data_port::MarketDataPort;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::PathBuf;

const TIMESTAMP_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, instrument: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", instrument))
    }
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn field<'r>(record: &'r csv::StringRecord, index: usize, name: &str) -> Result<&'r str, PullbackError> {
    record.get(index).ok_or_else(|| PullbackError::Data {
        reason: format!("missing {} column", name),
    })
}

fn price(record: &csv::StringRecord, index: usize, name: &str) -> Result<f64, PullbackError> {
    field(record, index, name)?
        .trim()
        .parse()
        .map_err(|e| PullbackError::Data {
            reason: format!("invalid {} value: {}", name, e),
        })
}

fn volume(record: &csv::StringRecord, index: usize) -> Result<i64, PullbackError> {
    let raw = field(record, index, "volume")?.trim();
    let bad = |reason: String| PullbackError::Data {
        reason: format!("invalid volume value '{}': {}", raw, reason),
    };
    let value = match raw.parse::<i64>() {
        Ok(v) => v,
        Err(_) => {
            let v: f64 = raw.parse().map_err(|e: std::num::ParseFloatError| bad(e.to_string()))?;
            if !v.is_finite() || v > i64::MAX as f64 {
                return Err(bad("not a finite count".to_string()));
            }
            v.round() as i64
        }
    };
    if value < 0 {
        return Err(bad("volume cannot be negative".to_string()));
    }
    Ok(value)
}

impl MarketDataPort for CsvAdapter {
    fn fetch_bars(&self, instrument: &str) -> Result<Vec<Bar>, PullbackError> {
        let path = self.csv_path(instrument);
        let content = fs::read_to_string(&path).map_err(|e| PullbackError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| PullbackError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;

            let raw_ts = field(&record, 0, "timestamp")?;
            let timestamp = parse_timestamp(raw_ts).ok_or_else(|| PullbackError::Data {
                reason: format!("invalid timestamp '{}'", raw_ts),
            })?;

            bars.push(Bar {
                timestamp,
                open: price(&record, 1, "open")?,
                high: price(&record, 2, "high")?,
                low: price(&record, 3, "low")?,
                close: price(&record, 4, "close")?,
                volume: volume(&record, 5)?,
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        log::debug!("loaded {} bars for {} from {}", bars.len(), instrument, path.display());
        Ok(bars)
    }
}
