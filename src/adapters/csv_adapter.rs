//! CSV file history provider for offline use.
//!
//! One file per settlement point, `<base>/<POINT>.csv`, with a header row and
//! `timestamp,value` columns. Timestamps are market-local wall-clock times.

use crate::domain::error::SppcastError;
use crate::domain::observation::Observation;
use crate::ports::price_port::PricePort;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::PathBuf;

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

pub struct CsvPriceAdapter {
    base_path: PathBuf,
}

impl CsvPriceAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, point: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", point))
    }

    /// Every observation in the file for `point`.
    pub fn read_all(&self, point: &str) -> Result<Vec<Observation>, SppcastError> {
        let path = self.csv_path(point);
        let content = fs::read_to_string(&path).map_err(|e| SppcastError::Upstream {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut observations = Vec::new();

        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| SppcastError::Decode {
                reason: format!("CSV parse error: {}", e),
            })?;
            let row = line + 2;

            let ts_str = record.get(0).ok_or_else(|| SppcastError::Decode {
                reason: format!("row {row}: missing timestamp column"),
            })?;
            let timestamp = parse_timestamp(ts_str).ok_or_else(|| SppcastError::Decode {
                reason: format!("row {row}: invalid timestamp '{ts_str}'"),
            })?;

            let value: f64 = record
                .get(1)
                .ok_or_else(|| SppcastError::Decode {
                    reason: format!("row {row}: missing value column"),
                })?
                .trim()
                .parse()
                .map_err(|e| SppcastError::Decode {
                    reason: format!("row {row}: invalid value: {e}"),
                })?;
            if !value.is_finite() {
                return Err(SppcastError::Decode {
                    reason: format!("row {row}: value is not finite"),
                });
            }

            observations.push(Observation::new(timestamp, value));
        }

        Ok(observations)
    }
}

fn parse_timestamp(input: &str) -> Option<NaiveDateTime> {
    let input = input.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
}

impl PricePort for CsvPriceAdapter {
    fn fetch_day(&self, point: &str, day: NaiveDate) -> Result<Vec<Observation>, SppcastError> {
        let mut out: Vec<Observation> = self
            .read_all(point)?
            .into_iter()
            .filter(|o| o.date() == day)
            .collect();
        out.sort_by_key(|o| o.timestamp);
        Ok(out)
    }

    fn fetch_days(
        &self,
        point: &str,
        days: &[NaiveDate],
    ) -> Result<Vec<Observation>, SppcastError> {
        let mut out: Vec<Observation> = self
            .read_all(point)?
            .into_iter()
            .filter(|o| days.contains(&o.date()))
            .collect();
        out.sort_by_key(|o| o.timestamp);
        Ok(out)
    }
}
