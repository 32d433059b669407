//! CSV report adapter implementing ReportPort.
//!
//! One row per forecast slot: `timestamp,forecast,source,actual`, where
//! `actual` is the comparison day's price for the same slot (empty if absent).

use std::path::Path;

use crate::domain::error::SppcastError;
use crate::domain::report::ForecastReport;
use crate::ports::report_port::ReportPort;

pub struct CsvReportAdapter;

impl ReportPort for CsvReportAdapter {
    fn write(&self, report: &ForecastReport, output_path: &Path) -> Result<(), SppcastError> {
        let to_io = |e: csv::Error| SppcastError::Io(std::io::Error::other(e));
        let mut writer = csv::Writer::from_path(output_path).map_err(to_io)?;
        writer
            .write_record(["timestamp", "forecast", "source", "actual"])
            .map_err(to_io)?;

        let actuals = report.actual_by_slot();
        for (slot, point) in report.forecast.iter().enumerate() {
            let source = report.sources.get(slot).map(|s| s.label()).unwrap_or("");
            let actual = actuals
                .get(slot)
                .copied()
                .flatten()
                .map(|v| format!("{v:.4}"))
                .unwrap_or_default();
            writer
                .write_record([
                    point.timestamp.format("%Y-%m-%dT%H:%M:%S").to_string(),
                    format!("{:.4}", point.value),
                    source.to_string(),
                    actual,
                ])
                .map_err(to_io)?;
        }
        writer.flush()?;
        Ok(())
    }
}
