//! JSON report adapter implementing ReportPort.
//!
//! Writes the same document the web API serves, pretty-printed.

use std::fs;
use std::path::Path;

use crate::domain::error::SppcastError;
use crate::domain::report::ForecastReport;
use crate::ports::report_port::ReportPort;

pub struct JsonReportAdapter;

impl JsonReportAdapter {
    pub fn render(report: &ForecastReport) -> Result<String, SppcastError> {
        serde_json::to_string_pretty(report)
            .map_err(|e| SppcastError::Io(std::io::Error::other(e)))
    }
}

impl ReportPort for JsonReportAdapter {
    fn write(&self, report: &ForecastReport, output_path: &Path) -> Result<(), SppcastError> {
        let mut json = Self::render(report)?;
        json.push('\n');
        fs::write(output_path, json)?;
        Ok(())
    }
}
