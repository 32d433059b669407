//! Report output port trait.

use crate::domain::error::SppcastError;
use crate::domain::report::ForecastReport;
use std::path::Path;

/// Port for writing forecast reports to a file.
pub trait ReportPort {
    fn write(&self, report: &ForecastReport, output_path: &Path) -> Result<(), SppcastError>;
}
