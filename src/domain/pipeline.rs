//! Forecast pipeline: fetch the required days from a [`PricePort`] and
//! assemble the report.

use chrono::NaiveDate;
use tracing::{debug, info};

use super::calendar::{comparison_day, history_days};
use super::error::SppcastError;
use super::report::{ForecastReport, ForecastSettings};
use crate::ports::price_port::PricePort;

/// Days that must be fetched to forecast `target`: the comparison day plus
/// every same-weekday day of the lookback window.
pub fn required_days(target: NaiveDate, weeks_lookback: u32) -> Vec<NaiveDate> {
    let mut days = history_days(target, weeks_lookback);
    let compare = comparison_day(target);
    if !days.contains(&compare) {
        days.push(compare);
    }
    days.sort();
    days
}

pub fn run_forecast(
    port: &dyn PricePort,
    settlement_point: &str,
    target: NaiveDate,
    settings: &ForecastSettings,
) -> Result<ForecastReport, SppcastError> {
    let days = required_days(target, settings.weeks_lookback);
    info!(
        point = settlement_point,
        target_date = %target,
        days = days.len(),
        "fetching history"
    );

    let observations = port.fetch_days(settlement_point, &days)?;
    debug!(observations = observations.len(), "history fetched");

    let report = ForecastReport::assemble(settlement_point, target, &observations, settings);
    if report.provenance.synthetic {
        info!(
            target_date = %target,
            "no history in lookback window; forecast is the zero fallback"
        );
    }
    Ok(report)
}
