//! Assembly of the forecast report: forecast, backtest and statistics for one
//! target day, computed from an already-fetched set of observations.

use chrono::NaiveDate;
use serde::Serialize;

use super::calendar::{comparison_day, day_start};
use super::forecast::{
    DEFAULT_WEEKS_LOOKBACK, SlotSource, build_seasonal_forecast, build_seasonal_forecast_detailed,
};
use super::observation::{ForecastPoint, Observation, SLOTS_PER_DAY, before_day, on_day};
use super::stats::{BacktestResult, DEFAULT_MAPE_EPSILON, DailyStats, daily_stats};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastSettings {
    pub weeks_lookback: u32,
    pub mape_epsilon: f64,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            weeks_lookback: DEFAULT_WEEKS_LOOKBACK,
            mape_epsilon: DEFAULT_MAPE_EPSILON,
        }
    }
}

/// How much of the forecast rests on real history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    pub observed_slots: usize,
    pub filled_slots: usize,
    /// No slot had any history; every value is the zero fallback.
    pub synthetic: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Actuals {
    pub date: NaiveDate,
    pub points: Vec<Observation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReportStats {
    pub forecast: DailyStats,
    pub actuals: DailyStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Backtest {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub result: BacktestResult,
    pub forecast: Vec<ForecastPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastReport {
    pub settlement_point: String,
    pub target_date: NaiveDate,
    pub weeks_lookback: u32,
    pub forecast: Vec<ForecastPoint>,
    #[serde(skip)]
    pub sources: Vec<SlotSource>,
    pub provenance: Provenance,
    pub actuals: Actuals,
    pub stats: ReportStats,
    pub backtest: Backtest,
}

impl ForecastReport {
    /// Build the report for `target` from `observations`, which should cover
    /// the lookback days and the comparison day.
    pub fn assemble(
        settlement_point: &str,
        target: NaiveDate,
        observations: &[Observation],
        settings: &ForecastSettings,
    ) -> Self {
        let detailed = build_seasonal_forecast_detailed(
            day_start(target),
            observations,
            settings.weeks_lookback,
        );
        let provenance = Provenance {
            observed_slots: detailed.observed_slots(),
            filled_slots: detailed.filled_slots(),
            synthetic: !detailed.has_observed_data(),
        };

        let compare_day = comparison_day(target);
        let actual_points = on_day(observations, compare_day);
        let prior = before_day(observations, compare_day);
        let backtest_forecast =
            build_seasonal_forecast(day_start(compare_day), &prior, settings.weeks_lookback);

        let (actual_values, predicted_values) = align_by_slot(&actual_points, &backtest_forecast);
        if actual_points.len() != SLOTS_PER_DAY {
            tracing::warn!(
                date = %compare_day,
                points = actual_points.len(),
                expected = SLOTS_PER_DAY,
                "comparison day is incomplete; backtest uses the available points"
            );
        }
        let result =
            BacktestResult::evaluate(&actual_values, &predicted_values, settings.mape_epsilon);

        let forecast_values: Vec<f64> = detailed.values();
        let stats = ReportStats {
            forecast: daily_stats(&forecast_values),
            actuals: daily_stats(&actual_values),
        };

        Self {
            settlement_point: settlement_point.to_string(),
            target_date: target,
            weeks_lookback: settings.weeks_lookback,
            forecast: detailed.points,
            sources: detailed.sources,
            provenance,
            actuals: Actuals {
                date: compare_day,
                points: actual_points,
            },
            stats,
            backtest: Backtest {
                date: compare_day,
                result,
                forecast: backtest_forecast,
            },
        }
    }

    /// Actual value for each forecast slot of the comparison day, if present.
    pub fn actual_by_slot(&self) -> Vec<Option<f64>> {
        let mut by_slot = vec![None; SLOTS_PER_DAY];
        for obs in &self.actuals.points {
            if let Some(cell) = by_slot.get_mut(obs.slot()) {
                *cell = Some(obs.value);
            }
        }
        by_slot
    }
}

/// Pair each actual observation with the forecast of its own slot.
fn align_by_slot(actuals: &[Observation], forecast: &[ForecastPoint]) -> (Vec<f64>, Vec<f64>) {
    actuals
        .iter()
        .filter_map(|obs| forecast.get(obs.slot()).map(|p| (obs.value, p.value)))
        .unzip()
}
