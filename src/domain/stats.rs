//! Descriptive statistics and forecast accuracy metrics.
//!
//! These values are display-bound: undefined results come back as NaN (or
//! `None` for MAPE) rather than as errors.

use serde::Serialize;

pub const DEFAULT_MAPE_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub std: f64,
}

impl DailyStats {
    pub fn undefined() -> Self {
        Self {
            min: f64::NAN,
            max: f64::NAN,
            avg: f64::NAN,
            std: f64::NAN,
        }
    }
}

/// min, max, mean and population standard deviation of `values`.
pub fn daily_stats(values: &[f64]) -> DailyStats {
    if values.is_empty() {
        return DailyStats::undefined();
    }

    let n = values.len() as f64;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let avg = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / n;

    DailyStats {
        min,
        max,
        avg,
        std: variance.sqrt(),
    }
}

/// Mean absolute error over the positionally paired prefix of both series.
pub fn mae(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len().min(predicted.len());
    if n == 0 {
        return f64::NAN;
    }
    let total: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum();
    total / n as f64
}

/// Mean absolute percentage error, in percent.
///
/// Pairs whose actual value is within `epsilon` of zero are skipped. Returns
/// `None` when no pair qualifies.
pub fn mape(actual: &[f64], predicted: &[f64], epsilon: f64) -> Option<f64> {
    let (sum, count) = actual
        .iter()
        .zip(predicted)
        .filter(|(a, _)| a.abs() > epsilon)
        .fold((0.0_f64, 0usize), |(s, c), (a, p)| {
            (s + ((a - p) / a).abs(), c + 1)
        });

    (count > 0).then(|| 100.0 * sum / count as f64)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BacktestResult {
    pub mae: f64,
    pub mape: Option<f64>,
    #[serde(rename = "count")]
    pub sample_count: usize,
}

impl BacktestResult {
    pub fn evaluate(actual: &[f64], predicted: &[f64], epsilon: f64) -> Self {
        Self {
            mae: mae(actual, predicted),
            mape: mape(actual, predicted, epsilon),
            sample_count: actual.len().min(predicted.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn daily_stats_empty_is_nan() {
        let stats = daily_stats(&[]);
        assert!(stats.min.is_nan());
        assert!(stats.max.is_nan());
        assert!(stats.avg.is_nan());
        assert!(stats.std.is_nan());
    }

    #[test]
    fn daily_stats_known_values() {
        let stats = daily_stats(&[2.0, 4.0, 6.0]);
        assert_relative_eq!(stats.min, 2.0);
        assert_relative_eq!(stats.max, 6.0);
        assert_relative_eq!(stats.avg, 4.0);
        assert_relative_eq!(stats.std, (8.0_f64 / 3.0).sqrt(), epsilon = 1e-12);
        assert_relative_eq!(stats.std, 1.632_993, epsilon = 1e-6);
    }

    #[test]
    fn daily_stats_uses_population_std() {
        // sample std would be 2.138, population std is exactly 2
        let stats = daily_stats(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_relative_eq!(stats.std, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn daily_stats_single_value() {
        let stats = daily_stats(&[-3.5]);
        assert_relative_eq!(stats.min, -3.5);
        assert_relative_eq!(stats.max, -3.5);
        assert_relative_eq!(stats.std, 0.0);
    }

    #[test]
    fn mae_known_values() {
        assert_relative_eq!(mae(&[1.0, 2.0, 3.0], &[1.0, 2.0, 5.0]), 2.0 / 3.0);
    }

    #[test]
    fn mae_empty_is_nan() {
        assert!(mae(&[], &[1.0]).is_nan());
        assert!(mae(&[1.0], &[]).is_nan());
    }

    #[test]
    fn mae_truncates_to_shorter_series() {
        assert_relative_eq!(mae(&[1.0, 2.0], &[2.0, 4.0, 100.0, 100.0]), 1.5);
    }

    #[test]
    fn mape_skips_near_zero_actuals() {
        let value = mape(&[0.0, 10.0, 20.0], &[1.0, 9.0, 22.0], DEFAULT_MAPE_EPSILON);
        assert_relative_eq!(value.unwrap(), 10.0, epsilon = 1e-12);
    }

    #[test]
    fn mape_without_qualifying_pairs_is_none() {
        assert_eq!(mape(&[0.0, 0.0], &[5.0, 5.0], DEFAULT_MAPE_EPSILON), None);
        assert_eq!(mape(&[], &[], DEFAULT_MAPE_EPSILON), None);
    }

    #[test]
    fn mape_perfect_forecast_is_zero_not_none() {
        assert_eq!(mape(&[5.0, 6.0], &[5.0, 6.0], DEFAULT_MAPE_EPSILON), Some(0.0));
    }

    #[test]
    fn mape_handles_negative_prices() {
        // |(-10 - -5) / -10| = 0.5
        let value = mape(&[-10.0], &[-5.0], DEFAULT_MAPE_EPSILON).unwrap();
        assert_relative_eq!(value, 50.0);
    }

    #[test]
    fn backtest_result_counts_pairs() {
        let result = BacktestResult::evaluate(&[10.0, 20.0, 30.0], &[11.0, 18.0], 1e-6);
        assert_eq!(result.sample_count, 2);
        assert_relative_eq!(result.mae, 1.5);
        assert_relative_eq!(result.mape.unwrap(), 10.0);
    }
}
