//! Seasonal baseline forecast.
//!
//! Each of the 96 slots of the target day is predicted as the mean of the
//! same slot on the same weekday over the preceding `weeks_lookback` weeks.
//! Slots without history take the most recent value emitted before them;
//! leading empty slots take the first observed slot's mean, and a window with
//! no matching history at all yields zero everywhere.
//!
//! The engine is pure: a backtest is the same call with an earlier target day
//! and a history truncated before that day.

use chrono::{Datelike, NaiveDateTime, TimeDelta};
use serde::Serialize;

use super::observation::{ForecastPoint, Observation, SLOTS_PER_DAY, slot_index, slot_start};

pub const DEFAULT_WEEKS_LOOKBACK: u32 = 4;

/// Value used for every slot when the window holds no matching history.
pub const ZERO_FALLBACK: f64 = 0.0;

/// Where a forecast slot's value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum SlotSource {
    /// Mean of `samples` same-weekday observations.
    Observed { samples: usize },
    /// Leading slot before the first observed slot; seeded from it.
    Backfilled,
    /// Repeats the value of the nearest preceding slot.
    CarriedForward,
    /// No slot in the window had data.
    Fallback,
}

impl SlotSource {
    pub fn label(&self) -> &'static str {
        match self {
            SlotSource::Observed { .. } => "observed",
            SlotSource::Backfilled => "backfilled",
            SlotSource::CarriedForward => "carried_forward",
            SlotSource::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalForecast {
    pub points: Vec<ForecastPoint>,
    pub sources: Vec<SlotSource>,
}

impl SeasonalForecast {
    pub fn has_observed_data(&self) -> bool {
        self.observed_slots() > 0
    }

    pub fn observed_slots(&self) -> usize {
        self.count_where(|s| matches!(s, SlotSource::Observed { .. }))
    }

    pub fn filled_slots(&self) -> usize {
        self.count_where(|s| matches!(s, SlotSource::Backfilled | SlotSource::CarriedForward))
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    fn count_where(&self, pred: impl Fn(&SlotSource) -> bool) -> usize {
        self.sources.iter().filter(|s| pred(s)).count()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct SlotAccumulator {
    sum: f64,
    count: usize,
}

impl SlotAccumulator {
    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Forecast the 96 slots of the day starting at `target_day_start`.
///
/// `target_day_start` is expected at local midnight. The history window is
/// `[target_day_start - weeks_lookback weeks, target_day_start)`.
pub fn build_seasonal_forecast(
    target_day_start: NaiveDateTime,
    history: &[Observation],
    weeks_lookback: u32,
) -> Vec<ForecastPoint> {
    build_seasonal_forecast_detailed(target_day_start, history, weeks_lookback).points
}

/// As [`build_seasonal_forecast`], also reporting each slot's provenance.
pub fn build_seasonal_forecast_detailed(
    target_day_start: NaiveDateTime,
    history: &[Observation],
    weeks_lookback: u32,
) -> SeasonalForecast {
    let accumulators = accumulate(target_day_start, history, weeks_lookback);

    let seed = accumulators.iter().find_map(SlotAccumulator::mean);
    let mut carry = seed.unwrap_or(ZERO_FALLBACK);
    let mut seen_observed = false;

    let day = target_day_start.date();
    let mut points = Vec::with_capacity(SLOTS_PER_DAY);
    let mut sources = Vec::with_capacity(SLOTS_PER_DAY);

    for (slot, acc) in accumulators.iter().enumerate() {
        let source = match acc.mean() {
            Some(mean) => {
                carry = mean;
                seen_observed = true;
                SlotSource::Observed { samples: acc.count }
            }
            None if seed.is_none() => SlotSource::Fallback,
            None if seen_observed => SlotSource::CarriedForward,
            None => SlotSource::Backfilled,
        };
        points.push(ForecastPoint {
            timestamp: slot_start(day, slot),
            value: carry,
        });
        sources.push(source);
    }

    SeasonalForecast { points, sources }
}

fn accumulate(
    target_day_start: NaiveDateTime,
    history: &[Observation],
    weeks_lookback: u32,
) -> [SlotAccumulator; SLOTS_PER_DAY] {
    let target_dow = target_day_start.weekday();
    let cutoff = window_start(target_day_start, weeks_lookback);

    let mut accumulators = [SlotAccumulator::default(); SLOTS_PER_DAY];
    for obs in history {
        if obs.timestamp < cutoff || obs.timestamp >= target_day_start {
            continue;
        }
        if obs.timestamp.weekday() != target_dow {
            continue;
        }
        let slot = slot_index(obs.timestamp);
        if let Some(acc) = accumulators.get_mut(slot) {
            acc.sum += obs.value;
            acc.count += 1;
        }
    }
    accumulators
}

/// Earliest instant of the lookback window; saturates at the start of
/// representable time when the lookback reaches past it.
fn window_start(target_day_start: NaiveDateTime, weeks_lookback: u32) -> NaiveDateTime {
    TimeDelta::try_weeks(i64::from(weeks_lookback))
        .and_then(|span| target_day_start.checked_sub_signed(span))
        .unwrap_or(NaiveDateTime::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};
    use proptest::prelude::*;

    // 2024-03-04 is a Monday.
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    fn midnight(day: NaiveDate) -> NaiveDateTime {
        day.and_hms_opt(0, 0, 0).unwrap()
    }

    fn obs(day: NaiveDate, slot: usize, value: f64) -> Observation {
        Observation::new(slot_start(day, slot), value)
    }

    fn full_day(day: NaiveDate, value: f64) -> Vec<Observation> {
        (0..SLOTS_PER_DAY).map(|s| obs(day, s, value)).collect()
    }

    #[test]
    fn empty_history_yields_96_zero_points() {
        let target = monday();
        let points = build_seasonal_forecast(midnight(target), &[], DEFAULT_WEEKS_LOOKBACK);

        assert_eq!(points.len(), SLOTS_PER_DAY);
        assert!(points.iter().all(|p| p.value == ZERO_FALLBACK));
        assert_eq!(points[0].timestamp, midnight(target));
        assert_eq!(
            points[95].timestamp,
            target.and_hms_opt(23, 45, 0).unwrap()
        );
    }

    #[test]
    fn four_weeks_of_constant_days_average() {
        let target = monday();
        let mut history = Vec::new();
        for (weeks_back, v) in [(1, 10.0), (2, 20.0), (3, 30.0), (4, 40.0)] {
            history.extend(full_day(target - Duration::weeks(weeks_back), v));
        }

        let points = build_seasonal_forecast(midnight(target), &history, 4);
        assert_eq!(points.len(), SLOTS_PER_DAY);
        for p in &points {
            assert_relative_eq!(p.value, 25.0);
        }
    }

    #[test]
    fn window_excludes_older_weeks_and_target_day() {
        let target = monday();
        let mut history = full_day(target - Duration::weeks(1), 10.0);
        history.extend(full_day(target - Duration::weeks(5), 1000.0));
        history.extend(full_day(target, 500.0));

        let points = build_seasonal_forecast(midnight(target), &history, 4);
        assert!(points.iter().all(|p| (p.value - 10.0).abs() < 1e-12));
    }

    #[test]
    fn shorter_lookback_narrows_window() {
        let target = monday();
        let mut history = full_day(target - Duration::weeks(1), 10.0);
        history.extend(full_day(target - Duration::weeks(2), 30.0));

        let one_week = build_seasonal_forecast(midnight(target), &history, 1);
        let two_weeks = build_seasonal_forecast(midnight(target), &history, 2);
        assert_relative_eq!(one_week[0].value, 10.0);
        assert_relative_eq!(two_weeks[0].value, 20.0);
    }

    #[test]
    fn other_weekdays_are_ignored() {
        let target = monday();
        let mut history = full_day(target - Duration::weeks(1), 10.0);
        history.extend(full_day(target - Duration::days(1), 99.0));
        history.extend(full_day(target - Duration::days(6), 77.0));

        let points = build_seasonal_forecast(midnight(target), &history, 4);
        assert!(points.iter().all(|p| (p.value - 10.0).abs() < 1e-12));
    }

    #[test]
    fn slot_mean_is_order_independent() {
        let target = monday();
        let a = obs(target - Duration::weeks(1), 7, 3.0);
        let b = obs(target - Duration::weeks(2), 7, 6.0);
        let c = obs(target - Duration::weeks(3), 7, 12.0);

        let forward = build_seasonal_forecast(midnight(target), &[a, b, c], 4);
        let reversed = build_seasonal_forecast(midnight(target), &[c, b, a], 4);
        assert_relative_eq!(forward[7].value, 7.0);
        assert_eq!(forward, reversed);
    }

    #[test]
    fn duplicate_slots_are_averaged() {
        let target = monday();
        let day = target - Duration::weeks(1);
        let history = vec![obs(day, 8, 10.0), obs(day, 8, 20.0)];

        let forecast = build_seasonal_forecast_detailed(midnight(target), &history, 4);
        assert_relative_eq!(forecast.points[8].value, 15.0);
        assert_eq!(forecast.sources[8], SlotSource::Observed { samples: 2 });
    }

    #[test]
    fn gap_carries_previous_slot_forward() {
        let target = monday();
        let day = target - Duration::weeks(1);
        let mut history: Vec<Observation> = (0..=5).map(|s| obs(day, s, s as f64)).collect();
        history.extend((9..SLOTS_PER_DAY).map(|s| obs(day, s, s as f64)));

        let forecast = build_seasonal_forecast_detailed(midnight(target), &history, 4);
        for slot in 6..=8 {
            assert_relative_eq!(forecast.points[slot].value, 5.0);
            assert_eq!(forecast.sources[slot], SlotSource::CarriedForward);
        }
        assert_relative_eq!(forecast.points[9].value, 9.0);
    }

    #[test]
    fn leading_gap_is_seeded_from_first_observed_slot() {
        let target = monday();
        let day = target - Duration::weeks(1);
        let history = vec![obs(day, 10, 42.0), obs(day, 20, 50.0)];

        let forecast = build_seasonal_forecast_detailed(midnight(target), &history, 4);
        for slot in 0..10 {
            assert_relative_eq!(forecast.points[slot].value, 42.0);
            assert_eq!(forecast.sources[slot], SlotSource::Backfilled);
        }
        assert_eq!(forecast.sources[10], SlotSource::Observed { samples: 1 });
        assert_relative_eq!(forecast.points[15].value, 42.0);
        assert_relative_eq!(forecast.points[20].value, 50.0);
        assert_relative_eq!(forecast.points[95].value, 50.0);
        assert_eq!(forecast.observed_slots(), 2);
        assert_eq!(forecast.filled_slots(), 94);
    }

    #[test]
    fn no_matching_history_is_flagged_as_fallback() {
        let target = monday();
        let history = full_day(target - Duration::days(3), 55.0);

        let forecast = build_seasonal_forecast_detailed(midnight(target), &history, 4);
        assert!(!forecast.has_observed_data());
        assert!(forecast.sources.iter().all(|s| *s == SlotSource::Fallback));
        assert!(forecast.values().iter().all(|v| *v == ZERO_FALLBACK));
    }

    #[test]
    fn huge_lookback_covers_all_history() {
        let target = monday();
        let mut history = full_day(target - Duration::weeks(1), 10.0);
        history.extend(full_day(target - Duration::weeks(520), 30.0));

        let empty = build_seasonal_forecast(midnight(target), &[], u32::MAX);
        assert_eq!(empty.len(), SLOTS_PER_DAY);
        assert!(empty.iter().all(|p| p.value == ZERO_FALLBACK));

        let points = build_seasonal_forecast(midnight(target), &history, u32::MAX);
        assert!(points.iter().all(|p| (p.value - 20.0).abs() < 1e-12));
    }

    #[test]
    fn window_start_saturates() {
        let start = midnight(monday());
        assert_eq!(window_start(start, 2), start - Duration::weeks(2));
        assert_eq!(window_start(start, u32::MAX), NaiveDateTime::MIN);
    }

    #[test]
    fn output_timestamps_normalize_to_midnight() {
        let target = monday();
        let start = target.and_hms_opt(0, 0, 0).unwrap();
        let points = build_seasonal_forecast(start, &[], 4);
        for (i, p) in points.iter().enumerate() {
            assert_eq!(p.timestamp, slot_start(target, i));
        }
    }

    proptest! {
        #[test]
        fn always_96_points_fifteen_minutes_apart(
            day_offset in 0i64..3650,
            values in proptest::collection::vec((0usize..40, 0usize..96, -500.0f64..500.0), 0..200),
            weeks in 1u32..8,
        ) {
            let target = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap() + Duration::days(day_offset);
            let history: Vec<Observation> = values
                .iter()
                .map(|(days_back, slot, v)| {
                    obs(target - Duration::days(*days_back as i64), *slot, *v)
                })
                .collect();

            let forecast = build_seasonal_forecast_detailed(midnight(target), &history, weeks);
            prop_assert_eq!(forecast.points.len(), SLOTS_PER_DAY);
            prop_assert_eq!(forecast.sources.len(), SLOTS_PER_DAY);
            prop_assert_eq!(forecast.points[0].timestamp, midnight(target));
            for pair in forecast.points.windows(2) {
                prop_assert_eq!(pair[1].timestamp - pair[0].timestamp, Duration::minutes(15));
            }
            for (i, source) in forecast.sources.iter().enumerate() {
                if *source == SlotSource::CarriedForward {
                    prop_assert_eq!(forecast.points[i].value, forecast.points[i - 1].value);
                }
            }
        }
    }
}
