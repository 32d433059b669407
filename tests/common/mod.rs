#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use sppcast::domain::error::SppcastError;
use sppcast::domain::observation::{Observation, SLOTS_PER_DAY, slot_start};
use sppcast::ports::price_port::PricePort;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const POINT: &str = "HB_NORTH";

/// In-memory history provider keyed by day.
pub struct MockPricePort {
    pub data: HashMap<NaiveDate, Vec<Observation>>,
    pub errors: HashMap<NaiveDate, String>,
    pub delay: Option<std::time::Duration>,
    pub calls: AtomicUsize,
}

impl MockPricePort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_day(mut self, day: NaiveDate, observations: Vec<Observation>) -> Self {
        self.data.entry(day).or_default().extend(observations);
        self
    }

    pub fn with_error(mut self, day: NaiveDate, reason: &str) -> Self {
        self.errors.insert(day, reason.to_string());
        self
    }

    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PricePort for MockPricePort {
    fn fetch_day(&self, _point: &str, day: NaiveDate) -> Result<Vec<Observation>, SppcastError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if let Some(reason) = self.errors.get(&day) {
            return Err(SppcastError::UpstreamStatus {
                status: 503,
                body: reason.clone(),
            });
        }
        Ok(self.data.get(&day).cloned().unwrap_or_default())
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// 96 observations on `day`, all at `value`.
pub fn flat_day(day: NaiveDate, value: f64) -> Vec<Observation> {
    day_from_fn(day, |_| value)
}

/// 96 observations on `day` with the value given per slot.
pub fn day_from_fn(day: NaiveDate, f: impl Fn(usize) -> f64) -> Vec<Observation> {
    (0..SLOTS_PER_DAY)
        .map(|slot| Observation::new(slot_start(day, slot), f(slot)))
        .collect()
}

/// Mock port holding flat days `target - k weeks` at `values[k - 1]`.
pub fn weekly_history(target: NaiveDate, values: &[f64]) -> MockPricePort {
    values
        .iter()
        .enumerate()
        .fold(MockPricePort::new(), |port, (i, &v)| {
            let day = target - Duration::weeks(i as i64 + 1);
            port.with_day(day, flat_day(day, v))
        })
}
