//! Price observations and the 96-slot day model.
//!
//! All timestamps are market-local wall-clock times. A day is divided into
//! 96 fixed 15-minute slots, 00:00 through 23:45.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::Serialize;

pub const SLOT_MINUTES: u32 = 15;
pub const SLOTS_PER_DAY: usize = 96;

/// One realized price at a 15-minute slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Observation {
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

impl Observation {
    pub fn new(timestamp: NaiveDateTime, value: f64) -> Self {
        Self { timestamp, value }
    }

    pub fn slot(&self) -> usize {
        slot_index(self.timestamp)
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

/// One forecast value, aligned to a slot boundary of the forecast day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

/// hour * 4 + minute / 15
pub fn slot_index(timestamp: NaiveDateTime) -> usize {
    (timestamp.hour() * 4 + timestamp.minute() / SLOT_MINUTES) as usize
}

/// Start of `slot` on `day`, computed as a minute-of-day offset from midnight.
pub fn slot_start(day: NaiveDate, slot: usize) -> NaiveDateTime {
    day.and_time(NaiveTime::MIN) + Duration::minutes(slot as i64 * SLOT_MINUTES as i64)
}

/// Values of `observations` in chronological order.
pub fn values(observations: &[Observation]) -> Vec<f64> {
    let mut sorted: Vec<&Observation> = observations.iter().collect();
    sorted.sort_by_key(|o| o.timestamp);
    sorted.into_iter().map(|o| o.value).collect()
}

/// Observations falling on `day`, chronologically ordered.
pub fn on_day(observations: &[Observation], day: NaiveDate) -> Vec<Observation> {
    let mut out: Vec<Observation> = observations
        .iter()
        .filter(|o| o.date() == day)
        .copied()
        .collect();
    out.sort_by_key(|o| o.timestamp);
    out
}

/// Observations strictly before midnight of `day`.
pub fn before_day(observations: &[Observation], day: NaiveDate) -> Vec<Observation> {
    let start = day.and_time(NaiveTime::MIN);
    observations
        .iter()
        .filter(|o| o.timestamp < start)
        .copied()
        .collect()
}
