//! Calendar helpers: market-local "today", the forward selection window, and
//! the days a forecast request needs from the history provider.

use chrono::{DateTime, Days, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use super::error::SppcastError;

pub const DEFAULT_FORWARD_DAYS: u32 = 7;

/// ERCOT runs on US Central time; standard-time offset.
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = -360;

pub fn parse_date(input: &str) -> Result<NaiveDate, SppcastError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| SppcastError::InvalidDate {
        input: input.to_string(),
    })
}

pub fn day_start(day: NaiveDate) -> NaiveDateTime {
    day.and_time(NaiveTime::MIN)
}

/// The market-local calendar date at `now`.
///
/// A fixed offset is used, so the date can be off by one during the hour
/// around a daylight-saving change.
pub fn market_date_at(now: DateTime<Utc>, utc_offset_minutes: i32) -> NaiveDate {
    match FixedOffset::east_opt(utc_offset_minutes * 60) {
        Some(offset) => now.with_timezone(&offset).date_naive(),
        None => now.date_naive(),
    }
}

pub fn market_today(utc_offset_minutes: i32) -> NaiveDate {
    market_date_at(Utc::now(), utc_offset_minutes)
}

/// Dates a user may request: `today` through `today + forward_days`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForwardWindow {
    pub earliest: NaiveDate,
    pub latest: NaiveDate,
}

impl ForwardWindow {
    pub fn from_today(today: NaiveDate, forward_days: u32) -> Self {
        Self {
            earliest: today,
            latest: today
                .checked_add_days(Days::new(u64::from(forward_days)))
                .unwrap_or(NaiveDate::MAX),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.earliest && date <= self.latest
    }

    pub fn check(&self, date: NaiveDate) -> Result<NaiveDate, SppcastError> {
        if self.contains(date) {
            Ok(date)
        } else {
            Err(SppcastError::DateOutOfRange {
                date,
                earliest: self.earliest,
                latest: self.latest,
            })
        }
    }

    /// Parse `input` and require it to fall inside the window. A missing or
    /// blank input selects the first day of the window.
    pub fn resolve(&self, input: Option<&str>) -> Result<NaiveDate, SppcastError> {
        match input.map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => self.check(parse_date(s)?),
            None => Ok(self.earliest),
        }
    }
}

/// The already-realized day a forecast is backtested against.
pub fn comparison_day(target: NaiveDate) -> NaiveDate {
    target.checked_sub_days(Days::new(7)).unwrap_or(NaiveDate::MIN)
}

/// Same-weekday days preceding `target`, most recent first. Stops early at
/// the start of the representable calendar.
pub fn history_days(target: NaiveDate, weeks_lookback: u32) -> Vec<NaiveDate> {
    (1..=u64::from(weeks_lookback))
        .map_while(|k| target.checked_sub_days(Days::new(7 * k)))
        .collect()
}
