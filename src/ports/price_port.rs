//! History provider port.

use crate::domain::error::SppcastError;
use crate::domain::observation::Observation;
use chrono::NaiveDate;

/// Source of realized 15-minute prices for one settlement point.
pub trait PricePort {
    /// All observations for `point` on the market-local calendar `day`.
    fn fetch_day(&self, point: &str, day: NaiveDate) -> Result<Vec<Observation>, SppcastError>;

    /// Observations for several days, concatenated in chronological order.
    /// Fails on the first day that fails.
    fn fetch_days(
        &self,
        point: &str,
        days: &[NaiveDate],
    ) -> Result<Vec<Observation>, SppcastError> {
        let mut sorted = days.to_vec();
        sorted.sort();
        sorted.dedup();

        let mut out = Vec::new();
        for day in sorted {
            out.extend(self.fetch_day(point, day)?);
        }
        out.sort_by_key(|o| o.timestamp);
        Ok(out)
    }
}

impl<P: PricePort + ?Sized> PricePort for std::sync::Arc<P> {
    fn fetch_day(&self, point: &str, day: NaiveDate) -> Result<Vec<Observation>, SppcastError> {
        (**self).fetch_day(point, day)
    }
}
