//! Strict decoding of ERCOT report pages into observations.
//!
//! Rows arrive either as positional arrays described by the page's `fields`
//! list or as objects keyed by field name, with loosely typed cells. Every
//! row is decoded into an [`Observation`] or rejected with a reason; nothing
//! is coerced into NaN.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;
use serde_json::Value;

use crate::domain::error::SppcastError;
use crate::domain::observation::Observation;

pub const DELIVERY_DATE: &str = "deliveryDate";
pub const DELIVERY_HOUR: &str = "deliveryHour";
pub const DELIVERY_INTERVAL: &str = "deliveryInterval";
pub const SETTLEMENT_POINT: &str = "settlementPoint";
pub const PRICE: &str = "settlementPointPrice";

#[derive(Debug, Clone, Deserialize)]
pub struct FieldDef {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageMeta {
    #[serde(rename = "totalPages")]
    pub total_pages: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportPage {
    #[serde(rename = "_meta", default)]
    pub meta: PageMeta,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub data: Vec<Value>,
}

impl ReportPage {
    pub fn total_pages(&self) -> u32 {
        self.meta.total_pages.unwrap_or(1).max(1)
    }
}

/// Positions of the columns we read within an array-shaped row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnIndex {
    delivery_date: Option<usize>,
    delivery_hour: Option<usize>,
    delivery_interval: Option<usize>,
    settlement_point: Option<usize>,
    price: Option<usize>,
}

impl ColumnIndex {
    pub fn from_fields(fields: &[FieldDef]) -> Self {
        let find = |name: &str| fields.iter().position(|f| f.name.eq_ignore_ascii_case(name));
        Self {
            delivery_date: find(DELIVERY_DATE),
            delivery_hour: find(DELIVERY_HOUR),
            delivery_interval: find(DELIVERY_INTERVAL),
            settlement_point: find(SETTLEMENT_POINT),
            price: find(PRICE),
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        match name {
            DELIVERY_DATE => self.delivery_date,
            DELIVERY_HOUR => self.delivery_hour,
            DELIVERY_INTERVAL => self.delivery_interval,
            SETTLEMENT_POINT => self.settlement_point,
            PRICE => self.price,
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RowRejection {
    #[error("row is neither an array nor an object")]
    NotARow,
    #[error("missing column {0}")]
    MissingColumn(&'static str),
    #[error("row is for settlement point {0}")]
    OtherPoint(String),
    #[error("invalid delivery date {0}")]
    BadDate(String),
    #[error("invalid delivery hour {0}")]
    BadHour(String),
    #[error("invalid delivery interval {0}")]
    BadInterval(String),
    #[error("invalid price {0}")]
    BadPrice(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowDecode {
    Accepted(Observation),
    Rejected(RowRejection),
}

/// Outcome of decoding one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedPage {
    pub observations: Vec<Observation>,
    pub rejected: Vec<RowRejection>,
}

pub fn decode_page(page: &ReportPage, point: &str) -> DecodedPage {
    let columns = ColumnIndex::from_fields(&page.fields);
    let mut out = DecodedPage::default();
    for row in &page.data {
        match decode_row(row, &columns, point) {
            RowDecode::Accepted(obs) => out.observations.push(obs),
            RowDecode::Rejected(reason) => out.rejected.push(reason),
        }
    }
    out
}

pub fn decode_row(row: &Value, columns: &ColumnIndex, point: &str) -> RowDecode {
    match try_decode_row(row, columns, point) {
        Ok(obs) => RowDecode::Accepted(obs),
        Err(reason) => RowDecode::Rejected(reason),
    }
}

fn try_decode_row(
    row: &Value,
    columns: &ColumnIndex,
    point: &str,
) -> Result<Observation, RowRejection> {
    if !(row.is_array() || row.is_object()) {
        return Err(RowRejection::NotARow);
    }

    if let Some(row_point) = cell(row, columns, SETTLEMENT_POINT).and_then(Value::as_str) {
        if !row_point.trim().eq_ignore_ascii_case(point) {
            return Err(RowRejection::OtherPoint(row_point.to_string()));
        }
    }

    let date_cell = required(row, columns, DELIVERY_DATE)?;
    let date = date_cell
        .as_str()
        .and_then(parse_delivery_date)
        .ok_or_else(|| RowRejection::BadDate(date_cell.to_string()))?;

    let hour_cell = required(row, columns, DELIVERY_HOUR)?;
    let hour = as_integer(hour_cell)
        .filter(|h| (1..=24).contains(h))
        .ok_or_else(|| RowRejection::BadHour(hour_cell.to_string()))?;

    let interval_cell = required(row, columns, DELIVERY_INTERVAL)?;
    let interval = as_integer(interval_cell)
        .filter(|i| (1..=4).contains(i))
        .ok_or_else(|| RowRejection::BadInterval(interval_cell.to_string()))?;

    let price_cell = required(row, columns, PRICE)?;
    let price = as_number(price_cell)
        .filter(|p| p.is_finite())
        .ok_or_else(|| RowRejection::BadPrice(price_cell.to_string()))?;

    Ok(Observation::new(interval_start(date, hour, interval), price))
}

/// Hour-ending `hour` (1..=24) and `interval` (1..=4) to the slot's start.
pub fn interval_start(date: NaiveDate, hour: i64, interval: i64) -> NaiveDateTime {
    let minutes = (hour - 1) * 60 + (interval - 1) * 15;
    date.and_time(NaiveTime::MIN) + chrono::Duration::minutes(minutes)
}

fn cell<'a>(row: &'a Value, columns: &ColumnIndex, name: &'static str) -> Option<&'a Value> {
    let value = match row {
        Value::Array(items) => columns.position(name).and_then(|i| items.get(i)),
        Value::Object(map) => map.get(name),
        _ => None,
    };
    value.filter(|v| !v.is_null())
}

fn required<'a>(
    row: &'a Value,
    columns: &ColumnIndex,
    name: &'static str,
) -> Result<&'a Value, RowRejection> {
    cell(row, columns, name).ok_or(RowRejection::MissingColumn(name))
}

fn parse_delivery_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(input, "%m/%d/%Y"))
        .ok()
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Map a page-level schema problem to an error when no row could be read.
pub fn check_schema(page: &ReportPage) -> Result<(), SppcastError> {
    let array_rows = page.data.iter().any(Value::is_array);
    if !array_rows {
        return Ok(());
    }
    let columns = ColumnIndex::from_fields(&page.fields);
    for name in [DELIVERY_DATE, DELIVERY_HOUR, DELIVERY_INTERVAL, PRICE] {
        if columns.position(name).is_none() {
            return Err(SppcastError::Decode {
                reason: format!("report fields do not include {name}"),
            });
        }
    }
    Ok(())
}
