//! HTML templates using Askama.
//!
//! Templates only print prepared strings; all number formatting happens in
//! [`ForecastView::from_report`].

use askama::Template;
use chrono::NaiveDate;

use crate::domain::report::ForecastReport;
use crate::domain::stats::DailyStats;

use super::chart::{Series, render_day_chart};

const FORECAST_COLOR: &str = "#1f77b4";
const ACTUAL_COLOR: &str = "#d62728";

pub struct StatCard {
    pub label: String,
    pub value: String,
}

pub struct ForecastRow {
    pub time: String,
    pub forecast: String,
    pub source: &'static str,
    pub actual: String,
}

/// Display model of a [`ForecastReport`].
pub struct ForecastView {
    pub settlement_point: String,
    pub target_date: String,
    pub compare_date: String,
    pub weeks_lookback: u32,
    pub synthetic: bool,
    pub observed_slots: usize,
    pub filled_slots: usize,
    pub cards: Vec<StatCard>,
    pub chart_svg: String,
    pub rows: Vec<ForecastRow>,
}

impl ForecastView {
    pub fn from_report(report: &ForecastReport) -> Self {
        let actuals = report.actual_by_slot();
        let forecast: Vec<Option<f64>> = report.forecast.iter().map(|p| Some(p.value)).collect();
        let chart_svg = render_day_chart(&[
            Series {
                name: "forecast",
                color: FORECAST_COLOR,
                values: &forecast,
            },
            Series {
                name: "actual (prior week)",
                color: ACTUAL_COLOR,
                values: &actuals,
            },
        ]);

        let rows = report
            .forecast
            .iter()
            .enumerate()
            .map(|(slot, point)| ForecastRow {
                time: point.timestamp.format("%H:%M").to_string(),
                forecast: format_price(point.value),
                source: report.sources.get(slot).map(|s| s.label()).unwrap_or(""),
                actual: actuals
                    .get(slot)
                    .copied()
                    .flatten()
                    .map(format_price)
                    .unwrap_or_default(),
            })
            .collect();

        let backtest = &report.backtest.result;
        let mut cards = stat_cards("Forecast", &report.stats.forecast);
        cards.extend(stat_cards("Actual", &report.stats.actuals));
        cards.push(StatCard {
            label: "Backtest MAE".to_string(),
            value: format_price(backtest.mae),
        });
        cards.push(StatCard {
            label: "Backtest MAPE".to_string(),
            value: backtest
                .mape
                .map(|m| format!("{m:.2}%"))
                .unwrap_or_else(|| "n/a".to_string()),
        });
        cards.push(StatCard {
            label: "Compared slots".to_string(),
            value: backtest.sample_count.to_string(),
        });

        Self {
            settlement_point: report.settlement_point.clone(),
            target_date: report.target_date.to_string(),
            compare_date: report.actuals.date.to_string(),
            weeks_lookback: report.weeks_lookback,
            synthetic: report.provenance.synthetic,
            observed_slots: report.provenance.observed_slots,
            filled_slots: report.provenance.filled_slots,
            cards,
            chart_svg,
            rows,
        }
    }
}

fn stat_cards(prefix: &str, stats: &DailyStats) -> Vec<StatCard> {
    [
        ("avg", stats.avg),
        ("min", stats.min),
        ("max", stats.max),
        ("std", stats.std),
    ]
    .into_iter()
    .map(|(name, value)| StatCard {
        label: format!("{prefix} {name}"),
        value: format_price(value),
    })
    .collect()
}

pub fn format_price(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.2}")
    } else {
        "n/a".to_string()
    }
}

#[derive(Template)]
#[template(path = "forecast.html")]
pub struct ForecastPage<'a> {
    pub title: &'a str,
    pub selected_date: NaiveDate,
    pub min_date: NaiveDate,
    pub max_date: NaiveDate,
    pub view: &'a ForecastView,
}

#[derive(Template)]
#[template(path = "forecast_fragment.html")]
pub struct ForecastFragment<'a> {
    pub view: &'a ForecastView,
}

#[derive(Template)]
#[template(path = "base.html")]
pub struct BasePage<'a> {
    pub title: &'a str,
    pub content: &'a str,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate<'a> {
    pub message: &'a str,
    pub status: u16,
}
