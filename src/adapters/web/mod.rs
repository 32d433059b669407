//! Web server adapter.
//!
//! Axum server with a JSON forecast API and an HTMX page showing the forecast,
//! its backtest and summary statistics for a chosen delivery date.

mod chart;
mod error;
mod handlers;
mod templates;

pub use error::{ErrorFormat, WebError, status_from_error};
pub use handlers::*;
pub use templates::*;

use axum::{Router, routing::get};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

use crate::domain::calendar::{ForwardWindow, market_today};
use crate::domain::config_validation::validate_web_config;
use crate::domain::error::SppcastError;
use crate::domain::report::ForecastSettings;
use crate::ports::config_port::ConfigPort;
use crate::ports::price_port::PricePort;

pub const DEFAULT_LISTEN: &str = "127.0.0.1:3000";
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;

pub struct AppState {
    pub price_port: Arc<dyn PricePort + Send + Sync>,
    pub settlement_point: String,
    pub settings: ForecastSettings,
    pub utc_offset_minutes: i32,
    pub forward_days: u32,
    pub upstream_timeout: Duration,
}

impl AppState {
    /// Dates selectable right now in the market's local calendar.
    pub fn forward_window(&self) -> ForwardWindow {
        ForwardWindow::from_today(market_today(self.utc_offset_minutes), self.forward_days)
    }
}

/// Listen address and upstream timeout from the `[web]` section.
pub fn web_settings(
    config: &dyn ConfigPort,
) -> Result<(std::net::SocketAddr, Duration), SppcastError> {
    validate_web_config(config)?;
    let listen = config
        .get_string("web", "listen")
        .unwrap_or_else(|| DEFAULT_LISTEN.to_string());
    let addr = listen
        .trim()
        .parse()
        .map_err(|_| SppcastError::ConfigInvalid {
            section: "web".to_string(),
            key: "listen".to_string(),
            reason: format!("'{listen}' is not a socket address"),
        })?;
    let timeout = config
        .get_int("web", "upstream_timeout_secs", DEFAULT_UPSTREAM_TIMEOUT_SECS as i64)
        .max(1) as u64;
    Ok((addr, Duration::from_secs(timeout)))
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::forecast_page))
        .route("/forecast", get(handlers::forecast_page))
        .route("/api/forecast", get(handlers::forecast_api))
        .route("/healthz", get(handlers::healthz))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn is_htmx_request(headers: &axum::http::HeaderMap) -> bool {
    headers.get("HX-Request").is_some()
}
