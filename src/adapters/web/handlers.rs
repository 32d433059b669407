//! HTTP request handlers for the web adapter.

use askama::Template;
use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::domain::error::SppcastError;
use crate::domain::pipeline::run_forecast;
use crate::domain::report::ForecastReport;

use super::templates::{ForecastFragment, ForecastPage, ForecastView};
use super::{AppState, ErrorFormat, WebError, is_htmx_request};

#[derive(Debug, Default, Deserialize)]
pub struct ForecastQuery {
    pub date: Option<String>,
}

/// Resolve the requested date against the forward window and run the
/// forecast off the async runtime, bounded by the upstream timeout.
pub async fn build_report(
    state: &Arc<AppState>,
    date: Option<&str>,
) -> Result<ForecastReport, SppcastError> {
    let target = state.forward_window().resolve(date)?;
    let timeout = state.upstream_timeout;

    let task_state = Arc::clone(state);
    let task = tokio::task::spawn_blocking(move || {
        run_forecast(
            task_state.price_port.as_ref(),
            &task_state.settlement_point,
            target,
            &task_state.settings,
        )
    });

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(SppcastError::Upstream {
            reason: format!("forecast task failed: {join_error}"),
        }),
        Err(_) => {
            tracing::warn!(
                target_date = %target,
                timeout_secs = timeout.as_secs(),
                "history fetch timed out"
            );
            Err(SppcastError::UpstreamTimeout {
                seconds: timeout.as_secs(),
            })
        }
    }
}

pub async fn forecast_api(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ForecastQuery>,
) -> Result<Json<ForecastReport>, WebError> {
    let report = build_report(&state, query.date.as_deref()).await?;
    Ok(Json(report))
}

pub async fn forecast_page(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ForecastQuery>,
) -> Result<Response, WebError> {
    let htmx = is_htmx_request(&headers);
    let format = if htmx {
        ErrorFormat::Fragment
    } else {
        ErrorFormat::Page
    };

    let report = build_report(&state, query.date.as_deref())
        .await
        .map_err(|e| WebError::from(e).with_format(format))?;
    let view = ForecastView::from_report(&report);

    let rendered = if htmx {
        ForecastFragment { view: &view }.render()
    } else {
        let window = state.forward_window();
        ForecastPage {
            title: "sppcast",
            selected_date: report.target_date,
            min_date: window.earliest,
            max_date: window.latest,
            view: &view,
        }
        .render()
    };

    let html = rendered
        .map_err(|e| WebError::internal(format!("template error: {e}")).with_format(format))?;
    Ok(Html(html).into_response())
}

pub async fn healthz() -> &'static str {
    "ok"
}

pub async fn not_found(uri: Uri) -> WebError {
    let format = if uri.path().starts_with("/api") {
        ErrorFormat::Json
    } else {
        ErrorFormat::Page
    };
    WebError::new(StatusCode::NOT_FOUND, format!("no route for {}", uri.path())).with_format(format)
}
