//! HTTP error responses for the web adapter.
//!
//! API routes answer with a JSON body, page routes with an HTML page or an
//! HTMX fragment.

use askama::Template;
use axum::{
    Json,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde_json::json;

use crate::domain::error::SppcastError;

use super::templates::{BasePage, ErrorTemplate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorFormat {
    Json,
    Page,
    Fragment,
}

#[derive(Debug)]
pub struct WebError {
    pub status: StatusCode,
    pub message: String,
    pub format: ErrorFormat,
}

impl WebError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            format: ErrorFormat::Json,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn with_format(mut self, format: ErrorFormat) -> Self {
        self.format = format;
        self
    }
}

pub fn status_from_error(err: &SppcastError) -> StatusCode {
    match err {
        SppcastError::InvalidDate { .. } | SppcastError::DateOutOfRange { .. } => {
            StatusCode::BAD_REQUEST
        }
        SppcastError::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        SppcastError::Upstream { .. }
        | SppcastError::UpstreamStatus { .. }
        | SppcastError::Auth { .. }
        | SppcastError::Decode { .. } => StatusCode::BAD_GATEWAY,
        SppcastError::ConfigParse { .. }
        | SppcastError::ConfigMissing { .. }
        | SppcastError::ConfigInvalid { .. }
        | SppcastError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<SppcastError> for WebError {
    fn from(err: SppcastError) -> Self {
        Self::new(status_from_error(&err), err.to_string())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = self.status.as_u16(), error = %self.message, "request failed");
        } else {
            tracing::debug!(
                status = self.status.as_u16(),
                error = %self.message,
                "request rejected"
            );
        }

        if self.format == ErrorFormat::Json {
            let body = json!({
                "error": {
                    "status": self.status.as_u16(),
                    "message": self.message,
                }
            });
            return (self.status, Json(body)).into_response();
        }

        let template = ErrorTemplate {
            message: &self.message,
            status: self.status.as_u16(),
        };
        let content = match template.render() {
            Ok(html) => html,
            Err(_) => return (self.status, self.message).into_response(),
        };
        if self.format == ErrorFormat::Fragment {
            return (self.status, Html(content)).into_response();
        }

        let page = BasePage {
            title: "Error",
            content: &content,
        };
        match page.render() {
            Ok(html) => (self.status, Html(html)).into_response(),
            Err(_) => (self.status, Html(content)).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn maps_errors_to_statuses() {
        assert_eq!(
            status_from_error(&SppcastError::InvalidDate { input: "x".into() }),
            StatusCode::BAD_REQUEST
        );
        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(
            status_from_error(&SppcastError::DateOutOfRange {
                date: d,
                earliest: d,
                latest: d
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_from_error(&SppcastError::UpstreamTimeout { seconds: 30 }),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_from_error(&SppcastError::UpstreamStatus {
                status: 503,
                body: String::new()
            }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_from_error(&SppcastError::Io(std::io::Error::other("disk"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn default_format_is_json() {
        let err: WebError = SppcastError::Upstream {
            reason: "down".into(),
        }
        .into();
        assert_eq!(err.format, ErrorFormat::Json);
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
        assert_eq!(
            err.with_format(ErrorFormat::Page).format,
            ErrorFormat::Page
        );
    }
}
