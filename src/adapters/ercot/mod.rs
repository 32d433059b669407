//! ERCOT public reports API history provider.
//!
//! Fetches settlement point prices for one delivery day at a time, following
//! pagination. Authentication is a resource-owner password token exchange
//! whose bearer token is cached until shortly before it expires.

pub mod decode;
pub mod retry;
pub mod token;

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use tracing::{debug, info, warn};

use crate::domain::config_validation::{
    ERCOT_PASSWORD_ENV, ERCOT_SUBSCRIPTION_KEY_ENV, ERCOT_USERNAME_ENV,
};
use crate::domain::error::SppcastError;
use crate::domain::observation::Observation;
use crate::ports::config_port::ConfigPort;
use crate::ports::price_port::PricePort;

use decode::{ReportPage, check_schema, decode_page};
use retry::{RetryPolicy, send_with_retry};
use token::{IssuedToken, TokenCache};

pub const DEFAULT_API_BASE: &str = "https://api.ercot.com/api/public-reports";
pub const DEFAULT_REPORT_PATH: &str = "np6-905-cd/spp_node_zone_hub";
pub const DEFAULT_TOKEN_URL: &str = "https://ercotb2c.b2clogin.com/ercotb2c.onmicrosoft.com/B2C_1_PUBAPI-ROPC-FLOW/oauth2/v2.0/token";
pub const DEFAULT_CLIENT_ID: &str = "fec253ea-0d06-4272-a5e6-b478baeecd70";

const SUBSCRIPTION_HEADER: &str = "Ocp-Apim-Subscription-Key";
/// Upstream error bodies are cut to this many characters in messages.
const MAX_ERROR_BODY: usize = 200;

#[derive(Debug, Clone)]
pub struct ErcotSettings {
    pub api_base: String,
    pub report_path: String,
    pub token_url: String,
    pub client_id: String,
    pub username: String,
    pub password: String,
    pub subscription_key: String,
    pub request_timeout: Duration,
    pub page_size: u32,
    pub retry: RetryPolicy,
}

impl ErcotSettings {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, SppcastError> {
        let string_or = |key: &str, default: &str| {
            config
                .get_string("ercot", key)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let secret = |key: &str, env: &str| {
            config
                .get_string_or_env("ercot", key, env)
                .map(|s| s.trim().to_string())
                .ok_or_else(|| SppcastError::ConfigMissing {
                    section: "ercot".to_string(),
                    key: key.to_string(),
                })
        };

        Ok(Self {
            api_base: string_or("api_base", DEFAULT_API_BASE),
            report_path: string_or("report_path", DEFAULT_REPORT_PATH),
            token_url: string_or("token_url", DEFAULT_TOKEN_URL),
            client_id: string_or("client_id", DEFAULT_CLIENT_ID),
            username: secret("username", ERCOT_USERNAME_ENV)?,
            password: secret("password", ERCOT_PASSWORD_ENV)?,
            subscription_key: secret("subscription_key", ERCOT_SUBSCRIPTION_KEY_ENV)?,
            request_timeout: Duration::from_secs(
                config.get_int("ercot", "request_timeout_secs", 20).max(1) as u64,
            ),
            page_size: config.get_int("ercot", "page_size", 1000).clamp(1, 100_000) as u32,
            retry: RetryPolicy {
                max_retries: config.get_int("ercot", "max_retries", 3).clamp(0, 10) as u32,
                base_delay: Duration::from_millis(
                    config.get_int("ercot", "retry_base_delay_ms", 500).max(0) as u64,
                ),
            },
        })
    }

    fn report_url(&self) -> String {
        format!(
            "{}/{}",
            self.api_base.trim_end_matches('/'),
            self.report_path.trim_start_matches('/')
        )
    }
}

pub struct ErcotAdapter {
    client: Client,
    settings: ErcotSettings,
    tokens: TokenCache,
}

impl ErcotAdapter {
    pub fn new(settings: ErcotSettings) -> Result<Self, SppcastError> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| SppcastError::Upstream {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            settings,
            tokens: TokenCache::new(),
        })
    }

    fn bearer_token(&self) -> Result<String, SppcastError> {
        self.tokens.get_or_issue(|| self.request_token())
    }

    fn request_token(&self) -> Result<IssuedToken, SppcastError> {
        let s = &self.settings;
        let scope = format!("openid {} offline_access", s.client_id);
        let query = [
            ("username", s.username.as_str()),
            ("password", s.password.as_str()),
            ("grant_type", "password"),
            ("scope", scope.as_str()),
            ("client_id", s.client_id.as_str()),
            ("response_type", "id_token"),
        ];

        info!(url = %s.token_url, "requesting ERCOT access token");
        let response = send_with_retry(&s.retry, "ercot_token", || {
            self.client.post(&s.token_url).query(&query).send()
        })
        .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = read_body(response)?;
        if !status.is_success() {
            return Err(SppcastError::Auth {
                reason: format!(
                    "token endpoint returned HTTP {}: {}",
                    status.as_u16(),
                    truncate(&body)
                ),
            });
        }
        IssuedToken::parse(&body)
    }

    fn get_page(
        &self,
        point: &str,
        day: NaiveDate,
        page: u32,
        token: &str,
    ) -> Result<Response, SppcastError> {
        let s = &self.settings;
        let url = s.report_url();
        let date = day.format("%Y-%m-%d").to_string();
        let size = s.page_size.to_string();
        let page = page.to_string();
        let query = [
            ("deliveryDateFrom", date.as_str()),
            ("deliveryDateTo", date.as_str()),
            ("settlementPoint", point),
            ("size", size.as_str()),
            ("page", page.as_str()),
        ];

        send_with_retry(&s.retry, "ercot_report", || {
            self.client
                .get(&url)
                .query(&query)
                .header(SUBSCRIPTION_HEADER, &s.subscription_key)
                .bearer_auth(token)
                .send()
        })
        .map_err(|e| self.transport_error(e))
    }

    /// One page of the report, re-authenticating once on 401.
    fn fetch_page(
        &self,
        point: &str,
        day: NaiveDate,
        page: u32,
    ) -> Result<ReportPage, SppcastError> {
        let token = self.bearer_token()?;
        let mut response = self.get_page(point, day, page, &token)?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!(point, day = %day, "ERCOT rejected the cached token, re-authenticating");
            self.tokens.invalidate();
            let token = self.bearer_token()?;
            response = self.get_page(point, day, page, &token)?;
        }

        let status = response.status();
        let body = read_body(response)?;
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            self.tokens.invalidate();
            return Err(SppcastError::Auth {
                reason: format!(
                    "report endpoint returned HTTP {}: {}",
                    status.as_u16(),
                    truncate(&body)
                ),
            });
        }
        if !status.is_success() {
            return Err(SppcastError::UpstreamStatus {
                status: status.as_u16(),
                body: truncate(&body),
            });
        }

        let parsed: ReportPage = serde_json::from_str(&body).map_err(|e| SppcastError::Decode {
            reason: format!("report page {page} is not valid JSON: {e}"),
        })?;
        check_schema(&parsed)?;
        Ok(parsed)
    }

    fn transport_error(&self, error: reqwest::Error) -> SppcastError {
        if error.is_timeout() {
            SppcastError::UpstreamTimeout {
                seconds: self.settings.request_timeout.as_secs(),
            }
        } else {
            SppcastError::Upstream {
                reason: error.to_string(),
            }
        }
    }
}

impl PricePort for ErcotAdapter {
    fn fetch_day(&self, point: &str, day: NaiveDate) -> Result<Vec<Observation>, SppcastError> {
        let mut observations = Vec::new();
        let mut rejected = 0usize;
        let mut page = 1u32;

        loop {
            let report = self.fetch_page(point, day, page)?;
            let decoded = decode_page(&report, point);
            if let Some(first) = decoded.rejected.first() {
                debug!(point, day = %day, page, reason = %first, "first rejected row");
            }
            rejected += decoded.rejected.len();
            observations.extend(decoded.observations.into_iter().filter(|o| o.date() == day));

            if page >= report.total_pages() {
                break;
            }
            page += 1;
        }

        if rejected > 0 {
            warn!(point, day = %day, rejected, "skipped malformed report rows");
        }
        observations.sort_by_key(|o| o.timestamp);
        debug!(
            point,
            day = %day,
            pages = page,
            points = observations.len(),
            "fetched ERCOT prices"
        );
        Ok(observations)
    }
}

fn read_body(response: Response) -> Result<String, SppcastError> {
    response.text().map_err(|e| SppcastError::Upstream {
        reason: format!("failed to read response body: {e}"),
    })
}

fn truncate(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
