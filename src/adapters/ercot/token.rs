//! Bearer token cache for the ERCOT public API.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;

use crate::domain::error::SppcastError;

/// Tokens are refreshed this long before they actually expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);
const DEFAULT_EXPIRES_IN: u64 = 3600;
/// Upper bound on the lifetime accepted from a token response.
const MAX_EXPIRES_IN: u64 = 24 * 3600;

/// Body of a successful token response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    id_token: Option<String>,
    access_token: Option<String>,
    expires_in: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: Duration,
}

impl IssuedToken {
    pub fn parse(body: &str) -> Result<Self, SppcastError> {
        let response: TokenResponse = serde_json::from_str(body).map_err(|e| SppcastError::Auth {
            reason: format!("token response is not valid JSON: {e}"),
        })?;
        let token = response
            .id_token
            .or(response.access_token)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SppcastError::Auth {
                reason: "token response has neither id_token nor access_token".to_string(),
            })?;
        let seconds = match response.expires_in {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        }
        .unwrap_or(DEFAULT_EXPIRES_IN)
        .min(MAX_EXPIRES_IN);
        Ok(Self {
            token,
            expires_in: Duration::from_secs(seconds),
        })
    }
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

#[derive(Default)]
pub struct TokenCache {
    current: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached token, or obtain a new one with `issue`.
    ///
    /// The lock is held while issuing so concurrent callers share one login.
    pub fn get_or_issue<F>(&self, issue: F) -> Result<String, SppcastError>
    where
        F: FnOnce() -> Result<IssuedToken, SppcastError>,
    {
        let mut current = self.current.lock();
        if let Some(cached) = current.as_ref() {
            if Instant::now() < cached.expires_at {
                return Ok(cached.token.clone());
            }
        }
        let issued = issue()?;
        let lifetime = issued.expires_in.saturating_sub(EXPIRY_MARGIN);
        *current = Instant::now()
            .checked_add(lifetime)
            .map(|expires_at| CachedToken {
                token: issued.token.clone(),
                expires_at,
            });
        Ok(issued.token)
    }

    pub fn invalidate(&self) {
        *self.current.lock() = None;
    }
}
