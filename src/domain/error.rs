//! Error types shared by the domain, ports and adapters.
//!
//! The forecast engine and the statistics never produce these; they degrade to
//! NaN / `None` instead. Everything here originates in a collaborator.

/// Top-level error type for sppcast.
#[derive(Debug, thiserror::Error)]
pub enum SppcastError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid date '{input}': expected YYYY-MM-DD")]
    InvalidDate { input: String },

    #[error("date {date} is outside the allowed range {earliest} to {latest}")]
    DateOutOfRange {
        date: chrono::NaiveDate,
        earliest: chrono::NaiveDate,
        latest: chrono::NaiveDate,
    },

    #[error("upstream request failed: {reason}")]
    Upstream { reason: String },

    #[error("upstream returned HTTP {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("upstream did not respond within {seconds}s")]
    UpstreamTimeout { seconds: u64 },

    #[error("upstream authentication failed: {reason}")]
    Auth { reason: String },

    #[error("malformed upstream response: {reason}")]
    Decode { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SppcastError {
    /// True for failures of the history provider rather than of the request.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            SppcastError::Upstream { .. }
                | SppcastError::UpstreamStatus { .. }
                | SppcastError::UpstreamTimeout { .. }
                | SppcastError::Auth { .. }
                | SppcastError::Decode { .. }
        )
    }
}

impl From<&SppcastError> for std::process::ExitCode {
    fn from(err: &SppcastError) -> Self {
        let code: u8 = match err {
            SppcastError::Io(_) => 1,
            SppcastError::ConfigParse { .. }
            | SppcastError::ConfigMissing { .. }
            | SppcastError::ConfigInvalid { .. } => 2,
            SppcastError::InvalidDate { .. } | SppcastError::DateOutOfRange { .. } => 3,
            SppcastError::Upstream { .. }
            | SppcastError::UpstreamStatus { .. }
            | SppcastError::UpstreamTimeout { .. }
            | SppcastError::Auth { .. }
            | SppcastError::Decode { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}
