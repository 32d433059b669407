//! Tracing subscriber setup for the command-line entry point.
//!
//! Logs go to stderr so that `forecast --json` output on stdout stays clean.

use clap::ValueEnum;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

/// `RUST_LOG` wins when set and valid; otherwise `level` with noisy
/// dependencies held at warn.
pub fn build_env_filter(level: LogLevel) -> EnvFilter {
    let base = level.as_str();
    match std::env::var("RUST_LOG") {
        Ok(directives) => EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(base)),
        Err(_) => EnvFilter::new(format!(
            "{base},hyper=warn,hyper_util=warn,reqwest=warn,tower_http=info"
        )),
    }
}

/// Install the global subscriber. A second call is a no-op.
pub fn init_tracing(level: LogLevel, format: LogFormat) {
    let filter = build_env_filter(level);
    let registry = tracing_subscriber::registry().with(filter);

    // try_init fails only if a subscriber is already installed.
    let _ = match format {
        LogFormat::Compact => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names() {
        assert_eq!(LogLevel::Trace.as_str(), "trace");
        assert_eq!(LogLevel::default().as_str(), "warn");
        assert_eq!(LogFormat::default(), LogFormat::Compact);
    }

    #[test]
    fn init_twice_does_not_panic() {
        init_tracing(LogLevel::Error, LogFormat::Compact);
        init_tracing(LogLevel::Debug, LogFormat::Json);
    }
}
