//! Configuration validation.
//!
//! Validates every config section before a command runs.

use crate::domain::error::SppcastError;
use crate::ports::config_port::ConfigPort;
use std::net::SocketAddr;

pub const ERCOT_USERNAME_ENV: &str = "ERCOT_USERNAME";
pub const ERCOT_PASSWORD_ENV: &str = "ERCOT_PASSWORD";
pub const ERCOT_SUBSCRIPTION_KEY_ENV: &str = "ERCOT_SUBSCRIPTION_KEY";

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), SppcastError> {
    validate_market_config(config)?;
    validate_forecast_config(config)?;
    validate_data_config(config)?;
    validate_cache_config(config)?;
    Ok(())
}

pub fn validate_market_config(config: &dyn ConfigPort) -> Result<(), SppcastError> {
    validate_settlement_point(config)?;
    validate_utc_offset(config)?;
    validate_forward_days(config)?;
    Ok(())
}

pub fn validate_forecast_config(config: &dyn ConfigPort) -> Result<(), SppcastError> {
    validate_weeks_lookback(config)?;
    validate_mape_epsilon(config)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), SppcastError> {
    match data_source(config).as_str() {
        "ercot" => validate_ercot_config(config),
        "csv" => {
            require(config, "data", "csv_path")?;
            Ok(())
        }
        other => Err(invalid(
            "data",
            "source",
            format!("unknown data source '{other}' (expected ercot or csv)"),
        )),
    }
}

pub fn validate_ercot_config(config: &dyn ConfigPort) -> Result<(), SppcastError> {
    require_with_env(config, "ercot", "username", ERCOT_USERNAME_ENV)?;
    require_with_env(config, "ercot", "password", ERCOT_PASSWORD_ENV)?;
    require_with_env(config, "ercot", "subscription_key", ERCOT_SUBSCRIPTION_KEY_ENV)?;

    if config.get_int("ercot", "request_timeout_secs", 20) <= 0 {
        return Err(invalid(
            "ercot",
            "request_timeout_secs",
            "request_timeout_secs must be positive",
        ));
    }
    let retries = config.get_int("ercot", "max_retries", 3);
    if !(0..=10).contains(&retries) {
        return Err(invalid(
            "ercot",
            "max_retries",
            "max_retries must be between 0 and 10",
        ));
    }
    if config.get_int("ercot", "retry_base_delay_ms", 500) < 0 {
        return Err(invalid(
            "ercot",
            "retry_base_delay_ms",
            "retry_base_delay_ms must be non-negative",
        ));
    }
    if config.get_int("ercot", "page_size", 1000) <= 0 {
        return Err(invalid("ercot", "page_size", "page_size must be positive"));
    }
    Ok(())
}

pub fn validate_cache_config(config: &dyn ConfigPort) -> Result<(), SppcastError> {
    if config.get_int("cache", "ttl_secs", 300) < 0 {
        return Err(invalid("cache", "ttl_secs", "ttl_secs must be non-negative"));
    }
    if config.get_int("cache", "max_entries", 256) <= 0 {
        return Err(invalid(
            "cache",
            "max_entries",
            "max_entries must be positive",
        ));
    }
    Ok(())
}

pub fn validate_web_config(config: &dyn ConfigPort) -> Result<(), SppcastError> {
    if let Some(listen) = config.get_string("web", "listen") {
        if listen.trim().parse::<SocketAddr>().is_err() {
            return Err(invalid(
                "web",
                "listen",
                format!("'{listen}' is not a socket address"),
            ));
        }
    }
    if config.get_int("web", "upstream_timeout_secs", 30) <= 0 {
        return Err(invalid(
            "web",
            "upstream_timeout_secs",
            "upstream_timeout_secs must be positive",
        ));
    }
    Ok(())
}

pub fn data_source(config: &dyn ConfigPort) -> String {
    config
        .get_string("data", "source")
        .map(|s| s.trim().to_lowercase())
        .unwrap_or_else(|| "ercot".to_string())
}

fn validate_settlement_point(config: &dyn ConfigPort) -> Result<(), SppcastError> {
    let point = require(config, "market", "settlement_point")?;
    if point.chars().any(char::is_whitespace) {
        return Err(invalid(
            "market",
            "settlement_point",
            "settlement_point must not contain whitespace",
        ));
    }
    Ok(())
}

fn validate_utc_offset(config: &dyn ConfigPort) -> Result<(), SppcastError> {
    let value = config.get_int("market", "utc_offset_minutes", -360);
    if !(-720..=840).contains(&value) {
        return Err(invalid(
            "market",
            "utc_offset_minutes",
            "utc_offset_minutes must be between -720 and 840",
        ));
    }
    Ok(())
}

fn validate_forward_days(config: &dyn ConfigPort) -> Result<(), SppcastError> {
    let value = config.get_int("market", "forward_days", 7);
    if !(0..=31).contains(&value) {
        return Err(invalid(
            "market",
            "forward_days",
            "forward_days must be between 0 and 31",
        ));
    }
    Ok(())
}

fn validate_weeks_lookback(config: &dyn ConfigPort) -> Result<(), SppcastError> {
    let value = config.get_int("forecast", "weeks_lookback", 4);
    if !(1..=52).contains(&value) {
        return Err(invalid(
            "forecast",
            "weeks_lookback",
            "weeks_lookback must be between 1 and 52",
        ));
    }
    Ok(())
}

fn validate_mape_epsilon(config: &dyn ConfigPort) -> Result<(), SppcastError> {
    let value = config.get_double("forecast", "mape_epsilon", 1e-6);
    if !(value.is_finite() && value > 0.0) {
        return Err(invalid(
            "forecast",
            "mape_epsilon",
            "mape_epsilon must be a positive number",
        ));
    }
    Ok(())
}

fn require(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, SppcastError> {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| SppcastError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        })
}

fn require_with_env(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    env: &str,
) -> Result<String, SppcastError> {
    config
        .get_string_or_env(section, key, env)
        .ok_or_else(|| SppcastError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        })
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> SppcastError {
    SppcastError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}
