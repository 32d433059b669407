//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use crate::adapters::cache::CachedPricePort;
use crate::adapters::csv_adapter::CsvPriceAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::domain::calendar::{
    DEFAULT_FORWARD_DAYS, DEFAULT_UTC_OFFSET_MINUTES, market_today, parse_date,
};
use crate::domain::config_validation::{
    data_source, validate_config, validate_forecast_config, validate_web_config,
};
use crate::domain::error::SppcastError;
use crate::domain::forecast::DEFAULT_WEEKS_LOOKBACK;
use crate::domain::pipeline::run_forecast;
use crate::domain::report::{ForecastReport, ForecastSettings};
use crate::domain::stats::{DEFAULT_MAPE_EPSILON, DailyStats};
use crate::logging::{LogFormat, LogLevel, init_tracing};
use crate::ports::config_port::ConfigPort;
use crate::ports::price_port::PricePort;
use crate::ports::report_port::ReportPort;

pub type SharedPricePort = Arc<dyn PricePort + Send + Sync>;

#[derive(Parser, Debug)]
#[command(
    name = "sppcast",
    version,
    about = "Seasonal 15-minute settlement point price forecaster"
)]
pub struct Cli {
    /// Log level; RUST_LOG overrides it
    #[arg(long, value_enum, default_value_t = LogLevel::Warn, global = true)]
    pub log_level: LogLevel,
    #[arg(long, value_enum, default_value_t = LogFormat::Compact, global = true)]
    pub log_format: LogFormat,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Forecast one delivery day and backtest against the prior week
    Forecast {
        #[arg(short, long)]
        config: PathBuf,
        /// Delivery date (YYYY-MM-DD); defaults to today in market time
        #[arg(short, long)]
        date: Option<String>,
        /// Override [forecast] weeks_lookback
        #[arg(long)]
        weeks: Option<u32>,
        /// Print the full report as JSON instead of a summary
        #[arg(long)]
        json: bool,
        /// Write the report to a file (.json, otherwise CSV)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print one day of realized prices as CSV
    Fetch {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        date: String,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Start the web server
    Serve {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    init_tracing(cli.log_level, cli.log_format);

    let result = match cli.command {
        Command::Forecast {
            config,
            date,
            weeks,
            json,
            output,
        } => run_forecast_command(&config, date.as_deref(), weeks, json, output.as_deref()),
        Command::Fetch { config, date } => run_fetch(&config, &date),
        Command::Validate { config } => run_validate(&config),
        Command::Serve { config } => run_serve(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, SppcastError> {
    FileConfigAdapter::from_file(path).map_err(|e| SppcastError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

pub fn settlement_point(config: &dyn ConfigPort) -> Result<String, SppcastError> {
    config
        .get_string("market", "settlement_point")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| SppcastError::ConfigMissing {
            section: "market".to_string(),
            key: "settlement_point".to_string(),
        })
}

pub fn utc_offset_minutes(config: &dyn ConfigPort) -> Result<i32, SppcastError> {
    int_setting(config, "market", "utc_offset_minutes", DEFAULT_UTC_OFFSET_MINUTES)
}

pub fn forward_days(config: &dyn ConfigPort) -> Result<u32, SppcastError> {
    int_setting(config, "market", "forward_days", DEFAULT_FORWARD_DAYS)
}

/// Integer key narrowed to `T`; values that do not fit are a config error.
fn int_setting<T>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: T,
) -> Result<T, SppcastError>
where
    T: TryFrom<i64> + Into<i64>,
{
    let raw = config.get_int(section, key, default.into());
    T::try_from(raw).map_err(|_| SppcastError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: format!("{key} = {raw} is out of range"),
    })
}

/// Forecast settings from `[forecast]`, with an optional lookback override.
pub fn build_forecast_settings(
    config: &dyn ConfigPort,
    weeks_override: Option<u32>,
) -> Result<ForecastSettings, SppcastError> {
    validate_forecast_config(config)?;
    let weeks_lookback = match weeks_override {
        Some(w) if !(1..=52).contains(&w) => {
            return Err(SppcastError::ConfigInvalid {
                section: "forecast".to_string(),
                key: "weeks_lookback".to_string(),
                reason: format!("--weeks {w} must be between 1 and 52"),
            });
        }
        Some(w) => w,
        None => int_setting(config, "forecast", "weeks_lookback", DEFAULT_WEEKS_LOOKBACK)?,
    };
    Ok(ForecastSettings {
        weeks_lookback,
        mape_epsilon: config.get_double("forecast", "mape_epsilon", DEFAULT_MAPE_EPSILON),
    })
}

/// History provider selected by `[data] source`, wrapped in the TTL cache.
pub fn build_price_port(config: &dyn ConfigPort) -> Result<SharedPricePort, SppcastError> {
    match data_source(config).as_str() {
        "csv" => {
            let dir = config
                .get_string("data", "csv_path")
                .ok_or_else(|| SppcastError::ConfigMissing {
                    section: "data".to_string(),
                    key: "csv_path".to_string(),
                })?;
            let adapter = CsvPriceAdapter::new(PathBuf::from(dir.trim()));
            Ok(Arc::new(CachedPricePort::from_config(adapter, config)))
        }
        #[cfg(feature = "ercot")]
        "ercot" => {
            use crate::adapters::ercot::{ErcotAdapter, ErcotSettings};
            let adapter = ErcotAdapter::new(ErcotSettings::from_config(config)?)?;
            Ok(Arc::new(CachedPricePort::from_config(adapter, config)))
        }
        #[cfg(not(feature = "ercot"))]
        "ercot" => Err(SppcastError::ConfigInvalid {
            section: "data".to_string(),
            key: "source".to_string(),
            reason: "built without the ercot feature".to_string(),
        }),
        other => Err(SppcastError::ConfigInvalid {
            section: "data".to_string(),
            key: "source".to_string(),
            reason: format!("unknown data source '{other}' (expected ercot or csv)"),
        }),
    }
}

/// The explicit date, or today in market time.
pub fn resolve_target_date(
    date: Option<&str>,
    utc_offset_minutes: i32,
) -> Result<NaiveDate, SppcastError> {
    match date.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => parse_date(s),
        None => Ok(market_today(utc_offset_minutes)),
    }
}

/// Write `report` as JSON when `path` ends in `.json`, as a CSV table otherwise.
pub fn write_report(report: &ForecastReport, path: &Path) -> Result<(), SppcastError> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let writer: &dyn ReportPort = if is_json {
        &JsonReportAdapter
    } else {
        &CsvReportAdapter
    };
    writer.write(report, path)
}

fn fmt_value(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.2}")
    } else {
        "n/a".to_string()
    }
}

fn fmt_stats(stats: &DailyStats) -> String {
    format!(
        "avg {}  min {}  max {}  std {}",
        fmt_value(stats.avg),
        fmt_value(stats.min),
        fmt_value(stats.max),
        fmt_value(stats.std)
    )
}

pub fn format_summary(report: &ForecastReport) -> String {
    let backtest = &report.backtest.result;
    let mut lines = vec![
        format!(
            "{} forecast for {} ({}-week lookback)",
            report.settlement_point, report.target_date, report.weeks_lookback
        ),
        format!(
            "  Slots:     {} observed, {} filled",
            report.provenance.observed_slots, report.provenance.filled_slots
        ),
    ];
    if report.provenance.synthetic {
        lines.push("  Warning:   no history in the lookback window; values are 0".to_string());
    }
    lines.push(format!("  Forecast:  {}", fmt_stats(&report.stats.forecast)));
    lines.push(format!(
        "  Actual:    {} ({})",
        fmt_stats(&report.stats.actuals),
        report.actuals.date
    ));
    lines.push(format!(
        "  Backtest:  MAE {}  MAPE {}  over {} slots",
        fmt_value(backtest.mae),
        backtest
            .mape
            .map(|m| format!("{m:.2}%"))
            .unwrap_or_else(|| "n/a".to_string()),
        backtest.sample_count
    ));
    lines.join("\n")
}

fn run_forecast_command(
    config_path: &Path,
    date: Option<&str>,
    weeks: Option<u32>,
    json: bool,
    output: Option<&Path>,
) -> Result<(), SppcastError> {
    eprintln!("Loading config from {}", config_path.display());
    let config = load_config(config_path)?;
    validate_config(&config)?;

    let point = settlement_point(&config)?;
    let settings = build_forecast_settings(&config, weeks)?;
    let target = resolve_target_date(date, utc_offset_minutes(&config)?)?;
    let port = build_price_port(&config)?;

    let report = run_forecast(port.as_ref(), &point, target, &settings)?;

    if json {
        println!("{}", JsonReportAdapter::render(&report)?);
    } else {
        println!("{}", format_summary(&report));
    }

    if let Some(path) = output {
        write_report(&report, path)?;
        eprintln!("Report written to: {}", path.display());
    }
    Ok(())
}

fn run_fetch(config_path: &Path, date: &str) -> Result<(), SppcastError> {
    let config = load_config(config_path)?;
    validate_config(&config)?;

    let point = settlement_point(&config)?;
    let day = parse_date(date)?;
    let port = build_price_port(&config)?;
    let observations = port.fetch_day(&point, day)?;

    let to_io = |e: csv::Error| SppcastError::Io(std::io::Error::other(e));
    let mut writer = csv::Writer::from_writer(std::io::stdout().lock());
    writer.write_record(["timestamp", "value"]).map_err(to_io)?;
    for obs in &observations {
        writer
            .write_record([
                obs.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                obs.value.to_string(),
            ])
            .map_err(to_io)?;
    }
    writer.flush()?;
    eprintln!("{} observations for {point} on {day}", observations.len());
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), SppcastError> {
    eprintln!("Validating config: {}", config_path.display());
    let config = load_config(config_path)?;
    validate_config(&config)?;
    validate_web_config(&config)?;
    eprintln!("Config validated successfully");
    Ok(())
}

fn run_serve(config_path: &Path) -> Result<(), SppcastError> {
    #[cfg(feature = "web")]
    {
        use crate::adapters::web::{AppState, build_router, web_settings};

        eprintln!("Loading config from {}", config_path.display());
        let config = load_config(config_path)?;
        validate_config(&config)?;
        let (addr, upstream_timeout) = web_settings(&config)?;

        let state = Arc::new(AppState {
            price_port: build_price_port(&config)?,
            settlement_point: settlement_point(&config)?,
            settings: build_forecast_settings(&config, None)?,
            utc_offset_minutes: utc_offset_minutes(&config)?,
            forward_days: forward_days(&config)?,
            upstream_timeout,
        });
        let router = build_router(Arc::clone(&state));

        eprintln!("Starting web server on {addr}");
        let runtime = tokio::runtime::Runtime::new()?;
        let served = runtime.block_on(async move {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            tracing::info!(%addr, "listening");
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = tokio::signal::ctrl_c().await;
                })
                .await
        });
        // The blocking HTTP client must not be dropped inside the runtime.
        drop(runtime);
        drop(state);
        served.map_err(SppcastError::Io)
    }

    #[cfg(not(feature = "web"))]
    {
        let _ = config_path;
        Err(SppcastError::ConfigInvalid {
            section: "web".to_string(),
            key: "listen".to_string(),
            reason: "built without the web feature".to_string(),
        })
    }
}
