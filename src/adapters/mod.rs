//! Concrete adapter implementations for ports.

pub mod cache;
pub mod csv_adapter;
pub mod csv_report_adapter;
#[cfg(feature = "ercot")]
pub mod ercot;
pub mod file_config_adapter;
pub mod json_report_adapter;
#[cfg(feature = "web")]
pub mod web;
