//! Core domain types and logic.
//!
//! [`forecast`] and [`stats`] are pure; everything that touches the outside
//! world goes through the traits in [`crate::ports`].

pub mod observation;
pub mod forecast;
pub mod stats;
pub mod calendar;
pub mod report;
pub mod pipeline;
pub mod config_validation;
pub mod error;
