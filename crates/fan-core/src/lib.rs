//! Core domain types for Fan Analytics.
//!
//! Holds the fan record model, the input-boundary validation that turns raw
//! submissions into records, the engagement scorer, the filter
//! specification, command-line settings and the shared error type.

pub mod error;
pub mod filter;
pub mod models;
pub mod scoring;
pub mod settings;
pub mod time_utils;
pub mod validation;

pub use error::{FanError, Result};
