//! # scorearena Common Library
//!
//! Shared code for the scorearena service:
//! - Error type
//! - Configuration loading and root folder resolution
//! - Append-only CSV logs
//! - Timestamp helpers

pub mod config;
pub mod csv_log;
pub mod error;
pub mod time;

pub use csv_log::AppendLog;
pub use error::{Error, Result};
