//! threshold-monitor - data-quality threshold monitoring.
//!
//! Renders a threshold query, runs it against the warehouse, formats the
//! exceeding rows into a plain-text report, and optionally posts the report
//! to Slack.

pub mod config;
pub mod db;
pub mod error;
pub mod monitor;
pub mod notify;
pub mod query;
pub mod report;

pub use monitor::{run_monitoring, Monitor};
