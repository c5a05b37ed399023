//! Integration tests for threshold-monitor.

pub mod common;
pub mod config_test;
pub mod monitoring_test;
pub mod notification_test;
pub mod warehouse_test;
