//! Config file loading and request resolution.

use std::io::Write;
use tempfile::NamedTempFile;
use threshold_monitor::config::{Config, MonitoringRequest};
use threshold_monitor::query::build_query;

#[test]
fn test_config_file_drives_rendered_query() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[monitor]
table_name = "fct__payments"
target_column = "amount"
id_column = "payment_id"
date_column = "paid_at"
threshold = 1000.5
start_date = "2024-06-01"
database = "analytics"
schema = "finance"
"#
    )
    .unwrap();

    let config = Config::load_from_file(file.path()).unwrap();
    let sql = build_query(&config.monitor);

    assert!(sql.contains("from analytics.finance.fct__payments"));
    assert!(sql.contains("amount > 1000.5"));
    assert!(sql.contains("paid_at > '2024-06-01'"));
    assert!(config.snowflake.is_none());
}

#[test]
fn test_missing_config_file_uses_balance_job() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load_from_file(&dir.path().join("absent.toml")).unwrap();

    assert_eq!(config.monitor, MonitoringRequest::balance_default());
}

#[test]
fn test_invalid_config_is_config_error() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[monitor]\nthreshold = \"high\"").unwrap();

    let err = Config::load_from_file(file.path()).unwrap_err();
    assert_eq!(err.category(), "Configuration Error");
    assert!(err.to_string().starts_with("Configuration error: invalid config file"));
}
