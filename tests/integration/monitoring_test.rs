//! End-to-end monitoring runs against the mock warehouse and transport.

use super::common::{request, request_with_slack, snowflake_env, three_rows, CHANNEL, TOKEN};
use pretty_assertions::assert_eq;
use threshold_monitor::config::MockEnvironment;
use threshold_monitor::db::{MockConnector, MockFailure, QueryResult};
use threshold_monitor::error::RunStage;
use threshold_monitor::notify::{MockTransport, PostResponse};
use threshold_monitor::query::build_query;
use threshold_monitor::Monitor;

const THREE_ROW_REPORT: &str = "Monitoring Results for test_table.amount:
Found 3 records exceeding threshold

Top 5 records:

1. ID: 1
   Value: 200.0
   Difference: 100.0

2. ID: 2
   Value: 180.0
   Difference: 80.0

3. ID: 3
   Value: 150.0
   Difference: 50.0";

#[tokio::test]
async fn test_run_without_notification() {
    let connector = MockConnector::new().with_result(three_rows());
    let log = connector.log();
    let transport = MockTransport::new();
    let monitor = Monitor::new(connector, transport.clone()).with_env(snowflake_env());

    let report = monitor.run(&request()).await.unwrap();

    assert_eq!(report, THREE_ROW_REPORT);
    assert_eq!(log.executed(), vec![build_query(&request())]);
    assert_eq!(log.cursor_closes(), 1);
    assert_eq!(log.connection_closes(), 1);
    assert!(transport.posted().is_empty());
}

#[tokio::test]
async fn test_run_posts_report_to_slack() {
    let transport = MockTransport::new();
    let monitor = Monitor::new(MockConnector::new().with_result(three_rows()), transport.clone())
        .with_env(snowflake_env());

    let report = monitor.run(&request_with_slack()).await.unwrap();

    let posted = transport.posted();
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0].channel, CHANNEL);
    assert_eq!(posted[0].token, TOKEN);
    assert_eq!(posted[0].text, report);
}

#[tokio::test]
async fn test_slack_rejection_does_not_fail_run() {
    let transport = MockTransport::new().respond(PostResponse::rejected("channel_not_found"));
    let monitor = Monitor::new(MockConnector::new().with_result(three_rows()), transport.clone())
        .with_env(snowflake_env());

    let report = monitor.run(&request_with_slack()).await.unwrap();

    assert_eq!(report, THREE_ROW_REPORT);
    assert_eq!(transport.posted().len(), 1);
}

#[tokio::test]
async fn test_slack_transport_failure_does_not_fail_run() {
    let transport = MockTransport::new().failing("request_failed (connection refused)");
    let monitor = Monitor::new(MockConnector::new().with_result(three_rows()), transport.clone())
        .with_env(snowflake_env());

    let report = monitor.run(&request_with_slack()).await.unwrap();
    assert_eq!(report, THREE_ROW_REPORT);
}

#[tokio::test]
async fn test_token_without_channel_skips_slack() {
    let transport = MockTransport::new();
    let monitor = Monitor::new(MockConnector::new().with_result(three_rows()), transport.clone())
        .with_env(snowflake_env());

    let mut req = request_with_slack();
    req.notification_channel = None;
    monitor.run(&req).await.unwrap();

    assert!(transport.posted().is_empty());
}

#[tokio::test]
async fn test_no_rows_reports_nothing_found() {
    let transport = MockTransport::new();
    let connector = MockConnector::new().with_result(QueryResult::new());
    let monitor = Monitor::new(connector, transport.clone()).with_env(snowflake_env());

    let report = monitor.run(&request_with_slack()).await.unwrap();

    assert_eq!(report, "No records found exceeding threshold in test_table.amount");
    assert_eq!(transport.posted()[0].text, report);
}

#[tokio::test]
async fn test_query_failure_aborts_run() {
    let connector =
        MockConnector::new().failing(MockFailure::Execute("Query execution failed".into()));
    let log = connector.log();
    let transport = MockTransport::new();
    let monitor = Monitor::new(connector, transport.clone()).with_env(snowflake_env());

    let err = monitor.run(&request_with_slack()).await.unwrap_err();

    assert_eq!(err.stage(), Some(RunStage::Query));
    let text = err.to_string();
    assert!(text.contains("Error running monitoring"), "got: {text}");
    assert!(text.contains("Query execution failed"), "got: {text}");
    assert_eq!(log.cursor_closes(), 1);
    assert_eq!(log.connection_closes(), 1);
    assert!(transport.posted().is_empty());
}

#[tokio::test]
async fn test_connection_failure_aborts_run() {
    let connector = MockConnector::new().failing(MockFailure::Connect("Connection failed".into()));
    let log = connector.log();
    let monitor = Monitor::new(connector, MockTransport::new()).with_env(snowflake_env());

    let err = monitor.run(&request()).await.unwrap_err();

    assert_eq!(err.stage(), Some(RunStage::Connect));
    assert_eq!(
        err.to_string(),
        "Error running monitoring: Error connecting to Snowflake: Connection failed"
    );
    assert!(log.executed().is_empty());
}

#[tokio::test]
async fn test_missing_credentials_never_reach_driver() {
    let connector = MockConnector::new();
    let log = connector.log();
    let env = MockEnvironment::new()
        .with_var("SNOWFLAKE_USER", "test_user")
        .with_var("SNOWFLAKE_ACCOUNT", "test_account")
        .with_var("SNOWFLAKE_ROLE", "  ");
    let monitor = Monitor::new(connector, MockTransport::new()).with_env(env);

    let err = monitor.run(&request()).await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "Error running monitoring: Missing required connection parameters: password, warehouse, role"
    );
    assert!(log.calls().is_empty());
}

#[tokio::test]
async fn test_only_first_five_records_detailed() {
    use threshold_monitor::db::{ColumnInfo, Value};

    let rows = (0..8)
        .map(|i| {
            vec![
                Value::from(format!("org_{i}")),
                Value::from(500.0 - i as f64 * 10.0),
                Value::from(400.0 - i as f64 * 10.0),
            ]
        })
        .collect();
    let result = QueryResult::with_data(
        vec![
            ColumnInfo::new("ID", "text"),
            ColumnInfo::new("VALUE", "real"),
            ColumnInfo::new("DIFFERENCE", "real"),
        ],
        rows,
    );
    let monitor = Monitor::new(MockConnector::new().with_result(result), MockTransport::new())
        .with_env(snowflake_env());

    let report = monitor.run(&request()).await.unwrap();

    assert!(report.contains("Found 8 records exceeding threshold"));
    assert!(report.contains("5. ID: org_4"));
    assert!(!report.contains("org_5"));
}
