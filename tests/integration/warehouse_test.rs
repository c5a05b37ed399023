//! Warehouse access through the connector seam.

use super::common::{connection_params, three_rows};
use threshold_monitor::config::ConnectionParams;
use threshold_monitor::db::{self, MockCall, MockConnector, MockFailure, Record};

#[tokio::test]
async fn test_connect_passes_parameters_through() {
    let connector = MockConnector::new();
    let log = connector.log();
    let params = ConnectionParams {
        database: Some("analytics".to_string()),
        ..connection_params()
    };

    db::connect(&connector, &params).await.unwrap();

    assert_eq!(log.connect_params(), vec![params]);
}

#[tokio::test]
async fn test_connect_wraps_driver_error() {
    let connector = MockConnector::new()
        .failing(MockFailure::Connect("Incorrect username or password".into()));

    let err = db::connect(&connector, &connection_params()).await.err().unwrap();

    assert_eq!(
        err.to_string(),
        "Error connecting to Snowflake: Incorrect username or password"
    );
}

#[tokio::test]
async fn test_read_table_normalizes_column_names() {
    let connector = MockConnector::new().with_result(three_rows());
    let conn = db::connect(&connector, &connection_params()).await.unwrap();

    let records = db::read_table(conn, "SELECT 1").await.unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[0], Record::new("1", 200.0, 100.0));
}

#[tokio::test]
async fn test_read_table_call_order() {
    let connector = MockConnector::new().with_result(three_rows());
    let log = connector.log();
    let conn = db::connect(&connector, &connection_params()).await.unwrap();

    db::read_table(conn, "SELECT 1").await.unwrap();

    let calls: Vec<MockCall> = log.calls().into_iter().skip(1).collect();
    assert_eq!(
        calls,
        vec![
            MockCall::Cursor,
            MockCall::Execute("SELECT 1".to_string()),
            MockCall::Fetch,
            MockCall::CloseCursor,
            MockCall::CloseConnection,
        ]
    );
}

#[tokio::test]
async fn test_fetch_failure_releases_resources() {
    let connector = MockConnector::new().failing(MockFailure::Fetch("result expired".into()));
    let log = connector.log();
    let conn = db::connect(&connector, &connection_params()).await.unwrap();

    let err = db::read_table(conn, "SELECT 1").await.unwrap_err();

    assert_eq!(err.to_string(), "Error reading from Snowflake: result expired");
    assert_eq!(log.cursor_closes(), 1);
    assert_eq!(log.connection_closes(), 1);
}
