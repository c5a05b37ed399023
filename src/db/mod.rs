//! Warehouse access layer for threshold-monitor.
//!
//! Provides a trait-based interface over the warehouse driver, plus the two
//! operations a monitoring run needs: opening a validated connection and
//! reading a query's rows with guaranteed release of the cursor and
//! connection.

mod mock;
mod snowflake;
mod types;

pub use mock::{MockCall, MockConnector, MockFailure, MockLog};
pub use snowflake::SnowflakeConnector;
pub use types::{format_float, ColumnInfo, QueryResult, Record, Row, Value};

use crate::config::ConnectionParams;
use crate::error::{MonitorError, Result};
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Raw failure reported by a driver, carrying the driver's own message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct DriverError(pub String);

impl DriverError {
    /// Creates a driver error with the given message.
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Result type alias for driver operations.
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Opens connections to the warehouse.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a connection using exactly the given parameters.
    async fn connect(
        &self,
        params: &ConnectionParams,
    ) -> DriverResult<Box<dyn WarehouseConnection>>;
}

/// An open warehouse session.
#[async_trait]
pub trait WarehouseConnection: Send {
    /// Acquires a cursor for running one statement.
    async fn cursor(&mut self) -> DriverResult<Box<dyn Cursor>>;

    /// Ends the session.
    async fn close(&mut self) -> DriverResult<()>;
}

/// Statement handle scoped to a single query.
#[async_trait]
pub trait Cursor: Send {
    /// Runs a SQL statement.
    async fn execute(&mut self, sql: &str) -> DriverResult<()>;

    /// Fetches every row produced by the last statement.
    async fn fetch_all(&mut self) -> DriverResult<QueryResult>;

    /// Releases the cursor.
    async fn close(&mut self) -> DriverResult<()>;
}

/// Validates `params` and opens a connection with them.
///
/// Missing required keys fail before any network I/O, naming every missing
/// key. Driver failures become connection errors carrying the driver's message.
pub async fn connect(
    connector: &dyn Connector,
    params: &ConnectionParams,
) -> Result<Box<dyn WarehouseConnection>> {
    params.validate()?;

    info!("Connecting to {}", params.display_string());
    let conn = connector
        .connect(params)
        .await
        .map_err(|e| MonitorError::connection(e.to_string()))?;
    debug!("Connection established");
    Ok(conn)
}

/// Runs `query` on `conn` and returns its rows as monitoring records.
///
/// Takes ownership of the connection: the cursor and the connection are both
/// closed before this returns, whether the statement, the fetch, or the
/// record conversion failed or not.
pub async fn read_table(
    mut conn: Box<dyn WarehouseConnection>,
    query: &str,
) -> Result<Vec<Record>> {
    let outcome = run_on_cursor(conn.as_mut(), query).await;

    if let Err(e) = conn.close().await {
        warn!("Failed to close warehouse connection: {}", e);
    }

    let result = outcome.map_err(|e| MonitorError::query(e.to_string()))?;
    debug!("Fetched {} rows", result.row_count());
    result.into_records()
}

async fn run_on_cursor(
    conn: &mut dyn WarehouseConnection,
    query: &str,
) -> DriverResult<QueryResult> {
    let mut cursor = conn.cursor().await?;

    debug!("Executing query:\n{}", query);
    let outcome: DriverResult<QueryResult> = async {
        cursor.execute(query).await?;
        cursor.fetch_all().await
    }
    .await;

    if let Err(e) = cursor.close().await {
        warn!("Failed to close cursor: {}", e);
    }

    outcome
}
