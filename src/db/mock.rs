//! Mock warehouse driver for testing.
//!
//! Returns a scripted result, can be told to fail at any driver call, and
//! records every call so tests can assert on parameters, SQL, and resource
//! release.

use super::{Connector, Cursor, DriverError, DriverResult, QueryResult, WarehouseConnection};
use crate::config::ConnectionParams;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// A driver call that can be made to fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockFailure {
    Connect(String),
    Cursor(String),
    Execute(String),
    Fetch(String),
    CloseCursor(String),
    CloseConnection(String),
}

/// A driver call recorded by the mock.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Connect(ConnectionParams),
    Cursor,
    Execute(String),
    Fetch,
    CloseCursor,
    CloseConnection,
}

/// Shared record of driver calls.
#[derive(Debug, Clone, Default)]
pub struct MockLog {
    calls: Arc<Mutex<Vec<MockCall>>>,
}

impl MockLog {
    fn record(&self, call: MockCall) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
    }

    /// Returns every call made so far, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Returns the parameters of each connect call.
    pub fn connect_params(&self) -> Vec<ConnectionParams> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MockCall::Connect(params) => Some(params),
                _ => None,
            })
            .collect()
    }

    /// Returns the SQL of each execute call.
    pub fn executed(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MockCall::Execute(sql) => Some(sql),
                _ => None,
            })
            .collect()
    }

    /// Number of cursor close calls.
    pub fn cursor_closes(&self) -> usize {
        self.count(&MockCall::CloseCursor)
    }

    /// Number of connection close calls.
    pub fn connection_closes(&self) -> usize {
        self.count(&MockCall::CloseConnection)
    }

    fn count(&self, call: &MockCall) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }
}

#[derive(Debug, Clone, Default)]
struct Script {
    result: QueryResult,
    failures: Vec<MockFailure>,
}

impl Script {
    fn fail(&self, pick: impl Fn(&MockFailure) -> Option<&String>) -> DriverResult<()> {
        match self.failures.iter().find_map(pick) {
            Some(msg) => Err(DriverError::new(msg.clone())),
            None => Ok(()),
        }
    }
}

/// A mock connector whose connections return a scripted result.
#[derive(Debug, Default)]
pub struct MockConnector {
    script: Arc<Script>,
    log: MockLog,
}

impl MockConnector {
    /// Creates a connector whose queries return an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the result returned by every fetch.
    pub fn with_result(mut self, result: QueryResult) -> Self {
        Arc::make_mut(&mut self.script).result = result;
        self
    }

    /// Makes the given driver call fail with its message.
    pub fn failing(mut self, failure: MockFailure) -> Self {
        Arc::make_mut(&mut self.script).failures.push(failure);
        self
    }

    /// Returns a handle to the call log.
    pub fn log(&self) -> MockLog {
        self.log.clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(
        &self,
        params: &ConnectionParams,
    ) -> DriverResult<Box<dyn WarehouseConnection>> {
        self.log.record(MockCall::Connect(params.clone()));
        self.script.fail(|f| match f {
            MockFailure::Connect(msg) => Some(msg),
            _ => None,
        })?;

        Ok(Box::new(MockConnection {
            script: Arc::clone(&self.script),
            log: self.log.clone(),
        }))
    }
}

struct MockConnection {
    script: Arc<Script>,
    log: MockLog,
}

#[async_trait]
impl WarehouseConnection for MockConnection {
    async fn cursor(&mut self) -> DriverResult<Box<dyn Cursor>> {
        self.log.record(MockCall::Cursor);
        self.script.fail(|f| match f {
            MockFailure::Cursor(msg) => Some(msg),
            _ => None,
        })?;

        Ok(Box::new(MockCursor {
            script: Arc::clone(&self.script),
            log: self.log.clone(),
            executed: false,
        }))
    }

    async fn close(&mut self) -> DriverResult<()> {
        self.log.record(MockCall::CloseConnection);
        self.script.fail(|f| match f {
            MockFailure::CloseConnection(msg) => Some(msg),
            _ => None,
        })
    }
}

struct MockCursor {
    script: Arc<Script>,
    log: MockLog,
    executed: bool,
}

#[async_trait]
impl Cursor for MockCursor {
    async fn execute(&mut self, sql: &str) -> DriverResult<()> {
        self.log.record(MockCall::Execute(sql.to_string()));
        self.script.fail(|f| match f {
            MockFailure::Execute(msg) => Some(msg),
            _ => None,
        })?;
        self.executed = true;
        Ok(())
    }

    async fn fetch_all(&mut self) -> DriverResult<QueryResult> {
        self.log.record(MockCall::Fetch);
        if !self.executed {
            return Err(DriverError::new("no statement has been executed"));
        }
        self.script.fail(|f| match f {
            MockFailure::Fetch(msg) => Some(msg),
            _ => None,
        })?;
        Ok(self.script.result.clone())
    }

    async fn close(&mut self) -> DriverResult<()> {
        self.log.record(MockCall::CloseCursor);
        self.script.fail(|f| match f {
            MockFailure::CloseCursor(msg) => Some(msg),
            _ => None,
        })
    }
}
