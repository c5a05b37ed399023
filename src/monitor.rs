//! Monitoring run orchestration.
//!
//! A run connects, queries, formats, and optionally notifies. Only the
//! connect and query stages can fail the run; a failed notification is
//! logged and the report is still returned.

use crate::config::{ConnectionParams, EnvironmentProvider, MonitoringRequest, SystemEnvironment};
use crate::db::{self, Connector, SnowflakeConnector};
use crate::error::{MonitorError, Result, RunStage};
use crate::notify::{self, NotificationTransport, SlackTransport};
use crate::query::build_query;
use crate::report::format_monitoring_results;
use tracing::{debug, info, warn};

/// Runs monitoring requests against a warehouse and a notification channel.
pub struct Monitor {
    connector: Box<dyn Connector>,
    transport: Box<dyn NotificationTransport>,
    env: Box<dyn EnvironmentProvider>,
    connection: Option<ConnectionParams>,
}

impl Monitor {
    /// Creates a monitor that reads connection parameters from the process environment.
    pub fn new(
        connector: impl Connector + 'static,
        transport: impl NotificationTransport + 'static,
    ) -> Self {
        Self {
            connector: Box::new(connector),
            transport: Box::new(transport),
            env: Box::new(SystemEnvironment),
            connection: None,
        }
    }

    /// Creates a monitor backed by Snowflake and Slack.
    ///
    /// Neither client does any setup here; failures surface in the connect
    /// stage or the notification step of a run.
    pub fn snowflake() -> Self {
        Self::new(SnowflakeConnector::new(), SlackTransport::new())
    }

    /// Resolves connection parameters from `env` instead of the process environment.
    pub fn with_env(mut self, env: impl EnvironmentProvider + 'static) -> Self {
        self.env = Box::new(env);
        self
    }

    /// Uses `params` instead of environment-derived connection parameters.
    pub fn with_connection_params(mut self, params: ConnectionParams) -> Self {
        self.connection = Some(params);
        self
    }

    /// Runs one monitoring request and returns its report.
    ///
    /// Connection and query failures abort the run and are wrapped with the
    /// stage they came from. Notification failures never fail the run.
    pub async fn run(&self, request: &MonitoringRequest) -> Result<String> {
        info!("Running monitoring for {}", request.target());

        let params = ConnectionParams::resolve(self.connection.clone(), self.env.as_ref());
        let conn = db::connect(self.connector.as_ref(), &params)
            .await
            .map_err(|e| MonitorError::monitoring(RunStage::Connect, e))?;

        let query = build_query(request);
        let records = db::read_table(conn, &query)
            .await
            .map_err(|e| MonitorError::monitoring(RunStage::Query, e))?;
        info!("Found {} records exceeding threshold", records.len());

        let report =
            format_monitoring_results(&records, &request.table_name, &request.target_column);

        match request.notification_target() {
            Some((channel, token)) => {
                if let Err(e) = self.notify(&report, channel, token).await {
                    warn!("Failed to send results to Slack: {}", e);
                }
            }
            None => debug!("No notification channel configured"),
        }

        Ok(report)
    }

    /// Best-effort delivery of a finished report.
    async fn notify(&self, report: &str, channel: &str, token: &str) -> Result<bool> {
        notify::send_monitoring_results(self.transport.as_ref(), report, channel, token).await
    }
}

/// Runs `request` against Snowflake (connection from `SNOWFLAKE_*`) and Slack.
pub async fn run_monitoring(request: &MonitoringRequest) -> Result<String> {
    Monitor::snowflake().run(request).await
}
