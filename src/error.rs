//! Error types for threshold-monitor.
//!
//! Defines the error enum shared by every stage of a monitoring run.

use std::fmt;
use thiserror::Error;

/// Stage of a monitoring run that produced a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    /// Validating parameters and opening the warehouse connection.
    Connect,
    /// Rendering and executing the threshold query.
    Query,
}

impl RunStage {
    /// Returns the stage name for display purposes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Query => "query",
        }
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for monitoring operations.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Required connection parameters are missing or empty.
    #[error("Missing required connection parameters: {}", .0.join(", "))]
    MissingParameters(Vec<String>),

    /// Configuration errors (unreadable or invalid config file, bad flags, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The warehouse rejected or could not establish a connection.
    #[error("Error connecting to Snowflake: {0}")]
    Connection(String),

    /// Query execution or result fetching failed.
    #[error("Error reading from Snowflake: {0}")]
    Query(String),

    /// The notification transport failed to deliver a message.
    #[error("Error sending message to Slack: {code}")]
    Notification {
        /// Machine-readable error code reported by the transport.
        code: String,
    },

    /// Top-level failure of a monitoring run.
    #[error("Error running monitoring: {source}")]
    Monitoring {
        /// Stage in which the run aborted.
        stage: RunStage,
        /// Error raised by that stage.
        #[source]
        source: Box<MonitorError>,
    },
}

impl MonitorError {
    /// Creates a missing-parameters error listing every missing key.
    pub fn missing_parameters<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::MissingParameters(keys.into_iter().map(Into::into).collect())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a notification error carrying the transport's error code.
    pub fn notification(code: impl Into<String>) -> Self {
        Self::Notification { code: code.into() }
    }

    /// Wraps an error raised by `stage` into a run-level failure.
    pub fn monitoring(stage: RunStage, source: MonitorError) -> Self {
        Self::Monitoring {
            stage,
            source: Box::new(source),
        }
    }

    /// Returns the stage a run-level failure originated from.
    pub fn stage(&self) -> Option<RunStage> {
        match self {
            Self::Monitoring { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::MissingParameters(_) | Self::Config(_) => "Configuration Error",
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::Notification { .. } => "Notification Error",
            Self::Monitoring { .. } => "Monitoring Error",
        }
    }
}

/// Result type alias using MonitorError.
pub type Result<T> = std::result::Result<T, MonitorError>;
