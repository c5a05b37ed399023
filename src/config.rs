//! Configuration management for threshold-monitor.
//!
//! Resolves warehouse connection parameters from an explicit override or the
//! environment, defines the per-run monitoring request, and loads optional
//! defaults for both from a TOML file.

use crate::error::{MonitorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Connection keys that must be present and non-empty.
pub const REQUIRED_KEYS: [&str; 5] = ["user", "password", "account", "warehouse", "role"];

/// Environment variable names for each connection key.
pub const ENV_USER: &str = "SNOWFLAKE_USER";
pub const ENV_PASSWORD: &str = "SNOWFLAKE_PASSWORD";
pub const ENV_ACCOUNT: &str = "SNOWFLAKE_ACCOUNT";
pub const ENV_WAREHOUSE: &str = "SNOWFLAKE_WAREHOUSE";
pub const ENV_ROLE: &str = "SNOWFLAKE_ROLE";
pub const ENV_DATABASE: &str = "SNOWFLAKE_DATABASE";
pub const ENV_SCHEMA: &str = "SNOWFLAKE_SCHEMA";

/// Read access to environment variables.
///
/// Connection parameters are resolved through this capability so that
/// nothing below the entry point reads the process environment directly.
pub trait EnvironmentProvider: Send + Sync {
    /// Returns the value of `key`, or `None` if it is unset.
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads from the real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnvironment;

impl EnvironmentProvider for SystemEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Map-backed environment for tests.
#[derive(Debug, Clone, Default)]
pub struct MockEnvironment {
    vars: HashMap<String, String>,
}

impl MockEnvironment {
    /// Creates an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a variable.
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }
}

impl EnvironmentProvider for MockEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

/// Warehouse connection parameters.
///
/// Required keys are stored as plain strings; an empty string means the key
/// is missing.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionParams {
    pub user: String,
    pub password: String,
    pub account: String,
    pub warehouse: String,
    pub role: String,
    pub database: Option<String>,
    pub schema: Option<String>,
}

impl ConnectionParams {
    /// Builds parameters from the `SNOWFLAKE_*` variables.
    ///
    /// Unset variables become empty values, so they still fail validation.
    pub fn from_env(env: &dyn EnvironmentProvider) -> Self {
        let get = |key: &str| env.var(key).unwrap_or_default();
        Self {
            user: get(ENV_USER),
            password: get(ENV_PASSWORD),
            account: get(ENV_ACCOUNT),
            warehouse: get(ENV_WAREHOUSE),
            role: get(ENV_ROLE),
            database: env.var(ENV_DATABASE).filter(|v| !v.is_empty()),
            schema: env.var(ENV_SCHEMA).filter(|v| !v.is_empty()),
        }
    }

    /// Returns the explicit override if given, otherwise the environment-derived set.
    pub fn resolve(explicit: Option<ConnectionParams>, env: &dyn EnvironmentProvider) -> Self {
        explicit.unwrap_or_else(|| Self::from_env(env))
    }

    /// Looks up a parameter by key name.
    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            "user" => Some(&self.user),
            "password" => Some(&self.password),
            "account" => Some(&self.account),
            "warehouse" => Some(&self.warehouse),
            "role" => Some(&self.role),
            "database" => self.database.as_deref(),
            "schema" => self.schema.as_deref(),
            _ => None,
        }
    }

    /// Lists every required key whose value is missing or blank.
    pub fn missing_required(&self) -> Vec<&'static str> {
        REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|key| self.get(key).map_or(true, |v| v.trim().is_empty()))
            .collect()
    }

    /// Fails with a configuration error naming all missing required keys.
    pub fn validate(&self) -> Result<()> {
        let missing = self.missing_required();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(MonitorError::missing_parameters(missing))
        }
    }

    /// Returns a display-safe string (no password) for log output.
    pub fn display_string(&self) -> String {
        let mut s = format!(
            "{}@{} (warehouse {}, role {})",
            self.user, self.account, self.warehouse, self.role
        );
        if let Some(database) = &self.database {
            s.push_str(&format!(", {database}"));
            if let Some(schema) = &self.schema {
                s.push_str(&format!(".{schema}"));
            }
        }
        s
    }
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("user", &self.user)
            .field("password", &redact(&self.password))
            .field("account", &self.account)
            .field("warehouse", &self.warehouse)
            .field("role", &self.role)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        ""
    } else {
        "***"
    }
}

/// Inputs to a single monitoring run.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringRequest {
    /// Table to monitor.
    pub table_name: String,
    /// Metric column compared against the threshold.
    pub target_column: String,
    /// Column identifying each record.
    pub id_column: String,
    /// Date or timestamp column used for the start-date filter.
    pub date_column: String,
    /// Rows whose target value is strictly greater than this are reported.
    pub threshold: f64,
    /// Only rows with a date strictly after this are considered.
    pub start_date: String,
    pub database: String,
    pub schema: String,
    /// Slack channel that receives the report.
    pub notification_channel: Option<String>,
    /// Slack bot token used to post the report.
    pub notification_token: Option<String>,
}

impl MonitoringRequest {
    /// The built-in job: organization balance changes above 50%.
    pub fn balance_default() -> Self {
        Self {
            table_name: "fct__organizations_balance".to_string(),
            target_column: "balance_change_percentage".to_string(),
            id_column: "organization_id".to_string(),
            date_column: "balance_date".to_string(),
            threshold: 50.0,
            start_date: "2024-01-01".to_string(),
            database: "deel_takehome_dev".to_string(),
            schema: "ehernani_fact_tables".to_string(),
            notification_channel: None,
            notification_token: None,
        }
    }

    /// Returns `(channel, token)` when both are present and non-empty.
    pub fn notification_target(&self) -> Option<(&str, &str)> {
        let channel = self.notification_channel.as_deref().filter(|c| !c.is_empty())?;
        let token = self.notification_token.as_deref().filter(|t| !t.is_empty())?;
        Some((channel, token))
    }

    /// Returns `table.column` as used in report headers.
    pub fn target(&self) -> String {
        format!("{}.{}", self.table_name, self.target_column)
    }
}

impl Default for MonitoringRequest {
    fn default() -> Self {
        Self::balance_default()
    }
}

impl fmt::Debug for MonitoringRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitoringRequest")
            .field("table_name", &self.table_name)
            .field("target_column", &self.target_column)
            .field("id_column", &self.id_column)
            .field("date_column", &self.date_column)
            .field("threshold", &self.threshold)
            .field("start_date", &self.start_date)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("notification_channel", &self.notification_channel)
            .field(
                "notification_token",
                &self.notification_token.as_deref().map(redact),
            )
            .finish()
    }
}

/// Contents of the optional config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Monitoring request defaults.
    #[serde(default)]
    pub monitor: MonitoringRequest,

    /// Explicit connection parameters; when absent the environment is used.
    #[serde(default)]
    pub snowflake: Option<ConnectionParams>,
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("threshold-monitor")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file, falling back to defaults if it does not exist.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| MonitorError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            MonitorError::config(format!(
                "invalid config file {}: {}",
                path.display(),
                e
            ))
        })
    }
}
