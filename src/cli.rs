//! Command-line argument parsing for threshold-monitor.
//!
//! Every monitoring field can be overridden on the command line; anything
//! not given falls back to the config file, then to the built-in balance job.

use clap::Parser;
use std::path::PathBuf;
use threshold_monitor::config::{Config, MonitoringRequest};

/// Report rows of a warehouse table whose metric exceeds a threshold.
#[derive(Parser, Debug)]
#[command(name = "threshold-monitor")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Table to monitor
    #[arg(short = 't', long = "table", value_name = "TABLE")]
    pub table_name: Option<String>,

    /// Column compared against the threshold
    #[arg(short = 'c', long = "column", value_name = "COLUMN")]
    pub target_column: Option<String>,

    /// Column identifying each record
    #[arg(long, value_name = "COLUMN")]
    pub id_column: Option<String>,

    /// Date column used for the start-date filter
    #[arg(long, value_name = "COLUMN")]
    pub date_column: Option<String>,

    /// Report rows whose value is strictly greater than this
    #[arg(long, value_name = "NUMBER", allow_negative_numbers = true)]
    pub threshold: Option<f64>,

    /// Only consider rows dated strictly after this (e.g. 2024-01-01)
    #[arg(long, value_name = "DATE")]
    pub start_date: Option<String>,

    /// Database containing the table
    #[arg(short = 'd', long, value_name = "DATABASE")]
    pub database: Option<String>,

    /// Schema containing the table
    #[arg(short = 's', long, value_name = "SCHEMA")]
    pub schema: Option<String>,

    /// Slack channel that receives the report
    #[arg(long, value_name = "CHANNEL", env = "SLACK_CHANNEL")]
    pub slack_channel: Option<String>,

    /// Slack bot token
    #[arg(long, value_name = "TOKEN", env = "SLACK_BOT_TOKEN", hide_env_values = true)]
    pub slack_token: Option<String>,

    /// Print the rendered SQL and exit without connecting
    #[arg(long)]
    pub print_query: bool,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Applies command-line overrides on top of `base`.
    pub fn apply_to(&self, base: MonitoringRequest) -> MonitoringRequest {
        fn pick(flag: &Option<String>, base: String) -> String {
            flag.clone().unwrap_or(base)
        }

        MonitoringRequest {
            table_name: pick(&self.table_name, base.table_name),
            target_column: pick(&self.target_column, base.target_column),
            id_column: pick(&self.id_column, base.id_column),
            date_column: pick(&self.date_column, base.date_column),
            threshold: self.threshold.unwrap_or(base.threshold),
            start_date: pick(&self.start_date, base.start_date),
            database: pick(&self.database, base.database),
            schema: pick(&self.schema, base.schema),
            notification_channel: self.slack_channel.clone().or(base.notification_channel),
            notification_token: self.slack_token.clone().or(base.notification_token),
        }
    }
}
