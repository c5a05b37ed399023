//! threshold-monitor - report warehouse rows that exceed a threshold.

mod cli;
mod logging;

use cli::Cli;
use threshold_monitor::config::Config;
use threshold_monitor::error::Result;
use threshold_monitor::monitor::Monitor;
use threshold_monitor::query::build_query;
use tracing::{debug, error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Load .env before clap reads SLACK_* from the environment
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse_args();
    logging::init_stderr_logging(cli.verbose);

    if let Ok(path) = dotenv {
        debug!("Loaded environment from {}", path.display());
    }

    if let Err(e) = run(cli).await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    let request = cli.apply_to(config.monitor);

    if cli.print_query {
        println!("{}", build_query(&request));
        return Ok(());
    }

    let mut monitor = Monitor::snowflake();
    if let Some(params) = config.snowflake {
        info!("Using connection parameters from {}", config_path.display());
        monitor = monitor.with_connection_params(params);
    }

    let report = monitor.run(&request).await?;
    println!("{report}");

    Ok(())
}
