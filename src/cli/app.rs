use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use super::commands::Commands;
use super::env::CliArgs;
use super::info::cmd_info;
use super::run::cmd_run;
use super::runtime::init_logging;
use crate::config::AppConfig;
use crate::metrics;

pub async fn run() -> Result<()> {
    let cli = CliArgs::parse();

    init_logging(&cli.log_level, cli.debug)?;
    let _metrics_server = metrics::spawn_metrics_server(cli.metrics_port);

    info!("Starting SoulBrowser v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load(cli.config.clone())?;

    let result = match cli.command.clone() {
        Commands::Run(args) => cmd_run(args, config).await,
        Commands::Info(args) => cmd_info(args, &config).await,
    };

    match result {
        Ok(()) => {
            info!("Command completed successfully");
            Ok(())
        }
        Err(err) => {
            error!("Command failed: {}", err);
            Err(err)
        }
    }
}
