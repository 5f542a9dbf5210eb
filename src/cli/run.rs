use anyhow::Result;
use clap::Args;
use tracing::info;

use crate::config::AppConfig;
use crate::runner;

#[derive(Args, Clone)]
pub struct RunArgs {
    /// Natural-language goal handed to the agent step loop
    pub goal: String,

    /// Override the configured step budget for this run
    #[arg(long)]
    pub max_steps: Option<u32>,

    /// Run with a visible browser window instead of headless
    #[arg(long)]
    pub headed: bool,

    /// Host glob patterns actions are allowed to touch (repeatable)
    #[arg(long = "allow-domain")]
    pub allowed_domains: Vec<String>,

    /// Skip emitting the per-run telemetry event
    #[arg(long)]
    pub no_telemetry: bool,
}

pub async fn cmd_run(args: RunArgs, mut config: AppConfig) -> Result<()> {
    if let Some(max_steps) = args.max_steps {
        config.max_steps = max_steps;
    }
    if args.headed {
        config.headless = false;
    }
    if !args.allowed_domains.is_empty() {
        config.allowed_domains = args.allowed_domains.clone();
    }
    if args.no_telemetry {
        config.telemetry_enabled = false;
    }

    let result = runner::run_with_defaults(&args.goal, config).await?;

    info!(
        status = ?result.status,
        steps = result.steps_taken,
        total_time_ms = result.total_time_ms,
        "run finished"
    );
    println!("{}", result.message);
    if let Some(final_output) = &result.final_output {
        println!("{final_output}");
    }

    if !result.is_success() {
        anyhow::bail!("run did not complete successfully: {}", result.message);
    }
    Ok(())
}
