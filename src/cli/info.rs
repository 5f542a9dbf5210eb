use anyhow::Result;
use clap::Args;

use crate::config::AppConfig;
use crate::metrics;

#[derive(Args, Clone)]
pub struct InfoArgs;

pub async fn cmd_info(_args: InfoArgs, config: &AppConfig) -> Result<()> {
    println!("SoulBrowser Agent Runtime");
    println!("=========================");
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Configuration:");
    println!("- Max steps: {}", config.max_steps);
    println!("- Vision enabled: {}", config.enable_vision);
    println!("- Headless: {}", config.headless);
    println!("- Downloads dir: {}", config.downloads_dir.display());
    println!("- Telemetry enabled: {}", config.telemetry_enabled);
    if config.allowed_domains.is_empty() {
        println!("- Allowed domains: (unrestricted)");
    } else {
        println!("- Allowed domains:");
        for pattern in &config.allowed_domains {
            println!("  - {pattern}");
        }
    }

    println!();
    println!("CDP adapter counters:");
    let snapshot = metrics::cdp_adapter_snapshot();
    println!("- Commands issued: {}", snapshot.commands);
    println!("- Command successes: {}", snapshot.command_success);
    println!("- Command failures: {}", snapshot.command_failures);
    println!("- Events received: {}", snapshot.events);

    Ok(())
}
