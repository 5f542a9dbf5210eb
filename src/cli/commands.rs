use clap::Subcommand;

use super::info::InfoArgs;
use super::run::RunArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Drive a single agent task to completion (§4.6 step loop)
    Run(RunArgs),

    /// Show resolved configuration and adapter metrics
    Info(InfoArgs),
}
