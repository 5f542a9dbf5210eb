//! SoulBrowser library
//!
//! Exposes the composition root (§6) for integration testing: config
//! loading, the top-level error type, Prometheus metrics, and the
//! `run_task` entry point that wires Event Bus, Browser Session,
//! Watchdogs, Action Registry, and the Agent Step Loop together.

pub mod cli;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod runner;

pub use config::AppConfig;
pub use errors::{AppError, AppResult};
pub use runner::{run_task, run_with_defaults, RunnerConfig};
