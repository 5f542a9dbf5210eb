//! Application configuration: one `AppConfig`, layered from defaults,
//! an optional config file, and environment variables prefixed
//! `SOULBROWSER_` (e.g. `SOULBROWSER_MAX_STEPS=50`), the way the
//! teacher layers `SOUL_*` env vars over `CdpConfig`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Maximum agent loop steps before the run is forced to stop (§4.6).
    pub max_steps: u32,
    /// Whether to capture screenshots and send them to the model.
    pub enable_vision: bool,
    /// Host glob patterns an action's `allowed_domains` may be checked
    /// against; empty means no restriction (§4.5 "domain filter").
    pub allowed_domains: Vec<String>,
    /// Directory downloads and auto-fetched PDFs are written to.
    pub downloads_dir: PathBuf,
    /// Run the browser without a visible window.
    pub headless: bool,
    /// Emit one redacted `agent_event` telemetry record per run (§8).
    /// Mirrors `ANONYMIZED_TELEMETRY`; this field is the config-file
    /// override, the env var always wins if set.
    pub telemetry_enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_steps: 100,
            enable_vision: true,
            allowed_domains: Vec::new(),
            downloads_dir: PathBuf::from("./downloads"),
            headless: true,
            telemetry_enabled: true,
        }
    }
}

impl AppConfig {
    /// Load defaults, then an optional config file, then environment
    /// overrides (`SOULBROWSER_MAX_STEPS`, `SOULBROWSER_HEADLESS`, ...).
    pub fn load(config_file: Option<PathBuf>) -> AppResult<Self> {
        let defaults = config::Config::try_from(&AppConfig::default())
            .map_err(|err| AppError::Config(err.to_string()))?;
        let mut builder = config::Config::builder().add_source(defaults);

        if let Some(path) = config_file {
            builder = builder.add_source(config::File::from(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("SOULBROWSER")
                .separator("_")
                .try_parsing(true),
        );

        let settings = builder.build().map_err(|err| AppError::Config(err.to_string()))?;
        settings
            .try_deserialize()
            .map_err(|err| AppError::Config(err.to_string()))
    }
}
