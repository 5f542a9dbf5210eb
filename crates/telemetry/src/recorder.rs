//! `TelemetryRecorder`: applies sensitive-data redaction to the
//! `agent_event` payload, then hands it to the configured sink.
//! Opt-out is a single boolean, sourced from `ANONYMIZED_TELEMETRY=false`
//! per spec §6's environment variable list.

use std::sync::Arc;

use l6_privacy::{apply_event, RedactCtx};

use crate::event::AgentTelemetryEvent;
use crate::sink::{NoopSink, TelemetrySink};

pub struct TelemetryRecorder {
    sink: Arc<dyn TelemetrySink>,
    enabled: bool,
}

impl TelemetryRecorder {
    pub fn new(sink: Arc<dyn TelemetrySink>, enabled: bool) -> Self {
        Self { sink, enabled }
    }

    /// Build a recorder reading `ANONYMIZED_TELEMETRY` from the process
    /// environment; any value other than `false`/`0` leaves telemetry on.
    pub fn from_env(sink: Arc<dyn TelemetrySink>) -> Self {
        let enabled = !matches!(
            std::env::var("ANONYMIZED_TELEMETRY").ok().as_deref(),
            Some("false") | Some("0")
        );
        Self::new(sink, enabled)
    }

    pub fn noop() -> Self {
        Self::new(Arc::new(NoopSink), false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Redact then capture one run's event. A no-op when telemetry is
    /// disabled, so callers never need to branch on `is_enabled`.
    pub async fn record(&self, event: AgentTelemetryEvent) {
        if !self.enabled {
            return;
        }
        let mut payload = match serde_json::to_value(&event) {
            Ok(v) => v,
            Err(err) => {
                tracing::warn!(%err, "failed to serialize agent_event for telemetry");
                return;
            }
        };
        let ctx = RedactCtx::default();
        if let Err(err) = apply_event(&mut payload, &ctx) {
            tracing::warn!(%err, "failed to redact agent_event before capture");
            return;
        }
        let redacted: AgentTelemetryEvent = match serde_json::from_value(payload) {
            Ok(e) => e,
            Err(_) => event,
        };
        self.sink.capture(&redacted).await;
    }

    pub async fn flush(&self) {
        self.sink.flush().await;
    }
}
