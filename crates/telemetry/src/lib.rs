//! Telemetry (C8): one `agent_event` per run — model, provider, steps,
//! tokens, success, error, judge verdict — redacted via `l6-privacy`
//! and handed to a pluggable sink. Default sink is a no-op; opt-out is
//! the single `ANONYMIZED_TELEMETRY` boolean env var (§6).

pub mod event;
pub mod recorder;
pub mod sink;

pub use event::{AgentTelemetryEvent, JudgeVerdict, TerminalState, TokenUsage};
pub use recorder::TelemetryRecorder;
pub use sink::{EventStoreSink, NoopSink, TelemetrySink};

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use soulbrowser_core_types::TaskId;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct CountingSink {
        captured: AtomicUsize,
    }

    #[async_trait]
    impl TelemetrySink for CountingSink {
        async fn capture(&self, _event: &AgentTelemetryEvent) {
            self.captured.fetch_add(1, Ordering::SeqCst);
        }
        async fn flush(&self) {}
    }

    fn sample_event() -> AgentTelemetryEvent {
        AgentTelemetryEvent {
            task_id: TaskId::new(),
            model: "gpt-test".to_string(),
            provider: "mock".to_string(),
            steps: 4,
            usage: TokenUsage {
                prompt_tokens: 100,
                completion_tokens: 50,
            },
            terminal_state: TerminalState::DoneSuccess,
            success: true,
            error: None,
            judge_verdict: None,
            duration_ms: 1234,
        }
    }

    #[tokio::test]
    async fn disabled_recorder_never_calls_sink() {
        let sink = Arc::new(CountingSink::default());
        let recorder = TelemetryRecorder::new(sink.clone(), false);
        recorder.record(sample_event()).await;
        assert_eq!(sink.captured.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn enabled_recorder_captures_exactly_once() {
        let sink = Arc::new(CountingSink::default());
        let recorder = TelemetryRecorder::new(sink.clone(), true);
        recorder.record(sample_event()).await;
        assert_eq!(sink.captured.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn token_usage_totals() {
        let mut usage = TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
        };
        usage.add(TokenUsage {
            prompt_tokens: 1,
            completion_tokens: 2,
        });
        assert_eq!(usage.total(), 18);
    }
}
