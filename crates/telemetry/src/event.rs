//! Wire shape for the single `agent_event` emitted per run (§4.8).

use serde::{Deserialize, Serialize};
use soulbrowser_core_types::TaskId;

/// Verdict from an optional secondary judge LLM that scored the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeVerdict {
    pub passed: bool,
    #[serde(default)]
    pub rationale: Option<String>,
    #[serde(default)]
    pub score: Option<f32>,
}

/// Token usage accumulated across every LLM call made during the run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }

    pub fn add(&mut self, other: TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
    }
}

/// One of the exactly four user-visible terminal states (§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalState {
    DoneSuccess,
    DoneFailure,
    Aborted,
    Exhausted,
}

impl TerminalState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminalState::DoneSuccess => "done_success",
            TerminalState::DoneFailure => "done_failure",
            TerminalState::Aborted => "aborted",
            TerminalState::Exhausted => "exhausted",
        }
    }
}

/// The single telemetry event a run emits. Every string field is expected to
/// have already passed sensitive-data redaction (§4.8) before it reaches a
/// sink; `TelemetryRecorder::record` is the one place that applies it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTelemetryEvent {
    pub task_id: TaskId,
    pub model: String,
    pub provider: String,
    pub steps: u32,
    pub usage: TokenUsage,
    pub terminal_state: TerminalState,
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub judge_verdict: Option<JudgeVerdict>,
    pub duration_ms: u64,
}
