//! Agent Loop Controller - main orchestration for observe-think-act cycle.
//!
//! This module implements the browser-use style agent loop where the LLM
//! is consulted at each step to decide the next action based on current
//! browser state.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;

use super::config::AgentLoopConfig;
use super::types::{
    AgentAction, AgentActionResult, AgentActionType, AgentHistoryEntry, AgentOutput,
    BrowserStateSummary,
};

/// Result of an agent loop execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentLoopResult {
    /// Final status of the loop.
    pub status: AgentLoopStatus,
    /// Completion or error message.
    pub message: String,
    /// Total steps taken.
    pub steps_taken: u32,
    /// Final output from the agent (if completed successfully).
    pub final_output: Option<String>,
    /// Execution history.
    pub history: Vec<AgentHistoryEntry>,
    /// Total execution time in milliseconds.
    pub total_time_ms: u64,
}

impl AgentLoopResult {
    /// Create a completed result.
    pub fn completed(
        message: String,
        steps: u32,
        history: Vec<AgentHistoryEntry>,
        time_ms: u64,
    ) -> Self {
        Self {
            status: AgentLoopStatus::Completed,
            final_output: Some(message.clone()),
            message,
            steps_taken: steps,
            history,
            total_time_ms: time_ms,
        }
    }

    /// Create a failed result.
    pub fn failed(
        message: String,
        steps: u32,
        history: Vec<AgentHistoryEntry>,
        time_ms: u64,
    ) -> Self {
        Self {
            status: AgentLoopStatus::Failed,
            message,
            steps_taken: steps,
            final_output: None,
            history,
            total_time_ms: time_ms,
        }
    }

    /// Create a max steps reached result.
    pub fn max_steps_reached(steps: u32, history: Vec<AgentHistoryEntry>, time_ms: u64) -> Self {
        Self {
            status: AgentLoopStatus::MaxStepsReached,
            message: format!("Reached maximum steps limit: {}", steps),
            steps_taken: steps,
            final_output: None,
            history,
            total_time_ms: time_ms,
        }
    }

    /// Create an in-progress placeholder (should not be returned as final result).
    pub fn in_progress() -> Self {
        Self {
            status: AgentLoopStatus::InProgress,
            message: "Loop in progress".to_string(),
            steps_taken: 0,
            final_output: None,
            history: Vec::new(),
            total_time_ms: 0,
        }
    }

    /// Check if the loop completed successfully.
    pub fn is_success(&self) -> bool {
        matches!(self.status, AgentLoopStatus::Completed)
    }
}

/// Status of the agent loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentLoopStatus {
    /// Task completed successfully.
    Completed,
    /// Task failed due to errors.
    Failed,
    /// Reached maximum steps without completion.
    MaxStepsReached,
    /// Loop is still in progress (internal state).
    InProgress,
    /// Loop was cancelled by user.
    Cancelled,
}

/// Result of a single step execution.
#[derive(Debug, Clone)]
pub struct StepResult {
    /// History entry for this step.
    pub history_entry: AgentHistoryEntry,
    /// Whether the task is done.
    pub is_done: bool,
    /// Result if done.
    pub done_result: Option<DoneResult>,
}

/// Result from a done action.
#[derive(Debug, Clone)]
pub struct DoneResult {
    /// Whether the task succeeded.
    pub success: bool,
    /// Completion message.
    pub message: String,
}

/// Internal state of the agent loop.
#[derive(Debug, Default)]
struct LoopState {
    step_count: u32,
    consecutive_failures: u32,
    history: Vec<AgentHistoryEntry>,
    is_done: bool,
    is_cancelled: bool,
    is_paused: bool,
    final_result: Option<AgentLoopResult>,
}

/// Controller for the agent loop execution.
///
/// This is a generic controller that can work with any LLM provider
/// and action executor. The actual execution depends on the callbacks
/// provided during execution.
#[derive(Debug)]
pub struct AgentLoopController {
    config: AgentLoopConfig,
    state: Mutex<LoopState>,
    start_time: Mutex<Option<Instant>>,
    /// Observed by the per-step LLM-retry sleep, the inter-action sleep,
    /// and exposed via `cancellation_token()` so an integrator's
    /// `decide_fn`/`execute_fn` can thread it into the LLM call / CDP
    /// call they make (§4.6 "abort signal ... delivered through the
    /// event" / "Pause/resume/cancel").
    cancel_token: Mutex<CancellationToken>,
    /// Signalled by `resume()` to wake a loop parked in `run()`'s
    /// cooperative pause wait.
    resume_notify: Notify,
}

impl AgentLoopController {
    /// Create a new controller with the given configuration.
    pub fn new(config: AgentLoopConfig) -> Self {
        Self {
            config,
            state: Mutex::new(LoopState::default()),
            start_time: Mutex::new(None),
            cancel_token: Mutex::new(CancellationToken::new()),
            resume_notify: Notify::new(),
        }
    }

    /// Create a controller with default configuration.
    pub fn default_config() -> Self {
        Self::new(AgentLoopConfig::default())
    }

    /// Get the configuration.
    pub fn config(&self) -> &AgentLoopConfig {
        &self.config
    }

    /// A cancellation token that fires when `cancel()` is called. Pass
    /// this into the `observe_fn`/`decide_fn`/`execute_fn` closures an
    /// integrator builds so the abort reaches the LLM call and CDP I/O
    /// directly, not just the loop's own sleeps.
    pub async fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.lock().await.clone()
    }

    /// Cancel the loop. Takes effect after the in-flight LLM call or
    /// action unwinds (§4.6): the running step still completes its
    /// current await, `check_termination` then observes `is_cancelled`
    /// before the next step starts.
    pub async fn cancel(&self) {
        let mut state = self.state.lock().await;
        state.is_cancelled = true;
        state.is_paused = false;
        self.cancel_token.lock().await.cancel();
        self.resume_notify.notify_waiters();
    }

    /// Check if cancelled.
    pub async fn is_cancelled(&self) -> bool {
        let state = self.state.lock().await;
        state.is_cancelled
    }

    /// Pause the loop. Takes effect at the next step boundary: `run()`
    /// waits cooperatively on `resume()` or `cancel()` before observing
    /// state or calling the LLM again (§4.6 step 1: "If paused, wait
    /// cooperatively on a resume signal").
    pub async fn pause(&self) {
        let mut state = self.state.lock().await;
        state.is_paused = true;
    }

    /// Resume a paused loop.
    pub async fn resume(&self) {
        let mut state = self.state.lock().await;
        state.is_paused = false;
        self.resume_notify.notify_waiters();
    }

    /// Check if paused.
    pub async fn is_paused(&self) -> bool {
        let state = self.state.lock().await;
        state.is_paused
    }

    /// Get current step count.
    pub async fn step_count(&self) -> u32 {
        let state = self.state.lock().await;
        state.step_count
    }

    /// Get execution history.
    pub async fn history(&self) -> Vec<AgentHistoryEntry> {
        let state = self.state.lock().await;
        state.history.clone()
    }

    /// Reset the controller for a new run.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        *state = LoopState::default();

        let mut start = self.start_time.lock().await;
        *start = None;

        *self.cancel_token.lock().await = CancellationToken::new();
    }

    /// Run the agent loop with the provided callbacks.
    ///
    /// # Arguments
    /// * `goal` - The task goal
    /// * `observe_fn` - Callback to get current browser state
    /// * `decide_fn` - Callback to get LLM decision
    /// * `execute_fn` - Callback to execute actions
    ///
    /// # Returns
    /// The final result of the loop execution.
    pub async fn run<O, D, E>(
        &self,
        goal: &str,
        mut observe_fn: O,
        mut decide_fn: D,
        mut execute_fn: E,
    ) -> AgentLoopResult
    where
        O: FnMut() -> std::pin::Pin<
            Box<dyn std::future::Future<Output = Result<BrowserStateSummary, String>> + Send>,
        >,
        D: FnMut(
            &BrowserStateSummary,
            &[AgentHistoryEntry],
        ) -> std::pin::Pin<
            Box<dyn std::future::Future<Output = Result<AgentOutput, String>> + Send>,
        >,
        E: FnMut(
            &AgentAction,
            &BrowserStateSummary,
        ) -> std::pin::Pin<
            Box<dyn std::future::Future<Output = Result<AgentActionResult, String>> + Send>,
        >,
    {
        // Initialize
        {
            let mut state = self.state.lock().await;
            *state = LoopState::default();

            let mut start = self.start_time.lock().await;
            *start = Some(Instant::now());
        }

        loop {
            // Step 1 of §4.6: if paused, wait cooperatively on a resume
            // signal (or a cancellation, which always wins) before doing
            // anything else this iteration.
            while self.is_paused().await && !self.is_cancelled().await {
                let token = self.cancellation_token().await;
                tokio::select! {
                    _ = self.resume_notify.notified() => {}
                    _ = token.cancelled() => {}
                }
            }

            // Check termination conditions
            let (should_terminate, result) = self.check_termination().await;
            if should_terminate {
                return match result {
                    Some(r) => r,
                    None => {
                        let state_guard = self.state.lock().await;
                        let elapsed = self.elapsed_ms().await;
                        AgentLoopResult::failed(
                            "Unexpected termination".to_string(),
                            state_guard.step_count,
                            state_guard.history.clone(),
                            elapsed,
                        )
                    }
                };
            }

            // Increment step
            {
                let mut state = self.state.lock().await;
                state.step_count += 1;
            }

            let step_num = self.step_count().await;
            let history = self.history().await;

            // Execute one step
            match self
                .execute_step(
                    goal,
                    step_num,
                    &history,
                    &mut observe_fn,
                    &mut decide_fn,
                    &mut execute_fn,
                )
                .await
            {
                Ok(step_result) => {
                    let mut state = self.state.lock().await;
                    state.history.push(step_result.history_entry);
                    state.consecutive_failures = 0;

                    if step_result.is_done {
                        state.is_done = true;
                        if let Some(done) = step_result.done_result {
                            let elapsed = self.elapsed_ms().await;
                            state.final_result = Some(if done.success {
                                AgentLoopResult::completed(
                                    done.message,
                                    state.step_count,
                                    state.history.clone(),
                                    elapsed,
                                )
                            } else {
                                AgentLoopResult::failed(
                                    done.message,
                                    state.step_count,
                                    state.history.clone(),
                                    elapsed,
                                )
                            });
                        }
                    }
                }
                Err(err) => {
                    let mut state = self.state.lock().await;
                    state.consecutive_failures += 1;
                    state.history.push(AgentHistoryEntry::error(step_num, err));
                }
            }
        }
    }

    /// Execute a single step of the loop.
    async fn execute_step<O, D, E>(
        &self,
        _goal: &str,
        step_num: u32,
        history: &[AgentHistoryEntry],
        observe_fn: &mut O,
        decide_fn: &mut D,
        execute_fn: &mut E,
    ) -> Result<StepResult, String>
    where
        O: FnMut() -> std::pin::Pin<
            Box<dyn std::future::Future<Output = Result<BrowserStateSummary, String>> + Send>,
        >,
        D: FnMut(
            &BrowserStateSummary,
            &[AgentHistoryEntry],
        ) -> std::pin::Pin<
            Box<dyn std::future::Future<Output = Result<AgentOutput, String>> + Send>,
        >,
        E: FnMut(
            &AgentAction,
            &BrowserStateSummary,
        ) -> std::pin::Pin<
            Box<dyn std::future::Future<Output = Result<AgentActionResult, String>> + Send>,
        >,
    {
        // 1. Observe: Get current browser state
        let browser_state = observe_fn().await?;

        // 2. Think: Ask LLM to decide next actions. Transient failures are
        // retried with exponential backoff + jitter up to `llm_max_retries`
        // (§4.6 Retry policy); the integrator's `decide_fn` is expected to
        // have already classified non-retryable errors away (e.g. by
        // surfacing them as a `Done{success:false}` action instead).
        let mut attempt = 0u32;
        let agent_output = loop {
            match decide_fn(&browser_state, history).await {
                Ok(output) => break output,
                Err(err) if attempt < self.config.llm_max_retries => {
                    attempt += 1;
                    let backoff_ms = 200u64.saturating_mul(1u64 << attempt.min(8));
                    let jitter_ms = (backoff_ms / 4).max(1);
                    let jitter = (attempt as u64 * 37) % jitter_ms;
                    tracing::debug!(attempt, %err, "retrying llm decide after transient error");
                    if self.sleep_cancellably(Duration::from_millis(backoff_ms + jitter)).await {
                        return Err("cancelled".to_string());
                    }
                }
                Err(err) => return Err(err),
            }
        };

        if self.is_cancelled().await {
            return Err("cancelled".to_string());
        }

        // 3. Act: Execute actions
        let mut action_results = Vec::new();
        let mut is_done = false;
        let mut done_result = None;

        let max_actions = self.config.max_actions_per_step as usize;

        for (i, action) in agent_output.actions.iter().enumerate() {
            if i >= max_actions {
                break;
            }

            // Check for done action
            if matches!(action.action_type, AgentActionType::Done) {
                is_done = true;
                let success = action
                    .params
                    .done_success
                    .or(action.params.success)
                    .unwrap_or(false);
                let text = action
                    .params
                    .done_text
                    .clone()
                    .unwrap_or_else(|| "Task completed".to_string());
                done_result = Some(DoneResult {
                    success,
                    message: text,
                });
                break;
            }

            // Execute action
            let result = execute_fn(action, &browser_state).await?;
            action_results.push(result.clone());

            // Wait between actions
            if i < agent_output.actions.len() - 1
                && self
                    .sleep_cancellably(Duration::from_millis(self.config.wait_between_actions_ms))
                    .await
            {
                return Err("cancelled".to_string());
            }

            // Stop if action failed
            if !result.success {
                break;
            }
        }

        // Aggregate results
        let overall_result = AgentActionResult {
            success: action_results.iter().all(|r| r.success),
            error_message: action_results.iter().find_map(|r| r.error_message.clone()),
            state_changed: action_results.iter().any(|r| r.state_changed),
        };

        Ok(StepResult {
            history_entry: AgentHistoryEntry {
                step_number: step_num,
                state_summary: format!("URL: {}", browser_state.url),
                actions_taken: agent_output.actions.clone(),
                result: overall_result,
                thinking: Some(agent_output.thinking.clone()),
                next_goal: Some(agent_output.next_goal.clone()),
                evaluation: agent_output.evaluation_previous_goal.clone(),
                memory: agent_output.memory.clone(),
            },
            is_done,
            done_result,
        })
    }

    /// Check termination conditions.
    async fn check_termination(&self) -> (bool, Option<AgentLoopResult>) {
        let state = self.state.lock().await;
        let elapsed = self.elapsed_ms().await;

        // Already done
        if state.is_done {
            return (true, state.final_result.clone());
        }

        // Cancelled
        if state.is_cancelled {
            return (
                true,
                Some(AgentLoopResult {
                    status: AgentLoopStatus::Cancelled,
                    message: "Loop cancelled by user".to_string(),
                    steps_taken: state.step_count,
                    final_output: None,
                    history: state.history.clone(),
                    total_time_ms: elapsed,
                }),
            );
        }

        // Max steps reached
        if state.step_count >= self.config.max_steps {
            let mut history = state.history.clone();
            if self.config.final_response_after_failure {
                history.push(AgentHistoryEntry::error(
                    state.step_count,
                    format!(
                        "step budget of {} exhausted without a done action",
                        self.config.max_steps
                    ),
                ));
            }
            return (
                true,
                Some(AgentLoopResult::max_steps_reached(
                    state.step_count,
                    history,
                    elapsed,
                )),
            );
        }

        // Loop detection: the last `loop_detection_window` steps repeat the
        // same action sequence with no change in URL or element count.
        if self.config.loop_detection_window > 0
            && looks_like_a_loop(&state.history, self.config.loop_detection_window as usize)
        {
            return (
                true,
                Some(AgentLoopResult::failed(
                    "loop detected".to_string(),
                    state.step_count,
                    state.history.clone(),
                    elapsed,
                )),
            );
        }

        // Too many failures
        if state.consecutive_failures >= self.config.max_consecutive_failures {
            return (
                true,
                Some(AgentLoopResult::failed(
                    format!(
                        "Too many consecutive failures: {}",
                        state.consecutive_failures
                    ),
                    state.step_count,
                    state.history.clone(),
                    elapsed,
                )),
            );
        }

        (false, None)
    }

    /// Sleep for `duration`, but wake early if cancelled. Returns `true`
    /// iff the sleep was cut short by cancellation.
    async fn sleep_cancellably(&self, duration: Duration) -> bool {
        let token = self.cancellation_token().await;
        tokio::select! {
            _ = tokio::time::sleep(duration) => false,
            _ = token.cancelled() => true,
        }
    }

    /// Get elapsed time in milliseconds.
    async fn elapsed_ms(&self) -> u64 {
        let start = self.start_time.lock().await;
        start.map(|s| s.elapsed().as_millis() as u64).unwrap_or(0)
    }
}

/// Window the last `window` history entries: true iff their action-name
/// sequences are all identical AND `state_summary` never changed either,
/// meaning the agent is repeating itself without making progress (§4.6).
fn looks_like_a_loop(history: &[AgentHistoryEntry], window: usize) -> bool {
    if history.len() < window || window < 2 {
        return false;
    }
    let tail = &history[history.len() - window..];
    let first_actions = tail[0].actions_summary();
    let first_state = &tail[0].state_summary;
    tail.iter()
        .all(|entry| entry.actions_summary() == first_actions && &entry.state_summary == first_state)
}

/// Aggregate multiple action results into one.
pub fn aggregate_action_results(results: &[AgentActionResult]) -> AgentActionResult {
    AgentActionResult {
        success: results.iter().all(|r| r.success),
        error_message: results.iter().find_map(|r| r.error_message.clone()),
        state_changed: results.iter().any(|r| r.state_changed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_controller_creation() {
        let controller = AgentLoopController::default_config();
        assert_eq!(controller.config().max_steps, 100);
        assert_eq!(controller.step_count().await, 0);
    }

    #[tokio::test]
    async fn test_controller_cancel() {
        let controller = AgentLoopController::default_config();
        assert!(!controller.is_cancelled().await);
        controller.cancel().await;
        assert!(controller.is_cancelled().await);
        assert!(controller.cancellation_token().await.is_cancelled());
    }

    #[tokio::test]
    async fn test_controller_pause_resume() {
        let controller = AgentLoopController::default_config();
        assert!(!controller.is_paused().await);
        controller.pause().await;
        assert!(controller.is_paused().await);
        controller.resume().await;
        assert!(!controller.is_paused().await);
    }

    #[tokio::test]
    async fn test_cancel_wakes_a_paused_loop() {
        let controller = std::sync::Arc::new(AgentLoopController::default_config());
        controller.pause().await;

        let waiter = {
            let controller = controller.clone();
            tokio::spawn(async move {
                while controller.is_paused().await && !controller.is_cancelled().await {
                    let token = controller.cancellation_token().await;
                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_secs(5)) => {}
                        _ = token.cancelled() => {}
                    }
                }
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        controller.cancel().await;
        tokio::time::timeout(Duration::from_millis(500), waiter)
            .await
            .expect("cancel should wake a paused waiter promptly")
            .unwrap();
    }

    #[tokio::test]
    async fn test_reset_issues_a_fresh_cancellation_token() {
        let controller = AgentLoopController::default_config();
        controller.cancel().await;
        assert!(controller.cancellation_token().await.is_cancelled());
        controller.reset().await;
        assert!(!controller.cancellation_token().await.is_cancelled());
        assert!(!controller.is_cancelled().await);
    }

    #[tokio::test]
    async fn test_result_constructors() {
        let completed = AgentLoopResult::completed("Done".to_string(), 5, vec![], 1000);
        assert!(completed.is_success());
        assert_eq!(completed.status, AgentLoopStatus::Completed);

        let failed = AgentLoopResult::failed("Error".to_string(), 3, vec![], 500);
        assert!(!failed.is_success());
        assert_eq!(failed.status, AgentLoopStatus::Failed);

        let max_steps = AgentLoopResult::max_steps_reached(100, vec![], 5000);
        assert!(!max_steps.is_success());
        assert_eq!(max_steps.status, AgentLoopStatus::MaxStepsReached);
    }

    #[test]
    fn test_aggregate_results() {
        let results = vec![
            AgentActionResult {
                success: true,
                error_message: None,
                state_changed: true,
            },
            AgentActionResult {
                success: true,
                error_message: None,
                state_changed: false,
            },
        ];

        let aggregated = aggregate_action_results(&results);
        assert!(aggregated.success);
        assert!(aggregated.state_changed);
        assert!(aggregated.error_message.is_none());

        let results_with_failure = vec![
            AgentActionResult {
                success: true,
                error_message: None,
                state_changed: false,
            },
            AgentActionResult {
                success: false,
                error_message: Some("Failed".to_string()),
                state_changed: false,
            },
        ];

        let aggregated = aggregate_action_results(&results_with_failure);
        assert!(!aggregated.success);
        assert_eq!(aggregated.error_message, Some("Failed".to_string()));
    }
}
