//! Chat model seam (§6): the only interface the agent step loop needs
//! from an LLM. Concrete provider adapters (OpenAI, Anthropic, Bedrock,
//! Gemini, ...) are out of scope; this trait is the contract they all
//! satisfy, grounded on the teacher's planner-facing `LlmProvider` trait
//! but narrowed to the step loop's single `decide` call.

use async_trait::async_trait;

use crate::agent_loop::{AgentHistoryEntry, AgentOutput, BrowserStateSummary};
use crate::errors::AgentError;
use crate::model::AgentRequest;

/// Abstraction over LLM-backed decision makers so multiple vendors can
/// plug into the agent core through one small surface.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Decide next action(s) based on current browser state (agent loop mode).
    ///
    /// Called at each step of the agent loop to determine what action(s)
    /// to take based on the current browser state and history.
    ///
    /// # Arguments
    /// * `request` - The original agent request with goal and context
    /// * `state` - Current browser state summary with indexed elements
    /// * `history` - History of previous steps and their results
    async fn decide(
        &self,
        request: &AgentRequest,
        state: &BrowserStateSummary,
        history: &[AgentHistoryEntry],
    ) -> Result<AgentOutput, AgentError>;
}

/// Deterministic provider used for tests and offline development.
#[derive(Debug, Default, Clone)]
pub struct MockLlmProvider;

#[async_trait]
impl LlmProvider for MockLlmProvider {
    async fn decide(
        &self,
        request: &AgentRequest,
        state: &BrowserStateSummary,
        history: &[AgentHistoryEntry],
    ) -> Result<AgentOutput, AgentError> {
        ensure_goal(request)?;

        use crate::agent_loop::{AgentAction, AgentActionParams, AgentActionType};

        // Mock implementation: if we've taken 3+ steps, signal done
        if history.len() >= 3 {
            return Ok(AgentOutput {
                thinking: format!(
                    "Mock thinking: After {} steps on {}, task should be complete.",
                    history.len(),
                    state.url
                ),
                evaluation_previous_goal: Some("Previous step completed successfully".to_string()),
                memory: Some(format!("Completed {} steps", history.len())),
                next_goal: "Signal task completion".to_string(),
                actions: vec![AgentAction {
                    action_type: AgentActionType::Done,
                    element_index: None,
                    params: AgentActionParams {
                        done_success: Some(true),
                        done_text: Some(format!(
                            "Mock task completed after {} steps",
                            history.len()
                        )),
                        ..Default::default()
                    },
                }],
            });
        }

        // Otherwise, return a mock action based on element availability
        let action = if state.element_count > 0 {
            AgentAction {
                action_type: AgentActionType::Click,
                element_index: Some(0),
                params: AgentActionParams::default(),
            }
        } else {
            AgentAction {
                action_type: AgentActionType::Wait,
                element_index: None,
                params: AgentActionParams {
                    ms: Some(1000),
                    ..Default::default()
                },
            }
        };

        Ok(AgentOutput {
            thinking: format!(
                "Mock thinking: Analyzing page at {} with {} elements.",
                state.url, state.element_count
            ),
            evaluation_previous_goal: if history.is_empty() {
                None
            } else {
                Some("Previous action completed".to_string())
            },
            memory: Some(format!(
                "Step {} of task: {}",
                history.len() + 1,
                request.goal
            )),
            next_goal: format!("Continue task execution (step {})", history.len() + 1),
            actions: vec![action],
        })
    }
}

fn ensure_goal(request: &AgentRequest) -> Result<(), AgentError> {
    if request.goal.trim().is_empty() {
        return Err(AgentError::invalid_request("goal cannot be empty"));
    }
    Ok(())
}
