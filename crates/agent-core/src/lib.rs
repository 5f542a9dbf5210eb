//! Agent Step Loop (C6): the think -> act -> observe controller that
//! drives the Browser Session, Watchdogs, and Action Registry. Provides
//! the request/context envelope (`AgentRequest`), the chat-model seam
//! (`LlmProvider`), and the step state machine itself (`agent_loop`).

pub mod agent_loop;
pub mod errors;
pub mod llm_provider;
pub mod model;

pub use agent_loop::{AgentLoopConfig, AgentLoopController, AgentLoopResult, AgentLoopStatus};
pub use errors::AgentError;
pub use llm_provider::{LlmProvider, MockLlmProvider};
pub use model::{
    AgentContext, AgentIntentMetadata, AgentRequest, ConversationRole, ConversationTurn,
    RequestedOutput,
};
