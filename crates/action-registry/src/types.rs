//! Shared types threaded through every action handler.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::ActionOutcome;
use crate::fs_sandbox::FileSystemSandbox;
use crate::sensitive_data::SensitiveDataMap;
use browser_session::BrowserSession;

/// A chat-model call used by `extract_structured_data` to turn a page's
/// markdown rendering into the requested structured shape. No concrete
/// provider is implemented here (out of scope); this is the seam a
/// provider plugs into.
#[async_trait]
pub trait ExtractionLlm: Send + Sync {
    async fn extract(&self, markdown: &str, goal: &str) -> ActionOutcome<String>;
}

/// Everything a handler may need beyond its own typed parameters.
#[derive(Clone)]
pub struct ActionContext {
    pub browser_session: Arc<BrowserSession>,
    pub page_extraction_llm: Option<Arc<dyn ExtractionLlm>>,
    pub sensitive_data: Option<Arc<SensitiveDataMap>>,
    pub available_file_paths: Vec<PathBuf>,
    pub file_system: Option<Arc<FileSystemSandbox>>,
}

impl ActionContext {
    pub fn new(browser_session: Arc<BrowserSession>) -> Self {
        Self {
            browser_session,
            page_extraction_llm: None,
            sensitive_data: None,
            available_file_paths: Vec::new(),
            file_system: None,
        }
    }

    pub fn with_extraction_llm(mut self, llm: Arc<dyn ExtractionLlm>) -> Self {
        self.page_extraction_llm = Some(llm);
        self
    }

    pub fn with_sensitive_data(mut self, map: Arc<SensitiveDataMap>) -> Self {
        self.sensitive_data = Some(map);
        self
    }

    pub fn with_file_system(mut self, fs: Arc<FileSystemSandbox>) -> Self {
        self.file_system = Some(fs);
        self
    }
}

/// Normalized outcome of an action invocation (§4.5 step f).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ActionResult {
    pub extracted_content: Option<String>,
    pub error: Option<String>,
    pub is_done: bool,
    pub success: Option<bool>,
    pub files_to_display: Vec<String>,
    pub include_in_memory: bool,
}

impl ActionResult {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            extracted_content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn json(value: Value) -> Self {
        Self {
            extracted_content: Some(value.to_string()),
            ..Default::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn done(success: bool, text: impl Into<String>, files_to_display: Vec<String>) -> Self {
        Self {
            extracted_content: Some(text.into()),
            is_done: true,
            success: Some(success),
            files_to_display,
            ..Default::default()
        }
    }
}

#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn execute(&self, params: Value, ctx: &ActionContext) -> ActionOutcome<ActionResult>;
}

#[async_trait]
impl<F, Fut> ActionHandler for F
where
    F: Fn(Value, ActionContext) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = ActionOutcome<ActionResult>> + Send,
{
    async fn execute(&self, params: Value, ctx: &ActionContext) -> ActionOutcome<ActionResult> {
        (self)(params, ctx.clone()).await
    }
}

/// A registered action: name, human description, JSON Schema for its
/// parameters, optional domain restriction, and the handler itself.
#[derive(Clone)]
pub struct ActionDeclaration {
    pub name: String,
    pub description: String,
    pub param_schema: Value,
    pub allowed_domains: Option<Vec<String>>,
    pub handler: Arc<dyn ActionHandler>,
}
