//! The action registry itself (§4.5): `action(...)(handler)` registers,
//! `execute_action` runs the lookup → validate → domain-filter →
//! sensitive-data substitution → invoke → normalize pipeline.
//!
//! Parameter validation (step b) is delegated to each handler's typed
//! `serde_json::from_value::<Params>` call rather than a standalone JSON
//! Schema validator — the teacher's `action-primitives` crate takes the
//! same approach (typed params, no runtime schema engine); `param_schema`
//! on `ActionDeclaration` exists for the message builder to describe the
//! action to the LLM, not to gate execution itself.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::ActionError;
use crate::types::{ActionContext, ActionDeclaration, ActionHandler, ActionResult};

#[derive(Default)]
pub struct ActionRegistry {
    actions: DashMap<String, ActionDeclaration>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, declaration: ActionDeclaration) {
        debug!(action = %declaration.name, "registering action");
        self.actions.insert(declaration.name.clone(), declaration);
    }

    pub fn action(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        param_schema: Value,
        allowed_domains: Option<Vec<String>>,
        handler: Arc<dyn ActionHandler>,
    ) {
        self.register(ActionDeclaration {
            name: name.into(),
            description: description.into(),
            param_schema,
            allowed_domains,
            handler,
        });
    }

    pub fn get(&self, name: &str) -> Option<ActionDeclaration> {
        self.actions.get(name).map(|entry| entry.clone())
    }

    pub fn names(&self) -> Vec<String> {
        self.actions.iter().map(|e| e.key().clone()).collect()
    }

    pub fn declarations(&self) -> Vec<ActionDeclaration> {
        self.actions.iter().map(|e| e.value().clone()).collect()
    }

    /// §4.5: (a) look up, (b) parameter validation happens inside the
    /// handler, (c) domain filter, (d) sensitive-data substitution on
    /// string parameter fields, (e) invoke, (f) normalize.
    pub async fn execute_action(
        &self,
        name: &str,
        mut raw_params: Value,
        ctx: &ActionContext,
    ) -> ActionResult {
        let declaration = match self.get(name) {
            Some(d) => d,
            None => {
                return ActionResult::error(ActionError::UnknownAction(name.to_string()).to_string())
            }
        };

        let active_url = ctx
            .browser_session
            .current_tab()
            .map(|t| t.url)
            .unwrap_or_default();

        if let Some(patterns) = &declaration.allowed_domains {
            if !domain_allowed(&active_url, patterns) {
                let err = ActionError::DomainDenied {
                    url: active_url,
                    patterns: patterns.clone(),
                };
                warn!(action = name, %err, "action blocked by domain filter");
                return ActionResult::error(err.to_string());
            }
        }

        if let Some(sensitive) = &ctx.sensitive_data {
            substitute_strings(&mut raw_params, |s| sensitive.resolve_placeholders(s, &active_url));
        }

        match declaration.handler.execute(raw_params, ctx).await {
            Ok(result) => result,
            Err(err) => ActionResult::error(err.to_string()),
        }
    }
}

fn domain_allowed(url: &str, patterns: &[String]) -> bool {
    if patterns.is_empty() {
        return true;
    }
    let host = url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default();
    patterns.iter().any(|pattern| {
        glob::Pattern::new(pattern)
            .map(|p| p.matches(&host))
            .unwrap_or(false)
    })
}

/// Walks a JSON value in place, applying `f` to every string leaf.
fn substitute_strings(value: &mut Value, f: impl Fn(&str) -> String + Copy) {
    match value {
        Value::String(s) => *s = f(s),
        Value::Array(items) => {
            for item in items {
                substitute_strings(item, f);
            }
        }
        Value::Object(map) => {
            for (_, v) in map.iter_mut() {
                substitute_strings(v, f);
            }
        }
        _ => {}
    }
}
