//! The terminal `done` action. When the agent is configured with an
//! output schema, the registry swaps this declaration's `param_schema`
//! for one whose `data` field conforms to that schema (§4.5 "Structured
//! done"); the handler itself is schema-agnostic since it only forwards
//! whatever `data`/`text` it is given.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ActionOutcome;
use crate::param_parse::parse;
use crate::types::{ActionContext, ActionResult};

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct DoneParams {
    pub success: bool,
    pub text: String,
    #[serde(default)]
    pub files_to_display: Vec<String>,
}

pub async fn done(params: Value, _ctx: ActionContext) -> ActionOutcome<ActionResult> {
    let params: DoneParams = parse("done", params)?;
    Ok(ActionResult::done(
        params.success,
        params.text,
        params.files_to_display,
    ))
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct StructuredDoneParams {
    pub success: bool,
    pub data: Value,
    #[serde(default)]
    pub files_to_display: Vec<String>,
}

/// Used in place of `done` when the caller built the registry with a
/// structured output schema.
pub async fn structured_done(params: Value, _ctx: ActionContext) -> ActionOutcome<ActionResult> {
    let params: StructuredDoneParams = parse("done", params)?;
    Ok(ActionResult::done(
        params.success,
        params.data.to_string(),
        params.files_to_display,
    ))
}
