use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ActionOutcome;
use crate::param_parse::parse;
use crate::types::{ActionContext, ActionResult};

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct SwitchTabParams {
    pub tab_index: usize,
}

pub async fn switch_tab(params: Value, ctx: ActionContext) -> ActionOutcome<ActionResult> {
    let params: SwitchTabParams = parse("switch_tab", params)?;
    let tab = ctx.browser_session.switch_to_tab(params.tab_index)?;
    Ok(ActionResult::text(format!("switched to tab '{}'", tab.url)))
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct CloseTabParams {
    pub target_id: String,
}

pub async fn close_tab(params: Value, ctx: ActionContext) -> ActionOutcome<ActionResult> {
    let params: CloseTabParams = parse("close_tab", params)?;
    ctx.browser_session.close_tab(&params.target_id).await?;
    Ok(ActionResult::text(format!(
        "closed tab {}",
        params.target_id
    )))
}
