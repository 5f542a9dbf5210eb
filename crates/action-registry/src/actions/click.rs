use cdp_adapter::adapter::Cdp;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ActionOutcome;
use crate::param_parse::parse;
use crate::types::{ActionContext, ActionResult};

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct ClickElementByIndexParams {
    pub index: u32,
}

pub async fn click_element_by_index(
    params: Value,
    ctx: ActionContext,
) -> ActionOutcome<ActionResult> {
    let params: ClickElementByIndexParams = parse("click_element_by_index", params)?;
    let node = ctx
        .browser_session
        .get_dom_element_by_index(params.index)
        .await
        .map_err(|_| crate::errors::ActionError::ElementNotFound(params.index))?;

    let opened_tab = ctx.browser_session.click_element_node(&node, true).await?;

    match opened_tab {
        Some(tab) => Ok(ActionResult::text(format!(
            "clicked element {}, opened new tab '{}'",
            params.index, tab.url
        ))),
        None => Ok(ActionResult::text(format!(
            "clicked element {}",
            params.index
        ))),
    }
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct SendKeysParams {
    pub keys: String,
}

pub async fn send_keys(params: Value, ctx: ActionContext) -> ActionOutcome<ActionResult> {
    let params: SendKeysParams = parse("send_keys", params)?;
    let page = ctx
        .browser_session
        .current_adapter_page()
        .map_err(crate::errors::ActionError::from)?;
    let adapter = ctx.browser_session.adapter();
    adapter
        .type_text(page, "body", &params.keys, std::time::Duration::from_secs(10))
        .await
        .map_err(|err| crate::errors::ActionError::Internal(err.to_string()))?;
    Ok(ActionResult::text(format!("sent keys '{}'", params.keys)))
}
