use cdp_adapter::adapter::Cdp;
use cdp_adapter::commands::SelectSpec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ActionOutcome;
use crate::param_parse::parse;
use crate::types::{ActionContext, ActionResult};

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct GetDropdownOptionsParams {
    pub index: u32,
}

pub async fn get_dropdown_options(params: Value, ctx: ActionContext) -> ActionOutcome<ActionResult> {
    let params: GetDropdownOptionsParams = parse("get_dropdown_options", params)?;
    let node = ctx
        .browser_session
        .get_dom_element_by_index(params.index)
        .await
        .map_err(|_| crate::errors::ActionError::ElementNotFound(params.index))?;
    let selector = node
        .attributes
        .get("id")
        .map(|id| format!("#{id}"))
        .unwrap_or(node.xpath.clone());

    let page = ctx
        .browser_session
        .current_adapter_page()
        .map_err(crate::errors::ActionError::from)?;
    let adapter = ctx.browser_session.adapter();
    let script = format!(
        "Array.from(document.querySelector({sel})?.options || []).map(o => ({{text: o.text, value: o.value}}))",
        sel = serde_json::to_string(&selector).unwrap_or_default()
    );
    let options = adapter
        .evaluate_script(page, &script)
        .await
        .map_err(|err| crate::errors::ActionError::Internal(err.to_string()))?;

    Ok(ActionResult::json(options))
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct SelectDropdownOptionParams {
    pub index: u32,
    pub text: String,
}

pub async fn select_dropdown_option(
    params: Value,
    ctx: ActionContext,
) -> ActionOutcome<ActionResult> {
    let params: SelectDropdownOptionParams = parse("select_dropdown_option", params)?;
    let node = ctx
        .browser_session
        .get_dom_element_by_index(params.index)
        .await
        .map_err(|_| crate::errors::ActionError::ElementNotFound(params.index))?;
    let selector = node
        .attributes
        .get("id")
        .map(|id| format!("#{id}"))
        .unwrap_or(node.xpath.clone());

    let page = ctx
        .browser_session
        .current_adapter_page()
        .map_err(crate::errors::ActionError::from)?;
    let adapter = ctx.browser_session.adapter();
    adapter
        .select_option(
            page,
            SelectSpec {
                selector,
                value: params.text.clone(),
                match_label: true,
            },
            std::time::Duration::from_secs(10),
        )
        .await
        .map_err(|err| crate::errors::ActionError::OptionNotFound(err.to_string()))?;

    Ok(ActionResult::text(format!(
        "selected option '{}' on element {}",
        params.text, params.index
    )))
}
