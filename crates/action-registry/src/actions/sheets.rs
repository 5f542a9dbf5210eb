//! Google Sheets helpers: drive the Sheets web UI directly (keyboard
//! shortcuts + formula bar) rather than calling the Sheets API, since
//! this registry has no HTTP client for external APIs (out of scope).
//! Grounded on the same `evaluate_script`/`type_text` primitives every
//! other action uses; restricted to `docs.google.com` via
//! `allowed_domains` when registered.

use cdp_adapter::adapter::Cdp;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ActionOutcome;
use crate::param_parse::parse;
use crate::types::{ActionContext, ActionResult};

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct SelectCellOrRangeParams {
    pub cell_or_range: String,
}

pub async fn select_cell_or_range(
    params: Value,
    ctx: ActionContext,
) -> ActionOutcome<ActionResult> {
    let params: SelectCellOrRangeParams = parse("select_cell_or_range", params)?;
    let page = ctx
        .browser_session
        .current_adapter_page()
        .map_err(crate::errors::ActionError::from)?;
    let adapter = ctx.browser_session.adapter();
    let script = format!(
        "document.querySelector('#t-name-box')?.focus(); document.execCommand('insertText', false, {range})",
        range = serde_json::to_string(&params.cell_or_range).unwrap_or_default()
    );
    adapter
        .evaluate_script(page, &script)
        .await
        .map_err(|err| crate::errors::ActionError::Internal(err.to_string()))?;
    Ok(ActionResult::text(format!(
        "selected range '{}'",
        params.cell_or_range
    )))
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct GetSheetContentsParams {}

pub async fn get_sheet_contents(_params: Value, ctx: ActionContext) -> ActionOutcome<ActionResult> {
    let page = ctx
        .browser_session
        .current_adapter_page()
        .map_err(crate::errors::ActionError::from)?;
    let adapter = ctx.browser_session.adapter();
    let script = "Array.from(document.querySelectorAll('.waffle-cell')).map(c => c.textContent).join('\\t')";
    let contents = adapter
        .evaluate_script(page, script)
        .await
        .map_err(|err| crate::errors::ActionError::Internal(err.to_string()))?;
    Ok(ActionResult::text(
        contents.as_str().unwrap_or_default().to_string(),
    ))
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct UpdateRangeContentsParams {
    pub cell_or_range: String,
    pub new_contents_tsv: String,
}

pub async fn update_range_contents(
    params: Value,
    ctx: ActionContext,
) -> ActionOutcome<ActionResult> {
    let params: UpdateRangeContentsParams = parse("update_range_contents", params)?;

    let select = select_cell_or_range(
        serde_json::to_value(SelectCellOrRangeParams {
            cell_or_range: params.cell_or_range.clone(),
        })
        .unwrap_or_default(),
        ctx.clone(),
    )
    .await?;
    if select.error.is_some() {
        return Ok(select);
    }

    let page = ctx
        .browser_session
        .current_adapter_page()
        .map_err(crate::errors::ActionError::from)?;
    let adapter = ctx.browser_session.adapter();
    adapter
        .type_text(
            page,
            "body",
            &params.new_contents_tsv,
            std::time::Duration::from_secs(10),
        )
        .await
        .map_err(|err| crate::errors::ActionError::Internal(err.to_string()))?;

    Ok(ActionResult::text(format!(
        "updated range '{}'",
        params.cell_or_range
    )))
}
