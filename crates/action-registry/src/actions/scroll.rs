use cdp_adapter::adapter::Cdp;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ActionOutcome;
use crate::param_parse::parse;
use crate::types::{ActionContext, ActionResult};

const MAX_PAGES: f64 = 5.0;
const VIEWPORT_FRACTION: f64 = 0.8;

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct ScrollParams {
    /// Positive scrolls down, negative scrolls up, clamped to [-5, 5] pages.
    pub pages: f64,
}

pub async fn scroll(params: Value, ctx: ActionContext) -> ActionOutcome<ActionResult> {
    let params: ScrollParams = parse("scroll", params)?;
    let pages = params.pages.clamp(-MAX_PAGES, MAX_PAGES);

    let page = ctx
        .browser_session
        .current_adapter_page()
        .map_err(crate::errors::ActionError::from)?;
    let adapter = ctx.browser_session.adapter();
    let script = format!(
        "window.scrollBy(0, window.innerHeight * {VIEWPORT_FRACTION} * ({pages}))",
    );
    adapter
        .evaluate_script(page, &script)
        .await
        .map_err(|err| crate::errors::ActionError::Internal(err.to_string()))?;

    Ok(ActionResult::text(format!("scrolled {pages} pages")))
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct ScrollToTextParams {
    pub text: String,
}

pub async fn scroll_to_text(params: Value, ctx: ActionContext) -> ActionOutcome<ActionResult> {
    let params: ScrollToTextParams = parse("scroll_to_text", params)?;
    let page = ctx
        .browser_session
        .current_adapter_page()
        .map_err(crate::errors::ActionError::from)?;
    let adapter = ctx.browser_session.adapter();

    let script = format!(
        r#"(() => {{
            const walker = document.createTreeWalker(document.body, NodeFilter.SHOW_TEXT);
            let node;
            while ((node = walker.nextNode())) {{
                if (node.textContent && node.textContent.includes({needle})) {{
                    node.parentElement?.scrollIntoView({{block: 'center'}});
                    return true;
                }}
            }}
            return false;
        }})()"#,
        needle = serde_json::to_string(&params.text).unwrap_or_default()
    );

    let found = adapter
        .evaluate_script(page, &script)
        .await
        .map_err(|err| crate::errors::ActionError::Internal(err.to_string()))?;

    if found.as_bool().unwrap_or(false) {
        Ok(ActionResult::text(format!(
            "scrolled to text '{}'",
            params.text
        )))
    } else {
        Ok(ActionResult::error(format!(
            "text '{}' not found on page",
            params.text
        )))
    }
}
