use cdp_adapter::adapter::Cdp;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ActionOutcome;
use crate::param_parse::parse;
use crate::types::{ActionContext, ActionResult};

const MAX_MARKDOWN_CHARS: usize = 30_000;
const PERSIST_THRESHOLD_CHARS: usize = 600;

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct ExtractStructuredDataParams {
    pub goal: String,
}

/// HTML → markdown (deterministic), truncated with a head/tail policy
/// so the extraction LLM sees both ends of a long page, passed to the
/// extraction model, and persisted to the file-system sandbox when the
/// result is long enough to be worth keeping around for later steps.
pub async fn extract_structured_data(
    params: Value,
    ctx: ActionContext,
) -> ActionOutcome<ActionResult> {
    let params: ExtractStructuredDataParams = parse("extract_structured_data", params)?;

    let page = ctx
        .browser_session
        .current_adapter_page()
        .map_err(crate::errors::ActionError::from)?;
    let adapter = ctx.browser_session.adapter();
    let html_value = adapter
        .evaluate_script(page, "document.documentElement.outerHTML")
        .await
        .map_err(|err| crate::errors::ActionError::Internal(err.to_string()))?;
    let html = html_value.as_str().unwrap_or_default();

    let markdown = html2md::parse_html(html);
    let truncated = truncate_head_tail(&markdown, MAX_MARKDOWN_CHARS);

    let llm = ctx
        .page_extraction_llm
        .as_ref()
        .ok_or(crate::errors::ActionError::NoExtractionLlm)?;
    let extracted = llm.extract(&truncated, &params.goal).await?;

    let mut files_to_display = Vec::new();
    if extracted.len() > PERSIST_THRESHOLD_CHARS {
        if let Some(fs) = &ctx.file_system {
            let filename = format!("extracted-{}.md", uuid::Uuid::new_v4());
            fs.write_file(&filename, &extracted, false).await?;
            files_to_display.push(filename);
        }
    }

    Ok(ActionResult {
        extracted_content: Some(extracted),
        files_to_display,
        include_in_memory: true,
        ..Default::default()
    })
}

/// Keeps the first and last half of the budget, dropping the middle
/// (content far from either boundary is least likely to carry the
/// answer for extraction goals phrased against page structure).
fn truncate_head_tail(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let half = max_chars / 2;
    let chars: Vec<char> = text.chars().collect();
    let head: String = chars[..half].iter().collect();
    let tail: String = chars[chars.len() - half..].iter().collect();
    format!("{head}\n\n...[truncated]...\n\n{tail}")
}
