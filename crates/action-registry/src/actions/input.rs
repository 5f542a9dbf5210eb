use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ActionOutcome;
use crate::param_parse::parse;
use crate::types::{ActionContext, ActionResult};

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct InputTextParams {
    pub index: u32,
    pub text: String,
    #[serde(default = "default_true")]
    pub clear: bool,
}

fn default_true() -> bool {
    true
}

pub async fn input_text(params: Value, ctx: ActionContext) -> ActionOutcome<ActionResult> {
    let params: InputTextParams = parse("input_text", params)?;
    let node = ctx
        .browser_session
        .get_dom_element_by_index(params.index)
        .await
        .map_err(|_| crate::errors::ActionError::ElementNotFound(params.index))?;
    ctx.browser_session
        .input_text_element_node(&node, &params.text, params.clear)
        .await?;
    Ok(ActionResult::text(format!(
        "typed into element {}",
        params.index
    )))
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct UploadFileParams {
    pub index: u32,
    pub path: String,
}

/// The driver trait has no `DOM.setFileInputFiles`-equivalent command,
/// so this types the path directly into the `<input type=file>` element
/// the way a scripted `.value =` assignment would; a real CDP
/// implementation should prefer a native file-chooser call once one is
/// added to the trait.
pub async fn upload_file(params: Value, ctx: ActionContext) -> ActionOutcome<ActionResult> {
    let params: UploadFileParams = parse("upload_file", params)?;

    let allowed = ctx
        .available_file_paths
        .iter()
        .any(|p| p.to_string_lossy() == params.path);
    if !allowed {
        return Err(crate::errors::ActionError::FileSystem(format!(
            "{} is not in the available file paths for this session",
            params.path
        )));
    }

    let node = ctx
        .browser_session
        .find_file_upload_element_by_index(params.index)
        .await
        .map_err(|_| crate::errors::ActionError::ElementNotFound(params.index))?;
    ctx.browser_session
        .input_text_element_node(&node, &params.path, false)
        .await?;

    Ok(ActionResult::text(format!(
        "uploaded {} to element {}",
        params.path, params.index
    )))
}
