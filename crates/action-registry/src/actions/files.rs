use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ActionOutcome;
use crate::param_parse::parse;
use crate::types::{ActionContext, ActionResult};

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct ReadFileParams {
    pub file_name: String,
}

pub async fn read_file(params: Value, ctx: ActionContext) -> ActionOutcome<ActionResult> {
    let params: ReadFileParams = parse("read_file", params)?;
    let fs = ctx
        .file_system
        .as_ref()
        .ok_or_else(|| crate::errors::ActionError::FileSystem("no file system configured".into()))?;
    let content = fs.read_file(&params.file_name).await?;
    Ok(ActionResult::text(content))
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct WriteFileParams {
    pub file_name: String,
    pub content: String,
    #[serde(default)]
    pub append: bool,
}

pub async fn write_file(params: Value, ctx: ActionContext) -> ActionOutcome<ActionResult> {
    let params: WriteFileParams = parse("write_file", params)?;
    let fs = ctx
        .file_system
        .as_ref()
        .ok_or_else(|| crate::errors::ActionError::FileSystem("no file system configured".into()))?;
    fs.write_file(&params.file_name, &params.content, params.append)
        .await?;
    Ok(ActionResult::text(format!("wrote {}", params.file_name)))
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct ReplaceFileStrParams {
    pub file_name: String,
    pub search: String,
    pub replace: String,
}

pub async fn replace_file_str(params: Value, ctx: ActionContext) -> ActionOutcome<ActionResult> {
    let params: ReplaceFileStrParams = parse("replace_file_str", params)?;
    let fs = ctx
        .file_system
        .as_ref()
        .ok_or_else(|| crate::errors::ActionError::FileSystem("no file system configured".into()))?;
    let count = fs
        .replace_file_str(&params.file_name, &params.search, &params.replace)
        .await?;
    Ok(ActionResult::text(format!(
        "replaced {count} occurrence(s) in {}",
        params.file_name
    )))
}
