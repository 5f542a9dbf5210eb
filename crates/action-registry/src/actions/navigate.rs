use std::time::Duration;

use browser_session::NavigateOptions;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ActionOutcome;
use crate::param_parse::parse;
use crate::types::{ActionContext, ActionResult};

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct SearchGoogleParams {
    pub query: String,
}

pub async fn search_google(params: Value, ctx: ActionContext) -> ActionOutcome<ActionResult> {
    let params: SearchGoogleParams = parse("search_google", params)?;
    let url = format!(
        "https://www.google.com/search?q={}",
        urlencode(&params.query)
    );
    ctx.browser_session
        .navigate_to(&url, NavigateOptions::default())
        .await?;
    Ok(ActionResult::text(format!(
        "searched Google for '{}'",
        params.query
    )))
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct GoToUrlParams {
    pub url: String,
    #[serde(default)]
    pub new_tab: bool,
}

pub async fn go_to_url(params: Value, ctx: ActionContext) -> ActionOutcome<ActionResult> {
    let params: GoToUrlParams = parse("go_to_url", params)?;
    ctx.browser_session
        .navigate_to(
            &params.url,
            NavigateOptions {
                new_tab: params.new_tab,
                ..NavigateOptions::default()
            },
        )
        .await?;
    Ok(ActionResult::text(format!("navigated to {}", params.url)))
}

pub async fn go_back(_params: Value, ctx: ActionContext) -> ActionOutcome<ActionResult> {
    ctx.browser_session.go_back().await?;
    Ok(ActionResult::text("navigated back"))
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct WaitParams {
    #[serde(default = "default_wait_seconds")]
    pub seconds: f64,
}

fn default_wait_seconds() -> f64 {
    3.0
}

pub async fn wait(params: Value, _ctx: ActionContext) -> ActionOutcome<ActionResult> {
    let params: WaitParams = parse("wait", params)?;
    tokio::time::sleep(Duration::from_secs_f64(params.seconds.max(0.0))).await;
    Ok(ActionResult::text(format!("waited {}s", params.seconds)))
}

fn urlencode(input: &str) -> String {
    let mut out = String::new();
    for byte in input.as_bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(*byte as char)
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
