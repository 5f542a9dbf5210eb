//! Composition root (§6): wires Event Bus, Browser Session, Watchdogs,
//! Action Registry, and the Agent Step Loop into one `run_task` call.
//! This is the only module that knows about every component crate at
//! once; everything downstream only knows its own seams.

use std::sync::Arc;
use std::time::{Duration, Instant};

use action_registry::{register_default_actions, ActionContext, ActionRegistry};
use agent_core::agent_loop::types::ElementSelectorRef;
use agent_core::agent_loop::{
    AgentAction, AgentActionParams, AgentActionResult, AgentActionType, AgentLoopConfig,
    AgentLoopController, AgentLoopResult, AgentLoopStatus, AgentOutput,
    BrowserStateSummary as AgentStateSummary, ScrollPosition,
};
use agent_core::{AgentRequest, LlmProvider};
use browser_session::{BrowserSession, SessionConfig, ALL_EVENT_NAMES};
use cdp_adapter::adapter::{CdpAdapter, ChromiumCdpAdapter};
use cdp_adapter::CdpConfig;
use soulbrowser_core_types::{AgentId, TaskId};
use soulbrowser_event_bus::{EventBus, EventHandler};
use tracing::info;
use watchdogs::{
    security::SecurityPolicy, CdpSessionWatchdog, CrashWatchdog, DownloadsWatchdog, HarWatchdog,
    SecurityWatchdog, StorageWatchdog,
};

use crate::config::AppConfig;
use crate::errors::AppResult;

/// Everything a single `run_task` invocation needs beyond the goal
/// text itself.
pub struct RunnerConfig {
    pub app: AppConfig,
    pub llm: Arc<dyn LlmProvider>,
    pub telemetry: Arc<telemetry::TelemetryRecorder>,
}

/// Launches the browser, attaches watchdogs, and drives the agent
/// step loop to completion for a single task. Returns the loop's
/// terminal result (§7 "exactly four user-visible terminal states").
pub async fn run_task(goal: &str, runner: RunnerConfig) -> AppResult<AgentLoopResult> {
    let task_id = TaskId::new();
    let started = Instant::now();

    let cdp_config = CdpConfig {
        headless: runner.app.headless,
        ..CdpConfig::default()
    };
    let adapter: Arc<dyn CdpAdapter> = Arc::new(ChromiumCdpAdapter::new(cdp_config).await?);

    let bus: EventBus<browser_session::BrowserEvent> = EventBus::new(Duration::from_secs(10));
    apply_timeout_env_overrides(&bus);

    let session = Arc::new(BrowserSession::new(
        adapter,
        bus,
        SessionConfig {
            downloads_dir: runner.app.downloads_dir.clone(),
            ..SessionConfig::default()
        },
    ));

    attach_watchdogs(&session, &runner.app);

    session.claim_agent(AgentId::new(), browser_session::OwnerMode::Exclusive)?;
    session.start().await?;

    let registry = Arc::new(ActionRegistry::new());
    register_default_actions(&registry);
    let ctx = ActionContext::new(Arc::clone(&session));

    let loop_config = if runner.app.enable_vision {
        AgentLoopConfig::with_vision()
    } else {
        AgentLoopConfig::default().vision(false)
    }
    .max_steps(runner.app.max_steps);
    let controller = AgentLoopController::new(loop_config);

    let request = AgentRequest::new(task_id.clone(), goal.to_string());
    let llm = runner.llm;

    let observe_session = Arc::clone(&session);
    let observe_fn = move || {
        let session = Arc::clone(&observe_session);
        Box::pin(async move {
            let state = session
                .get_browser_state_with_recovery(true, true)
                .await
                .map_err(|err| err.to_string())?;
            Ok(to_agent_state_summary(state))
        }) as std::pin::Pin<Box<dyn std::future::Future<Output = Result<AgentStateSummary, String>> + Send>>
    };

    let decide_request = request.clone();
    let decide_fn = move |state: &AgentStateSummary, history: &[agent_core::agent_loop::AgentHistoryEntry]| {
        let llm = Arc::clone(&llm);
        let request = decide_request.clone();
        let state = state.clone();
        let history = history.to_vec();
        Box::pin(async move {
            llm.decide(&request, &state, &history)
                .await
                .map_err(|err| err.to_string())
        }) as std::pin::Pin<Box<dyn std::future::Future<Output = Result<AgentOutput, String>> + Send>>
    };

    let exec_registry = Arc::clone(&registry);
    let exec_ctx = ctx.clone();
    let execute_fn = move |action: &AgentAction, _state: &AgentStateSummary| {
        let registry = Arc::clone(&exec_registry);
        let ctx = exec_ctx.clone();
        let action = action.clone();
        Box::pin(async move { execute_agent_action(&registry, &ctx, &action).await })
            as std::pin::Pin<Box<dyn std::future::Future<Output = Result<AgentActionResult, String>> + Send>>
    };

    let result = controller.run(goal, observe_fn, decide_fn, execute_fn).await;

    let terminal_state = if result.is_success() {
        telemetry::TerminalState::DoneSuccess
    } else if result.status == AgentLoopStatus::MaxStepsReached {
        telemetry::TerminalState::Exhausted
    } else if result.status == AgentLoopStatus::Cancelled {
        telemetry::TerminalState::Aborted
    } else {
        telemetry::TerminalState::DoneFailure
    };
    crate::metrics::record_run_terminal_state(terminal_state.as_str());

    runner
        .telemetry
        .record(telemetry::AgentTelemetryEvent {
            task_id,
            model: "mock".to_string(),
            provider: "mock".to_string(),
            steps: result.steps_taken,
            usage: telemetry::TokenUsage::default(),
            terminal_state,
            success: result.is_success(),
            error: if result.is_success() { None } else { Some(result.message.clone()) },
            judge_verdict: None,
            duration_ms: started.elapsed().as_millis() as u64,
        })
        .await;

    session.stop().await?;
    Ok(result)
}

/// §6 "Environment variables: `TIMEOUT_<EventName>` overrides per-event
/// timeouts in seconds" / DESIGN NOTES §9 "Global state ... read once at
/// startup". Checked for every known event class; unset vars leave the
/// bus's own default untouched.
fn apply_timeout_env_overrides(bus: &EventBus<browser_session::BrowserEvent>) {
    for name in ALL_EVENT_NAMES {
        let var = format!("TIMEOUT_{name}");
        if let Ok(raw) = std::env::var(&var) {
            match raw.parse::<f64>() {
                Ok(secs) if secs > 0.0 => {
                    bus.set_timeout(name, Duration::from_secs_f64(secs));
                }
                _ => {
                    tracing::warn!(var = %var, value = %raw, "ignoring unparseable TIMEOUT_ override");
                }
            }
        }
    }
}

fn attach_watchdogs(session: &Arc<BrowserSession>, app: &AppConfig) {
    let bus = session.bus();
    register_on_every_event(bus, Arc::new(CrashWatchdog::new(Arc::clone(session), Default::default())));
    register_on_every_event(bus, Arc::new(DownloadsWatchdog::new(Arc::clone(session))));
    register_on_every_event(
        bus,
        Arc::new(HarWatchdog::new(Arc::clone(session), app.downloads_dir.join("session.har"))),
    );
    register_on_every_event(bus, Arc::new(StorageWatchdog::new(Arc::clone(session))));
    register_on_every_event(bus, Arc::new(CdpSessionWatchdog::new(Arc::clone(session))));
    if !app.allowed_domains.is_empty() {
        let policy = SecurityPolicy {
            allowed_domain_patterns: app.allowed_domains.clone(),
        };
        register_on_every_event(bus, Arc::new(SecurityWatchdog::new(Arc::clone(session), policy)));
    }
}

/// Each watchdog ignores the event variants it doesn't care about
/// (§4.4), so registering it against the full event-name list is
/// simpler than hand-picking a subset per watchdog.
fn register_on_every_event(
    bus: &EventBus<browser_session::BrowserEvent>,
    handler: Arc<dyn EventHandler<browser_session::BrowserEvent>>,
) {
    for name in ALL_EVENT_NAMES {
        let _ = bus.on(name, Arc::clone(&handler));
    }
}

fn to_agent_state_summary(state: browser_session::BrowserStateSummary) -> AgentStateSummary {
    let mut selector_map = std::collections::HashMap::new();
    let mut element_tree = String::new();
    if let Some(root) = &state.element_tree {
        element_tree = dom_model::clickable_elements_to_string(root);
        collect_selectors(root, &mut selector_map);
    }

    AgentStateSummary {
        url: state.url,
        title: Some(state.title),
        element_tree,
        selector_map: selector_map.clone(),
        screenshot_base64: state.screenshot,
        scroll_position: ScrollPosition::default(),
        focused_element: None,
        element_count: selector_map.len() as u32,
    }
}

fn collect_selectors(
    node: &dom_model::DomElementNode,
    map: &mut std::collections::HashMap<u32, ElementSelectorRef>,
) {
    if let Some(idx) = node.highlight_index {
        map.insert(
            idx,
            ElementSelectorRef {
                css_selector: node.attributes.get("id").map(|id| format!("#{id}")),
                backend_node_id: None,
                aria_selector: None,
                text_content: if node.text.is_empty() { None } else { Some(node.text.clone()) },
                tag_name: node.tag.clone(),
            },
        );
    }
    for child in &node.children {
        collect_selectors(child, map);
    }
}

/// Bridges the agent loop's simplified `AgentAction` vocabulary (§4.6)
/// onto the Action Registry's named, JSON-schema'd actions (§4.5).
async fn execute_agent_action(
    registry: &ActionRegistry,
    ctx: &ActionContext,
    action: &AgentAction,
) -> Result<AgentActionResult, String> {
    let (name, params) = to_registry_call(action);
    let result = registry.execute_action(&name, params, ctx).await;
    Ok(AgentActionResult {
        success: result.error.is_none(),
        error_message: result.error,
        state_changed: !matches!(action.action_type, AgentActionType::Wait),
    })
}

fn to_registry_call(action: &AgentAction) -> (String, serde_json::Value) {
    let p: &AgentActionParams = &action.params;
    match action.action_type {
        AgentActionType::Navigate => (
            "go_to_url".to_string(),
            serde_json::json!({ "url": p.url.clone().unwrap_or_default(), "new_tab": false }),
        ),
        AgentActionType::Click => (
            "click_element_by_index".to_string(),
            serde_json::json!({ "index": action.element_index.unwrap_or_default() }),
        ),
        AgentActionType::TypeText => (
            "input_text".to_string(),
            serde_json::json!({
                "index": action.element_index.unwrap_or_default(),
                "text": p.text.clone().unwrap_or_default(),
                "clear": true,
            }),
        ),
        AgentActionType::Select => (
            "select_dropdown_option".to_string(),
            serde_json::json!({
                "index": action.element_index.unwrap_or_default(),
                "text": p.value.clone().unwrap_or_default(),
            }),
        ),
        AgentActionType::Scroll => {
            let pages = (p.amount.unwrap_or(800) as f64 / 800.0)
                * match p.direction {
                    Some(agent_core::agent_loop::ScrollDirection::Up) => -1.0,
                    _ => 1.0,
                };
            (
                "scroll".to_string(),
                serde_json::json!({ "pages": pages }),
            )
        }
        AgentActionType::Wait => (
            "wait".to_string(),
            serde_json::json!({ "seconds": (p.ms.unwrap_or(1000) as f64) / 1000.0 }),
        ),
        AgentActionType::Done => (
            "done".to_string(),
            serde_json::json!({
                "success": p.done_success.or(p.success).unwrap_or(false),
                "text": p.done_text.clone().unwrap_or_default(),
                "files_to_display": Vec::<String>::new(),
            }),
        ),
    }
}

/// Convenience entry point: brings up a default, telemetry-opted-in
/// runner with the mock LLM provider (real providers plug in by
/// constructing `RunnerConfig` directly).
pub async fn run_with_defaults(goal: &str, app: AppConfig) -> AppResult<AgentLoopResult> {
    let telemetry_enabled = app.telemetry_enabled;
    let sink: Arc<dyn telemetry::TelemetrySink> = Arc::new(telemetry::NoopSink);
    let telemetry = Arc::new(if telemetry_enabled {
        telemetry::TelemetryRecorder::from_env(sink)
    } else {
        telemetry::TelemetryRecorder::noop()
    });
    let runner = RunnerConfig {
        app,
        llm: Arc::new(agent_core::MockLlmProvider::default()),
        telemetry,
    };
    info!(%goal, "starting agent run");
    run_task(goal, runner).await
}
