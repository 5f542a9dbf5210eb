use agent_core::agent_loop::{AgentHistoryEntry, AgentActionResult, BrowserStateSummary, ScrollPosition};
use agent_core::{AgentRequest, LlmProvider, MockLlmProvider};
use futures::executor::block_on;
use soulbrowser_core_types::TaskId;
use std::collections::HashMap;

fn build_request(goal: &str) -> AgentRequest {
    AgentRequest::new(TaskId::new(), goal.to_string())
}

fn state(url: &str, element_count: u32) -> BrowserStateSummary {
    BrowserStateSummary {
        url: url.to_string(),
        title: None,
        element_tree: String::new(),
        selector_map: HashMap::new(),
        screenshot_base64: None,
        scroll_position: ScrollPosition::default(),
        focused_element: None,
        element_count,
    }
}

#[test]
fn mock_provider_rejects_empty_goal() {
    let provider = MockLlmProvider::default();
    let request = AgentRequest::new(TaskId::new(), "   ");
    let outcome = block_on(provider.decide(&request, &state("https://example.com", 0), &[]));
    assert!(outcome.is_err());
}

#[test]
fn mock_provider_clicks_when_elements_present() {
    let provider = MockLlmProvider::default();
    let request = build_request("Open the landing page");

    let output = block_on(provider.decide(&request, &state("https://example.com", 3), &[]))
        .expect("decide");
    assert!(!output.is_done());
    assert_eq!(output.actions.len(), 1);
}

#[test]
fn mock_provider_signals_done_after_enough_steps() {
    let provider = MockLlmProvider::default();
    let request = build_request("Fill out the signup form");

    let history: Vec<AgentHistoryEntry> = (1..=3)
        .map(|n| AgentHistoryEntry::new(n, format!("step {n}"), vec![], AgentActionResult::default()))
        .collect();

    let output = block_on(provider.decide(&request, &state("https://example.com", 3), &history))
        .expect("decide");
    assert!(output.is_done());
    let (success, _text) = output.done_result().expect("done result");
    assert!(*success);
}
