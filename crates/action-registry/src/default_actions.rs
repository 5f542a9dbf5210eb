//! Registers the built-in action set (§4.5 "Default actions").

use std::sync::Arc;

use schemars::schema_for;

use crate::actions::{click, done, dropdown, extract, files, input, navigate, scroll, sheets, tabs};
use crate::registry::ActionRegistry;
use crate::types::ActionHandler;

fn schema<T: schemars::JsonSchema>() -> serde_json::Value {
    serde_json::to_value(schema_for!(T)).unwrap_or(serde_json::Value::Null)
}

/// Registers every default action with no domain restriction. Callers
/// that need Google Sheets actions confined to `docs.google.com`, or a
/// structured `done`, should register those individually afterward
/// (`ActionRegistry::action` overwrites by name).
pub fn register_default_actions(registry: &ActionRegistry) {
    registry.action(
        "search_google",
        "Search Google for a query in the current tab",
        schema::<navigate::SearchGoogleParams>(),
        None,
        Arc::new(navigate::search_google) as Arc<dyn ActionHandler>,
    );
    registry.action(
        "go_to_url",
        "Navigate to a URL, optionally in a new tab",
        schema::<navigate::GoToUrlParams>(),
        None,
        Arc::new(navigate::go_to_url),
    );
    registry.action(
        "go_back",
        "Navigate back in the current tab's history",
        serde_json::json!({"type": "object", "properties": {}}),
        None,
        Arc::new(navigate::go_back),
    );
    registry.action(
        "wait",
        "Wait for a number of seconds",
        schema::<navigate::WaitParams>(),
        None,
        Arc::new(navigate::wait),
    );
    registry.action(
        "click_element_by_index",
        "Click the interactive element with the given highlight index",
        schema::<click::ClickElementByIndexParams>(),
        None,
        Arc::new(click::click_element_by_index),
    );
    registry.action(
        "send_keys",
        "Send raw keyboard input to the page",
        schema::<click::SendKeysParams>(),
        None,
        Arc::new(click::send_keys),
    );
    registry.action(
        "input_text",
        "Type text into the interactive element with the given highlight index",
        schema::<input::InputTextParams>(),
        None,
        Arc::new(input::input_text),
    );
    registry.action(
        "upload_file",
        "Upload a sandboxed file into a file-input element",
        schema::<input::UploadFileParams>(),
        None,
        Arc::new(input::upload_file),
    );
    registry.action(
        "switch_tab",
        "Switch the active tab by index",
        schema::<tabs::SwitchTabParams>(),
        None,
        Arc::new(tabs::switch_tab),
    );
    registry.action(
        "close_tab",
        "Close a tab by target id",
        schema::<tabs::CloseTabParams>(),
        None,
        Arc::new(tabs::close_tab),
    );
    registry.action(
        "extract_structured_data",
        "Extract structured data from the current page toward a stated goal",
        schema::<extract::ExtractStructuredDataParams>(),
        None,
        Arc::new(extract::extract_structured_data),
    );
    registry.action(
        "scroll",
        "Scroll the page up or down by a number of viewport pages",
        schema::<scroll::ScrollParams>(),
        None,
        Arc::new(scroll::scroll),
    );
    registry.action(
        "scroll_to_text",
        "Scroll the page until the given text is visible",
        schema::<scroll::ScrollToTextParams>(),
        None,
        Arc::new(scroll::scroll_to_text),
    );
    registry.action(
        "read_file",
        "Read a file from the sandboxed agent file system",
        schema::<files::ReadFileParams>(),
        None,
        Arc::new(files::read_file),
    );
    registry.action(
        "write_file",
        "Write a file into the sandboxed agent file system",
        schema::<files::WriteFileParams>(),
        None,
        Arc::new(files::write_file),
    );
    registry.action(
        "replace_file_str",
        "Replace all occurrences of a string within a sandboxed file",
        schema::<files::ReplaceFileStrParams>(),
        None,
        Arc::new(files::replace_file_str),
    );
    registry.action(
        "get_dropdown_options",
        "List the options of a dropdown element",
        schema::<dropdown::GetDropdownOptionsParams>(),
        None,
        Arc::new(dropdown::get_dropdown_options),
    );
    registry.action(
        "select_dropdown_option",
        "Select a dropdown option by its visible text",
        schema::<dropdown::SelectDropdownOptionParams>(),
        None,
        Arc::new(dropdown::select_dropdown_option),
    );
    registry.action(
        "done",
        "Finish the task and report the result",
        schema::<done::DoneParams>(),
        None,
        Arc::new(done::done),
    );
}

/// Registers the Google Sheets helper set, confined to `docs.google.com`.
pub fn register_sheets_actions(registry: &ActionRegistry) {
    let sheets_only = Some(vec!["docs.google.com".to_string()]);

    registry.action(
        "select_cell_or_range",
        "Select a cell or range in the open Google Sheet",
        schema::<sheets::SelectCellOrRangeParams>(),
        sheets_only.clone(),
        Arc::new(sheets::select_cell_or_range),
    );
    registry.action(
        "get_sheet_contents",
        "Read the visible contents of the open Google Sheet",
        schema::<sheets::GetSheetContentsParams>(),
        sheets_only.clone(),
        Arc::new(sheets::get_sheet_contents),
    );
    registry.action(
        "update_range_contents",
        "Overwrite a range in the open Google Sheet with tab-separated values",
        schema::<sheets::UpdateRangeContentsParams>(),
        sheets_only,
        Arc::new(sheets::update_range_contents),
    );
}

/// Swaps the `done` action's parameter model for one whose `data` field
/// must conform to `output_schema` (§4.5 "Structured done").
pub fn register_structured_done(registry: &ActionRegistry, output_schema: serde_json::Value) {
    let schema = serde_json::json!({
        "type": "object",
        "properties": {
            "success": {"type": "boolean"},
            "data": output_schema,
            "files_to_display": {"type": "array", "items": {"type": "string"}},
        },
        "required": ["success", "data"],
    });

    registry.action(
        "done",
        "Finish the task and report the structured result",
        schema,
        None,
        Arc::new(done::structured_done),
    );
}
