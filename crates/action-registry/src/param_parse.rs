//! Shared typed-parameter parsing helper used by every action handler.

use serde_json::Value;

use crate::errors::{ActionError, ActionOutcome};

pub fn parse<T: serde::de::DeserializeOwned>(action: &str, value: Value) -> ActionOutcome<T> {
    serde_json::from_value(value).map_err(|err| ActionError::Validation {
        action: action.to_string(),
        reason: err.to_string(),
    })
}
