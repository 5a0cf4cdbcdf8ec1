// call.rs — Proposed tool invocations and the tool inventory.
//
// A ToolCallInfo is what the external planner proposes and what every
// audit decision is about. Targets are not declared by the caller; they
// are extracted from the argument map by a fixed key-preference probe,
// so constraints can talk about "the thing being acted on" without
// schema knowledge of each tool.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::classify::{infer_operation, Operation};

/// Argument keys probed for a call's target, in preference order.
const TARGET_KEY_PREFERENCE: &[&str] = &[
    "target",
    "resource",
    "id",
    "name",
    "user",
    "file",
    "path",
    "recipient",
];

/// A proposed tool invocation, as submitted for audit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ToolCallInfo {
    /// The tool the planner wants to invoke.
    pub tool_name: String,
    /// Untyped argument map. `serde_json::Map` keeps keys sorted, so
    /// serialization is deterministic and retry keys depend only on
    /// content, never on construction order.
    #[serde(default)]
    pub arguments: Map<String, Value>,
    /// Caller-assigned correlation id, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
}

impl ToolCallInfo {
    /// Create a call with no arguments.
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments: Map::new(),
            call_id: None,
        }
    }

    /// Builder-style argument insertion.
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    /// Builder-style correlation id.
    pub fn with_call_id(mut self, call_id: impl Into<String>) -> Self {
        self.call_id = Some(call_id.into());
        self
    }

    /// The call's inferred coarse operation.
    pub fn operation(&self) -> Operation {
        infer_operation(&self.tool_name)
    }

    /// Extract the call's target, when one can be determined.
    ///
    /// Probes the argument keys in [`TARGET_KEY_PREFERENCE`] order; if
    /// none match and exactly one argument exists, that argument's value
    /// is the target. Otherwise the target is undefined and any
    /// target-based predicate fails to apply.
    pub fn target(&self) -> Option<String> {
        for key in TARGET_KEY_PREFERENCE {
            if let Some(value) = self.arguments.get(*key) {
                return Some(value_to_text(value));
            }
        }
        if self.arguments.len() == 1 {
            return self.arguments.values().next().map(value_to_text);
        }
        None
    }

    /// Every argument value rendered as text, for token-overlap scoring.
    pub fn argument_texts(&self) -> Vec<String> {
        self.arguments.values().map(value_to_text).collect()
    }
}

/// Render a JSON value as bare text: strings without quotes, everything
/// else in its JSON form.
fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// One entry in the available-tool inventory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolSpec {
    pub name: String,
    /// Human-readable description; feeds necessity scoring.
    #[serde(default)]
    pub description: String,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}
