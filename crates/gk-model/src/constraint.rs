// constraint.rs — Allow/forbid/confirm rules and their predicates.
//
// A Constraint pairs a kind (allow / forbid / require_confirmation) with
// a structured condition over the proposed call. Conditions are a closed
// set of typed predicate fields evaluated through one dispatch point,
// `ConstraintCondition::applies_to` — not an open-ended property bag.
//
// Pattern fields are fail-closed: a pattern that does not compile never
// matches, so a typo in a generated constraint cannot widen its reach.

use std::fmt;
use std::sync::Arc;

use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::call::ToolCallInfo;
use crate::classify::Operation;

/// What a matching constraint asserts about a call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    Allow,
    Forbid,
    RequireConfirmation,
}

/// Out-of-band predicate hook for conditions the structured fields
/// cannot express. Not serialized; compared as absent.
pub type CustomCheck = Arc<dyn Fn(&ToolCallInfo) -> bool + Send + Sync>;

/// Structured predicate deciding whether a constraint applies to a call.
///
/// Every field is optional; all present fields must hold (conjunction).
/// An empty condition applies to every call. The `allowed_targets` and
/// `forbidden_targets` lists are both membership tests — the names say
/// which constraint kind they are meant to ride with, not different
/// matching semantics.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ConstraintCondition {
    /// Exact tool name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    /// Wildcard or regex pattern over the tool name. Bare `*`/`?`
    /// wildcard patterns are translated to an anchored regex; anything
    /// else compiles as a regex directly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name_pattern: Option<String>,
    /// Inferred coarse operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,
    /// Exact extracted target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Glob pattern over the extracted target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_pattern: Option<String>,
    /// Target must be one of these.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_targets: Option<Vec<String>>,
    /// Target must be one of these.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forbidden_targets: Option<Vec<String>>,
    /// Opaque caller-supplied predicate.
    #[serde(skip)]
    pub custom_check: Option<CustomCheck>,
}

impl ConstraintCondition {
    /// Single dispatch point: true when every present predicate holds.
    ///
    /// Target-based predicates need an extractable target; a call
    /// without one fails them (the predicate cannot apply).
    pub fn applies_to(&self, call: &ToolCallInfo) -> bool {
        if let Some(name) = &self.tool_name {
            if *name != call.tool_name {
                return false;
            }
        }
        if let Some(pattern) = &self.tool_name_pattern {
            if !matches_name_pattern(pattern, &call.tool_name) {
                return false;
            }
        }
        if let Some(op) = self.operation {
            if call.operation() != op {
                return false;
            }
        }
        let needs_target = self.target.is_some()
            || self.target_pattern.is_some()
            || self.allowed_targets.is_some()
            || self.forbidden_targets.is_some();
        if needs_target {
            let target = match call.target() {
                Some(t) => t,
                None => return false,
            };
            if let Some(want) = &self.target {
                if *want != target {
                    return false;
                }
            }
            if let Some(pattern) = &self.target_pattern {
                if !matches_target_pattern(pattern, &target) {
                    return false;
                }
            }
            if let Some(allowed) = &self.allowed_targets {
                if !allowed.iter().any(|t| *t == target) {
                    return false;
                }
            }
            if let Some(forbidden) = &self.forbidden_targets {
                if !forbidden.iter().any(|t| *t == target) {
                    return false;
                }
            }
        }
        if let Some(check) = &self.custom_check {
            if !check(call) {
                return false;
            }
        }
        true
    }

    /// Scope comparison for the allow-override rule.
    ///
    /// Two conditions share scope when every one of `tool_name`,
    /// `tool_name_pattern`, `operation`, and `target` that is present in
    /// BOTH conditions has equal values. Conditions with no field in
    /// common share scope vacuously: a fully applicable narrow allow can
    /// cancel a broader forbid.
    pub fn shares_scope(&self, other: &Self) -> bool {
        fn same<T: PartialEq>(a: &Option<T>, b: &Option<T>) -> bool {
            match (a, b) {
                (Some(x), Some(y)) => x == y,
                // A field absent on either side does not narrow scope.
                _ => true,
            }
        }
        same(&self.tool_name, &other.tool_name)
            && same(&self.tool_name_pattern, &other.tool_name_pattern)
            && same(&self.operation, &other.operation)
            && same(&self.target, &other.target)
    }

    /// True when no predicate field is set at all.
    pub fn is_empty(&self) -> bool {
        self.tool_name.is_none()
            && self.tool_name_pattern.is_none()
            && self.operation.is_none()
            && self.target.is_none()
            && self.target_pattern.is_none()
            && self.allowed_targets.is_none()
            && self.forbidden_targets.is_none()
            && self.custom_check.is_none()
    }
}

impl fmt::Debug for ConstraintCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstraintCondition")
            .field("tool_name", &self.tool_name)
            .field("tool_name_pattern", &self.tool_name_pattern)
            .field("operation", &self.operation)
            .field("target", &self.target)
            .field("target_pattern", &self.target_pattern)
            .field("allowed_targets", &self.allowed_targets)
            .field("forbidden_targets", &self.forbidden_targets)
            .field("custom_check", &self.custom_check.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Conditions compare on their declarative fields; custom hooks are
/// opaque and ignored.
impl PartialEq for ConstraintCondition {
    fn eq(&self, other: &Self) -> bool {
        self.tool_name == other.tool_name
            && self.tool_name_pattern == other.tool_name_pattern
            && self.operation == other.operation
            && self.target == other.target
            && self.target_pattern == other.target_pattern
            && self.allowed_targets == other.allowed_targets
            && self.forbidden_targets == other.forbidden_targets
    }
}

impl Eq for ConstraintCondition {}

/// Match a tool-name pattern against a name.
///
/// Patterns built only from word characters, `-`, `*`, and `?` are
/// treated as shell-style wildcards and translated to an anchored regex;
/// anything else compiles as a regex as written. Invalid patterns never
/// match (fail-closed, not fail-open).
fn matches_name_pattern(pattern: &str, name: &str) -> bool {
    let looks_like_wildcard = pattern
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '*' | '?'));
    let source = if looks_like_wildcard {
        let mut rx = String::with_capacity(pattern.len() + 8);
        rx.push('^');
        for c in pattern.chars() {
            match c {
                '*' => rx.push_str(".*"),
                '?' => rx.push('.'),
                c if c.is_alphanumeric() => rx.push(c),
                c => {
                    rx.push('\\');
                    rx.push(c);
                }
            }
        }
        rx.push('$');
        rx
    } else {
        pattern.to_string()
    };
    match Regex::new(&source) {
        Ok(re) => re.is_match(name),
        Err(_) => false, // Invalid patterns never match (fail-closed)
    }
}

/// Match a glob pattern against an extracted target.
///
/// Uses the `glob` crate. If the pattern is invalid, it does not match
/// (fail-closed, not fail-open).
fn matches_target_pattern(pattern: &str, target: &str) -> bool {
    match Pattern::new(pattern) {
        Ok(p) => p.matches(target),
        Err(_) => false,
    }
}

/// A single allow/forbid/require-confirmation rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Constraint {
    /// Stable id, unique within its set.
    pub id: String,
    pub kind: ConstraintKind,
    /// What this rule is about, in the generator's words.
    pub description: String,
    #[serde(default)]
    pub condition: ConstraintCondition,
    /// Evaluation-order tiebreaker: smaller priorities are asserted
    /// first. Priority alone never decides the final outcome.
    #[serde(default = "default_priority")]
    pub priority: i32,
    /// Message surfaced when this rule is violated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violation_message: Option<String>,
}

fn default_priority() -> i32 {
    5
}

impl Constraint {
    /// Create a rule with an empty condition (applies to every call) and
    /// the default priority.
    pub fn new(id: impl Into<String>, kind: ConstraintKind, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            description: description.into(),
            condition: ConstraintCondition::default(),
            priority: default_priority(),
            violation_message: None,
        }
    }

    pub fn with_condition(mut self, condition: ConstraintCondition) -> Self {
        self.condition = condition;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_violation_message(mut self, message: impl Into<String>) -> Self {
        self.violation_message = Some(message.into());
        self
    }
}

/// The complete rule set for one task.
///
/// Immutable once attached to an audit session; replacing it (for a new
/// task) fully resets prior violation state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ConstraintSet {
    /// The task intent these rules were generated from.
    pub source_intent: String,
    /// Ordered rules; evaluation sorts ascending by priority.
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    /// Free-text rules that apply to the whole task.
    #[serde(default)]
    pub global_rules: Vec<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl ConstraintSet {
    /// Create an empty set for the given intent.
    pub fn new(source_intent: impl Into<String>) -> Self {
        Self {
            source_intent: source_intent.into(),
            constraints: Vec::new(),
            global_rules: Vec::new(),
            metadata: Map::new(),
        }
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn with_global_rule(mut self, rule: impl Into<String>) -> Self {
        self.global_rules.push(rule.into());
        self
    }

    /// Hard-coded fallback used when a generated constraint document
    /// fails validation: forbid writes and sends until a real set is
    /// attached. Priority 1 so the rules block even in hybrid mode.
    pub fn conservative_default(source_intent: impl Into<String>) -> Self {
        let no_write = Constraint::new(
            "conservative-no-write",
            ConstraintKind::Forbid,
            "No write operations under the conservative fallback policy",
        )
        .with_condition(ConstraintCondition {
            operation: Some(Operation::Write),
            ..ConstraintCondition::default()
        })
        .with_priority(1)
        .with_violation_message("write operations are blocked until task constraints are available");
        let no_send = Constraint::new(
            "conservative-no-send",
            ConstraintKind::Forbid,
            "No outbound communication under the conservative fallback policy",
        )
        .with_condition(ConstraintCondition {
            operation: Some(Operation::Send),
            ..ConstraintCondition::default()
        })
        .with_priority(1)
        .with_violation_message("send operations are blocked until task constraints are available");
        Self::new(source_intent)
            .with_constraint(no_write)
            .with_constraint(no_send)
    }
}
