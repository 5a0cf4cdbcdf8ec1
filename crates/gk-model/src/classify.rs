// classify.rs — Centralized keyword classifiers.
//
// Operation inference, risk grading, and redundancy-marker detection are
// all driven by small ordered lookup tables. They live in one module so
// the base auditor, the enhanced auditor, and the hypothesizer share a
// single vocabulary and cannot silently diverge.
//
// Matching depth differs deliberately: operation and risk classify the
// raw tool name by substring (first bucket wins), while markers match
// whole name tokens so that "pro" does not fire on "profile".

use serde::{Deserialize, Serialize};

use crate::text::tokenize;

/// Coarse operation classification, inferred from a tool's name.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Read,
    Write,
    Delete,
    Send,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Read => write!(f, "read"),
            Operation::Write => write!(f, "write"),
            Operation::Delete => write!(f, "delete"),
            Operation::Send => write!(f, "send"),
        }
    }
}

impl Operation {
    /// Whether a call with this operation mutates or emits anything.
    pub fn has_side_effects(self) -> bool {
        self != Operation::Read
    }
}

/// How dangerous a tool looks from its name alone.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

/// How redundant a tool is relative to the rest of the inventory.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RedundancyLevel {
    Minimal,
    Moderate,
    High,
}

impl std::fmt::Display for RedundancyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RedundancyLevel::Minimal => write!(f, "minimal"),
            RedundancyLevel::Moderate => write!(f, "moderate"),
            RedundancyLevel::High => write!(f, "high"),
        }
    }
}

// ── Lookup Tables ──

/// Ordered operation buckets. Earlier buckets win: a name matching both a
/// READ and a DELETE keyword classifies as READ.
const READ_KEYWORDS: &[&str] = &["get", "read", "fetch", "list", "search", "view"];
const WRITE_KEYWORDS: &[&str] = &["set", "write", "update", "modify", "create", "add"];
const DELETE_KEYWORDS: &[&str] = &["delete", "remove", "drop"];
const SEND_KEYWORDS: &[&str] = &["send", "post", "email", "message", "notify"];

/// Name fragments that read as destructive regardless of operation bucket.
const HIGH_RISK_KEYWORDS: &[&str] = &["delete", "remove", "drop", "destroy"];
const MEDIUM_RISK_KEYWORDS: &[&str] = &["write", "update", "modify", "create", "send", "transfer"];

/// Capability-inflation markers: name decorations suggesting a tool is an
/// embellished variant of a plainer one.
pub const INFLATION_MARKERS: &[&str] =
    &["advanced", "premium", "pro", "enhanced", "optimized", "community"];

/// Baseline markers: name tokens suggesting the plain variant.
pub const BASELINE_MARKERS: &[&str] =
    &["basic", "simple", "standard", "get", "read", "official", "api"];

/// Verb vocabulary used to decide whether two tools do the same job.
const CORE_VERBS: &[&str] = &[
    "get", "set", "read", "write", "send", "create", "update", "delete", "schedule", "list",
    "search", "fetch",
];

// ── Classifiers ──

/// Infer the coarse operation from a tool name.
///
/// Substring match against the ordered buckets; a name matching nothing
/// defaults to READ (the least privileged interpretation the rest of the
/// engine can still reason about).
pub fn infer_operation(tool_name: &str) -> Operation {
    let name = tool_name.to_lowercase();
    if READ_KEYWORDS.iter().any(|k| name.contains(*k)) {
        return Operation::Read;
    }
    if WRITE_KEYWORDS.iter().any(|k| name.contains(*k)) {
        return Operation::Write;
    }
    if DELETE_KEYWORDS.iter().any(|k| name.contains(*k)) {
        return Operation::Delete;
    }
    if SEND_KEYWORDS.iter().any(|k| name.contains(*k)) {
        return Operation::Send;
    }
    Operation::Read
}

/// Grade a tool's risk from its name: high for destructive fragments,
/// medium for mutating ones, low otherwise.
pub fn assess_risk(tool_name: &str) -> RiskLevel {
    let name = tool_name.to_lowercase();
    if HIGH_RISK_KEYWORDS.iter().any(|k| name.contains(*k)) {
        return RiskLevel::High;
    }
    if MEDIUM_RISK_KEYWORDS.iter().any(|k| name.contains(*k)) {
        return RiskLevel::Medium;
    }
    RiskLevel::Low
}

/// Whether a tool name reads as outbound communication.
pub fn is_communication_tool(tool_name: &str) -> bool {
    let name = tool_name.to_lowercase();
    SEND_KEYWORDS.iter().any(|k| name.contains(*k))
}

/// True when any whole token of the name is a capability-inflation marker.
pub fn has_inflation_marker(tool_name: &str) -> bool {
    tokenize(tool_name)
        .iter()
        .any(|t| INFLATION_MARKERS.contains(&t.as_str()))
}

/// True when any whole token of the name is a baseline marker.
pub fn has_baseline_marker(tool_name: &str) -> bool {
    tokenize(tool_name)
        .iter()
        .any(|t| BASELINE_MARKERS.contains(&t.as_str()))
}

/// The first name token that belongs to the core verb vocabulary.
///
/// Marker decorations fall out naturally: non-verb markers ("advanced",
/// "basic", …) are not in the vocabulary, while "get"/"read" are verbs in
/// their own right and keep their meaning.
pub fn core_verb(tool_name: &str) -> Option<String> {
    tokenize(tool_name)
        .into_iter()
        .find(|t| CORE_VERBS.contains(&t.as_str()))
}

/// Classify how redundant `tool_name` is against the full inventory, and
/// collect the baseline alternatives that make it so.
///
/// High: the name carries an inflation marker and a baseline-marked tool
/// with the same core verb exists. Moderate: marker, but no such
/// alternative. Minimal: no marker at all. Alternatives come back only
/// for High, for naming in feedback.
pub fn classify_redundancy(tool_name: &str, available: &[&str]) -> (RedundancyLevel, Vec<String>) {
    if !has_inflation_marker(tool_name) {
        return (RedundancyLevel::Minimal, Vec::new());
    }
    let verb = core_verb(tool_name);
    let alternatives: Vec<String> = available
        .iter()
        .filter(|name| !name.eq_ignore_ascii_case(tool_name))
        .filter(|name| has_baseline_marker(name))
        .filter(|name| verb.is_some() && core_verb(name) == verb)
        .map(|name| name.to_string())
        .collect();
    if alternatives.is_empty() {
        (RedundancyLevel::Moderate, Vec::new())
    } else {
        (RedundancyLevel::High, alternatives)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_buckets_in_order() {
        assert_eq!(infer_operation("get_invoice"), Operation::Read);
        assert_eq!(infer_operation("update_record"), Operation::Write);
        assert_eq!(infer_operation("delete_user"), Operation::Delete);
        assert_eq!(infer_operation("send_email"), Operation::Send);
    }

    #[test]
    fn operation_defaults_to_read() {
        assert_eq!(infer_operation("calculate_total"), Operation::Read);
    }

    #[test]
    fn earlier_bucket_wins_on_multiple_matches() {
        // "list" (READ) and "remove" (DELETE) both match; READ is checked first.
        assert_eq!(infer_operation("list_removed_items"), Operation::Read);
    }

    #[test]
    fn operation_inference_is_case_insensitive() {
        assert_eq!(infer_operation("Send_Notification"), Operation::Send);
    }

    #[test]
    fn risk_grading() {
        assert_eq!(assess_risk("delete_account"), RiskLevel::High);
        assert_eq!(assess_risk("update_profile"), RiskLevel::Medium);
        assert_eq!(assess_risk("view_balance"), RiskLevel::Low);
    }

    #[test]
    fn risk_high_beats_medium() {
        // "remove" (high) and "update" (medium) both present.
        assert_eq!(assess_risk("update_and_remove"), RiskLevel::High);
    }

    #[test]
    fn side_effects_follow_operation() {
        assert!(!Operation::Read.has_side_effects());
        assert!(Operation::Write.has_side_effects());
        assert!(Operation::Delete.has_side_effects());
        assert!(Operation::Send.has_side_effects());
    }

    #[test]
    fn communication_tools_detected() {
        assert!(is_communication_tool("send_message"));
        assert!(is_communication_tool("notify_user"));
        assert!(!is_communication_tool("read_file"));
    }

    #[test]
    fn markers_match_whole_tokens_only() {
        assert!(has_inflation_marker("pro_search"));
        assert!(!has_inflation_marker("profile_search"));
        assert!(has_baseline_marker("basic_get_weather"));
    }

    #[test]
    fn core_verb_skips_decorations() {
        assert_eq!(core_verb("advanced_get_invoice"), Some("get".to_string()));
        assert_eq!(core_verb("get_invoice"), Some("get".to_string()));
        assert_eq!(core_verb("dashboard_panel"), None);
    }

    #[test]
    fn redundancy_high_with_baseline_alternative() {
        let (level, alternatives) =
            classify_redundancy("advanced_get_weather", &["get_weather_basic", "send_email"]);
        assert_eq!(level, RedundancyLevel::High);
        assert_eq!(alternatives, vec!["get_weather_basic".to_string()]);
    }

    #[test]
    fn redundancy_moderate_without_alternative() {
        let (level, alternatives) = classify_redundancy("premium_search_docs", &["send_email"]);
        assert_eq!(level, RedundancyLevel::Moderate);
        assert!(alternatives.is_empty());
    }

    #[test]
    fn redundancy_minimal_without_marker() {
        let (level, _) = classify_redundancy("get_weather", &["get_weather_basic"]);
        assert_eq!(level, RedundancyLevel::Minimal);
    }

    #[test]
    fn redundancy_requires_matching_core_verb() {
        // Marker present and a baseline tool exists, but it does a
        // different job ("send" vs "get") — not redundant.
        let (level, _) = classify_redundancy("advanced_get_weather", &["basic_send_email"]);
        assert_eq!(level, RedundancyLevel::Moderate);
    }
}
