// hypothesis.rs — Candidate branches and the hypothesis tree.
//
// A HypothesisTree is advisory: it ranks every candidate tool for one
// decision point and names a recommendation. Whatever external logic
// commits to a call may take the advice or ignore it. Trees are created
// fresh per decision point and not mutated afterward.

use serde::{Deserialize, Serialize};

use crate::call::ToolCallInfo;
use crate::classify::{RedundancyLevel, RiskLevel};

/// One candidate tool invocation with its symbolic tags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HypothesisBranch {
    pub branch_id: String,
    pub tool_call: ToolCallInfo,
    /// Why this branch scored the way it did.
    pub rationale: String,
    pub risk_level: RiskLevel,
    /// Token-overlap relevance against the user intent, in [0, 1].
    pub necessity_score: f64,
    pub redundancy_level: RedundancyLevel,
    pub has_side_effects: bool,
    pub requires_external_communication: bool,
}

/// A scored set of candidate branches for one decision point.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HypothesisTree {
    /// The decision being ranked, in the caller's words.
    pub decision_point: String,
    /// Every candidate tool, in input order. Filtering is not performed
    /// here; low scorers are still present for the caller to inspect.
    pub branches: Vec<HypothesisBranch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_branch_id: Option<String>,
}

impl HypothesisTree {
    /// The recommended branch, resolved against the branch list.
    pub fn recommended(&self) -> Option<&HypothesisBranch> {
        let id = self.recommended_branch_id.as_deref()?;
        self.branches.iter().find(|b| b.branch_id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branch(id: &str, tool: &str) -> HypothesisBranch {
        HypothesisBranch {
            branch_id: id.to_string(),
            tool_call: ToolCallInfo::new(tool),
            rationale: String::new(),
            risk_level: RiskLevel::Low,
            necessity_score: 0.5,
            redundancy_level: RedundancyLevel::Minimal,
            has_side_effects: false,
            requires_external_communication: false,
        }
    }

    #[test]
    fn recommended_resolves_by_id() {
        let tree = HypothesisTree {
            decision_point: "pick a reader".to_string(),
            branches: vec![branch("branch-0", "read_file"), branch("branch-1", "view_file")],
            recommended_branch_id: Some("branch-1".to_string()),
        };
        assert_eq!(tree.recommended().unwrap().tool_call.tool_name, "view_file");
    }

    #[test]
    fn recommended_none_when_unset_or_dangling() {
        let mut tree = HypothesisTree {
            decision_point: "pick".to_string(),
            branches: vec![branch("branch-0", "read_file")],
            recommended_branch_id: None,
        };
        assert!(tree.recommended().is_none());
        tree.recommended_branch_id = Some("branch-9".to_string());
        assert!(tree.recommended().is_none());
    }
}
