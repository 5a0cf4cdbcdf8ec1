// engine.rs — Branch construction and transparent scoring.
//
// One branch per available tool, every branch scored by the same weighted
// sum over the shared classifier outputs. The necessity term dominates on
// purpose: a tool that clearly serves the intent should survive a medium
// risk grade, while an irrelevant tool should lose even when perfectly
// safe. Penalty constants sit below so the whole trade-off is readable in
// one place.

use tracing::debug;

use gk_model::text::{overlap_score, tokenize};
use gk_model::{
    assess_risk, classify_redundancy, infer_operation, is_communication_tool, HypothesisBranch,
    HypothesisTree, Operation, RedundancyLevel, RiskLevel, ToolCallInfo, ToolSpec,
};

/// Weight on the necessity score, the dominant term.
const NECESSITY_WEIGHT: f64 = 3.0;
/// Penalty for medium-risk names.
const MEDIUM_RISK_PENALTY: f64 = 0.5;
/// Penalty for high-risk names.
const HIGH_RISK_PENALTY: f64 = 1.5;
/// Penalty when a name carries an inflation marker but no plain twin exists.
const MODERATE_REDUNDANCY_PENALTY: f64 = 0.3;
/// Penalty when a plainer available tool does the same job.
const HIGH_REDUNDANCY_PENALTY: f64 = 1.0;
/// Penalty for any mutating or emitting operation.
const SIDE_EFFECT_PENALTY: f64 = 0.5;
/// Penalty for tools that communicate outside the session.
const EXTERNAL_COMMUNICATION_PENALTY: f64 = 0.3;

/// Builds scored hypothesis trees for decision points.
///
/// Stateless: every call to [`Hypothesizer::generate`] classifies the
/// inventory from scratch, so trees from different decision points never
/// contaminate each other.
#[derive(Debug, Clone)]
pub struct Hypothesizer;

impl Hypothesizer {
    pub fn new() -> Self {
        Self
    }

    /// Build one branch per available tool and recommend the best scorer.
    ///
    /// Branches come back in input order, ranking filters nothing, and an
    /// empty inventory yields an empty tree with no recommendation. Score
    /// ties resolve toward the earlier branch, so callers can pre-order
    /// candidates by their own preference.
    pub fn generate(
        &self,
        available_tools: &[ToolSpec],
        current_state: &str,
        user_intent: &str,
    ) -> HypothesisTree {
        let intent_tokens = tokenize(user_intent);
        let names: Vec<&str> = available_tools.iter().map(|t| t.name.as_str()).collect();
        let branches: Vec<HypothesisBranch> = available_tools
            .iter()
            .enumerate()
            .map(|(index, tool)| build_branch(index, tool, &intent_tokens, &names))
            .collect();
        let recommended_branch_id = pick_recommended(&branches);
        debug!(
            branches = branches.len(),
            recommended = recommended_branch_id.as_deref().unwrap_or("-"),
            "hypothesis tree built"
        );
        HypothesisTree {
            decision_point: decision_point(current_state, user_intent),
            branches,
            recommended_branch_id,
        }
    }

    /// Score a branch: `3·necessity` minus the risk, redundancy,
    /// side-effect, and external-communication penalties.
    ///
    /// Public so callers can re-rank a tree after pruning branches the
    /// auditor has already rejected.
    pub fn score(branch: &HypothesisBranch) -> f64 {
        let mut score = NECESSITY_WEIGHT * branch.necessity_score;
        score -= match branch.risk_level {
            RiskLevel::Low => 0.0,
            RiskLevel::Medium => MEDIUM_RISK_PENALTY,
            RiskLevel::High => HIGH_RISK_PENALTY,
        };
        score -= match branch.redundancy_level {
            RedundancyLevel::Minimal => 0.0,
            RedundancyLevel::Moderate => MODERATE_REDUNDANCY_PENALTY,
            RedundancyLevel::High => HIGH_REDUNDANCY_PENALTY,
        };
        if branch.has_side_effects {
            score -= SIDE_EFFECT_PENALTY;
        }
        if branch.requires_external_communication {
            score -= EXTERNAL_COMMUNICATION_PENALTY;
        }
        score
    }
}

impl Default for Hypothesizer {
    fn default() -> Self {
        Self::new()
    }
}

fn build_branch(
    index: usize,
    tool: &ToolSpec,
    intent_tokens: &[String],
    names: &[&str],
) -> HypothesisBranch {
    let operation = infer_operation(&tool.name);
    let risk_level = assess_risk(&tool.name);
    let (redundancy_level, alternatives) = classify_redundancy(&tool.name, names);
    let mut candidate = tokenize(&tool.name);
    candidate.extend(tokenize(&tool.description));
    let necessity_score = overlap_score(&candidate, intent_tokens);
    let requires_external_communication =
        operation == Operation::Send || is_communication_tool(&tool.name);
    HypothesisBranch {
        branch_id: format!("branch-{index}"),
        tool_call: ToolCallInfo::new(&tool.name),
        rationale: build_rationale(
            operation,
            necessity_score,
            risk_level,
            redundancy_level,
            &alternatives,
            requires_external_communication,
        ),
        risk_level,
        necessity_score,
        redundancy_level,
        has_side_effects: operation.has_side_effects(),
        requires_external_communication,
    }
}

fn build_rationale(
    operation: Operation,
    necessity: f64,
    risk: RiskLevel,
    redundancy: RedundancyLevel,
    alternatives: &[String],
    external: bool,
) -> String {
    let mut parts = vec![
        format!("{operation} operation"),
        format!("necessity {necessity:.2}"),
        format!("risk {risk}"),
        format!("redundancy {redundancy}"),
    ];
    if !alternatives.is_empty() {
        parts.push(format!("plainer alternative: {}", alternatives.join(", ")));
    }
    if external {
        parts.push("communicates outside the session".to_string());
    }
    parts.join("; ")
}

/// First strictly-best branch id by score, None for an empty tree.
fn pick_recommended(branches: &[HypothesisBranch]) -> Option<String> {
    let mut best: Option<(usize, f64)> = None;
    for (index, branch) in branches.iter().enumerate() {
        let score = Hypothesizer::score(branch);
        debug!(
            branch = %branch.branch_id,
            tool = %branch.tool_call.tool_name,
            score,
            "scored branch"
        );
        match best {
            Some((_, leading)) if score <= leading => {}
            _ => best = Some((index, score)),
        }
    }
    best.map(|(index, _)| branches[index].branch_id.clone())
}

fn decision_point(current_state: &str, user_intent: &str) -> String {
    if current_state.trim().is_empty() {
        user_intent.to_string()
    } else {
        format!("{user_intent} [state: {current_state}]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tools(names: &[(&str, &str)]) -> Vec<ToolSpec> {
        names
            .iter()
            .map(|(name, description)| ToolSpec::new(*name, *description))
            .collect()
    }

    #[test]
    fn every_tool_becomes_a_branch_in_input_order() {
        let inventory = tools(&[
            ("read_file", "read a file"),
            ("write_file", "write a file"),
            ("send_email", "send an email"),
        ]);
        let tree = Hypothesizer::new().generate(&inventory, "", "look at a file");
        assert_eq!(tree.branches.len(), 3);
        assert_eq!(tree.branches[0].branch_id, "branch-0");
        assert_eq!(tree.branches[1].branch_id, "branch-1");
        assert_eq!(tree.branches[2].branch_id, "branch-2");
        assert_eq!(tree.branches[0].tool_call.tool_name, "read_file");
        assert_eq!(tree.branches[2].tool_call.tool_name, "send_email");
    }

    #[test]
    fn empty_inventory_yields_empty_tree() {
        let tree = Hypothesizer::new().generate(&[], "start", "do anything");
        assert!(tree.branches.is_empty());
        assert!(tree.recommended_branch_id.is_none());
        assert!(tree.recommended().is_none());
    }

    #[test]
    fn side_effect_free_twin_wins_by_exactly_the_penalty() {
        // add_note and view_note tie on every term except side effects:
        // necessity 0.5 each against "note handling", both low risk, both
        // minimal redundancy, neither communicates externally.
        let inventory = tools(&[("add_note", ""), ("view_note", "")]);
        let tree = Hypothesizer::new().generate(&inventory, "", "note handling");
        let add = &tree.branches[0];
        let view = &tree.branches[1];
        assert!(add.has_side_effects);
        assert!(!view.has_side_effects);
        let gap = Hypothesizer::score(view) - Hypothesizer::score(add);
        assert!((gap - SIDE_EFFECT_PENALTY).abs() < 1e-9);
        assert_eq!(tree.recommended().unwrap().tool_call.tool_name, "view_note");
    }

    #[test]
    fn risky_name_loses_to_a_safe_one() {
        let inventory = tools(&[("delete_note", ""), ("view_note", "")]);
        let tree = Hypothesizer::new().generate(&inventory, "", "note");
        assert_eq!(tree.branches[0].risk_level, RiskLevel::High);
        assert_eq!(tree.branches[1].risk_level, RiskLevel::Low);
        assert_eq!(tree.recommended().unwrap().tool_call.tool_name, "view_note");
    }

    #[test]
    fn inflated_tool_loses_to_its_plain_twin() {
        let inventory = tools(&[("advanced_get_invoice", ""), ("get_invoice_api", "")]);
        let tree = Hypothesizer::new().generate(&inventory, "", "get invoice");
        assert_eq!(tree.branches[0].redundancy_level, RedundancyLevel::High);
        assert_eq!(tree.branches[1].redundancy_level, RedundancyLevel::Minimal);
        assert!(tree.branches[0].rationale.contains("get_invoice_api"));
        assert_eq!(
            tree.recommended().unwrap().tool_call.tool_name,
            "get_invoice_api"
        );
    }

    #[test]
    fn communication_tools_carry_the_external_flag() {
        let inventory = tools(&[("send_email", "email the team")]);
        let tree = Hypothesizer::new().generate(&inventory, "", "email the team");
        let branch = &tree.branches[0];
        assert!(branch.requires_external_communication);
        assert!(branch.has_side_effects);
        assert_eq!(branch.risk_level, RiskLevel::Medium);
        assert!(branch.rationale.contains("communicates outside"));
    }

    #[test]
    fn score_ties_recommend_the_first_branch() {
        // Identical classification profiles and identical necessity.
        let inventory = tools(&[("read_notes", ""), ("view_notes", "")]);
        let tree = Hypothesizer::new().generate(&inventory, "", "notes");
        let first = Hypothesizer::score(&tree.branches[0]);
        let second = Hypothesizer::score(&tree.branches[1]);
        assert!((first - second).abs() < 1e-9);
        assert_eq!(tree.recommended_branch_id.as_deref(), Some("branch-0"));
    }

    #[test]
    fn description_tokens_feed_necessity() {
        // The name alone shares nothing with the intent; the description
        // carries the overlap.
        let inventory = tools(&[("lookup_v2", "fetch the current weather forecast")]);
        let tree = Hypothesizer::new().generate(&inventory, "", "weather forecast");
        assert!((tree.branches[0].necessity_score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn decision_point_names_state_and_intent() {
        let inventory = tools(&[("read_file", "")]);
        let tree = Hypothesizer::new().generate(&inventory, "step 2 of 3", "read the bill");
        assert!(tree.decision_point.contains("read the bill"));
        assert!(tree.decision_point.contains("step 2 of 3"));
        let bare = Hypothesizer::new().generate(&inventory, "  ", "read the bill");
        assert_eq!(bare.decision_point, "read the bill");
    }

    #[test]
    fn irrelevant_tool_scores_at_the_risk_floor() {
        let inventory = tools(&[("transfer_funds", "move money between accounts")]);
        let tree = Hypothesizer::new().generate(&inventory, "", "summarize meeting notes");
        let branch = &tree.branches[0];
        assert_eq!(branch.necessity_score, 0.0);
        // Zero necessity leaves only the medium-risk penalty.
        assert!(Hypothesizer::score(branch) < 0.0);
    }
}
