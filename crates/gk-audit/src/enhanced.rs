// enhanced.rs — Enhanced auditor: heuristic checks on top of the base.
//
// Three additional checks run only when the base evaluation allows the
// call, in this fixed order, first failure wins:
//
// 1. Minimum necessity — the call must share enough tokens with the
//    stated task intent to plausibly serve it.
// 2. Redundancy — inflated variants of a plainer available tool are
//    refused, naming the alternatives.
// 3. Plan consistency — textual global constraints on the attached
//    execution sketch gate whole operation classes.
//
// The sketch and the available-tools inventory are mutable per-task
// state and can be replaced at any time.

use tracing::debug;

use gk_model::text::{overlap_score, tokenize};
use gk_model::{
    classify_redundancy, is_communication_tool, AuditResult, ConstraintSet, ExecutionSketch,
    Operation, RedundancyLevel, ToolCallInfo, ToolSpec,
};

use crate::base::{AuditCheck, AuditTrace, BaseAuditor};
use crate::config::AuditorConfig;
use crate::stats::AuditStats;

/// How many baseline alternatives a redundancy block names.
const MAX_NAMED_ALTERNATIVES: usize = 3;

/// The enhanced auditor — wraps a [`BaseAuditor`] and layers the
/// heuristic checks over it.
pub struct EnhancedAuditor {
    base: BaseAuditor,
    sketch: Option<ExecutionSketch>,
    available_tools: Vec<ToolSpec>,
}

impl EnhancedAuditor {
    pub fn new(config: AuditorConfig) -> Self {
        Self {
            base: BaseAuditor::new(config),
            sketch: None,
            available_tools: Vec::new(),
        }
    }

    /// Attach the constraint set for a new task (resets the counters).
    pub fn attach_constraints(&mut self, set: ConstraintSet) {
        self.base.attach_constraints(set);
    }

    /// Detach the current constraint set, if any.
    pub fn clear_constraints(&mut self) {
        self.base.clear_constraints();
    }

    pub fn constraint_set(&self) -> Option<&ConstraintSet> {
        self.base.constraint_set()
    }

    /// Replace the attached execution sketch.
    pub fn set_sketch(&mut self, sketch: ExecutionSketch) {
        self.sketch = Some(sketch);
    }

    /// Drop the attached execution sketch.
    pub fn clear_sketch(&mut self) {
        self.sketch = None;
    }

    pub fn sketch(&self) -> Option<&ExecutionSketch> {
        self.sketch.as_ref()
    }

    /// Replace the available-tools inventory used by the redundancy check.
    pub fn set_available_tools(&mut self, tools: Vec<ToolSpec>) {
        self.available_tools = tools;
    }

    pub fn available_tools(&self) -> &[ToolSpec] {
        &self.available_tools
    }

    pub fn config(&self) -> &AuditorConfig {
        self.base.config()
    }

    pub fn stats(&self) -> &AuditStats {
        self.base.stats()
    }

    /// Zero the audit counters, for reuse between tasks.
    pub fn reset_stats(&mut self) {
        self.base.reset_stats();
    }

    /// Audit a proposed call: base evaluation, then the heuristic
    /// checks, counting the final outcome exactly once.
    pub fn audit(&mut self, call: &ToolCallInfo) -> AuditResult {
        let result = self.evaluate(call);
        self.base.stats_mut().record(&result);
        result
    }

    /// Evaluate without touching the counters.
    pub fn evaluate(&self, call: &ToolCallInfo) -> AuditResult {
        let base_result = self.base.evaluate(call);
        if !base_result.allowed {
            return base_result;
        }
        if let Some(blocked) = self.check_necessity(call) {
            return blocked;
        }
        if let Some(blocked) = self.check_redundancy(call) {
            return blocked;
        }
        if let Some(blocked) = self.check_sketch_consistency(call) {
            return blocked;
        }
        base_result
    }

    /// Audit with a full trace: the base trace plus one check record per
    /// heuristic that ran (v0.5.2).
    pub fn audit_with_trace(&mut self, call: &ToolCallInfo) -> AuditTrace {
        let mut trace = self.base.evaluate_with_trace(call);
        if trace.result.allowed {
            // The base's terminal step is no longer terminal; the
            // heuristics get the last word.
            if let Some(last) = trace.checks.last_mut() {
                last.terminal = false;
            }
            let heuristics: [(&str, fn(&Self, &ToolCallInfo) -> Option<AuditResult>); 3] = [
                ("necessity", Self::check_necessity),
                ("redundancy", Self::check_redundancy),
                ("plan_consistency", Self::check_sketch_consistency),
            ];
            for (name, check) in heuristics {
                match check(self, call) {
                    Some(result) => {
                        trace.checks.push(AuditCheck {
                            check: name.to_string(),
                            outcome: result
                                .feedback_message
                                .clone()
                                .unwrap_or_else(|| "blocked".to_string()),
                            terminal: true,
                        });
                        trace.result = result;
                        break;
                    }
                    None => trace.checks.push(AuditCheck {
                        check: name.to_string(),
                        outcome: "passed".to_string(),
                        terminal: false,
                    }),
                }
            }
            if trace.result.allowed {
                if let Some(last) = trace.checks.last_mut() {
                    last.terminal = true;
                }
            }
        }
        self.base.stats_mut().record(&trace.result);
        trace
    }

    /// Check 1: minimum necessity.
    ///
    /// Skipped when no constraint set is attached or its intent is
    /// empty — there is nothing to measure relevance against.
    fn check_necessity(&self, call: &ToolCallInfo) -> Option<AuditResult> {
        let set = self.base.constraint_set()?;
        let intent_tokens = tokenize(&set.source_intent);
        if intent_tokens.is_empty() {
            return None;
        }
        let mut candidate = tokenize(&call.tool_name);
        for text in call.argument_texts() {
            candidate.extend(tokenize(&text));
        }
        let score = overlap_score(&candidate, &intent_tokens);
        let threshold = self.base.config().necessity_threshold();
        if score < threshold {
            debug!(tool = %call.tool_name, score, threshold, "necessity check failed");
            return Some(AuditResult::block(format!(
                "necessity check failed: relevance {:.2} is below the {:.2} threshold for {} mode; the call does not appear to serve the stated task",
                score,
                threshold,
                self.base.config().mode
            )));
        }
        None
    }

    /// Check 2: redundancy.
    fn check_redundancy(&self, call: &ToolCallInfo) -> Option<AuditResult> {
        let names: Vec<&str> = self
            .available_tools
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        let (level, alternatives) = classify_redundancy(&call.tool_name, &names);
        if level != RedundancyLevel::High {
            return None;
        }
        let named: Vec<&str> = alternatives
            .iter()
            .take(MAX_NAMED_ALTERNATIVES)
            .map(String::as_str)
            .collect();
        debug!(tool = %call.tool_name, alternatives = ?named, "redundancy check failed");
        Some(AuditResult::block(format!(
            "redundancy check failed: '{}' duplicates a plainer available tool; prefer {}",
            call.tool_name,
            named.join(", ")
        )))
    }

    /// Check 3: plan consistency against the sketch's global constraints.
    fn check_sketch_consistency(&self, call: &ToolCallInfo) -> Option<AuditResult> {
        let sketch = self.sketch.as_ref()?;
        let operation = call.operation();
        for constraint in &sketch.global_constraints {
            let text = constraint.to_lowercase();
            let read_only = text.contains("no modif") || text.contains("read-only");
            if read_only && matches!(operation, Operation::Write | Operation::Delete) {
                return Some(AuditResult::block(format!(
                    "plan consistency check failed: the plan is read-only ('{}') but '{}' performs a {} operation",
                    constraint, call.tool_name, operation
                )));
            }
            let no_external = text.contains("no external") || text.contains("no communication");
            if no_external
                && (operation == Operation::Send || is_communication_tool(&call.tool_name))
            {
                return Some(AuditResult::block(format!(
                    "plan consistency check failed: the plan forbids external communication ('{}') but '{}' communicates externally",
                    constraint, call.tool_name
                )));
            }
        }
        None
    }
}

impl Default for EnhancedAuditor {
    fn default() -> Self {
        Self::new(AuditorConfig::default())
    }
}
