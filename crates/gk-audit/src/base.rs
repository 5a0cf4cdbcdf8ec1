// base.rs — Base constraint auditor.
//
// Every proposed tool call flows through `audit()`, which checks:
//
// 1. Is the tool whitelisted? → Yes → Allow (whitelist wins over everything)
// 2. Is the tool blacklisted? → Yes → Block with a fixed message
// 3. Is a constraint set attached? → No → allow unless strict mode
// 4. Assert constraints ascending by priority: forbids record violations,
//    allows cancel same-scope violations, confirmation rules raise a flag
// 5. Resolve by mode: permissive never blocks, strict blocks on anything,
//    hybrid blocks on high-priority violations and holds for confirmation
//
// Step 4 carries a subtlety worth reading twice: because allows are
// asserted in priority order like everything else, an allow can cancel a
// forbid of numerically lower (nominally more important) priority when
// the two share scope. That ordering is intentional, relied on by
// downstream policy sets, and pinned by tests — do not "fix" it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use gk_model::{AuditResult, Constraint, ConstraintKind, ConstraintSet, ToolCallInfo};

use crate::config::{AuditMode, AuditorConfig, FeedbackVerbosity};
use crate::stats::AuditStats;

/// Hybrid mode blocks only violations at or below this priority.
const HYBRID_BLOCKING_PRIORITY: i32 = 3;

/// Fixed message for blacklisted tools.
const BLACKLISTED_FEEDBACK: &str = "this tool is blacklisted and can never be called";

/// Message when a matching rule demands confirmation.
const CONFIRMATION_FEEDBACK: &str =
    "this call requires explicit confirmation before it can proceed";

/// A step in the audit evaluation chain (v0.5.2).
///
/// Captures what the auditor checked at each stage so the decision trail
/// is fully observable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditCheck {
    /// Which check was performed (e.g., "whitelist", "constraint:c-1").
    pub check: String,
    /// The outcome of this check.
    pub outcome: String,
    /// Whether this step was the terminal decision point.
    pub terminal: bool,
}

/// Full evaluation trace returned alongside an AuditResult (v0.5.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditTrace {
    /// The final result.
    pub result: AuditResult,
    /// Ordered steps the auditor evaluated.
    pub checks: Vec<AuditCheck>,
    /// Which constraints were consulted (id and priority), in assertion order.
    pub constraints_consulted: Vec<String>,
}

/// The base auditor — evaluates proposed calls against the attached
/// constraint set.
pub struct BaseAuditor {
    config: AuditorConfig,
    constraint_set: Option<ConstraintSet>,
    stats: AuditStats,
}

impl BaseAuditor {
    pub fn new(config: AuditorConfig) -> Self {
        Self {
            config,
            constraint_set: None,
            stats: AuditStats::default(),
        }
    }

    /// Attach the constraint set for a new task.
    ///
    /// Replacing the set starts a fresh task: the audit counters reset
    /// along with it.
    pub fn attach_constraints(&mut self, set: ConstraintSet) {
        self.constraint_set = Some(set);
        self.stats.reset();
    }

    /// Detach the current constraint set, if any.
    pub fn clear_constraints(&mut self) {
        self.constraint_set = None;
    }

    pub fn constraint_set(&self) -> Option<&ConstraintSet> {
        self.constraint_set.as_ref()
    }

    pub fn config(&self) -> &AuditorConfig {
        &self.config
    }

    pub fn stats(&self) -> &AuditStats {
        &self.stats
    }

    /// Zero the audit counters, for reuse between tasks.
    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    pub(crate) fn stats_mut(&mut self) -> &mut AuditStats {
        &mut self.stats
    }

    /// Audit a proposed call: evaluate it and count the outcome.
    pub fn audit(&mut self, call: &ToolCallInfo) -> AuditResult {
        let result = self.evaluate(call);
        self.stats.record(&result);
        result
    }

    /// Evaluate a proposed call without touching the counters.
    pub fn evaluate(&self, call: &ToolCallInfo) -> AuditResult {
        // Step 1: whitelist short-circuit. Checked before the blacklist,
        // so the whitelist wins when both name the same tool.
        if self.config.whitelist.iter().any(|t| t == &call.tool_name) {
            return AuditResult::pass();
        }

        // Step 2: blacklist short-circuit.
        if self.config.blacklist.iter().any(|t| t == &call.tool_name) {
            return AuditResult::block(BLACKLISTED_FEEDBACK);
        }

        // Step 3: no constraint set attached.
        let set = match &self.constraint_set {
            Some(set) => set,
            None => return self.resolve_missing_set(),
        };

        // Steps 4–5: assert constraints, then resolve by mode.
        let (violations, confirmation_needed) = self.assert_constraints(set, call);
        self.resolve(violations, confirmation_needed)
    }

    /// Audit with a full trace: same decision as `audit()`, with every
    /// step recorded (v0.5.2).
    pub fn audit_with_trace(&mut self, call: &ToolCallInfo) -> AuditTrace {
        let trace = self.evaluate_with_trace(call);
        self.stats.record(&trace.result);
        trace
    }

    /// Evaluate with a full trace, without touching the counters (v0.5.2).
    pub fn evaluate_with_trace(&self, call: &ToolCallInfo) -> AuditTrace {
        let mut checks = Vec::new();
        let mut consulted = Vec::new();

        // Step 1: whitelist
        if self.config.whitelist.iter().any(|t| t == &call.tool_name) {
            checks.push(AuditCheck {
                check: "whitelist".to_string(),
                outcome: format!("'{}' is whitelisted", call.tool_name),
                terminal: true,
            });
            return AuditTrace {
                result: AuditResult::pass(),
                checks,
                constraints_consulted: consulted,
            };
        }
        checks.push(AuditCheck {
            check: "whitelist".to_string(),
            outcome: "not listed".to_string(),
            terminal: false,
        });

        // Step 2: blacklist
        if self.config.blacklist.iter().any(|t| t == &call.tool_name) {
            checks.push(AuditCheck {
                check: "blacklist".to_string(),
                outcome: format!("'{}' is blacklisted", call.tool_name),
                terminal: true,
            });
            return AuditTrace {
                result: AuditResult::block(BLACKLISTED_FEEDBACK),
                checks,
                constraints_consulted: consulted,
            };
        }
        checks.push(AuditCheck {
            check: "blacklist".to_string(),
            outcome: "not listed".to_string(),
            terminal: false,
        });

        // Step 3: constraint set presence
        let set = match &self.constraint_set {
            Some(set) => {
                checks.push(AuditCheck {
                    check: "constraint_set".to_string(),
                    outcome: format!("attached: {} constraints", set.constraints.len()),
                    terminal: false,
                });
                set
            }
            None => {
                let result = self.resolve_missing_set();
                checks.push(AuditCheck {
                    check: "constraint_set".to_string(),
                    outcome: if result.allowed {
                        "none attached; mode allows by default".to_string()
                    } else {
                        "none attached; strict mode denies by default".to_string()
                    },
                    terminal: true,
                });
                return AuditTrace {
                    result,
                    checks,
                    constraints_consulted: consulted,
                };
            }
        };

        // Step 4: constraint assertion, recorded per constraint
        let mut ordered: Vec<&Constraint> = set.constraints.iter().collect();
        ordered.sort_by_key(|c| c.priority);
        let mut violations: Vec<Constraint> = Vec::new();
        let mut confirmation_needed = false;
        for constraint in ordered {
            consulted.push(format!("{} (priority {})", constraint.id, constraint.priority));
            if !constraint.condition.applies_to(call) {
                checks.push(AuditCheck {
                    check: format!("constraint:{}", constraint.id),
                    outcome: "not applicable".to_string(),
                    terminal: false,
                });
                continue;
            }
            let outcome = match constraint.kind {
                ConstraintKind::Forbid => {
                    violations.push(constraint.clone());
                    "forbid recorded".to_string()
                }
                ConstraintKind::Allow => {
                    let before = violations.len();
                    violations.retain(|v| !v.condition.shares_scope(&constraint.condition));
                    format!("allow cancelled {} prior violation(s)", before - violations.len())
                }
                ConstraintKind::RequireConfirmation => {
                    confirmation_needed = true;
                    "confirmation flagged".to_string()
                }
            };
            checks.push(AuditCheck {
                check: format!("constraint:{}", constraint.id),
                outcome,
                terminal: false,
            });
        }

        // Step 5: mode resolution
        let result = self.resolve(violations, confirmation_needed);
        checks.push(AuditCheck {
            check: "mode_resolution".to_string(),
            outcome: format!(
                "{} under {} mode",
                if result.allowed { "allowed" } else { "blocked" },
                self.config.mode
            ),
            terminal: true,
        });
        AuditTrace {
            result,
            checks,
            constraints_consulted: consulted,
        }
    }

    /// Mode resolution when no constraint set is attached: strict denies
    /// by default, the other modes allow.
    fn resolve_missing_set(&self) -> AuditResult {
        if self.config.mode == AuditMode::Strict {
            AuditResult::block("no constraint set is attached; strict mode denies by default")
        } else {
            AuditResult::pass()
        }
    }

    /// Walk the constraints ascending by priority, accumulating
    /// violations and applying the allow-override rule.
    ///
    /// The sort is stable, so equal priorities keep declaration order.
    fn assert_constraints(
        &self,
        set: &ConstraintSet,
        call: &ToolCallInfo,
    ) -> (Vec<Constraint>, bool) {
        let mut ordered: Vec<&Constraint> = set.constraints.iter().collect();
        ordered.sort_by_key(|c| c.priority);
        let mut violations: Vec<Constraint> = Vec::new();
        let mut confirmation_needed = false;
        for constraint in ordered {
            if !constraint.condition.applies_to(call) {
                continue;
            }
            match constraint.kind {
                ConstraintKind::Forbid => violations.push(constraint.clone()),
                ConstraintKind::Allow => {
                    // Cancels already-recorded forbids sharing this
                    // allow's scope, whatever their priority. See the
                    // module header before changing this.
                    violations.retain(|v| !v.condition.shares_scope(&constraint.condition));
                }
                ConstraintKind::RequireConfirmation => confirmation_needed = true,
            }
        }
        debug!(
            tool = %call.tool_name,
            violations = violations.len(),
            confirmation_needed,
            "constraints asserted"
        );
        (violations, confirmation_needed)
    }

    /// Resolve accumulated findings into a final result per the mode.
    fn resolve(&self, violations: Vec<Constraint>, confirmation_needed: bool) -> AuditResult {
        match self.config.mode {
            AuditMode::Permissive => {
                let feedback = if violations.is_empty() {
                    None
                } else {
                    Some(self.describe_violations(&violations, true))
                };
                AuditResult {
                    allowed: true,
                    violated_constraints: violations,
                    feedback_message: feedback,
                    require_confirmation: confirmation_needed,
                }
            }
            AuditMode::Strict => {
                if !violations.is_empty() {
                    // A violation block outranks a confirmation demand;
                    // a blocked-for-violations result never claims to be
                    // a confirmation hold.
                    let feedback = self.describe_violations(&violations, false);
                    AuditResult {
                        allowed: false,
                        violated_constraints: violations,
                        feedback_message: Some(feedback),
                        require_confirmation: false,
                    }
                } else if confirmation_needed {
                    AuditResult {
                        allowed: false,
                        violated_constraints: Vec::new(),
                        feedback_message: Some(CONFIRMATION_FEEDBACK.to_string()),
                        require_confirmation: true,
                    }
                } else {
                    AuditResult::pass()
                }
            }
            AuditMode::Hybrid => {
                let blocking = violations
                    .iter()
                    .any(|v| v.priority <= HYBRID_BLOCKING_PRIORITY);
                if blocking {
                    let feedback = self.describe_violations(&violations, false);
                    AuditResult {
                        allowed: false,
                        violated_constraints: violations,
                        feedback_message: Some(feedback),
                        require_confirmation: false,
                    }
                } else if confirmation_needed {
                    AuditResult {
                        allowed: false,
                        violated_constraints: violations,
                        feedback_message: Some(CONFIRMATION_FEEDBACK.to_string()),
                        require_confirmation: true,
                    }
                } else {
                    let feedback = if violations.is_empty() {
                        None
                    } else {
                        Some(self.describe_violations(&violations, true))
                    };
                    AuditResult {
                        allowed: true,
                        violated_constraints: violations,
                        feedback_message: feedback,
                        require_confirmation: false,
                    }
                }
            }
        }
    }

    /// Build planner-facing feedback for a set of violations, honoring
    /// the configured verbosity.
    fn describe_violations(&self, violations: &[Constraint], informational: bool) -> String {
        let lead = if informational {
            format!(
                "{} constraint violation(s) noted (non-blocking)",
                violations.len()
            )
        } else {
            format!("call blocked: {} constraint violation(s)", violations.len())
        };
        match self.config.verbosity {
            FeedbackVerbosity::Minimal => lead,
            FeedbackVerbosity::Detailed | FeedbackVerbosity::Verbose => {
                let mut lines = vec![lead];
                for violation in violations {
                    let mut line = format!("- [{}] {}", violation.id, violation.description);
                    if let Some(message) = &violation.violation_message {
                        line.push_str(": ");
                        line.push_str(message);
                    }
                    lines.push(line);
                }
                if self.config.verbosity == FeedbackVerbosity::Verbose {
                    lines.push(
                        "Consider a different tool or approach that satisfies the constraints above."
                            .to_string(),
                    );
                }
                lines.join("\n")
            }
        }
    }
}

impl Default for BaseAuditor {
    fn default() -> Self {
        Self::new(AuditorConfig::default())
    }
}
