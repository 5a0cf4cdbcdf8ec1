// result.rs — Audit outcomes.
//
// An AuditResult is produced per call and never stored. A blocked result
// is not an error: it is the expected outcome surfaced as feedback text
// for the external planner to act on.

use serde::{Deserialize, Serialize};

use crate::constraint::Constraint;

/// The outcome of auditing one proposed tool call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AuditResult {
    /// Whether the call may proceed.
    pub allowed: bool,
    /// Constraints the call violated. Possibly empty; under permissive
    /// resolution these are informational, not blocking.
    #[serde(default)]
    pub violated_constraints: Vec<Constraint>,
    /// Planner-facing explanation of the decision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_message: Option<String>,
    /// True when this result is a confirmation hold: the call is not in
    /// violation but must wait for explicit sign-off. On an allowed
    /// permissive-mode result the flag is advisory. A result blocked for
    /// violations never carries it; the block outranks the hold.
    #[serde(default)]
    pub require_confirmation: bool,
}

impl AuditResult {
    /// A clean pass with no findings.
    pub fn pass() -> Self {
        Self {
            allowed: true,
            ..Self::default()
        }
    }

    /// A block with planner-facing feedback.
    pub fn block(feedback: impl Into<String>) -> Self {
        Self {
            allowed: false,
            feedback_message: Some(feedback.into()),
            ..Self::default()
        }
    }

    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback_message = Some(feedback.into());
        self
    }

    pub fn with_violations(mut self, violations: Vec<Constraint>) -> Self {
        self.violated_constraints = violations;
        self
    }
}
