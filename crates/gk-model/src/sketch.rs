// sketch.rs — Abstract execution sketches.
//
// A sketch is an externally generated plan: an ordered list of abstract
// steps with allowed/forbidden operation tags, plus global textual
// constraints. The engine consumes sketches for plan-consistency checks
// and step-level recall; it never produces or edits them.

use serde::{Deserialize, Serialize};

use crate::classify::Operation;

/// One abstract step of an externally generated plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SketchStep {
    /// What this step is supposed to accomplish.
    pub description: String,
    #[serde(default)]
    pub allowed_operations: Vec<Operation>,
    #[serde(default)]
    pub forbidden_operations: Vec<Operation>,
}

impl SketchStep {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            allowed_operations: Vec::new(),
            forbidden_operations: Vec::new(),
        }
    }
}

/// An externally generated, ordered plan with global textual rules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ExecutionSketch {
    /// The overall objective, in the generator's words.
    pub objective: String,
    #[serde(default)]
    pub steps: Vec<SketchStep>,
    /// Free-text constraints that apply to every step, e.g.
    /// "read-only: no modifications to user data".
    #[serde(default)]
    pub global_constraints: Vec<String>,
}

impl ExecutionSketch {
    pub fn new(objective: impl Into<String>) -> Self {
        Self {
            objective: objective.into(),
            steps: Vec::new(),
            global_constraints: Vec::new(),
        }
    }

    pub fn with_step(mut self, step: SketchStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_global_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.global_constraints.push(constraint.into());
        self
    }
}
