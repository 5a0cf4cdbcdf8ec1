//! # gk-model
//!
//! Shared vocabulary for the Gatekeeper policy-audit engine.
//!
//! Every other crate in the workspace speaks in these types: constraints
//! and their predicates, proposed tool calls, audit results, hypothesis
//! branches, verified execution paths, and abstract execution sketches.
//! The keyword classifiers and token heuristics live here too, so the
//! auditors, the hypothesizer, and the path cache measure names and text
//! one way.
//!
//! ## Key invariants
//!
//! - **Fail-closed patterns**: an invalid tool-name or target pattern
//!   never matches anything.
//! - **Deterministic identity**: [`VerifiedPath::derive_id`] depends only
//!   on record content, never on insertion order or wall-clock time.
//! - **One classifier vocabulary**: the operation, risk, and redundancy
//!   tables are defined once in [`classify`] and shared by every consumer.

pub mod call;
pub mod classify;
pub mod constraint;
pub mod hypothesis;
pub mod path;
pub mod result;
pub mod sketch;
pub mod text;

pub use call::{ToolCallInfo, ToolSpec};
pub use classify::{
    assess_risk, classify_redundancy, infer_operation, is_communication_tool, Operation,
    RedundancyLevel, RiskLevel,
};
pub use constraint::{Constraint, ConstraintCondition, ConstraintKind, ConstraintSet, CustomCheck};
pub use hypothesis::{HypothesisBranch, HypothesisTree};
pub use path::{PathOutcome, VerifiedPath};
pub use result::AuditResult;
pub use sketch::{ExecutionSketch, SketchStep};
