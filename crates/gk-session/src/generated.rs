// generated.rs — Parsing documents from the generation service.
//
// Constraint sets, execution sketches, and candidate rankings arrive as
// structured JSON produced by an external generation service. Only the
// structured fields are trusted; any free text inside a document is
// carried but never evaluated. The strict parsers reject malformed
// documents with a typed error, and each has a lenient twin that
// degrades instead of failing the task: a bad constraint document
// becomes the conservative default set, a bad sketch becomes no sketch,
// a bad ranking becomes no ranking.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use gk_model::{Constraint, ConstraintSet, ExecutionSketch};

/// Validation failures for generation-service documents.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The constraint document was not valid JSON of the expected shape.
    #[error("constraint document rejected: {0}")]
    Constraints(#[source] serde_json::Error),
    /// The constraint document parsed but declared no constraints; an
    /// empty rule set is indistinguishable from a generation failure.
    #[error("constraint document contained no constraints")]
    EmptyConstraints,
    /// The sketch document was not valid JSON of the expected shape.
    #[error("sketch document rejected: {0}")]
    Sketch(#[source] serde_json::Error),
    /// The candidate document was not valid JSON of the expected shape.
    #[error("candidate document rejected: {0}")]
    Candidates(#[source] serde_json::Error),
}

/// One ranked tool candidate from the generation service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RankedCandidate {
    pub tool_name: String,
    #[serde(default)]
    pub rationale: String,
}

#[derive(Debug, Deserialize)]
struct ConstraintDocument {
    constraints: Vec<Constraint>,
    #[serde(default)]
    global_rules: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateDocument {
    candidates: Vec<RankedCandidate>,
}

/// Strictly parse a constraint document for `intent`.
///
/// ```json
/// {
///   "constraints": [
///     {"id": "no-send", "kind": "forbid", "description": "No email",
///      "condition": {"operation": "send"}, "priority": 2}
///   ],
///   "global_rules": ["read-only task"]
/// }
/// ```
pub fn try_parse_constraints(intent: &str, document: &str) -> Result<ConstraintSet, DocumentError> {
    let parsed: ConstraintDocument =
        serde_json::from_str(document).map_err(DocumentError::Constraints)?;
    if parsed.constraints.is_empty() {
        return Err(DocumentError::EmptyConstraints);
    }
    let mut set = ConstraintSet::new(intent);
    set.constraints = parsed.constraints;
    set.global_rules = parsed.global_rules;
    Ok(set)
}

/// Parse a constraint document, degrading to the conservative default
/// set when it fails validation. The session is never left without
/// rules because generation misbehaved.
pub fn parse_constraints_or_default(intent: &str, document: &str) -> ConstraintSet {
    match try_parse_constraints(intent, document) {
        Ok(set) => set,
        Err(error) => {
            warn!(error = %error, "constraint document rejected; using conservative default");
            ConstraintSet::conservative_default(intent)
        }
    }
}

/// Strictly parse an execution-sketch document.
pub fn try_parse_sketch(document: &str) -> Result<ExecutionSketch, DocumentError> {
    serde_json::from_str(document).map_err(DocumentError::Sketch)
}

/// Parse a sketch document, degrading to no sketch when it fails
/// validation; plan-consistency checks simply do not run without one.
pub fn parse_sketch_or_none(document: &str) -> Option<ExecutionSketch> {
    match try_parse_sketch(document) {
        Ok(sketch) => Some(sketch),
        Err(error) => {
            warn!(error = %error, "sketch document rejected; continuing without a sketch");
            None
        }
    }
}

/// Strictly parse a candidate-ranking document.
pub fn try_parse_candidates(document: &str) -> Result<Vec<RankedCandidate>, DocumentError> {
    let parsed: CandidateDocument =
        serde_json::from_str(document).map_err(DocumentError::Candidates)?;
    Ok(parsed.candidates)
}

/// Parse a candidate document, degrading to an empty ranking when it
/// fails validation.
pub fn parse_candidates_or_empty(document: &str) -> Vec<RankedCandidate> {
    match try_parse_candidates(document) {
        Ok(candidates) => candidates,
        Err(error) => {
            warn!(error = %error, "candidate document rejected; continuing without a ranking");
            Vec::new()
        }
    }
}
