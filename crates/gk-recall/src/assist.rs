// assist.rs — External disambiguation seam.
//
// When several verified paths fit one abstract step equally well, the
// cache can delegate the choice to an outside collaborator (in practice
// an LLM behind an adapter). The trait keeps that collaborator at arm's
// length: the cache hands over plain data, gets back a plain selection,
// and treats every failure as a cue to fall back on execution counts.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ways a disambiguation client can fail. Every variant takes the same
/// deterministic fallback path inside the cache; none of them propagate
/// out to the decision loop.
#[derive(Debug, Error)]
pub enum AssistError {
    #[error("disambiguation service unavailable: {reason}")]
    Unavailable { reason: String },
    #[error("disambiguation timed out after {seconds}s")]
    Timeout { seconds: u64 },
    #[error("disambiguation response was not parseable: {reason}")]
    Unparseable { reason: String },
}

pub type Result<T> = std::result::Result<T, AssistError>;

/// One ambiguous candidate, summarized for the collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CandidateSummary {
    pub tool_name: String,
    /// How many times this path has been executed.
    pub execution_count: u64,
    /// The step this candidate previously served.
    pub prior_step_description: String,
}

/// A disambiguation request: the step being planned plus the ambiguous
/// candidates, in retrieval order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssistRequest {
    pub step_description: String,
    pub candidates: Vec<CandidateSummary>,
}

/// A collaborator's pick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssistSelection {
    /// Must name one of the offered candidates; anything else is treated
    /// as a failed selection.
    pub selected_tool_name: String,
    pub rationale: String,
}

/// External collaborator that chooses between ambiguous candidates.
///
/// Implementations are expected to be slow and fallible. Callers bound
/// them with their own timeout and must never let an error escape the
/// retrieval path; the cache already does both.
pub trait DisambiguationClient: Send + Sync {
    fn disambiguate(&self, request: &AssistRequest) -> Result<AssistSelection>;
}
