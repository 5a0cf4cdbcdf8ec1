// config.rs — Retrieval tunables.

use serde::{Deserialize, Serialize};

/// Minimum Jaccard similarity for a fuzzy key to count as a match.
const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.5;
/// Candidate pool size for plain query retrieval.
const DEFAULT_FUZZY_CANDIDATE_POOL: usize = 5;
/// Widened candidate pool for abstract-step retrieval.
const DEFAULT_ABSTRACT_CANDIDATE_POOL: usize = 10;
/// How many successful paths abstract-step retrieval returns.
const DEFAULT_ABSTRACT_TOP_K: usize = 3;

/// Tunables for fuzzy recall.
///
/// The defaults are long-standing calibration values; downstream
/// confidence in recalled tools is tuned against them, so deployments
/// should change them deliberately, not casually.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecallConfig {
    /// Jaccard similarity floor for fuzzy key matches, in [0, 1].
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    /// How many distinct path ids fuzzy query retrieval collects.
    #[serde(default = "default_fuzzy_candidate_pool")]
    pub fuzzy_candidate_pool: usize,
    /// How many distinct path ids abstract-step retrieval collects
    /// before filtering to successful entries.
    #[serde(default = "default_abstract_candidate_pool")]
    pub abstract_candidate_pool: usize,
    /// How many successful paths abstract-step retrieval returns.
    #[serde(default = "default_abstract_top_k")]
    pub abstract_top_k: usize,
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            fuzzy_candidate_pool: DEFAULT_FUZZY_CANDIDATE_POOL,
            abstract_candidate_pool: DEFAULT_ABSTRACT_CANDIDATE_POOL,
            abstract_top_k: DEFAULT_ABSTRACT_TOP_K,
        }
    }
}

fn default_similarity_threshold() -> f64 {
    DEFAULT_SIMILARITY_THRESHOLD
}

fn default_fuzzy_candidate_pool() -> usize {
    DEFAULT_FUZZY_CANDIDATE_POOL
}

fn default_abstract_candidate_pool() -> usize {
    DEFAULT_ABSTRACT_CANDIDATE_POOL
}

fn default_abstract_top_k() -> usize {
    DEFAULT_ABSTRACT_TOP_K
}
