// path.rs — Verified execution paths.
//
// A VerifiedPath records that a (step → tool) choice was executed and
// how it ended. Identity is a deterministic SHA-256 over the record's
// content, which is what makes de-duplication and cross-process
// export/import stable: the same step and tool always hash to the same
// path id, regardless of when or where the record was created.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::text::normalize;

/// How a recorded execution ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PathOutcome {
    Success,
    Failure,
}

impl std::fmt::Display for PathOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathOutcome::Success => write!(f, "success"),
            PathOutcome::Failure => write!(f, "failure"),
        }
    }
}

/// A previously executed (step → tool) association.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerifiedPath {
    /// Deterministic identity — see [`VerifiedPath::derive_id`].
    pub path_id: String,
    /// The task query this execution served.
    pub source_query: String,
    pub tool_name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
    pub outcome: PathOutcome,
    /// Position within the task's plan, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_index: Option<usize>,
    /// Abstract plan step this execution implemented, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abstract_step_description: Option<String>,
    /// How many times this exact path has been executed.
    pub execution_count: u64,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// When this path was first recorded (v0.6.0).
    pub first_recorded_at: DateTime<Utc>,
    /// When this path was last executed (v0.6.0).
    pub last_executed_at: DateTime<Utc>,
}

impl VerifiedPath {
    /// Create a fresh record with `execution_count = 1`.
    pub fn new(
        source_query: impl Into<String>,
        tool_name: impl Into<String>,
        outcome: PathOutcome,
    ) -> Self {
        let source_query = source_query.into();
        let tool_name = tool_name.into();
        let now = Utc::now();
        Self {
            path_id: Self::derive_id(&source_query, None, None, &tool_name),
            source_query,
            tool_name,
            arguments: Map::new(),
            outcome,
            step_index: None,
            abstract_step_description: None,
            execution_count: 1,
            metadata: Map::new(),
            first_recorded_at: now,
            last_executed_at: now,
        }
    }

    pub fn with_arguments(mut self, arguments: Map<String, Value>) -> Self {
        self.arguments = arguments;
        self
    }

    /// Builder-style step index. Recomputes the path id — identity
    /// depends on it.
    pub fn with_step_index(mut self, step_index: usize) -> Self {
        self.step_index = Some(step_index);
        self.rederive_id();
        self
    }

    /// Builder-style abstract step description. Recomputes the path id —
    /// a described path is identified by (step, tool) instead of
    /// (query, index, tool).
    pub fn with_abstract_step(mut self, description: impl Into<String>) -> Self {
        self.abstract_step_description = Some(description.into());
        self.rederive_id();
        self
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Fold a repeat execution into this record: bump the count, keep
    /// the latest outcome (last write wins), refresh the timestamp.
    pub fn record_repeat(&mut self, outcome: PathOutcome) {
        self.execution_count += 1;
        self.outcome = outcome;
        self.last_executed_at = Utc::now();
    }

    fn rederive_id(&mut self) {
        self.path_id = Self::derive_id(
            &self.source_query,
            self.step_index,
            self.abstract_step_description.as_deref(),
            &self.tool_name,
        );
    }

    /// Deterministic path identity: SHA-256 of the identifying fields,
    /// lowercase hex.
    ///
    /// Paths recorded against an abstract plan step are identified by
    /// (normalized step description, tool) — the same plan step always
    /// folds into one record however the task was phrased. Ad-hoc paths
    /// are identified by (query, step index, tool).
    pub fn derive_id(
        source_query: &str,
        step_index: Option<usize>,
        abstract_step_description: Option<&str>,
        tool_name: &str,
    ) -> String {
        let seed = match abstract_step_description {
            Some(step) => format!("step:{}|tool:{}", normalize(step), tool_name),
            None => {
                let idx = step_index
                    .map(|i| i.to_string())
                    .unwrap_or_else(|| "-".to_string());
                format!("query:{}|idx:{}|tool:{}", source_query, idx, tool_name)
            }
        };
        let mut hasher = Sha256::new();
        hasher.update(seed.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_deterministic() {
        let a = VerifiedPath::derive_id("fetch the bill", Some(0), None, "read_file");
        let b = VerifiedPath::derive_id("fetch the bill", Some(0), None, "read_file");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64); // SHA-256 hex
    }

    #[test]
    fn abstract_step_dominates_identity() {
        // Same step description with different queries → same id.
        let a = VerifiedPath::derive_id("task one", None, Some("read the bill"), "read_file");
        let b = VerifiedPath::derive_id("task two", Some(3), Some("read the bill"), "read_file");
        assert_eq!(a, b);
    }

    #[test]
    fn abstract_step_identity_normalizes_text() {
        let a = VerifiedPath::derive_id("q", None, Some("Read  the Bill"), "read_file");
        let b = VerifiedPath::derive_id("q", None, Some("read the bill"), "read_file");
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_tools_get_distinct_ids() {
        let a = VerifiedPath::derive_id("q", None, Some("read the bill"), "read_file");
        let b = VerifiedPath::derive_id("q", None, Some("read the bill"), "view_file");
        assert_ne!(a, b);
    }

    #[test]
    fn step_index_participates_for_ad_hoc_paths() {
        let a = VerifiedPath::derive_id("fetch the bill", Some(0), None, "read_file");
        let b = VerifiedPath::derive_id("fetch the bill", Some(1), None, "read_file");
        assert_ne!(a, b);
    }

    #[test]
    fn builders_recompute_the_id() {
        let plain = VerifiedPath::new("fetch the bill", "read_file", PathOutcome::Success);
        let indexed = plain.clone().with_step_index(2);
        assert_ne!(plain.path_id, indexed.path_id);
        let described = plain.clone().with_abstract_step("read the bill");
        assert_ne!(plain.path_id, described.path_id);
        assert_eq!(
            described.path_id,
            VerifiedPath::derive_id("anything", None, Some("read the bill"), "read_file")
        );
    }

    #[test]
    fn record_repeat_keeps_latest_outcome() {
        let mut path = VerifiedPath::new("fetch the bill", "read_file", PathOutcome::Success);
        path.record_repeat(PathOutcome::Failure);
        assert_eq!(path.execution_count, 2);
        assert_eq!(path.outcome, PathOutcome::Failure);
    }

    #[test]
    fn serialization_round_trip() {
        let path = VerifiedPath::new("fetch the bill", "read_file", PathOutcome::Success)
            .with_abstract_step("read the bill");
        let json = serde_json::to_string(&path).unwrap();
        let restored: VerifiedPath = serde_json::from_str(&json).unwrap();
        assert_eq!(path, restored);
    }
}
