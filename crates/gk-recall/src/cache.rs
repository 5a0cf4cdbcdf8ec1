// cache.rs — The verified-path store and its retrieval logic.
//
// Three indices hang off one record store: plain query, (query, step
// index), and normalized abstract step description. An exact index hit
// wins outright; otherwise cached keys are ranked by Jaccard similarity
// and the surviving records re-sorted by execution count, so the most
// proven path always surfaces first. Every map is ordered, which keeps
// tie-breaking and exports deterministic across processes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use gk_model::text::{jaccard_similarity, normalize};
use gk_model::{PathOutcome, VerifiedPath};

use crate::assist::{AssistRequest, AssistSelection, CandidateSummary, DisambiguationClient};
use crate::config::RecallConfig;

/// Recall counters. An explicit value object: owned by the cache,
/// inspected through [`PathCache::stats`], reset by [`PathCache::clear`].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheStats {
    /// New records inserted.
    pub adds: u64,
    /// Re-adds folded into an existing record.
    pub updates: u64,
    pub exact_hits: u64,
    pub fuzzy_hits: u64,
    pub misses: u64,
    /// Ambiguity decisions delegated to a disambiguation client.
    pub assist_delegations: u64,
    /// Delegations that fell back to the deterministic choice.
    pub assist_fallbacks: u64,
}

/// A flat, lossless image of the cache: every record plus the counters.
/// Indices are derived state and are never exported; import rebuilds
/// them from the records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheSnapshot {
    pub paths: Vec<VerifiedPath>,
    #[serde(default)]
    pub stats: CacheStats,
}

/// In-memory verified-path store with exact and fuzzy retrieval.
#[derive(Debug, Clone)]
pub struct PathCache {
    config: RecallConfig,
    /// Every record, keyed by deterministic path id.
    paths: BTreeMap<String, VerifiedPath>,
    /// `source_query` → path ids, in insertion order.
    query_index: BTreeMap<String, Vec<String>>,
    /// `(source_query, step_index)` → path ids.
    step_index: BTreeMap<(String, usize), Vec<String>>,
    /// Normalized abstract step description → path ids.
    abstract_index: BTreeMap<String, Vec<String>>,
    stats: CacheStats,
}

impl PathCache {
    pub fn new(config: RecallConfig) -> Self {
        Self {
            config,
            paths: BTreeMap::new(),
            query_index: BTreeMap::new(),
            step_index: BTreeMap::new(),
            abstract_index: BTreeMap::new(),
            stats: CacheStats::default(),
        }
    }

    pub fn config(&self) -> &RecallConfig {
        &self.config
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Number of distinct path records.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn get(&self, path_id: &str) -> Option<&VerifiedPath> {
        self.paths.get(path_id)
    }

    /// Record an execution.
    ///
    /// A path id seen before folds into the existing record: the count
    /// goes up by one, the latest outcome wins, and the indices stay
    /// untouched — they were built on first insert and identity has not
    /// changed. A fresh id is indexed under every key it carries.
    pub fn add(&mut self, path: VerifiedPath) {
        match self.paths.get_mut(&path.path_id) {
            Some(existing) => {
                if existing.outcome != path.outcome {
                    info!(
                        path_id = %existing.path_id,
                        tool = %existing.tool_name,
                        from = %existing.outcome,
                        to = %path.outcome,
                        "verified path outcome flipped"
                    );
                }
                existing.record_repeat(path.outcome);
                self.stats.updates += 1;
            }
            None => {
                self.index(&path);
                self.stats.adds += 1;
                debug!(path_id = %path.path_id, tool = %path.tool_name, "verified path recorded");
                self.paths.insert(path.path_id.clone(), path);
            }
        }
    }

    /// Recall the paths recorded for a query, most proven first.
    ///
    /// With a step index, the (query, step) index is consulted; without
    /// one, the plain query index. On an exact miss the plain query keys
    /// are ranked by Jaccard similarity instead. A miss is an empty
    /// vector, never an error.
    pub fn retrieve(&mut self, query: &str, step_index: Option<usize>) -> Vec<VerifiedPath> {
        let exact = match step_index {
            Some(index) => self.step_index.get(&(query.to_string(), index)),
            None => self.query_index.get(query),
        };
        if let Some(ids) = exact {
            let ids = ids.clone();
            self.stats.exact_hits += 1;
            return self.resolve_by_count(&ids);
        }
        let ids = fuzzy_ids(
            query,
            &self.query_index,
            self.config.similarity_threshold,
            self.config.fuzzy_candidate_pool,
        );
        if ids.is_empty() {
            self.stats.misses += 1;
            debug!(query, "no verified paths recalled");
            return Vec::new();
        }
        self.stats.fuzzy_hits += 1;
        self.resolve_by_count(&ids)
    }

    /// The single most proven tool for a query: the successful recalled
    /// path with the highest execution count, if any.
    pub fn recommend(&mut self, query: &str, step_index: Option<usize>) -> Option<String> {
        self.retrieve(query, step_index)
            .into_iter()
            .find(|path| path.outcome == PathOutcome::Success)
            .map(|path| path.tool_name)
    }

    /// Recall successful paths for an abstract plan step.
    ///
    /// Same exact-then-fuzzy shape as [`PathCache::retrieve`], but
    /// against the abstract-step index with the widened candidate pool,
    /// filtered to successful entries, and truncated to the configured
    /// top-k.
    pub fn retrieve_by_abstract_step(&mut self, description: &str) -> Vec<VerifiedPath> {
        let key = normalize(description);
        let ids = match self.abstract_index.get(&key) {
            Some(exact) => {
                let ids = exact.clone();
                self.stats.exact_hits += 1;
                ids
            }
            None => {
                let ids = fuzzy_ids(
                    &key,
                    &self.abstract_index,
                    self.config.similarity_threshold,
                    self.config.abstract_candidate_pool,
                );
                if ids.is_empty() {
                    self.stats.misses += 1;
                    debug!(step = description, "no verified paths recalled for step");
                    return Vec::new();
                }
                self.stats.fuzzy_hits += 1;
                ids
            }
        };
        let mut paths = self.resolve_by_count(&ids);
        paths.retain(|path| path.outcome == PathOutcome::Success);
        paths.truncate(self.config.abstract_top_k);
        paths
    }

    /// Choose between ambiguous candidates for an abstract step.
    ///
    /// Zero candidates selects nothing and one candidate is returned
    /// directly; two or more are delegated to the client. A selection
    /// naming a tool outside the candidate list, or any client error,
    /// falls back to the candidate with the highest execution count
    /// (first on ties) with a rationale naming the reason.
    pub fn select_with_assist(
        &mut self,
        description: &str,
        candidates: &[VerifiedPath],
        client: &dyn DisambiguationClient,
    ) -> Option<AssistSelection> {
        match candidates {
            [] => None,
            [only] => Some(AssistSelection {
                selected_tool_name: only.tool_name.clone(),
                rationale: format!(
                    "only one verified path fits '{description}'; no disambiguation needed"
                ),
            }),
            _ => {
                let request = AssistRequest {
                    step_description: description.to_string(),
                    candidates: candidates
                        .iter()
                        .map(|path| CandidateSummary {
                            tool_name: path.tool_name.clone(),
                            execution_count: path.execution_count,
                            prior_step_description: path
                                .abstract_step_description
                                .clone()
                                .unwrap_or_else(|| path.source_query.clone()),
                        })
                        .collect(),
                };
                self.stats.assist_delegations += 1;
                match client.disambiguate(&request) {
                    Ok(selection)
                        if candidates
                            .iter()
                            .any(|path| path.tool_name == selection.selected_tool_name) =>
                    {
                        Some(selection)
                    }
                    Ok(selection) => {
                        warn!(
                            selected = %selection.selected_tool_name,
                            "disambiguation picked a tool outside the candidate list"
                        );
                        self.fallback_selection(candidates, "selection was not a candidate")
                    }
                    Err(error) => {
                        warn!(error = %error, "disambiguation unavailable");
                        self.fallback_selection(candidates, "collaborator unavailable")
                    }
                }
            }
        }
    }

    /// Export every record plus the counters.
    pub fn export(&self) -> CacheSnapshot {
        CacheSnapshot {
            paths: self.paths.values().cloned().collect(),
            stats: self.stats,
        }
    }

    /// Replace the cache contents with a snapshot, rebuilding every
    /// index from the records. Duplicate path ids in the snapshot keep
    /// their first occurrence.
    pub fn import(&mut self, snapshot: CacheSnapshot) {
        self.paths.clear();
        self.query_index.clear();
        self.step_index.clear();
        self.abstract_index.clear();
        for path in snapshot.paths {
            if self.paths.contains_key(&path.path_id) {
                continue;
            }
            self.index(&path);
            self.paths.insert(path.path_id.clone(), path);
        }
        self.stats = snapshot.stats;
        info!(paths = self.paths.len(), "path cache imported");
    }

    /// Drop every record, index, and counter.
    pub fn clear(&mut self) {
        self.paths.clear();
        self.query_index.clear();
        self.step_index.clear();
        self.abstract_index.clear();
        self.stats = CacheStats::default();
    }

    fn index(&mut self, path: &VerifiedPath) {
        self.query_index
            .entry(path.source_query.clone())
            .or_default()
            .push(path.path_id.clone());
        if let Some(step) = path.step_index {
            self.step_index
                .entry((path.source_query.clone(), step))
                .or_default()
                .push(path.path_id.clone());
        }
        if let Some(description) = &path.abstract_step_description {
            self.abstract_index
                .entry(normalize(description))
                .or_default()
                .push(path.path_id.clone());
        }
    }

    /// Resolve ids to owned records, re-sorted by execution count
    /// descending. The sort is stable: equal counts keep retrieval
    /// order.
    fn resolve_by_count(&self, ids: &[String]) -> Vec<VerifiedPath> {
        let mut paths: Vec<VerifiedPath> = ids
            .iter()
            .filter_map(|id| self.paths.get(id).cloned())
            .collect();
        paths.sort_by(|a, b| b.execution_count.cmp(&a.execution_count));
        paths
    }

    /// Deterministic stand-in for a failed delegation: highest execution
    /// count wins, first candidate on ties.
    fn fallback_selection(
        &mut self,
        candidates: &[VerifiedPath],
        reason: &str,
    ) -> Option<AssistSelection> {
        self.stats.assist_fallbacks += 1;
        let mut best: Option<&VerifiedPath> = None;
        for candidate in candidates {
            match best {
                Some(leading) if candidate.execution_count <= leading.execution_count => {}
                _ => best = Some(candidate),
            }
        }
        best.map(|chosen| AssistSelection {
            selected_tool_name: chosen.tool_name.clone(),
            rationale: format!(
                "fallback ({reason}): '{}' has the highest execution count ({})",
                chosen.tool_name, chosen.execution_count
            ),
        })
    }
}

impl Default for PathCache {
    fn default() -> Self {
        Self::new(RecallConfig::default())
    }
}

/// Collect up to `pool` distinct path ids from an index, ranked by
/// Jaccard similarity between the query and each key. Keys below the
/// threshold are dropped. Equal similarities resolve in lexicographic
/// key order, which keeps retrieval stable across processes and across
/// export/import.
fn fuzzy_ids(
    query: &str,
    index: &BTreeMap<String, Vec<String>>,
    threshold: f64,
    pool: usize,
) -> Vec<String> {
    let mut scored: Vec<(f64, &str)> = index
        .keys()
        .map(|key| (jaccard_similarity(query, key), key.as_str()))
        .filter(|(similarity, _)| *similarity >= threshold)
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    let mut ids: Vec<String> = Vec::new();
    'keys: for (_, key) in scored {
        let Some(key_ids) = index.get(key) else {
            continue;
        };
        for id in key_ids {
            if ids.len() >= pool {
                break 'keys;
            }
            if !ids.iter().any(|existing| existing == id) {
                ids.push(id.clone());
            }
        }
    }
    ids
}
