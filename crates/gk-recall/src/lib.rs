//! # gk-recall
//!
//! The verified-path cache: Gatekeeper's memory of which (step → tool)
//! choices actually worked. Sessions record executions as
//! [`VerifiedPath`](gk_model::VerifiedPath) entries; later tasks retrieve
//! them by exact key or fuzzy similarity and get back proven tools before
//! spending a single speculative call.
//!
//! Retrieval is two-stage: an exact index hit wins outright, otherwise
//! cached keys are ranked by Jaccard similarity over whitespace tokens
//! and the survivors re-sorted by execution count. When several cached
//! paths fit one abstract plan step equally well, an optional
//! [`DisambiguationClient`] picks between them; every client failure
//! falls back to a deterministic highest-count choice.
//!
//! ## Key invariants
//!
//! - **Retrieval never fails.** A miss is an empty result, a broken
//!   disambiguation client is a fallback selection; no error reaches the
//!   decision loop.
//! - **One record per path id.** Re-adding an existing path folds into
//!   the record (count up, last outcome wins) and never duplicates it.
//! - **Deterministic order.** Indices iterate in sorted key order, so
//!   equal-similarity ties and exported snapshots are stable across
//!   processes.
//! - **Lossless snapshots.** `import(export())` reproduces retrieval
//!   behavior exactly; indices are derived state and are always rebuilt.

mod assist;
mod cache;
mod config;
mod shared;

pub use assist::{
    AssistError, AssistRequest, AssistSelection, CandidateSummary, DisambiguationClient,
};
pub use cache::{CacheSnapshot, CacheStats, PathCache};
pub use config::RecallConfig;
pub use shared::SharedPathCache;
