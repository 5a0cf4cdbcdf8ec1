//! # gk-hypothesis
//!
//! Hypothesis generation for Gatekeeper decision points. Given the tools
//! available at a step, the engine builds one scored branch per tool and
//! recommends the branch with the best safety/usefulness trade-off.
//!
//! The scoring model is deliberately transparent: a weighted sum of the
//! classifier outputs from `gk-model`, with fixed penalty constants that
//! can be read straight out of a branch's rationale. No branch is ever
//! hidden from the caller; a low score is advice, not a veto.
//!
//! ## Key invariants
//!
//! - **Every tool becomes a branch.** Ranking filters nothing; the full
//!   tree goes back to the caller in input order.
//! - **Ties break toward input order.** Equal scores recommend the
//!   earlier branch, so callers can order candidates by preference.
//! - **Advisory only.** The recommendation carries no enforcement
//!   weight; the auditor still reviews whatever the caller picks.

mod engine;

pub use engine::Hypothesizer;
