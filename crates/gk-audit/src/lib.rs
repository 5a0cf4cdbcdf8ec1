//! # gk-audit
//!
//! Constraint auditing for Gatekeeper.
//!
//! The [`BaseAuditor`] evaluates a [`gk_model::ConstraintSet`] against a
//! proposed tool call using allow/forbid/require-confirmation semantics
//! and an audit-mode policy. The [`EnhancedAuditor`] wraps it and adds
//! three heuristic checks — minimum necessity, redundancy, and
//! plan-consistency — that run only when the base evaluation passes.
//!
//! ## Key invariants
//!
//! - **Auditing never fails**: every call produces an [`gk_model::AuditResult`];
//!   a block is an outcome, not an error.
//! - **Whitelist first**: a whitelisted tool passes in every mode, even
//!   when it is also blacklisted.
//! - **Priority orders assertion, not outcome**: constraints are asserted
//!   ascending by priority, and a later-asserted allow can cancel an
//!   earlier forbid that shares its scope.
//! - **One commit point for stats**: each audited call is counted exactly
//!   once, whichever auditor produced the final result.

pub mod base;
pub mod config;
pub mod enhanced;
pub mod stats;

pub use base::{AuditCheck, AuditTrace, BaseAuditor};
pub use config::{AuditMode, AuditorConfig, FeedbackVerbosity};
pub use enhanced::EnhancedAuditor;
pub use stats::AuditStats;
