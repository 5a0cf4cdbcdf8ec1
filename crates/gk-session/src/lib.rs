//! # gk-session
//!
//! The front door of the Gatekeeper engine. A [`GuardSession`] sits
//! between an agent's decision loop and its tools: the host attaches a
//! task's constraints, routes every proposed call through
//! [`GuardSession::review`], executes only on [`Verdict::Allow`], and
//! reports outcomes back so the shared path cache and the retry
//! controller learn from what actually happened.
//!
//! Constraint sets usually arrive as structured documents from a
//! generation service; [`generated`] parses them strictly and degrades
//! to a conservative default instead of failing the task when a document
//! is malformed.
//!
//! ## Key invariants
//!
//! - **One commit point.** `review` is the only place a verdict is
//!   produced; audit, retry accounting, and exhaustion short-circuits
//!   cannot disagree with each other.
//! - **Attach resets.** Attaching a task replaces the constraint set and
//!   wipes audit statistics and retry budgets; nothing from the previous
//!   task leaks into the next one.
//! - **Degrade closed.** A malformed constraint document yields the
//!   conservative default set, never an unconstrained session.

mod config;
pub mod generated;
mod session;

pub use config::{ConfigError, GuardConfig};
pub use generated::DocumentError;
pub use session::{GuardSession, RankAdvice, Verdict};
