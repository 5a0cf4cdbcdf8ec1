//! # gk-retry
//!
//! Retry accounting for blocked tool calls. When the auditor refuses a
//! call, the planner gets feedback and may try again; this crate decides
//! how many times, and turns the refusal terminal once the budget is
//! spent. Without it a looping planner can propose the same rejected
//! call forever.
//!
//! ## Key invariants
//!
//! - **Content-addressed identity.** A call is identified by its tool
//!   name plus canonically serialized arguments; argument insertion
//!   order never splits or merges budgets.
//! - **Sticky exhaustion.** Once a call's budget is spent it stays
//!   exhausted until that call succeeds or the controller is reset;
//!   repeated proposals keep getting the terminal answer.
//! - **Success wipes the slate.** A successful execution clears the
//!   call's count entirely, so a later regression starts a fresh budget.

mod controller;

pub use controller::{attempt_key, RetryConfig, RetryController, RetryDisposition};
