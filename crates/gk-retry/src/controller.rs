// controller.rs — Bounded retry state for blocked calls.
//
// The controller counts how often each exact call has been blocked and
// turns repeated proposals into terminal refusals. "The same call" means
// the same tool with the same arguments: keys hash the canonically
// serialized argument map, so construction order is irrelevant.
// Exhaustion is sticky until the call succeeds or the controller is
// reset for a new task.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use gk_audit::FeedbackVerbosity;
use gk_model::ToolCallInfo;

/// How many times a blocked call may be re-proposed before the refusal
/// becomes terminal.
const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// Retry budget configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

/// What the planner should do with a call the auditor just blocked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "disposition", rename_all = "snake_case")]
pub enum RetryDisposition {
    /// Budget remains: adjust per the feedback and re-propose.
    Retry { attempt: u32, message: String },
    /// Budget spent: stop proposing this exact call.
    Exhausted { message: String },
}

/// Per-call retry bookkeeping for one session.
#[derive(Debug, Clone, Default)]
pub struct RetryController {
    config: RetryConfig,
    /// Blocked-proposal counts, keyed by call identity hash.
    attempts: HashMap<String, u32>,
}

impl RetryController {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            attempts: HashMap::new(),
        }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// How many times this exact call has been blocked so far.
    pub fn attempts_for(&self, call: &ToolCallInfo) -> u32 {
        self.attempts
            .get(&attempt_key(call))
            .copied()
            .unwrap_or(0)
    }

    /// Whether this exact call has spent its whole retry budget.
    pub fn is_exhausted(&self, call: &ToolCallInfo) -> bool {
        self.attempts_for(call) >= self.config.max_attempts
    }

    /// Register a blocked proposal and decide what the planner may do.
    ///
    /// While budget remains, the feedback comes back as retry guidance
    /// (annotated with the attempt counter at `Detailed` verbosity and
    /// above). Once the budget is spent the disposition is terminal and
    /// stays terminal for every further proposal of the same call.
    pub fn on_blocked(
        &mut self,
        call: &ToolCallInfo,
        feedback: &str,
        verbosity: FeedbackVerbosity,
    ) -> RetryDisposition {
        let seen = self.attempts.entry(attempt_key(call)).or_insert(0);
        if *seen < self.config.max_attempts {
            *seen += 1;
            let attempt = *seen;
            debug!(
                tool = %call.tool_name,
                attempt,
                max = self.config.max_attempts,
                "blocked call may retry"
            );
            let message = if verbosity >= FeedbackVerbosity::Detailed {
                format!(
                    "{feedback} (attempt {attempt} of {})",
                    self.config.max_attempts
                )
            } else {
                feedback.to_string()
            };
            RetryDisposition::Retry { attempt, message }
        } else {
            warn!(tool = %call.tool_name, "retry budget exhausted");
            RetryDisposition::Exhausted {
                message: format!(
                    "{feedback}; maximum attempts reached, do not propose this call again"
                ),
            }
        }
    }

    /// A call executed successfully: its retry slate wipes clean.
    pub fn on_success(&mut self, call: &ToolCallInfo) {
        self.attempts.remove(&attempt_key(call));
    }

    /// Drop all retry state, e.g. when a new task is attached.
    pub fn reset(&mut self) {
        self.attempts.clear();
    }

    /// How many distinct calls currently carry retry state.
    pub fn tracked(&self) -> usize {
        self.attempts.len()
    }
}

/// Identity key for retry bookkeeping: SHA-256 over the tool name and
/// the canonically serialized argument map, lowercase hex.
///
/// `serde_json::Map` keeps keys sorted, so the same logical call always
/// hashes the same regardless of how its arguments were assembled.
pub fn attempt_key(call: &ToolCallInfo) -> String {
    let arguments = serde_json::to_string(&call.arguments).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(call.tool_name.as_bytes());
    hasher.update(b"|");
    hasher.update(arguments.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call() -> ToolCallInfo {
        ToolCallInfo::new("send_email").with_arg("recipient", "team@example.com")
    }

    #[test]
    fn budget_runs_retry_retry_terminal() {
        let mut controller = RetryController::new(RetryConfig { max_attempts: 2 });
        let call = call();
        match controller.on_blocked(&call, "blocked", FeedbackVerbosity::Detailed) {
            RetryDisposition::Retry { attempt: 1, .. } => {}
            other => panic!("expected first retry, got {other:?}"),
        }
        match controller.on_blocked(&call, "blocked", FeedbackVerbosity::Detailed) {
            RetryDisposition::Retry { attempt: 2, .. } => {}
            other => panic!("expected second retry, got {other:?}"),
        }
        match controller.on_blocked(&call, "blocked", FeedbackVerbosity::Detailed) {
            RetryDisposition::Exhausted { message } => {
                assert!(message.contains("maximum attempts reached"));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[test]
    fn exhaustion_is_sticky() {
        let mut controller = RetryController::new(RetryConfig { max_attempts: 1 });
        let call = call();
        controller.on_blocked(&call, "blocked", FeedbackVerbosity::Minimal);
        for _ in 0..3 {
            assert!(matches!(
                controller.on_blocked(&call, "blocked", FeedbackVerbosity::Minimal),
                RetryDisposition::Exhausted { .. }
            ));
        }
        assert!(controller.is_exhausted(&call));
    }

    #[test]
    fn is_exhausted_flips_after_the_final_retry() {
        let mut controller = RetryController::new(RetryConfig { max_attempts: 2 });
        let call = call();
        assert!(!controller.is_exhausted(&call));
        controller.on_blocked(&call, "blocked", FeedbackVerbosity::Minimal);
        assert!(!controller.is_exhausted(&call));
        controller.on_blocked(&call, "blocked", FeedbackVerbosity::Minimal);
        // Budget fully spent: any further proposal is terminal.
        assert!(controller.is_exhausted(&call));
    }

    #[test]
    fn detailed_feedback_carries_the_attempt_counter() {
        let mut controller = RetryController::new(RetryConfig { max_attempts: 3 });
        match controller.on_blocked(&call(), "not allowed", FeedbackVerbosity::Detailed) {
            RetryDisposition::Retry { message, .. } => {
                assert!(message.contains("not allowed"));
                assert!(message.contains("(attempt 1 of 3)"));
            }
            other => panic!("expected retry, got {other:?}"),
        }
    }

    #[test]
    fn minimal_feedback_omits_the_counter() {
        let mut controller = RetryController::default();
        match controller.on_blocked(&call(), "not allowed", FeedbackVerbosity::Minimal) {
            RetryDisposition::Retry { message, .. } => {
                assert_eq!(message, "not allowed");
            }
            other => panic!("expected retry, got {other:?}"),
        }
    }

    #[test]
    fn success_clears_the_count() {
        let mut controller = RetryController::new(RetryConfig { max_attempts: 2 });
        let call = call();
        controller.on_blocked(&call, "blocked", FeedbackVerbosity::Minimal);
        controller.on_blocked(&call, "blocked", FeedbackVerbosity::Minimal);
        assert!(controller.is_exhausted(&call));
        controller.on_success(&call);
        assert!(!controller.is_exhausted(&call));
        assert_eq!(controller.attempts_for(&call), 0);
        // The budget starts over.
        assert!(matches!(
            controller.on_blocked(&call, "blocked", FeedbackVerbosity::Minimal),
            RetryDisposition::Retry { attempt: 1, .. }
        ));
    }

    #[test]
    fn different_arguments_are_different_calls() {
        let mut controller = RetryController::new(RetryConfig { max_attempts: 1 });
        let first = ToolCallInfo::new("send_email").with_arg("recipient", "a@example.com");
        let second = ToolCallInfo::new("send_email").with_arg("recipient", "b@example.com");
        controller.on_blocked(&first, "blocked", FeedbackVerbosity::Minimal);
        assert!(controller.is_exhausted(&first));
        assert!(!controller.is_exhausted(&second));
        assert_eq!(controller.tracked(), 1);
    }

    #[test]
    fn argument_order_does_not_split_the_budget() {
        let forward = ToolCallInfo::new("write_file")
            .with_arg("path", "out.txt")
            .with_arg("content", "hello");
        let backward = ToolCallInfo::new("write_file")
            .with_arg("content", "hello")
            .with_arg("path", "out.txt");
        assert_eq!(attempt_key(&forward), attempt_key(&backward));
    }

    #[test]
    fn reset_drops_every_budget() {
        let mut controller = RetryController::new(RetryConfig { max_attempts: 1 });
        let call = call();
        controller.on_blocked(&call, "blocked", FeedbackVerbosity::Minimal);
        controller.reset();
        assert!(!controller.is_exhausted(&call));
        assert_eq!(controller.tracked(), 0);
    }

    #[test]
    fn disposition_serializes_with_a_tag() {
        let disposition = RetryDisposition::Exhausted {
            message: "stop".to_string(),
        };
        let json = serde_json::to_string(&disposition).unwrap();
        assert!(json.contains(r#""disposition":"exhausted""#));
        let restored: RetryDisposition = serde_json::from_str(&json).unwrap();
        assert_eq!(disposition, restored);
    }

    #[test]
    fn config_fills_from_defaults() {
        let config: RetryConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.max_attempts, DEFAULT_MAX_ATTEMPTS);
    }
}
