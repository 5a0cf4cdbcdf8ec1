// session.rs — The guard session: one review loop per task run.
//
// A GuardSession owns an enhanced auditor and a retry controller, and
// holds a cloneable handle to the path cache it may share with other
// sessions. The host loop is:
//
//   attach_task → (review → execute on Allow → record_*) repeated
//
// review() is the single commit point: the retry pre-check, the audit,
// and the retry accounting all happen inside it, so no caller can see a
// verdict that disagrees with the recorded state.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use gk_audit::{AuditStats, EnhancedAuditor};
use gk_hypothesis::Hypothesizer;
use gk_model::{
    AuditResult, ConstraintSet, ExecutionSketch, HypothesisTree, PathOutcome, ToolCallInfo,
    ToolSpec, VerifiedPath,
};
use gk_recall::{AssistSelection, DisambiguationClient, PathCache, SharedPathCache};
use gk_retry::{RetryController, RetryDisposition};

use crate::config::GuardConfig;
use crate::generated;

/// The disposition of one reviewed call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// The call may execute as proposed.
    Allow { result: AuditResult },
    /// The call is held until explicitly confirmed.
    Confirm { result: AuditResult },
    /// Blocked, with budget left: adjust per the feedback and re-propose.
    Retry { result: AuditResult, attempt: u32 },
    /// Blocked terminally: this exact call must not be proposed again.
    Exhausted { result: AuditResult },
}

impl Verdict {
    /// Whether the call may execute.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allow { .. })
    }

    /// The audit result carried by any verdict.
    pub fn result(&self) -> &AuditResult {
        match self {
            Verdict::Allow { result }
            | Verdict::Confirm { result }
            | Verdict::Retry { result, .. }
            | Verdict::Exhausted { result } => result,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Allow { .. } => write!(f, "allow"),
            Verdict::Confirm { .. } => write!(f, "confirm"),
            Verdict::Retry { .. } => write!(f, "retry"),
            Verdict::Exhausted { .. } => write!(f, "exhausted"),
        }
    }
}

/// Advisory ranking for one decision point: the scored hypothesis tree
/// plus whatever the shared cache already proved for this task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankAdvice {
    pub tree: HypothesisTree,
    /// The most proven successful tool for this task, if the cache
    /// knows one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recalled_tool: Option<String>,
}

/// One guarded task run.
pub struct GuardSession {
    session_id: Uuid,
    config: GuardConfig,
    auditor: EnhancedAuditor,
    controller: RetryController,
    cache: SharedPathCache,
    hypothesizer: Hypothesizer,
}

impl GuardSession {
    /// Create a session with a private path cache.
    pub fn new(config: GuardConfig) -> Self {
        let cache = SharedPathCache::new(PathCache::new(config.recall.clone()));
        Self::with_cache(config, cache)
    }

    /// Create a session over an existing cache handle, so verified paths
    /// learned by other sessions are recalled here too.
    pub fn with_cache(config: GuardConfig, cache: SharedPathCache) -> Self {
        let session_id = Uuid::new_v4();
        info!(
            session_id = %session_id,
            mode = %config.auditor.mode,
            "guard session created"
        );
        Self {
            session_id,
            auditor: EnhancedAuditor::new(config.auditor.clone()),
            controller: RetryController::new(config.retry),
            config,
            cache,
            hypothesizer: Hypothesizer::new(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Read-only access to the underlying auditor, e.g. for traces.
    pub fn auditor(&self) -> &EnhancedAuditor {
        &self.auditor
    }

    pub fn audit_stats(&self) -> &AuditStats {
        self.auditor.stats()
    }

    pub fn constraint_set(&self) -> Option<&ConstraintSet> {
        self.auditor.constraint_set()
    }

    /// A cloneable handle to this session's path cache.
    pub fn cache_handle(&self) -> SharedPathCache {
        self.cache.clone()
    }

    /// Attach a task: replace the constraint set and wipe audit
    /// statistics and retry budgets. Nothing from the previous task
    /// survives into the next one.
    pub fn attach_task(&mut self, constraints: ConstraintSet) {
        info!(
            session_id = %self.session_id,
            intent = %constraints.source_intent,
            constraints = constraints.constraints.len(),
            "task attached"
        );
        self.auditor.attach_constraints(constraints);
        self.controller.reset();
    }

    /// Attach a task from a generation-service constraint document,
    /// degrading to the conservative default set if it is malformed.
    pub fn attach_task_document(&mut self, intent: &str, document: &str) {
        self.attach_task(generated::parse_constraints_or_default(intent, document));
    }

    /// Attach or replace the execution sketch consulted by the
    /// plan-consistency check.
    pub fn attach_sketch(&mut self, sketch: ExecutionSketch) {
        self.auditor.set_sketch(sketch);
    }

    /// Attach a sketch from a generation-service document; a malformed
    /// document leaves the current sketch untouched.
    pub fn attach_sketch_document(&mut self, document: &str) {
        if let Some(sketch) = generated::parse_sketch_or_none(document) {
            self.auditor.set_sketch(sketch);
        }
    }

    /// Declare the tool inventory consulted by the redundancy check and
    /// by [`GuardSession::rank`].
    pub fn set_available_tools(&mut self, tools: Vec<ToolSpec>) {
        self.auditor.set_available_tools(tools);
    }

    /// Review one proposed call and decide its disposition.
    ///
    /// Exhausted calls short-circuit before auditing: once a call's
    /// retry budget is spent, re-proposing it costs nothing and produces
    /// the same terminal answer. Otherwise the enhanced audit runs; an
    /// allowed call passes through, a confirmation hold surfaces as
    /// [`Verdict::Confirm`] without touching the retry budget, and a
    /// violation block is routed through the retry controller to decide
    /// between retry feedback and terminal exhaustion.
    pub fn review(&mut self, call: &ToolCallInfo) -> Verdict {
        if self.controller.is_exhausted(call) {
            debug!(
                session_id = %self.session_id,
                tool = %call.tool_name,
                "short-circuiting exhausted call"
            );
            return Verdict::Exhausted {
                result: AuditResult::block(format!(
                    "'{}' has exhausted its retry budget; do not propose this exact call again",
                    call.tool_name
                )),
            };
        }
        let result = self.auditor.audit(call);
        if result.allowed {
            return Verdict::Allow { result };
        }
        if result.require_confirmation {
            // Awaiting a human is not a policy violation; no budget spent.
            return Verdict::Confirm { result };
        }
        let feedback = result
            .feedback_message
            .clone()
            .unwrap_or_else(|| "call blocked".to_string());
        match self
            .controller
            .on_blocked(call, &feedback, self.config.auditor.verbosity)
        {
            RetryDisposition::Retry { attempt, message } => Verdict::Retry {
                attempt,
                result: AuditResult {
                    feedback_message: Some(message),
                    ..result
                },
            },
            RetryDisposition::Exhausted { message } => Verdict::Exhausted {
                result: AuditResult {
                    feedback_message: Some(message),
                    ..result
                },
            },
        }
    }

    /// Record a successful execution: the call's retry budget clears and
    /// the path folds into the shared cache for later recall.
    pub fn record_success(
        &mut self,
        call: &ToolCallInfo,
        step_index: Option<usize>,
        abstract_step: Option<&str>,
    ) {
        self.controller.on_success(call);
        self.record_path(call, PathOutcome::Success, step_index, abstract_step);
    }

    /// Record a failed execution. Retry budgets are untouched — an
    /// execution failure is not an audit block — but the failure becomes
    /// a verified path so later recall steers away from the tool.
    pub fn record_failure(
        &mut self,
        call: &ToolCallInfo,
        step_index: Option<usize>,
        abstract_step: Option<&str>,
    ) {
        self.record_path(call, PathOutcome::Failure, step_index, abstract_step);
    }

    /// Advisory ranking for a decision point. Advice only: whatever the
    /// caller picks still goes through [`GuardSession::review`].
    pub fn rank(&self, tools: &[ToolSpec], current_state: &str) -> RankAdvice {
        let intent = self.task_intent();
        let tree = self.hypothesizer.generate(tools, current_state, &intent);
        let recalled_tool = self.cache.write(|cache| cache.recommend(&intent, None));
        RankAdvice {
            tree,
            recalled_tool,
        }
    }

    /// Successful verified paths for an abstract plan step, most proven
    /// first.
    pub fn recall_for_step(&self, description: &str) -> Vec<VerifiedPath> {
        self.cache
            .write(|cache| cache.retrieve_by_abstract_step(description))
    }

    /// Resolve an abstract step to one proven tool, delegating ambiguity
    /// between equally plausible candidates to the client.
    pub fn select_tool_for_step(
        &self,
        description: &str,
        client: &dyn DisambiguationClient,
    ) -> Option<AssistSelection> {
        self.cache.write(|cache| {
            let candidates = cache.retrieve_by_abstract_step(description);
            cache.select_with_assist(description, &candidates, client)
        })
    }

    fn task_intent(&self) -> String {
        self.auditor
            .constraint_set()
            .map(|set| set.source_intent.clone())
            .unwrap_or_default()
    }

    fn record_path(
        &mut self,
        call: &ToolCallInfo,
        outcome: PathOutcome,
        step_index: Option<usize>,
        abstract_step: Option<&str>,
    ) {
        let mut path = VerifiedPath::new(self.task_intent(), &call.tool_name, outcome)
            .with_arguments(call.arguments.clone());
        if let Some(index) = step_index {
            path = path.with_step_index(index);
        }
        if let Some(step) = abstract_step {
            path = path.with_abstract_step(step);
        }
        debug!(
            session_id = %self.session_id,
            tool = %call.tool_name,
            outcome = %outcome,
            "recording executed path"
        );
        self.cache.write(|cache| cache.add(path));
    }
}
