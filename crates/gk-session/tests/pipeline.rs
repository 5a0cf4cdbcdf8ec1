// pipeline.rs — End-to-end integration test for the full guard loop.
//
// The main test exercises the complete Gatekeeper flow:
//
//   1. Load session config from YAML
//   2. Attach task constraints from a generation-service document
//   3. Attach an execution sketch with a read-only global rule
//   4. Review a compliant read → Allow
//   5. Record the success → the shared path cache learns it
//   6. Review an out-of-scope read → Retry with corrective feedback
//   7. Re-propose the same call → second Retry, then sticky Exhausted
//   8. Verify the exhausted re-proposal never reaches the auditor
//   9. Review a write → blocked by the read-only plan rule
//  10. A second session on the same cache recalls the proven tool
//  11. Abstract-step recall and single-candidate selection work
//
// VERIFY:
//   - Verdicts are correct at every step
//   - Retry feedback carries the violation message and attempt counter
//   - Exhaustion is terminal per exact call, not per tool
//   - Verified paths cross session boundaries through the shared cache

use gk_model::{ConstraintSet, ToolCallInfo, ToolSpec};
use gk_recall::{AssistError, AssistRequest, AssistSelection, DisambiguationClient, PathCache};
use gk_session::{GuardConfig, GuardSession, Verdict};

const SESSION_CONFIG: &str = r#"
auditor:
  mode: hybrid
  verbosity: detailed
retry:
  max_attempts: 2
"#;

const BILL_TASK_CONSTRAINTS: &str = r#"{
    "constraints": [
        {
            "id": "allow-bill",
            "kind": "allow",
            "description": "The bill file itself may be read",
            "condition": {"operation": "read", "target": "bill.txt"},
            "priority": 3
        },
        {
            "id": "reads-are-scoped",
            "kind": "forbid",
            "description": "No reads outside the bill file",
            "condition": {"operation": "read"},
            "priority": 2,
            "violation_message": "only bill.txt may be read in this task"
        }
    ],
    "global_rules": ["stay within the billing task"]
}"#;

const BILL_TASK_SKETCH: &str = r#"{
    "objective": "read the bill file and report what it says",
    "steps": [{"description": "read the bill"}],
    "global_constraints": ["read-only: no modifications"]
}"#;

/// A disambiguation collaborator that must never be consulted.
struct NeverConsulted;

impl DisambiguationClient for NeverConsulted {
    fn disambiguate(&self, request: &AssistRequest) -> Result<AssistSelection, AssistError> {
        panic!(
            "disambiguation requested for '{}' with one candidate",
            request.step_description
        );
    }
}

fn inventory() -> Vec<ToolSpec> {
    vec![
        ToolSpec::new("read_file", "read a file from disk"),
        ToolSpec::new("update_bill_file", "update the bill file"),
    ]
}

#[test]
fn full_guard_pipeline_from_config_to_recall() {
    // =========================================================
    // STEP 1: Load session config from YAML
    // =========================================================

    let config = GuardConfig::from_yaml_str(SESSION_CONFIG).unwrap();
    assert_eq!(config.retry.max_attempts, 2);

    let mut session = GuardSession::new(config.clone());

    // =========================================================
    // STEP 2+3: Attach task constraints and the execution sketch
    // =========================================================

    session.attach_task_document("read the bill file", BILL_TASK_CONSTRAINTS);
    session.attach_sketch_document(BILL_TASK_SKETCH);
    session.set_available_tools(inventory());

    let set = session.constraint_set().unwrap();
    assert_eq!(set.constraints.len(), 2);
    assert_eq!(set.global_rules, vec!["stay within the billing task".to_string()]);

    // =========================================================
    // STEP 4: A compliant read is allowed
    // =========================================================

    let bill_read = ToolCallInfo::new("read_file").with_arg("path", "bill.txt");
    let verdict = session.review(&bill_read);
    assert!(verdict.is_allowed(), "expected allow, got {verdict}");

    // =========================================================
    // STEP 5: Record the success so the cache learns the path
    // =========================================================

    session.record_success(&bill_read, Some(0), Some("read the bill"));

    // =========================================================
    // STEP 6: An out-of-scope read gets corrective feedback
    // =========================================================

    let stray_read = ToolCallInfo::new("read_file").with_arg("path", "other.txt");
    match session.review(&stray_read) {
        Verdict::Retry { attempt, result } => {
            assert_eq!(attempt, 1);
            let feedback = result.feedback_message.unwrap();
            assert!(
                feedback.contains("only bill.txt may be read in this task"),
                "feedback should carry the violation message, got: {feedback}"
            );
            assert!(feedback.contains("(attempt 1 of 2)"));
        }
        other => panic!("expected first retry, got {other:?}"),
    }

    // =========================================================
    // STEP 7: The budget runs out on the identical re-proposal
    // =========================================================

    match session.review(&stray_read) {
        Verdict::Retry { attempt: 2, result } => {
            assert!(result.feedback_message.unwrap().contains("(attempt 2 of 2)"));
        }
        other => panic!("expected second retry, got {other:?}"),
    }

    // =========================================================
    // STEP 8: Exhaustion short-circuits before the auditor runs
    // =========================================================

    let audits_before = session.audit_stats().total;
    match session.review(&stray_read) {
        Verdict::Exhausted { result } => {
            assert!(result
                .feedback_message
                .unwrap()
                .contains("do not propose this exact call again"));
        }
        other => panic!("expected exhaustion, got {other:?}"),
    }
    assert_eq!(
        session.audit_stats().total,
        audits_before,
        "an exhausted call must not be re-audited"
    );

    // Exhaustion is per exact call: the compliant read still passes.
    assert!(session.review(&bill_read).is_allowed());

    // =========================================================
    // STEP 9: The read-only plan rule blocks a write
    // =========================================================

    let write = ToolCallInfo::new("update_bill_file").with_arg("path", "bill.txt");
    match session.review(&write) {
        Verdict::Retry { attempt: 1, result } => {
            let feedback = result.feedback_message.unwrap();
            assert!(
                feedback.contains("plan consistency check failed"),
                "expected the sketch rule to block, got: {feedback}"
            );
            assert!(feedback.contains("read-only"));
        }
        other => panic!("expected a plan-consistency retry, got {other:?}"),
    }

    // =========================================================
    // STEP 10: A second session on the shared cache recalls the tool
    // =========================================================

    let mut second = GuardSession::with_cache(config, session.cache_handle());
    second.attach_task(ConstraintSet::new("read the bill file"));
    second.set_available_tools(inventory());

    let advice = second.rank(&inventory(), "after setup");
    assert_eq!(advice.tree.branches.len(), 2);
    assert_eq!(
        advice.recalled_tool.as_deref(),
        Some("read_file"),
        "the proven path must cross the session boundary"
    );
    // The plain read outranks the medium-risk write with side effects.
    assert_eq!(advice.tree.recommended_branch_id.as_deref(), Some("branch-0"));

    // =========================================================
    // STEP 11: Abstract-step recall resolves without delegation
    // =========================================================

    let recalled = second.recall_for_step("read the bill");
    assert_eq!(recalled.len(), 1);
    assert_eq!(recalled[0].tool_name, "read_file");

    let selection = second
        .select_tool_for_step("read the bill", &NeverConsulted)
        .unwrap();
    assert_eq!(selection.selected_tool_name, "read_file");
    assert!(selection.rationale.contains("only one verified path"));
}

#[test]
fn conservative_fallback_guards_a_degraded_session() {
    let mut session = GuardSession::new(GuardConfig::default());
    session.attach_task_document("update the customer record", "{ not json");

    // The degraded set forbids effects but leaves reads open.
    let write = ToolCallInfo::new("update_record").with_arg("id", "customer-7");
    match session.review(&write) {
        Verdict::Retry { result, .. } => {
            assert!(result
                .feedback_message
                .unwrap()
                .contains("write operations are blocked until task constraints are available"));
        }
        other => panic!("expected the conservative block, got {other:?}"),
    }

    let read = ToolCallInfo::new("read_record").with_arg("id", "customer-7");
    assert!(session.review(&read).is_allowed());
}

#[test]
fn confirmation_document_holds_without_burning_budget() {
    let document = r#"{
        "constraints": [
            {
                "id": "confirm-sends",
                "kind": "require_confirmation",
                "description": "Outbound email needs explicit sign-off",
                "condition": {"operation": "send"}
            }
        ]
    }"#;
    let mut session = GuardSession::new(GuardConfig::default());
    session.attach_task_document("notify the customer by email", document);

    let call = ToolCallInfo::new("notify_customer").with_arg("recipient", "c@example.com");
    for round in 1..=3 {
        match session.review(&call) {
            Verdict::Confirm { result } => {
                assert!(!result.allowed);
                assert!(result.require_confirmation);
            }
            other => panic!("round {round}: expected a confirmation hold, got {other:?}"),
        }
    }
    // Holds are counted but never spend retry budget.
    assert_eq!(session.audit_stats().confirmed, 3);
}

#[test]
fn cache_snapshot_survives_a_restart() {
    let config = GuardConfig::default();
    let mut session = GuardSession::new(config.clone());
    session.attach_task(ConstraintSet::new("archive the quarterly reports"));

    let call = ToolCallInfo::new("archive_reports").with_arg("quarter", "q3");
    session.record_success(&call, None, Some("collect the reports"));

    let snapshot = session.cache_handle().read(|cache| cache.export());
    assert_eq!(snapshot.paths.len(), 1);
    assert_eq!(snapshot.stats.adds, 1);

    // Serialize, "restart", and restore into a fresh cache.
    let stored = serde_json::to_string(&snapshot).unwrap();
    let restored = serde_json::from_str(&stored).unwrap();
    let mut cache = PathCache::new(config.recall.clone());
    cache.import(restored);

    let mut revived = GuardSession::with_cache(
        config,
        gk_recall::SharedPathCache::new(cache),
    );
    revived.attach_task(ConstraintSet::new("archive the quarterly reports"));

    let advice = revived.rank(
        &[ToolSpec::new("archive_reports", "archive a set of reports")],
        "fresh start",
    );
    assert_eq!(advice.recalled_tool.as_deref(), Some("archive_reports"));
    assert_eq!(revived.recall_for_step("collect the reports").len(), 1);
}
