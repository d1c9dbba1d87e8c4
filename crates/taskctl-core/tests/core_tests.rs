//! Data-model tests for taskctl-core: Action/ExecutionResult serde, Task/Report
//! lifecycle shapes, and Config resolution.

use taskctl_core::*;

// ===========================================================================
// Action
// ===========================================================================

#[test]
fn action_serde_roundtrip_task_create() {
    let action = Action::TaskCreate {
        agent_type: AgentType::Explorer,
        title: "verify echo output".into(),
        description: "run echo hi and report the output".into(),
        context_refs: vec!["prior_finding".into()],
        context_bootstrap: vec![ContextBootstrap {
            path: "/workspace/README.md".into(),
            reason: "project context".into(),
        }],
    };
    let json = serde_json::to_string(&action).unwrap();
    let back: Action = serde_json::from_str(&json).unwrap();
    assert_eq!(action, back);
}

#[test]
fn action_tag_name_orchestrator_vs_subagent() {
    let finish = Action::Finish { message: "done".into() };
    assert!(finish.is_orchestrator_only());
    assert!(!finish.is_subagent_only());

    let bash = Action::Bash { cmd: "echo hi".into(), block: true, timeout_secs: None, cwd: None };
    assert!(bash.is_subagent_only());
    assert!(!bash.is_orchestrator_only());

    let reasoning = Action::Reasoning { text: "thinking".into() };
    assert!(!reasoning.is_orchestrator_only());
    assert!(!reasoning.is_subagent_only());
}

// ===========================================================================
// ExecutionResult
// ===========================================================================

#[test]
fn execution_result_error_carries_kind_and_message() {
    let r = ExecutionResult::error(ErrorKind::NotFound, "/tmp/missing.txt not found");
    assert!(!r.ok);
    assert_eq!(r.error_kind, Some(ErrorKind::NotFound));
    assert!(r.error_message.unwrap().contains("missing.txt"));
}

#[test]
fn execution_result_error_with_payload_preserves_output() {
    let r = ExecutionResult::error_with_payload(ErrorKind::NonZeroExit, "exit 1", "stderr: boom");
    assert!(!r.ok);
    assert_eq!(r.payload, "stderr: boom");
}

// ===========================================================================
// Task / Report lifecycle
// ===========================================================================

fn new_task(id: &str) -> Task {
    Task {
        id: id.into(),
        agent_type: AgentType::Coder,
        title: "fix the bug".into(),
        description: "".into(),
        context_refs: vec![],
        context_bootstrap: vec![],
        status: TaskStatus::Pending,
        result: None,
        failure_reason: None,
        created_at: chrono::Utc::now(),
        launched_at: None,
        completed_at: None,
        warnings: vec![],
    }
}

#[test]
fn task_status_follows_report_final_status() {
    let mut task = new_task("t1");
    task.status = TaskStatus::Running;
    let report = Report {
        contexts: vec![ContextDraft { id: "patch_summary".into(), content: "fixed it".into() }],
        comments: "applied the fix".into(),
        task_id: "t1".into(),
        final_status: FinalStatus::Completed,
    };
    task.status = match report.final_status {
        FinalStatus::Completed => TaskStatus::Completed,
        FinalStatus::Failed | FinalStatus::Forced => TaskStatus::Failed,
    };
    task.result = Some(report);
    assert!(task.is_terminal());
    assert_eq!(task.status, TaskStatus::Completed);
}

#[test]
fn forced_report_maps_to_failed_status() {
    let report = Report {
        contexts: vec![],
        comments: "budget exhausted, no report submitted".into(),
        task_id: "t2".into(),
        final_status: FinalStatus::Forced,
    };
    let status = match report.final_status {
        FinalStatus::Completed => TaskStatus::Completed,
        FinalStatus::Failed | FinalStatus::Forced => TaskStatus::Failed,
    };
    assert_eq!(status, TaskStatus::Failed);
}

// ===========================================================================
// Config
// ===========================================================================

#[test]
fn config_for_test_is_self_contained() {
    let cfg = Config::for_test();
    assert_eq!(cfg.max_turns_for(AgentType::Explorer), 5);
    assert!(cfg.bash_output_limit_bytes > 0);
}
