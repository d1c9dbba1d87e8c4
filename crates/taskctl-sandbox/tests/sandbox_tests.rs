//! Boundary-behavior tests for the sandbox crate: exact timeout/truncation
//! thresholds, and the file manager's atomicity guarantees.

use std::time::Duration;
use taskctl_core::ErrorKind;
use taskctl_sandbox::{FileManager, SandboxExecutor, SearchManager};

// ===========================================================================
// Sandbox Executor — timeout boundary
// ===========================================================================

#[tokio::test]
async fn command_finishing_before_timeout_succeeds() {
    let exec = SandboxExecutor::new(Duration::from_secs(3), Duration::from_secs(30), 100 * 1024);
    let r = exec.exec("sleep 0.1 && echo done", true, None, None).await;
    assert!(r.ok);
    assert_eq!(r.payload, "done");
}

#[tokio::test]
async fn command_exceeding_timeout_is_killed() {
    let exec = SandboxExecutor::new(Duration::from_millis(200), Duration::from_secs(30), 100 * 1024);
    let r = exec.exec("sleep 10", true, None, None).await;
    assert_eq!(r.error_kind, Some(ErrorKind::Timeout));
}

#[tokio::test]
async fn requested_timeout_is_capped_at_hard_max() {
    let exec = SandboxExecutor::new(Duration::from_secs(30), Duration::from_millis(200), 100 * 1024);
    let r = exec.exec("sleep 10", true, Some(9999), None).await;
    assert_eq!(r.error_kind, Some(ErrorKind::Timeout));
}

// ===========================================================================
// Sandbox Executor — truncation boundary
// ===========================================================================

#[tokio::test]
async fn output_at_exactly_the_limit_is_not_truncated() {
    let exec = SandboxExecutor::new(Duration::from_secs(5), Duration::from_secs(30), 5);
    let r = exec.exec("printf hello", true, None, None).await;
    assert!(r.ok);
    assert_eq!(r.payload, "hello");
}

#[tokio::test]
async fn output_one_byte_over_the_limit_is_truncated() {
    let exec = SandboxExecutor::new(Duration::from_secs(5), Duration::from_secs(30), 5);
    let r = exec.exec("printf hello1", true, None, None).await;
    assert_eq!(r.error_kind, Some(ErrorKind::Truncated));
}

// ===========================================================================
// File Manager — atomicity and path contract
// ===========================================================================

#[tokio::test]
async fn multi_edit_failure_leaves_file_byte_for_byte_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("file.txt");
    tokio::fs::write(&path, "alpha beta gamma\n").await.unwrap();
    let path_str = path.to_str().unwrap();

    let edits = vec![
        taskctl_core::EditOp { old_string: "alpha".into(), new_string: "ALPHA".into() },
        taskctl_core::EditOp { old_string: "delta".into(), new_string: "DELTA".into() },
    ];
    let r = FileManager::multi_edit(path_str, &edits).await;
    assert!(!r.ok);

    let on_disk = tokio::fs::read_to_string(&path).await.unwrap();
    assert_eq!(on_disk, "alpha beta gamma\n");
}

#[tokio::test]
async fn edit_inverse_restores_original_byte_for_byte() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("file.txt");
    let original = "the quick fox\n";
    tokio::fs::write(&path, original).await.unwrap();
    let path_str = path.to_str().unwrap();

    FileManager::edit(path_str, "quick", "slow", false).await;
    FileManager::edit(path_str, "slow", "quick", false).await;

    let on_disk = tokio::fs::read_to_string(&path).await.unwrap();
    assert_eq!(on_disk, original);
}

// ===========================================================================
// Search Manager
// ===========================================================================

#[test]
fn glob_with_no_matches_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let search = SearchManager::new(1000);
    let r = search.glob("*.nonexistent", Some(dir.path().to_str().unwrap()));
    assert!(r.ok);
}
