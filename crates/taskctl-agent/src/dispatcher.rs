//! Action Dispatcher: maps a parsed `Action` to the sandbox primitive that
//! performs it, enforcing capability scope before anything touches disk.

use std::path::Path;

use taskctl_core::types::{AgentType, ErrorKind, ExecutionResult, FileOp, SearchOp, TodoOp};
use taskctl_sandbox::{AgentState, FileManager, SandboxExecutor, SearchManager};

/// Dispatches the subset of actions a Subagent (Explorer or Coder) may emit.
/// Orchestrator-only actions (`task_create`, `launch_subagent`, `add_context`,
/// `finish`) are rejected by the caller before reaching here; `report` ends
/// the turn loop rather than going through dispatch.
pub async fn dispatch_subagent_action(
    action: &taskctl_core::types::Action,
    agent_type: AgentType,
    sandbox: &SandboxExecutor,
    search: &SearchManager,
    state: &mut AgentState,
    temp_root: &Path,
) -> ExecutionResult {
    use taskctl_core::types::Action;

    match action {
        Action::File(op) => {
            if op.is_mutating() && !agent_type.can_write() {
                return ExecutionResult::error(
                    ErrorKind::Capability,
                    format!("{} has read-only access and cannot mutate files", agent_type),
                );
            }
            dispatch_file_op(op).await
        }
        Action::Search(op) => dispatch_search_op(op, search),
        Action::Bash { cmd, block, timeout_secs, cwd } => {
            sandbox.exec(cmd, *block, *timeout_secs, cwd.as_deref()).await
        }
        Action::Todo(op) => dispatch_todo_op(op, state),
        Action::Scratchpad { note } => state.note(note),
        Action::WriteTempScript { path, content } => {
            if agent_type.can_write() {
                return ExecutionResult::error(
                    ErrorKind::Capability,
                    "write_temp_script is an Explorer-only escape hatch",
                );
            }
            dispatch_write_temp_script(path, content, temp_root).await
        }
        other => ExecutionResult::error(
            ErrorKind::Capability,
            format!("<{}> is not a valid subagent action", other.tag_name()),
        ),
    }
}

async fn dispatch_file_op(op: &FileOp) -> ExecutionResult {
    match op {
        FileOp::Read { path, offset, limit } => FileManager::read(path, *offset, *limit).await,
        FileOp::Write { path, content } => FileManager::write(path, content).await,
        FileOp::Edit { path, old_string, new_string, replace_all } => {
            FileManager::edit(path, old_string, new_string, *replace_all).await
        }
        FileOp::MultiEdit { path, edits } => FileManager::multi_edit(path, edits).await,
        FileOp::Metadata { paths } => FileManager::metadata(paths).await,
    }
}

fn dispatch_search_op(op: &SearchOp, search: &SearchManager) -> ExecutionResult {
    match op {
        SearchOp::Grep { pattern, path, include } => {
            search.grep(pattern, path.as_deref(), include.as_deref())
        }
        SearchOp::Glob { pattern, path } => search.glob(pattern, path.as_deref()),
    }
}

fn dispatch_todo_op(op: &TodoOp, state: &mut AgentState) -> ExecutionResult {
    match op {
        TodoOp::Add { id, text } => state.todo_add(id, text),
        TodoOp::Complete { id } => state.todo_complete(id),
        TodoOp::Delete { id } => state.todo_delete(id),
        TodoOp::ViewAll => state.todo_view_all(),
    }
}

async fn dispatch_write_temp_script(path: &str, content: &str, temp_root: &Path) -> ExecutionResult {
    let candidate = Path::new(path);
    if !candidate.is_absolute() {
        return ExecutionResult::error(ErrorKind::InvalidPath, "write_temp_script path must be absolute");
    }
    if !candidate.starts_with(temp_root) {
        return ExecutionResult::error(
            ErrorKind::Capability,
            format!("write_temp_script is restricted to {}", temp_root.display()),
        );
    }
    FileManager::write(path, content).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskctl_core::types::{Action, EditOp};
    use tempfile::tempdir;

    fn sandbox() -> SandboxExecutor {
        SandboxExecutor::new(std::time::Duration::from_secs(5), std::time::Duration::from_secs(300), 100 * 1024)
    }

    fn search() -> SearchManager {
        SearchManager::new(1000)
    }

    #[tokio::test]
    async fn explorer_write_is_capability_violation() {
        let action = Action::File(FileOp::Write { path: "/tmp/whatever.txt".into(), content: "x".into() });
        let mut state = AgentState::new();
        let result = dispatch_subagent_action(
            &action,
            AgentType::Explorer,
            &sandbox(),
            &search(),
            &mut state,
            Path::new("/tmp"),
        )
        .await;
        assert!(!result.ok);
        assert_eq!(result.error_kind, Some(ErrorKind::Capability));
    }

    #[tokio::test]
    async fn coder_write_temp_script_is_capability_violation() {
        let action = Action::WriteTempScript { path: "/tmp/x.sh".into(), content: "echo hi".into() };
        let mut state = AgentState::new();
        let result = dispatch_subagent_action(
            &action,
            AgentType::Coder,
            &sandbox(),
            &search(),
            &mut state,
            Path::new("/tmp"),
        )
        .await;
        assert!(!result.ok);
        assert_eq!(result.error_kind, Some(ErrorKind::Capability));
    }

    #[tokio::test]
    async fn explorer_write_temp_script_outside_root_is_rejected() {
        let dir = tempdir().unwrap();
        let temp_root = dir.path().join("scratch");
        let action = Action::WriteTempScript { path: "/etc/passwd".into(), content: "nope".into() };
        let mut state = AgentState::new();
        let result = dispatch_subagent_action(
            &action,
            AgentType::Explorer,
            &sandbox(),
            &search(),
            &mut state,
            &temp_root,
        )
        .await;
        assert!(!result.ok);
        assert_eq!(result.error_kind, Some(ErrorKind::Capability));
    }

    #[tokio::test]
    async fn explorer_write_temp_script_inside_root_succeeds() {
        let dir = tempdir().unwrap();
        let script_path = dir.path().join("script.sh");
        let action = Action::WriteTempScript {
            path: script_path.to_string_lossy().to_string(),
            content: "echo hi".into(),
        };
        let mut state = AgentState::new();
        let result =
            dispatch_subagent_action(&action, AgentType::Explorer, &sandbox(), &search(), &mut state, dir.path())
                .await;
        assert!(result.ok);
        assert!(script_path.exists());
    }

    #[tokio::test]
    async fn scratchpad_note_is_recorded_in_state() {
        let action = Action::Scratchpad { note: "remember this".into() };
        let mut state = AgentState::new();
        let result =
            dispatch_subagent_action(&action, AgentType::Coder, &sandbox(), &search(), &mut state, Path::new("/tmp"))
                .await;
        assert!(result.ok);
        assert_eq!(state.scratchpad_view(), &["remember this".to_string()]);
    }

    #[tokio::test]
    async fn coder_multi_edit_dispatches_through_file_manager() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f.txt");
        tokio::fs::write(&path, "hello world").await.unwrap();
        let action = Action::File(FileOp::MultiEdit {
            path: path.to_string_lossy().to_string(),
            edits: vec![EditOp { old_string: "hello".into(), new_string: "goodbye".into() }],
        });
        let mut state = AgentState::new();
        let result =
            dispatch_subagent_action(&action, AgentType::Coder, &sandbox(), &search(), &mut state, Path::new("/tmp"))
                .await;
        assert!(result.ok);
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "goodbye world");
    }
}
