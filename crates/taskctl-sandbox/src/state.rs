//! Per-agent State (C4) — scratchpad notes and a todo list, private to the
//! owning agent and rendered into its next prompt. Each agent loop owns one
//! `AgentState`; there is no cross-agent sharing, so no lock is needed here.

use taskctl_core::{ErrorKind, ExecutionResult};
use tracing::debug;

#[derive(Clone, Debug)]
pub struct TodoItem {
    pub id: String,
    pub text: String,
    pub done: bool,
}

#[derive(Default)]
pub struct AgentState {
    scratchpad: Vec<String>,
    todos: Vec<TodoItem>,
}

impl AgentState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn note(&mut self, note: &str) -> ExecutionResult {
        self.scratchpad.push(note.to_string());
        debug!(notes = self.scratchpad.len(), "state: scratchpad note added");
        ExecutionResult::success("noted")
    }

    pub fn todo_add(&mut self, id: &str, text: &str) -> ExecutionResult {
        if let Some(existing) = self.todos.iter_mut().find(|t| t.id == id) {
            existing.text = text.to_string();
            existing.done = false;
        } else {
            self.todos.push(TodoItem { id: id.to_string(), text: text.to_string(), done: false });
        }
        ExecutionResult::success(format!("added todo {id}"))
    }

    /// Idempotent: completing an already-completed todo succeeds silently.
    pub fn todo_complete(&mut self, id: &str) -> ExecutionResult {
        match self.todos.iter_mut().find(|t| t.id == id) {
            Some(todo) => {
                todo.done = true;
                ExecutionResult::success(format!("completed todo {id}"))
            }
            None => ExecutionResult::error(ErrorKind::UnknownTodo, format!("unknown todo id: {id}")),
        }
    }

    pub fn todo_delete(&mut self, id: &str) -> ExecutionResult {
        let before = self.todos.len();
        self.todos.retain(|t| t.id != id);
        if self.todos.len() == before {
            ExecutionResult::error(ErrorKind::UnknownTodo, format!("unknown todo id: {id}"))
        } else {
            ExecutionResult::success(format!("deleted todo {id}"))
        }
    }

    pub fn todo_view_all(&self) -> ExecutionResult {
        if self.todos.is_empty() {
            return ExecutionResult::success("(no todos)");
        }
        let rendered: Vec<String> = self
            .todos
            .iter()
            .map(|t| format!("[{}] {} — {}", if t.done { "x" } else { " " }, t.id, t.text))
            .collect();
        ExecutionResult::success(rendered.join("\n"))
    }

    /// Rendered into the agent's next prompt alongside its todo view.
    pub fn scratchpad_view(&self) -> &[String] {
        &self.scratchpad
    }

    pub fn todos(&self) -> &[TodoItem] {
        &self.todos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_is_idempotent() {
        let mut state = AgentState::new();
        state.todo_add("t1", "write the fix");
        assert!(state.todo_complete("t1").ok);
        assert!(state.todo_complete("t1").ok);
    }

    #[test]
    fn unknown_todo_repeated_yields_same_kind() {
        let mut state = AgentState::new();
        let first = state.todo_complete("ghost");
        let second = state.todo_delete("ghost");
        assert_eq!(first.error_kind, Some(ErrorKind::UnknownTodo));
        assert_eq!(second.error_kind, Some(ErrorKind::UnknownTodo));
    }

    #[test]
    fn delete_removes_todo() {
        let mut state = AgentState::new();
        state.todo_add("t1", "x");
        assert!(state.todo_delete("t1").ok);
        assert_eq!(state.todo_delete("t1").error_kind, Some(ErrorKind::UnknownTodo));
    }

    #[test]
    fn scratchpad_accumulates_notes() {
        let mut state = AgentState::new();
        state.note("found the bug in parser.rs");
        state.note("fix applied");
        assert_eq!(state.scratchpad_view().len(), 2);
    }
}
