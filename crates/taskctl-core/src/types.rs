//! Data model: Context, Task, Report, Turn, Action, ExecutionResult.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Agent identifier — cheaply cloneable, used as the key for logs, prompts, and token counters.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct AgentId(Arc<str>);

impl AgentId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(Arc::from(s.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn orchestrator() -> Self {
        Self::new("orchestrator")
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for AgentId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// The two Subagent variants. The Orchestrator is not itself an `AgentType` —
/// it is the single long-lived loop that creates and launches these.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    Explorer,
    Coder,
}

impl AgentType {
    pub fn can_write(&self) -> bool {
        matches!(self, AgentType::Coder)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::Explorer => "explorer",
            AgentType::Coder => "coder",
        }
    }
}

impl std::fmt::Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An immutable, id-addressed knowledge artifact. Never mutated after creation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Context {
    pub id: String,
    pub content: String,
    pub created_by: AgentId,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A context produced by a Report, before it has been assigned `created_by`/`created_at`
/// by the hub at ingestion time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContextDraft {
    pub id: String,
    pub content: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContextBootstrap {
    pub path: String,
    pub reason: String,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FinalStatus {
    Completed,
    Failed,
    Forced,
}

impl std::fmt::Display for FinalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FinalStatus::Completed => "completed",
            FinalStatus::Failed => "failed",
            FinalStatus::Forced => "forced",
        };
        write!(f, "{}", s)
    }
}

/// A unit of delegated work, created by the Orchestrator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub agent_type: AgentType,
    pub title: String,
    pub description: String,
    pub context_refs: Vec<String>,
    pub context_bootstrap: Vec<ContextBootstrap>,
    pub status: TaskStatus,
    pub result: Option<Report>,
    pub failure_reason: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub launched_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Set when report ingestion hit a duplicate context id; surfaced in the hub snapshot.
    pub warnings: Vec<String>,
}

impl Task {
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// The single structured output of a Subagent invocation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Report {
    pub contexts: Vec<ContextDraft>,
    pub comments: String,
    pub task_id: String,
    pub final_status: FinalStatus,
}

/// One request/response round between an agent and the LLM.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Turn {
    pub agent_id: AgentId,
    pub turn_index: usize,
    pub prompt_rendered: String,
    pub raw_response: String,
    pub actions: Vec<Action>,
    pub results: Vec<ExecutionResult>,
    pub tokens_in: u32,
    pub tokens_out: u32,
}

/// A single edit within a `multi_edit` action.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EditOp {
    pub old_string: String,
    pub new_string: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FileOp {
    Read {
        path: String,
        #[serde(default)]
        offset: Option<usize>,
        #[serde(default)]
        limit: Option<usize>,
    },
    Write {
        path: String,
        content: String,
    },
    Edit {
        path: String,
        old_string: String,
        new_string: String,
        #[serde(default)]
        replace_all: bool,
    },
    MultiEdit {
        path: String,
        edits: Vec<EditOp>,
    },
    Metadata {
        paths: Vec<String>,
    },
}

impl FileOp {
    /// Whether this operation mutates the sandbox filesystem (vs. a pure read).
    pub fn is_mutating(&self) -> bool {
        !matches!(self, FileOp::Read { .. } | FileOp::Metadata { .. })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SearchOp {
    Grep {
        pattern: String,
        #[serde(default)]
        path: Option<String>,
        #[serde(default)]
        include: Option<String>,
    },
    Glob {
        pattern: String,
        #[serde(default)]
        path: Option<String>,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TodoOp {
    Add { id: String, text: String },
    Complete { id: String },
    Delete { id: String },
    ViewAll,
}

/// A single tagged directive emitted by an agent in one LLM response.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum Action {
    // --- Orchestrator-only ---
    TaskCreate {
        agent_type: AgentType,
        title: String,
        description: String,
        context_refs: Vec<String>,
        context_bootstrap: Vec<ContextBootstrap>,
    },
    LaunchSubagent {
        task_id: String,
    },
    AddContext {
        id: String,
        content: String,
    },
    Finish {
        message: String,
    },

    // --- Subagent-only ---
    File(FileOp),
    Search(SearchOp),
    Bash {
        cmd: String,
        #[serde(default)]
        block: bool,
        #[serde(default)]
        timeout_secs: Option<u64>,
        #[serde(default)]
        cwd: Option<String>,
    },
    Todo(TodoOp),
    Scratchpad {
        note: String,
    },
    Report {
        contexts: Vec<ContextDraft>,
        comments: String,
        final_status: FinalStatus,
    },
    WriteTempScript {
        path: String,
        content: String,
    },

    // --- Both ---
    Reasoning {
        text: String,
    },
}

impl Action {
    pub fn tag_name(&self) -> &'static str {
        match self {
            Action::TaskCreate { .. } => "task_create",
            Action::LaunchSubagent { .. } => "launch_subagent",
            Action::AddContext { .. } => "add_context",
            Action::Finish { .. } => "finish",
            Action::File(_) => "file",
            Action::Search(_) => "search",
            Action::Bash { .. } => "bash",
            Action::Todo(_) => "todo",
            Action::Scratchpad { .. } => "scratchpad",
            Action::Report { .. } => "report",
            Action::WriteTempScript { .. } => "write_temp_script",
            Action::Reasoning { .. } => "reasoning",
        }
    }

    pub fn is_orchestrator_only(&self) -> bool {
        matches!(
            self,
            Action::TaskCreate { .. }
                | Action::LaunchSubagent { .. }
                | Action::AddContext { .. }
                | Action::Finish { .. }
        )
    }

    pub fn is_subagent_only(&self) -> bool {
        matches!(
            self,
            Action::File(_)
                | Action::Search(_)
                | Action::Bash { .. }
                | Action::Todo(_)
                | Action::Scratchpad { .. }
                | Action::Report { .. }
                | Action::WriteTempScript { .. }
        )
    }
}

/// The taxonomy of non-fatal, self-correcting failures. Attached to an
/// `ExecutionResult` rather than unwinding the runtime — see `error.rs` for
/// the narrower set of errors that *do* abort the top-level task.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Parse,
    Validation,
    Capability,
    Timeout,
    NonZeroExit,
    Truncated,
    NotFound,
    NotAFile,
    PermissionDenied,
    MissingParent,
    InvalidPath,
    AmbiguousEdit,
    UnknownTodo,
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The uniform result of executing one Action.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub ok: bool,
    pub payload: String,
    pub error_kind: Option<ErrorKind>,
    pub error_message: Option<String>,
}

impl ExecutionResult {
    pub fn success(payload: impl Into<String>) -> Self {
        Self {
            ok: true,
            payload: payload.into(),
            error_kind: None,
            error_message: None,
        }
    }

    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            payload: String::new(),
            error_kind: Some(kind),
            error_message: Some(message.into()),
        }
    }

    /// Failures that still carry useful payload (e.g. a non-zero exit with captured output).
    pub fn error_with_payload(
        kind: ErrorKind,
        message: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            ok: false,
            payload: payload.into(),
            error_kind: Some(kind),
            error_message: Some(message.into()),
        }
    }
}
