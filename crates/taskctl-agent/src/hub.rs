//! Orchestrator Hub: the Task registry and the immutable Context Store,
//! behind a single coarse lock. Tasks reference contexts by id; there are no
//! back-pointers, so both registries can live in one plain struct guarded by
//! one mutex rather than e.g. two independently-sharded maps.

use std::collections::BTreeMap;
use std::sync::Mutex;

use taskctl_core::types::{
    AgentId, AgentType, Context, ContextBootstrap, FinalStatus, Report, Task, TaskStatus,
};

use crate::error::AgentError;

pub struct TaskSpec {
    pub agent_type: AgentType,
    pub title: String,
    pub description: String,
    pub context_refs: Vec<String>,
    pub context_bootstrap: Vec<ContextBootstrap>,
}

#[derive(Clone, Debug)]
pub struct TaskSummary {
    pub id: String,
    pub title: String,
    pub agent_type: AgentType,
    pub status: TaskStatus,
    pub warnings: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct ContextSummary {
    pub id: String,
    pub content: String,
}

#[derive(Clone, Debug, Default)]
pub struct HubSnapshot {
    pub tasks: Vec<TaskSummary>,
    pub contexts: Vec<ContextSummary>,
}

struct HubInner {
    tasks: BTreeMap<String, Task>,
    contexts: BTreeMap<String, Context>,
    next_task_id: u64,
}

pub struct Hub {
    inner: Mutex<HubInner>,
}

impl Hub {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HubInner { tasks: BTreeMap::new(), contexts: BTreeMap::new(), next_task_id: 1 }),
        }
    }

    /// Rejects the task outright if any `context_refs` entry does not
    /// resolve to an existing context at the moment of acceptance.
    pub fn create_task(&self, spec: TaskSpec) -> Result<String, AgentError> {
        let mut inner = self.inner.lock().unwrap();
        for context_ref in &spec.context_refs {
            if !inner.contexts.contains_key(context_ref) {
                return Err(AgentError::Validation(format!(
                    "context_ref '{context_ref}' does not exist"
                )));
            }
        }

        let id = format!("task-{}", inner.next_task_id);
        inner.next_task_id += 1;
        let task = Task {
            id: id.clone(),
            agent_type: spec.agent_type,
            title: spec.title,
            description: spec.description,
            context_refs: spec.context_refs,
            context_bootstrap: spec.context_bootstrap,
            status: TaskStatus::Pending,
            result: None,
            failure_reason: None,
            created_at: now(),
            launched_at: None,
            completed_at: None,
            warnings: Vec::new(),
        };
        tracing::info!(task_id = %id, agent_type = %task.agent_type, "hub: task created");
        inner.tasks.insert(id.clone(), task);
        Ok(id)
    }

    pub fn add_context(&self, id: String, content: String, created_by: AgentId) -> Result<(), AgentError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.contexts.contains_key(&id) {
            return Err(AgentError::Validation(format!("context id '{id}' already exists")));
        }
        inner.contexts.insert(id.clone(), Context { id, content, created_by, created_at: now() });
        Ok(())
    }

    pub fn mark_launched(&self, task_id: &str) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(task) = inner.tasks.get_mut(task_id) {
            task.status = TaskStatus::Running;
            task.launched_at = Some(now());
        }
    }

    pub fn get_task(&self, task_id: &str) -> Option<Task> {
        self.inner.lock().unwrap().tasks.get(task_id).cloned()
    }

    pub fn context_text(&self, id: &str) -> Option<String> {
        self.inner.lock().unwrap().contexts.get(id).map(|c| c.content.clone())
    }

    /// Contexts are added in report order; a duplicate id is dropped with a
    /// warning recorded on the task rather than aborting the whole report.
    /// The task's final status always follows `report.final_status`.
    pub fn ingest_report(&self, created_by: AgentId, report: Report) {
        let mut inner = self.inner.lock().unwrap();
        let mut warnings = Vec::new();

        for draft in &report.contexts {
            if inner.contexts.contains_key(&draft.id) {
                warnings.push(format!("duplicate context id '{}' dropped on report ingestion", draft.id));
                tracing::warn!(context_id = %draft.id, task_id = %report.task_id, "hub: duplicate context id in report");
                continue;
            }
            inner.contexts.insert(
                draft.id.clone(),
                Context {
                    id: draft.id.clone(),
                    content: draft.content.clone(),
                    created_by: created_by.clone(),
                    created_at: now(),
                },
            );
        }

        let status = match report.final_status {
            FinalStatus::Completed => TaskStatus::Completed,
            FinalStatus::Failed | FinalStatus::Forced => TaskStatus::Failed,
        };

        if let Some(task) = inner.tasks.get_mut(&report.task_id) {
            task.status = status;
            task.completed_at = Some(now());
            task.warnings.extend(warnings);
            if status == TaskStatus::Failed {
                task.failure_reason = Some(report.comments.clone());
            }
            task.result = Some(report);
        }
        tracing::info!(task_id = ?inner.tasks.values().last().map(|t| &t.id), "hub: report ingested");
    }

    pub fn snapshot(&self) -> HubSnapshot {
        let inner = self.inner.lock().unwrap();
        HubSnapshot {
            tasks: inner
                .tasks
                .values()
                .map(|t| TaskSummary {
                    id: t.id.clone(),
                    title: t.title.clone(),
                    agent_type: t.agent_type,
                    status: t.status,
                    warnings: t.warnings.clone(),
                })
                .collect(),
            contexts: inner
                .contexts
                .values()
                .map(|c| ContextSummary { id: c.id.clone(), content: c.content.clone() })
                .collect(),
        }
    }

    pub fn task_count(&self) -> usize {
        self.inner.lock().unwrap().tasks.len()
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

fn now() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now()
}
