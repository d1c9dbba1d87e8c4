//! Orchestrator Runtime: the long-lived loop that creates Tasks, launches
//! Subagents against them, and folds their Reports back into the Hub until
//! it emits `Finish` or exhausts its own, much larger, turn budget.

use std::path::Path;

use taskctl_core::types::{Action, AgentId, AgentType, ContextBootstrap};
use taskctl_core::Config;
use taskctl_llm::{LlmMessage, LlmProvider, LlmRequest, RetryPolicy};
use taskctl_sandbox::{FileManager, SandboxExecutor, SearchManager};

use crate::history::History;
use crate::hub::{Hub, TaskSpec};
use crate::parser;
use crate::render::{render_parse_error, render_result, render_turn_block};
use crate::subagent;
use crate::turnlog::TurnLogger;

const HISTORY_BUDGET_TOKENS: usize = 20_000;

#[derive(Clone, Debug, Default)]
pub struct Stats {
    pub total_turns: usize,
    pub explorer_count: usize,
    pub coder_count: usize,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub tasks_completed: usize,
    pub tasks_failed: usize,
    pub unverified_finish: bool,
}

pub struct OrchestratorOutcome {
    pub final_message: String,
    pub stats: Stats,
}

#[allow(clippy::too_many_arguments)]
pub async fn run_orchestrator(
    instruction: &str,
    hub: &Hub,
    provider: &dyn LlmProvider,
    retry: &RetryPolicy,
    sandbox: &SandboxExecutor,
    search: &SearchManager,
    config: &Config,
    turn_logger: &TurnLogger,
    temp_root: &Path,
) -> OrchestratorOutcome {
    let agent_id = AgentId::orchestrator();
    let mut history = History::new();
    let mut stats = Stats::default();
    // Set whenever a Coder task is launched, cleared whenever an Explorer
    // task completes afterward — tracks whether a Finish would be unverified.
    let mut needs_verification = false;

    let system_prompt = render_system_prompt(instruction);

    for turn_index in 1..=config.max_orch_turns {
        stats.total_turns = turn_index;
        let force_finish = turn_index == config.max_orch_turns;
        let prompt = render_turn_prompt(instruction, hub, &history, force_finish);

        let request = LlmRequest {
            model: config.model.clone(),
            system: Some(system_prompt.clone()),
            messages: vec![LlmMessage::user(prompt.clone())],
            temperature: config.temperature,
            max_tokens: 4096,
        };

        let response = match retry.call(provider, request, None).await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(error = %e, "orchestrator: llm call failed");
                stats.unverified_finish = needs_verification;
                return OrchestratorOutcome {
                    final_message: format!("orchestrator llm failure: {e}"),
                    stats,
                };
            }
        };

        stats.tokens_in += response.usage.input_tokens as u64;
        stats.tokens_out += response.usage.output_tokens as u64;

        let parsed = parser::parse_actions(&response.text);
        let mut real_actions = Vec::new();
        let mut real_results = Vec::new();
        let mut env_blocks = Vec::new();
        let mut finish_message = None;

        for item in parsed {
            match item {
                Err(e) => env_blocks.push(render_parse_error(&e)),
                Ok(action) => {
                    let (result, tag) = dispatch_orchestrator_action(
                        &action,
                        hub,
                        provider,
                        retry,
                        sandbox,
                        search,
                        config,
                        turn_logger,
                        temp_root,
                        &mut stats,
                        &mut needs_verification,
                    )
                    .await;

                    if let Action::Finish { message } = &action {
                        finish_message = Some(message.clone());
                    }
                    env_blocks.push(render_result(tag, &result));
                    real_actions.push(action);
                    real_results.push(result);
                }
            }
        }

        let turn = taskctl_core::types::Turn {
            agent_id: agent_id.clone(),
            turn_index,
            prompt_rendered: prompt,
            raw_response: response.text.clone(),
            actions: real_actions,
            results: real_results,
            tokens_in: response.usage.input_tokens,
            tokens_out: response.usage.output_tokens,
        };
        if let Err(e) = turn_logger.append(&turn).await {
            tracing::warn!(error = %e, "orchestrator: failed to persist turn log");
        }

        history.push(render_turn_block(turn_index, &response.text, &env_blocks));
        history.truncate_to_budget(HISTORY_BUDGET_TOKENS);

        if let Some(message) = finish_message {
            stats.unverified_finish = needs_verification;
            return OrchestratorOutcome { final_message: message, stats };
        }
    }

    tracing::warn!(max_turns = config.max_orch_turns, "orchestrator: exhausted turn budget without finish");
    stats.unverified_finish = needs_verification;
    OrchestratorOutcome { final_message: "budget exhausted".to_string(), stats }
}

#[allow(clippy::too_many_arguments)]
async fn dispatch_orchestrator_action(
    action: &Action,
    hub: &Hub,
    provider: &dyn LlmProvider,
    retry: &RetryPolicy,
    sandbox: &SandboxExecutor,
    search: &SearchManager,
    config: &Config,
    turn_logger: &TurnLogger,
    temp_root: &Path,
    stats: &mut Stats,
    needs_verification: &mut bool,
) -> (taskctl_core::types::ExecutionResult, &'static str) {
    use taskctl_core::types::ErrorKind;
    use taskctl_core::types::ExecutionResult;

    match action {
        Action::TaskCreate { agent_type, title, description, context_refs, context_bootstrap } => {
            let spec = TaskSpec {
                agent_type: *agent_type,
                title: title.clone(),
                description: description.clone(),
                context_refs: context_refs.clone(),
                context_bootstrap: context_bootstrap.clone(),
            };
            let result = match hub.create_task(spec) {
                Ok(id) => ExecutionResult::success(format!("created task {id}")),
                Err(e) => ExecutionResult::error(ErrorKind::Validation, e.to_string()),
            };
            (result, "task_create_output")
        }
        Action::AddContext { id, content } => {
            let result = match hub.add_context(id.clone(), content.clone(), AgentId::orchestrator()) {
                Ok(()) => ExecutionResult::success(format!("added context {id}")),
                Err(e) => ExecutionResult::error(ErrorKind::Validation, e.to_string()),
            };
            (result, "add_context_output")
        }
        Action::LaunchSubagent { task_id } => {
            let Some(task) = hub.get_task(task_id) else {
                return (
                    ExecutionResult::error(ErrorKind::Validation, format!("unknown task id: {task_id}")),
                    "launch_subagent_output",
                );
            };
            if task.status != taskctl_core::types::TaskStatus::Pending {
                return (
                    ExecutionResult::error(
                        ErrorKind::Validation,
                        format!("task {task_id} is {} and cannot be launched again", task.status),
                    ),
                    "launch_subagent_output",
                );
            }
            hub.mark_launched(task_id);
            if task.agent_type == AgentType::Coder {
                *needs_verification = true;
                stats.coder_count += 1;
            } else {
                stats.explorer_count += 1;
            }

            let context_texts: Vec<(String, String)> = task
                .context_refs
                .iter()
                .filter_map(|r| hub.context_text(r).map(|content| (r.clone(), content)))
                .collect();
            let bootstrap_texts = read_bootstrap_files(&task.context_bootstrap).await;

            let report = subagent::run_subagent(
                &task,
                &context_texts,
                &bootstrap_texts,
                provider,
                retry,
                sandbox,
                search,
                config,
                turn_logger,
                temp_root,
            )
            .await;

            if task.agent_type == AgentType::Explorer
                && report.final_status == taskctl_core::types::FinalStatus::Completed
            {
                *needs_verification = false;
            }
            match report.final_status {
                taskctl_core::types::FinalStatus::Completed => stats.tasks_completed += 1,
                _ => stats.tasks_failed += 1,
            }

            let summary = format!("task {task_id} finished with status {}", report.final_status);
            hub.ingest_report(AgentId::new(format!("{}-{}", task.agent_type.as_str(), task.id)), report);
            (ExecutionResult::success(summary), "launch_subagent_output")
        }
        Action::Finish { message } => (ExecutionResult::success(message.clone()), "finish_output"),
        Action::Reasoning { .. } => (ExecutionResult::success("noted"), "reasoning_output"),
        other => (
            ExecutionResult::error(ErrorKind::Capability, format!("<{}> is not valid for the orchestrator", other.tag_name())),
            "action_output",
        ),
    }
}

async fn read_bootstrap_files(bootstrap: &[ContextBootstrap]) -> Vec<(String, String)> {
    let mut out = Vec::with_capacity(bootstrap.len());
    for entry in bootstrap {
        let result = FileManager::read(&entry.path, None, None).await;
        let content = if result.ok {
            result.payload
        } else {
            format!("(could not load: {})", result.error_message.unwrap_or_default())
        };
        out.push((entry.path.clone(), content));
    }
    out
}

fn render_system_prompt(instruction: &str) -> String {
    format!(
        "You are the orchestrator for a terminal-based engineering task.\n\
         You may emit: task_create, launch_subagent, add_context, finish, reasoning.\n\
         Delegate work to Explorer (read-only) and Coder (read-write) subagents; \
         do not attempt to read or write files yourself.\n\n\
         Top-level task:\n{instruction}\n"
    )
}

fn render_turn_prompt(instruction: &str, hub: &Hub, history: &History, force_finish: bool) -> String {
    let mut s = String::new();
    s.push_str(&format!("Top-level task (unchanged): {instruction}\n\n"));

    let snapshot = hub.snapshot();
    s.push_str("<hub_snapshot>\n");
    for task in &snapshot.tasks {
        s.push_str(&format!("task {} [{}] ({}): {}\n", task.id, task.status, task.agent_type, task.title));
        for warning in &task.warnings {
            s.push_str(&format!("  warning: {warning}\n"));
        }
    }
    for context in &snapshot.contexts {
        s.push_str(&format!("context {}: {}\n", context.id, truncate_for_prompt(&context.content)));
    }
    s.push_str("</hub_snapshot>\n\n");

    s.push_str(&history.render());

    if force_finish {
        s.push_str("\nYou must emit a <finish> action this turn.\n");
    }
    s
}

fn truncate_for_prompt(content: &str) -> String {
    const MAX: usize = 500;
    if content.len() <= MAX {
        content.to_string()
    } else {
        format!("{}... [truncated for snapshot]", &content[..MAX])
    }
}
