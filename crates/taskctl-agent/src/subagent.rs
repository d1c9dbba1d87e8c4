//! Subagent Runtime: the bounded turn loop a freshly-launched Explorer or
//! Coder runs until it submits a Report or exhausts its turn budget.

use std::path::Path;

use taskctl_core::types::{
    Action, AgentId, AgentType, ContextDraft, ErrorKind, ExecutionResult, FinalStatus, Report, Task,
};
use taskctl_core::Config;
use taskctl_llm::{LlmMessage, LlmProvider, LlmRequest, RetryPolicy};
use taskctl_sandbox::{AgentState, SandboxExecutor, SearchManager};

use crate::dispatcher::dispatch_subagent_action;
use crate::history::History;
use crate::parser::{self, ParseError};
use crate::render::{render_action_result, render_parse_error, render_turn_block};
use crate::turnlog::TurnLogger;

const HISTORY_BUDGET_TOKENS: usize = 8_000;
const MAX_PARALLEL_BASH: usize = 3;

pub async fn run_subagent(
    task: &Task,
    context_texts: &[(String, String)],
    bootstrap_texts: &[(String, String)],
    provider: &dyn LlmProvider,
    retry: &RetryPolicy,
    sandbox: &SandboxExecutor,
    search: &SearchManager,
    config: &Config,
    turn_logger: &TurnLogger,
    temp_root: &Path,
) -> Report {
    let agent_id = AgentId::new(format!("{}-{}", task.agent_type.as_str(), task.id));
    let max_turns = config.max_turns_for(task.agent_type);
    let mut state = AgentState::new();
    let mut history = History::new();
    let system_prompt = render_system_prompt(task, context_texts, bootstrap_texts);

    for turn_index in 1..=max_turns {
        let warn_report = turn_index == max_turns.saturating_sub(1);
        let prompt = render_turn_prompt(&history, &state, warn_report);

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
                tracing::warn!(agent = %agent_id, turn = turn_index, error = %e, "subagent: llm call failed");
                return forced_report(task, &state, &format!("llm failure after retries: {e}"));
            }
        };

        let parsed = parser::parse_actions(&response.text);
        let (real_actions, real_results, env_blocks, report_out) =
            run_turn_actions(parsed, task.agent_type, sandbox, search, &mut state, temp_root).await;

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
            tracing::warn!(agent = %agent_id, error = %e, "subagent: failed to persist turn log");
        }

        history.push(render_turn_block(turn_index, &response.text, &env_blocks));
        history.truncate_to_budget(HISTORY_BUDGET_TOKENS);

        if let Some(mut report) = report_out {
            report.task_id = task.id.clone();
            return report;
        }
    }

    tracing::warn!(agent = %agent_id, max_turns, "subagent: exhausted turn budget without a report");
    forced_report(task, &state, "turn budget exhausted")
}

/// Executes every parsed action in document order, except that up to
/// `MAX_PARALLEL_BASH` consecutive `bash` actions run concurrently with
/// their outputs stitched back in input order.
async fn run_turn_actions(
    parsed: Vec<Result<Action, ParseError>>,
    agent_type: AgentType,
    sandbox: &SandboxExecutor,
    search: &SearchManager,
    state: &mut AgentState,
    temp_root: &Path,
) -> (Vec<Action>, Vec<ExecutionResult>, Vec<String>, Option<Report>) {
    let mut real_actions = Vec::new();
    let mut real_results = Vec::new();
    let mut env_blocks = Vec::new();
    let mut report_out = None;

    let mut idx = 0;
    while idx < parsed.len() {
        match &parsed[idx] {
            Err(e) => {
                env_blocks.push(render_parse_error(e));
                idx += 1;
            }
            Ok(Action::Bash { .. }) => {
                let mut batch = vec![parsed[idx].as_ref().unwrap().clone()];
                let mut j = idx + 1;
                while batch.len() < MAX_PARALLEL_BASH {
                    match parsed.get(j) {
                        Some(Ok(a @ Action::Bash { .. })) => {
                            batch.push(a.clone());
                            j += 1;
                        }
                        _ => break,
                    }
                }
                let futures = batch.iter().map(|a| match a {
                    Action::Bash { cmd, block, timeout_secs, cwd } => {
                        sandbox.exec(cmd, *block, *timeout_secs, cwd.as_deref())
                    }
                    _ => unreachable!(),
                });
                let batch_results = futures::future::join_all(futures).await;
                for (action, result) in batch.into_iter().zip(batch_results) {
                    env_blocks.push(render_action_result(&action, &result));
                    real_actions.push(action);
                    real_results.push(result);
                }
                idx = j;
            }
            Ok(action) => {
                let (result, finished) = dispatch_one(action, agent_type, sandbox, search, state, temp_root).await;
                if let Some(report) = finished {
                    report_out = Some(report);
                }
                env_blocks.push(render_action_result(action, &result));
                real_actions.push(action.clone());
                real_results.push(result);
                idx += 1;
            }
        }
    }

    (real_actions, real_results, env_blocks, report_out)
}

async fn dispatch_one(
    action: &Action,
    agent_type: AgentType,
    sandbox: &SandboxExecutor,
    search: &SearchManager,
    state: &mut AgentState,
    temp_root: &Path,
) -> (ExecutionResult, Option<Report>) {
    match action {
        Action::Report { contexts, comments, final_status } => {
            let report = Report {
                contexts: contexts.clone(),
                comments: comments.clone(),
                task_id: String::new(), // filled in by the caller once the task id is known
                final_status: *final_status,
            };
            (ExecutionResult::success("report received"), Some(report))
        }
        Action::Reasoning { .. } => (ExecutionResult::success("noted"), None),
        other if other.is_orchestrator_only() => (
            ExecutionResult::error(
                ErrorKind::Capability,
                format!("<{}> is an orchestrator-only action", other.tag_name()),
            ),
            None,
        ),
        other => (dispatch_subagent_action(other, agent_type, sandbox, search, state, temp_root).await, None),
    }
}

fn forced_report(task: &Task, state: &AgentState, reason: &str) -> Report {
    let mut contexts = Vec::new();
    if !state.scratchpad_view().is_empty() {
        contexts.push(ContextDraft {
            id: format!("{}-forced-scratchpad", task.id),
            content: state.scratchpad_view().join("\n"),
        });
    }
    Report {
        contexts,
        comments: format!("forced report: {reason}"),
        task_id: task.id.clone(),
        final_status: FinalStatus::Forced,
    }
}

fn render_system_prompt(task: &Task, context_texts: &[(String, String)], bootstrap_texts: &[(String, String)]) -> String {
    let mut s = String::new();
    s.push_str(&format!("You are a {} subagent.\n", task.agent_type));
    if task.agent_type.can_write() {
        s.push_str("You may emit: file, search, bash, todo, scratchpad, report, reasoning.\n");
    } else {
        s.push_str(
            "You have read-only filesystem access. You may emit: file (read/metadata only), search, bash, todo, scratchpad, write_temp_script, report, reasoning.\n",
        );
    }
    s.push_str(&format!("\nTask: {}\n{}\n", task.title, task.description));

    if !context_texts.is_empty() {
        s.push_str("\nContext:\n");
        for (id, content) in context_texts {
            s.push_str(&format!("--- {id} ---\n{content}\n"));
        }
    }
    if !bootstrap_texts.is_empty() {
        s.push_str("\nBootstrap files:\n");
        for (path, content) in bootstrap_texts {
            s.push_str(&format!("--- {path} ---\n{content}\n"));
        }
    }
    s
}

fn render_turn_prompt(history: &History, state: &AgentState, warn_report: bool) -> String {
    let mut s = history.render();
    if !state.todos().is_empty() {
        s.push_str("\n<todos>\n");
        s.push_str(&state.todo_view_all().payload);
        s.push_str("\n</todos>\n");
    }
    if warn_report {
        s.push_str("\nYour turn budget is nearly exhausted. You must emit a <report> action next turn.\n");
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coercion_directive_only_appears_on_the_warn_turn() {
        let history = History::new();
        let state = AgentState::new();

        assert!(render_turn_prompt(&history, &state, true).contains("next turn"));
        assert!(!render_turn_prompt(&history, &state, false).contains("next turn"));
    }

    #[test]
    fn warn_turn_is_one_before_max_turns() {
        let max_turns = 3usize;
        let warn_turns: Vec<usize> =
            (1..=max_turns).filter(|&t| t == max_turns.saturating_sub(1)).collect();
        assert_eq!(warn_turns, vec![max_turns - 1]);
    }
}
