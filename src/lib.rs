//! taskctl — a hierarchical multi-agent controller for terminal-based
//! engineering tasks.
//!
//! The public surface is [`perform_task`]: given a natural-language
//! instruction and a resolved [`Config`], it drives an Orchestrator to
//! completion and returns the final message plus run statistics. Everything
//! else in this crate (the action parser, the sandboxed executors, the hub,
//! the subagent/orchestrator turn loops) lives in `taskctl-core`,
//! `taskctl-sandbox`, `taskctl-llm`, and `taskctl-agent`; this crate only
//! wires them together.

pub mod error;

pub use error::{Result, TaskctlError};
pub use taskctl_agent::{OrchestratorOutcome, Stats};
pub use taskctl_core::Config;

use std::path::Path;

use taskctl_agent::hub::Hub;
use taskctl_agent::turnlog::TurnLogger;
use taskctl_llm::anthropic::AnthropicProvider;
use taskctl_llm::{LlmProvider, RetryPolicy};
use taskctl_sandbox::{SandboxExecutor, SearchManager};

/// Resolves configuration from the environment. The only fallible step at
/// this crate's edge — a missing key or unparsable float is a `Fatal`
/// config error surfaced before any agent loop starts.
pub fn resolve_config() -> Result<Config> {
    Config::from_env().map_err(TaskctlError::from)
}

/// Runs one top-level task to completion.
///
/// `temp_root` bounds where Explorer subagents may write scratch scripts via
/// `write_temp_script`; the benchmark harness supplies the container's
/// scratch directory here.
pub async fn perform_task(instruction: &str, config: Config, temp_root: &Path) -> OrchestratorOutcome {
    let provider = AnthropicProvider::new(config.api_key.clone(), config.api_base.clone());
    perform_task_with_provider(instruction, config, temp_root, &provider).await
}

/// Same as [`perform_task`] but takes an explicit [`LlmProvider`] — the seam
/// tests (and alternative model backends) hang off.
pub async fn perform_task_with_provider(
    instruction: &str,
    config: Config,
    temp_root: &Path,
    provider: &dyn LlmProvider,
) -> OrchestratorOutcome {
    let hub = Hub::new();
    let retry = RetryPolicy::from_config(&config);
    let sandbox = SandboxExecutor::from_config(&config);
    let search = SearchManager::new(config.search_result_limit);
    let turn_logger = TurnLogger::new(config.turn_log_dir.as_deref());

    taskctl_agent::run_orchestrator(instruction, &hub, provider, &retry, &sandbox, &search, &config, &turn_logger, temp_root)
        .await
}
