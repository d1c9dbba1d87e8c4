//! Environment-driven configuration, resolved once at process start.
//!
//! Nothing downstream reads `std::env` directly — every tunable the runtime
//! needs flows through this struct, built once in `Config::from_env` and
//! threaded explicitly into constructors.

use crate::error::Error;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    pub model: String,
    pub temperature: f32,
    pub api_key: String,
    pub api_base: String,
    pub max_orch_turns: usize,
    pub max_explorer_turns: usize,
    pub max_coder_turns: usize,
    pub turn_log_dir: Option<String>,
    pub bash_default_timeout: Duration,
    pub bash_max_timeout: Duration,
    pub bash_output_limit_bytes: usize,
    pub search_result_limit: usize,
    pub llm_retry_attempts: u32,
    pub llm_retry_base_delay: Duration,
    pub llm_retry_max_delay: Duration,
}

const DEFAULT_MODEL: &str = "anthropic/claude-sonnet-4-5";
const DEFAULT_API_BASE: &str = "https://api.anthropic.com/v1/messages";

impl Config {
    /// Resolve configuration from environment variables, applying reference defaults.
    /// Missing `LITE_LLM_API_KEY` or an unparsable `LITELLM_TEMPERATURE` is `Fatal`.
    pub fn from_env() -> Result<Self, Error> {
        let api_key = std::env::var("LITE_LLM_API_KEY")
            .map_err(|_| Error::config("LITE_LLM_API_KEY must be set"))?;

        let temperature = match std::env::var("LITELLM_TEMPERATURE") {
            Ok(raw) => raw
                .parse::<f32>()
                .map_err(|_| Error::config(format!("LITELLM_TEMPERATURE '{}' is not a float", raw)))?,
            Err(_) => 0.1,
        };

        Ok(Self {
            model: std::env::var("LITELLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            temperature,
            api_key,
            api_base: std::env::var("LITE_LLM_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            max_orch_turns: env_usize("MAX_ORCH_TURNS", 100)?,
            max_explorer_turns: env_usize("MAX_EXPLORER_TURNS", 15)?,
            max_coder_turns: env_usize("MAX_CODER_TURNS", 25)?,
            turn_log_dir: std::env::var("TASKCTL_LOG_DIR").ok(),
            bash_default_timeout: Duration::from_secs(30),
            bash_max_timeout: Duration::from_secs(300),
            bash_output_limit_bytes: 100 * 1024,
            search_result_limit: 1000,
            llm_retry_attempts: 3,
            llm_retry_base_delay: Duration::from_millis(500),
            llm_retry_max_delay: Duration::from_secs(8),
        })
    }

    /// Construct a config suitable for tests: no environment lookups, fixed small budgets.
    pub fn for_test() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.1,
            api_key: "test-key".to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            max_orch_turns: 10,
            max_explorer_turns: 5,
            max_coder_turns: 5,
            turn_log_dir: None,
            bash_default_timeout: Duration::from_secs(30),
            bash_max_timeout: Duration::from_secs(300),
            bash_output_limit_bytes: 100 * 1024,
            search_result_limit: 1000,
            llm_retry_attempts: 3,
            llm_retry_base_delay: Duration::from_millis(1),
            llm_retry_max_delay: Duration::from_millis(10),
        }
    }

    pub fn max_turns_for(&self, agent_type: crate::types::AgentType) -> usize {
        match agent_type {
            crate::types::AgentType::Explorer => self.max_explorer_turns,
            crate::types::AgentType::Coder => self.max_coder_turns,
        }
    }
}

fn env_usize(key: &str, default: usize) -> Result<usize, Error> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<usize>()
            .map_err(|_| Error::config(format!("{} '{}' is not a non-negative integer", key, raw))),
        Err(_) => Ok(default),
    }
}
