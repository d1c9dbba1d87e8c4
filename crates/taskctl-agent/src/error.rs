//! Errors that unwind out of the agent crate's own APIs, as opposed to
//! `ExecutionResult`s which are informational and flow back into a prompt.

#[derive(thiserror::Error, Debug)]
pub enum AgentError {
    #[error("parse error in <{tag}>: {message}")]
    Parse { tag: String, message: String },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("llm error: {0}")]
    Llm(#[from] taskctl_llm::LlmError),

    #[error(transparent)]
    Core(#[from] taskctl_core::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;
