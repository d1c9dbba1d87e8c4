//! Process-fatal error taxonomy.
//!
//! Most failures in this system are *not* Rust errors: a malformed action,
//! a missing context ref, a capability violation — these are surfaced as
//! `ExecutionResult`s (see `types.rs`) and fed back into the next prompt so
//! the model can self-correct. `Error` here is reserved for the smaller set
//! of conditions that abort the top-level task outright: bad configuration,
//! an unreachable sandbox, or an I/O failure while persisting turn logs.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("sandbox unreachable: {0}")]
    SandboxUnreachable(String),

    #[error("llm error: {0}")]
    Llm(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
