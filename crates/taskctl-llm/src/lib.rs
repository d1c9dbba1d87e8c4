//! taskctl-llm — a plain-text completion client: request/response types, the
//! `LlmProvider` trait, a concrete Anthropic Messages API adapter, and the
//! retry-with-backoff policy that wraps it.

pub mod anthropic;
pub mod provider;
pub mod retry;
pub mod types;

pub use anthropic::AnthropicProvider;
pub use provider::{LlmError, LlmProvider, LlmResult};
pub use retry::RetryPolicy;
pub use types::*;
