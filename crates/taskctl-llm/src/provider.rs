//! LLM Provider trait and error taxonomy.

use crate::types::{LlmRequest, LlmResponse};
use tokio_util::sync::CancellationToken;

pub type LlmResult<T> = Result<T, LlmError>;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("rate limited: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("context overflow: {0}")]
    ContextOverflow(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("cancelled")]
    Cancelled,

    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

impl LlmError {
    /// Transient failures the retry loop in `retry.rs` should retry: network
    /// blips, 5xx, and rate limiting. Auth failures, malformed responses, and
    /// context overflow are not — retrying them wastes the whole backoff budget
    /// on an error that will never resolve itself.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::NetworkError(_) | LlmError::RequestFailed(_) | LlmError::RateLimited { .. })
    }
}

#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    /// A single, non-streaming completion call. Returns accumulated text plus
    /// token usage; never yields partial output.
    async fn complete(&self, request: LlmRequest, cancel: Option<CancellationToken>) -> LlmResult<LlmResponse>;
}
