//! Retry with exponential backoff for transient LLM failures. The provider
//! itself makes one attempt per call; this wraps it in the policy from the
//! configuration (reference: 3 attempts, 500ms base, factor 2, capped at 8s).

use crate::provider::{LlmError, LlmProvider, LlmResult};
use crate::types::LlmRequest;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &taskctl_core::Config) -> Self {
        Self {
            attempts: config.llm_retry_attempts,
            base_delay: config.llm_retry_base_delay,
            max_delay: config.llm_retry_max_delay,
        }
    }

    pub async fn call(
        &self,
        provider: &dyn LlmProvider,
        request: LlmRequest,
        cancel: Option<CancellationToken>,
    ) -> LlmResult<crate::types::LlmResponse> {
        let mut last_err = None;
        for attempt in 0..self.attempts.max(1) {
            if attempt > 0 {
                let delay = (self.base_delay * 2u32.pow(attempt - 1)).min(self.max_delay);
                warn!(attempt, delay_ms = delay.as_millis() as u64, "llm: retrying after transient failure");
                tokio::time::sleep(delay).await;
            }
            match provider.complete(request.clone(), cancel.clone()).await {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_retryable() && attempt + 1 < self.attempts => {
                    last_err = Some(e);
                    continue;
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or(LlmError::RequestFailed("exhausted retries".into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LlmMessage, LlmResponse, Usage};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct FlakyProvider {
        fail_times: u32,
        calls: Arc<AtomicU32>,
    }

    #[async_trait::async_trait]
    impl LlmProvider for FlakyProvider {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn complete(&self, _request: LlmRequest, _cancel: Option<CancellationToken>) -> LlmResult<LlmResponse> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_times {
                Err(LlmError::RequestFailed("503".into()))
            } else {
                Ok(LlmResponse { text: "ok".into(), usage: Usage::default() })
            }
        }
    }

    fn test_request() -> LlmRequest {
        LlmRequest {
            model: "m".into(),
            system: None,
            messages: vec![LlmMessage::user("hi")],
            temperature: 0.1,
            max_tokens: 100,
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures_within_budget() {
        let calls = Arc::new(AtomicU32::new(0));
        let provider = FlakyProvider { fail_times: 2, calls: calls.clone() };
        let policy = RetryPolicy { attempts: 3, base_delay: Duration::from_millis(1), max_delay: Duration::from_millis(5) };
        let result = policy.call(&provider, test_request(), None).await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn surfaces_failure_once_budget_exhausted() {
        let calls = Arc::new(AtomicU32::new(0));
        let provider = FlakyProvider { fail_times: 10, calls: calls.clone() };
        let policy = RetryPolicy { attempts: 3, base_delay: Duration::from_millis(1), max_delay: Duration::from_millis(5) };
        let result = policy.call(&provider, test_request(), None).await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_error_returns_immediately() {
        struct AuthFailingProvider;
        #[async_trait::async_trait]
        impl LlmProvider for AuthFailingProvider {
            fn name(&self) -> &str {
                "auth-failing"
            }
            async fn complete(&self, _r: LlmRequest, _c: Option<CancellationToken>) -> LlmResult<LlmResponse> {
                Err(LlmError::AuthFailed("bad key".into()))
            }
        }
        let policy = RetryPolicy { attempts: 3, base_delay: Duration::from_millis(1), max_delay: Duration::from_millis(5) };
        let result = policy.call(&AuthFailingProvider, test_request(), None).await;
        assert!(matches!(result, Err(LlmError::AuthFailed(_))));
    }
}
