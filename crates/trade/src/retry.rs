use std::future::Future;
use std::time::Duration;

use serde_json::Value;
use tracing::error;

use interface::{ExchangeError, TradingError};

use crate::audit::{AuditEntry, AuditSink};
use crate::classifier::translate;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;
/// Backoff growth stops here; a longer initial delay or `Retry-After` is kept.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(300);

/// One exchange call as it appears in the audit log.
#[derive(Debug, Clone)]
pub struct ApiCall {
    pub method: &'static str,
    pub endpoint: &'static str,
    pub params: Option<Value>,
}

impl ApiCall {
    pub fn new(method: &'static str, endpoint: &'static str) -> Self {
        Self {
            method,
            endpoint,
            params: None,
        }
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }
}

/// Bounded retry with exponential backoff.
///
/// `max_retries` is the total number of attempts, the first call included.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: DEFAULT_INITIAL_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration, backoff_multiplier: f64) -> Self {
        Self {
            max_retries,
            initial_delay,
            backoff_multiplier,
        }
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable kind, or
    /// the attempt budget is spent.
    ///
    /// Every failure is classified where it is first seen and returned with the
    /// same kind however many attempts were made. Rate limited attempts wait
    /// at least the server's `Retry-After`. Attempts never overlap: the wait
    /// runs inside the calling task between them.
    pub async fn execute<T, F, Fut>(
        &self,
        call: &ApiCall,
        sink: &dyn AuditSink,
        mut operation: F,
    ) -> Result<T, TradingError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ExchangeError>>,
    {
        let max_attempts = self.max_retries.max(1);
        let mut delay = self.initial_delay;
        let mut attempt = 1;

        loop {
            sink.record(&AuditEntry::ApiRequest {
                method: call.method,
                endpoint: call.endpoint,
                params: call.params.clone(),
                attempt,
            });

            let err = match operation().await {
                Ok(value) => {
                    sink.record(&AuditEntry::ApiResponse {
                        endpoint: call.endpoint,
                        attempt,
                        error: None,
                    });
                    return Ok(value);
                }
                Err(e) => translate(e),
            };

            sink.record(&AuditEntry::ApiResponse {
                endpoint: call.endpoint,
                attempt,
                error: Some(err.clone()),
            });

            if !err.is_retryable() {
                return Err(err);
            }

            if attempt >= max_attempts {
                error!(
                    endpoint = call.endpoint,
                    attempts = attempt,
                    "Max retries exceeded: {}",
                    err
                );
                return Err(err);
            }

            if let Some(retry_after) = err.retry_after() {
                delay = delay.max(retry_after);
            }
            sink.record(&AuditEntry::RetryScheduled {
                endpoint: call.endpoint,
                attempt,
                delay,
            });

            tokio::time::sleep(delay).await;
            delay = self.next_delay(delay);
            attempt += 1;
        }
    }

    /// `delay * backoff_multiplier`, capped at [`MAX_RETRY_DELAY`].
    ///
    /// A negative or NaN multiplier keeps the delay unchanged instead of
    /// failing the caller.
    fn next_delay(&self, delay: Duration) -> Duration {
        let multiplier = self.backoff_multiplier;
        if multiplier.is_nan() || multiplier < 0.0 {
            return delay;
        }
        let ceiling = MAX_RETRY_DELAY.max(delay);
        match Duration::try_from_secs_f64(delay.as_secs_f64() * multiplier) {
            Ok(next) => next.min(ceiling),
            Err(_) => ceiling,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use interface::ErrorKind;

    use super::*;
    use crate::audit::MemoryAuditSink;

    fn api_error(code: i64, retry_after: Option<Duration>) -> ExchangeError {
        ExchangeError::Api {
            code,
            message: String::new(),
            retry_after,
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(100), 2.0)
    }

    fn call() -> ApiCall {
        ApiCall::new("GET", "/fapi/v2/balance")
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_first_attempt() {
        let sink = MemoryAuditSink::new();
        let result = policy()
            .execute(&call(), &sink, || async { Ok::<_, ExchangeError>(42) })
            .await;

        assert_eq!(result, Ok(42));
        assert_eq!(sink.attempts(), 1);
        assert!(sink.retry_delays().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_exhausts_budget() {
        let sink = MemoryAuditSink::new();
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy()
            .execute(&call(), &sink, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(api_error(-1003, None)) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.unwrap_err().kind(), ErrorKind::RateLimited);
        assert_eq!(sink.attempts(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_request_is_not_retried() {
        let sink = MemoryAuditSink::new();
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy()
            .execute(&call(), &sink, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(api_error(-1121, None)) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert_eq!(err.code(), Some(-1121));
        assert!(sink.retry_delays().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_insufficient_balance_is_not_retried() {
        let sink = MemoryAuditSink::new();
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy()
            .execute(&call(), &sink, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(api_error(-2019, None)) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.unwrap_err().kind(), ErrorKind::InsufficientBalance);
    }

    #[tokio::test(start_paused = true)]
    async fn test_order_rejected_uses_full_budget() {
        let sink = MemoryAuditSink::new();
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy()
            .execute(&call(), &sink, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(api_error(-2011, None)) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OrderRejected);
        assert_eq!(err.code(), Some(-2011));
        assert_eq!(
            sink.retry_delays(),
            vec![Duration::from_millis(100), Duration::from_millis(200)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_order_error_is_not_retried() {
        let sink = MemoryAuditSink::new();
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy()
            .execute(&call(), &sink, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ExchangeError::Order("status 502".to_string())) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.unwrap_err().kind(), ErrorKind::OrderPlacementFailure);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fails_twice_then_succeeds_with_backoff() {
        let sink = MemoryAuditSink::new();
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result = policy()
            .execute(&call(), &sink, || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(api_error(-1007, None))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(sink.attempts(), 3);
        assert_eq!(
            sink.retry_delays(),
            vec![Duration::from_millis(100), Duration::from_millis(200)]
        );
        assert!(started.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_honors_longer_retry_after() {
        let sink = MemoryAuditSink::new();
        let calls = AtomicU32::new(0);

        let result = policy()
            .execute(&call(), &sink, || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(api_error(-1003, Some(Duration::from_secs(2))))
                    } else {
                        Ok(())
                    }
                }
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(sink.retry_delays(), vec![Duration::from_secs(2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_longer_than_retry_after_wins() {
        let sink = MemoryAuditSink::new();
        let calls = AtomicU32::new(0);

        let result = RetryPolicy::new(3, Duration::from_secs(5), 2.0)
            .execute(&call(), &sink, || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(api_error(-1003, Some(Duration::from_secs(1))))
                    } else {
                        Ok(())
                    }
                }
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(
            sink.retry_delays(),
            vec![Duration::from_secs(5), Duration::from_secs(10)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_bad_multiplier_keeps_delay() {
        for multiplier in [-1.0, f64::NAN] {
            let sink = MemoryAuditSink::new();
            let result: Result<(), _> = RetryPolicy::new(3, Duration::from_millis(10), multiplier)
                .execute(&call(), &sink, || async { Err(api_error(-1001, None)) })
                .await;

            assert_eq!(result.unwrap_err().kind(), ErrorKind::ConnectionFailure);
            assert_eq!(sink.attempts(), 3);
            assert_eq!(
                sink.retry_delays(),
                vec![Duration::from_millis(10), Duration::from_millis(10)]
            );
        }
    }

    #[test]
    fn test_next_delay_saturates() {
        let policy = policy();
        assert_eq!(
            policy.next_delay(Duration::from_millis(100)),
            Duration::from_millis(200)
        );
        assert_eq!(policy.next_delay(Duration::from_secs(200)), MAX_RETRY_DELAY);
        assert_eq!(policy.next_delay(Duration::MAX), Duration::MAX);

        let policy = RetryPolicy::new(3, Duration::from_secs(1), f64::INFINITY);
        assert_eq!(policy.next_delay(Duration::from_secs(1)), MAX_RETRY_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_code_is_retried_then_raised() {
        let sink = MemoryAuditSink::new();

        let result: Result<(), _> = RetryPolicy::new(2, Duration::from_millis(10), 3.0)
            .execute(&call(), &sink, || async { Err(api_error(-9999, None)) })
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unclassified);
        assert!(err.message().contains("-9999"));
        assert_eq!(sink.attempts(), 2);
        assert_eq!(sink.retry_delays(), vec![Duration::from_millis(10)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_budget_still_attempts_once() {
        let sink = MemoryAuditSink::new();
        let result: Result<(), _> = RetryPolicy::new(0, Duration::from_millis(10), 2.0)
            .execute(&call(), &sink, || async { Err(api_error(-1001, None)) })
            .await;

        assert_eq!(result.unwrap_err().kind(), ErrorKind::ConnectionFailure);
        assert_eq!(sink.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_attempt_is_reported() {
        let sink = MemoryAuditSink::new();
        let calls = AtomicU32::new(0);

        let _ = policy()
            .execute(&call(), &sink, || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(api_error(-1001, None))
                    } else {
                        Ok(())
                    }
                }
            })
            .await;

        let responses: Vec<bool> = sink
            .entries()
            .into_iter()
            .filter_map(|e| match e {
                AuditEntry::ApiResponse { error, .. } => Some(error.is_none()),
                _ => None,
            })
            .collect();
        assert_eq!(responses, vec![false, true]);
    }
}
