// src/execution/retry.rs
use log::{debug, error, warn};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::time::{self, Duration};

use super::error::ExecutionError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(30),
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryConfig {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }
}

/// Hands out request ids for log correlation. Ids are unique per clock, not
/// ordered by wall-clock time across tasks.
#[derive(Debug, Default)]
pub struct RequestClock {
    last: AtomicU64,
}

impl RequestClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> u64 {
        self.last.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryContext {
    pub request_id: u64,
    pub attempt: u32,
    pub max_attempts: u32,
}

pub enum OperationEvent<'a> {
    Started,
    Completed,
    AttemptFailed { error: &'a ExecutionError, delay: Duration },
    Failed(&'a ExecutionError),
}

pub fn log_operation(context: &RetryContext, name: &str, event: OperationEvent<'_>) {
    match event {
        OperationEvent::Started => {
            debug!("[{}] {} started", context.request_id, name);
        }
        OperationEvent::Completed => {
            debug!(
                "[{}] {} completed (attempt {}/{})",
                context.request_id, name, context.attempt, context.max_attempts
            );
        }
        OperationEvent::AttemptFailed { error, delay } => {
            warn!(
                "[{}] {} failed (attempt {}/{}): {}. Retrying in {:?}...",
                context.request_id, name, context.attempt, context.max_attempts, error, delay
            );
        }
        OperationEvent::Failed(error) => {
            error!(
                "[{}] {} failed (attempt {}/{}): {}",
                context.request_id, name, context.attempt, context.max_attempts, error
            );
        }
    }
}

/// Delay to wait before `next_attempt` (1-based). The first attempt never waits.
pub fn calculate_backoff(next_attempt: u32, base_delay: Duration) -> Duration {
    if next_attempt <= 1 {
        return Duration::ZERO;
    }

    let factor = 2u32.saturating_pow(next_attempt - 1);
    base_delay.saturating_mul(factor)
}

/// Races `operation` against a timer. The loser is dropped, so a late
/// settlement can never reach the caller.
pub async fn race<T, Fut>(operation: Fut, limit: Duration) -> Result<T, ExecutionError>
where
    Fut: Future<Output = Result<T, ExecutionError>>,
{
    match time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => Err(ExecutionError::TimeoutError(limit)),
    }
}

#[derive(Debug, Clone)]
pub struct ResilientClient {
    config: RetryConfig,
    clock: Arc<RequestClock>,
}

impl Default for ResilientClient {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl ResilientClient {
    pub fn new(config: RetryConfig) -> Self {
        Self::with_clock(config, Arc::new(RequestClock::new()))
    }

    pub fn with_clock(config: RetryConfig, clock: Arc<RequestClock>) -> Self {
        Self { config, clock }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<RequestClock> {
        &self.clock
    }

    pub fn next_request_id(&self) -> u64 {
        self.clock.next_id()
    }

    pub async fn execute<T, F, Fut>(&self, name: &str, operation: F) -> Result<T, ExecutionError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ExecutionError>>,
    {
        self.execute_with(name, &self.config, operation).await
    }

    pub async fn execute_with<T, F, Fut>(
        &self,
        name: &str,
        config: &RetryConfig,
        operation: F,
    ) -> Result<T, ExecutionError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ExecutionError>>,
    {
        self.execute_as(self.next_request_id(), name, config, operation).await
    }

    /// Same as [`execute_with`](Self::execute_with) under a request id the
    /// caller already allocated, e.g. one that doubles as a JSON-RPC id.
    pub async fn execute_as<T, F, Fut>(
        &self,
        request_id: u64,
        name: &str,
        config: &RetryConfig,
        mut operation: F,
    ) -> Result<T, ExecutionError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ExecutionError>>,
    {
        let mut context = RetryContext {
            request_id,
            attempt: 0,
            max_attempts: config.max_attempts.max(1),
        };
        log_operation(&context, name, OperationEvent::Started);

        loop {
            context.attempt += 1;
            match race(operation(), config.attempt_timeout).await {
                Ok(value) => {
                    log_operation(&context, name, OperationEvent::Completed);
                    return Ok(value);
                }
                Err(error) if !error.is_retryable() => {
                    log_operation(&context, name, OperationEvent::Failed(&error));
                    return Err(error);
                }
                Err(error) if context.attempt >= context.max_attempts => {
                    let error = ExecutionError::RetriesExhausted {
                        operation: name.to_string(),
                        attempts: context.attempt,
                        source: Box::new(error),
                    };
                    log_operation(&context, name, OperationEvent::Failed(&error));
                    return Err(error);
                }
                Err(error) => {
                    let delay = calculate_backoff(context.attempt + 1, config.base_delay);
                    log_operation(&context, name, OperationEvent::AttemptFailed { error: &error, delay });
                    time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, AtomicU32};
    use std::sync::Mutex;
    use tokio::time::Instant;

    #[test]
    fn backoff_doubles_from_base() {
        let base = Duration::from_millis(1000);
        assert_eq!(calculate_backoff(1, base), Duration::ZERO);
        assert_eq!(calculate_backoff(2, base), Duration::from_secs(2));
        assert_eq!(calculate_backoff(3, base), Duration::from_secs(4));
        assert_eq!(calculate_backoff(4, base), Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn fails_twice_then_succeeds_after_two_and_four_seconds() {
        let client = ResilientClient::default();
        let calls = AtomicU32::new(0);
        let started_at = Mutex::new(Vec::new());

        let value = client
            .execute("getQuote", || {
                started_at.lock().unwrap().push(Instant::now());
                let attempt = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if attempt < 3 {
                        Err(ExecutionError::NetworkError("connection reset".into()))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let started_at = started_at.lock().unwrap();
        assert_eq!(started_at[1] - started_at[0], Duration::from_secs(2));
        assert_eq!(started_at[2] - started_at[1], Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_attempts_name_the_operation() {
        let client = ResilientClient::default();
        let calls = AtomicU32::new(0);

        let error = client
            .execute("getQuote", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(ExecutionError::HttpStatus { status: 503, body: String::new() }) }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match &error {
            ExecutionError::RetriesExhausted { operation, attempts, source } => {
                assert_eq!(operation, "getQuote");
                assert_eq!(*attempts, 3);
                assert!(matches!(**source, ExecutionError::HttpStatus { status: 503, .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(error.to_string().contains("getQuote failed after 3 attempts"));
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_errors_do_not_consume_attempts() {
        let client = ResilientClient::default();
        let calls = AtomicU32::new(0);

        let error = client
            .execute("sendTransaction", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err::<(), _>(ExecutionError::RpcError {
                        code: -32002,
                        message: "Transaction simulation failed".into(),
                    })
                }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(error, ExecutionError::RpcError { code: -32002, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_attempts_time_out_and_the_loser_is_discarded() {
        let client = ResilientClient::new(
            RetryConfig::default()
                .with_max_attempts(2)
                .with_attempt_timeout(Duration::from_secs(30)),
        );
        let settled = Arc::new(AtomicBool::new(false));

        let error = client
            .execute("getBlockHeight", || {
                let settled = settled.clone();
                async move {
                    time::sleep(Duration::from_secs(60)).await;
                    settled.store(true, Ordering::SeqCst);
                    Ok(1u64)
                }
            })
            .await
            .unwrap_err();

        assert!(matches!(
            error.root_cause(),
            ExecutionError::TimeoutError(limit) if *limit == Duration::from_secs(30)
        ));

        time::sleep(Duration::from_secs(120)).await;
        assert!(!settled.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn request_ids_stay_unique_across_tasks() {
        let clock = Arc::new(RequestClock::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let clock = clock.clone();
            handles.push(tokio::spawn(async move {
                (0..500).map(|_| clock.next_id()).collect::<Vec<_>>()
            }));
        }

        let mut ids = HashSet::new();
        for handle in handles {
            ids.extend(handle.await.unwrap());
        }
        assert_eq!(ids.len(), 4000);
        assert!(!ids.contains(&0));
    }
}
