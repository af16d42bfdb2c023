//! Backoff-controlled calls to a generative backend.
//!
//! Waits are `tokio::time::sleep` raced against a `CancellationToken`, so a
//! surrounding timeout or shutdown aborts a pending retry chain immediately.

use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::EngineSettings;
use crate::llm_client::{BackendError, GenerativeBackend};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    /// Added to a wait the backend suggested itself.
    pub buffer: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(10),
            buffer: Duration::from_secs(2),
        }
    }
}

impl From<&EngineSettings> for RetryPolicy {
    fn from(settings: &EngineSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            initial_delay: settings.initial_backoff,
            buffer: settings.suggested_wait_buffer,
        }
    }
}

impl RetryPolicy {
    /// Wait after the failed attempt with zero-based index `attempt`.
    pub fn delay_for(&self, attempt: u32, suggested: Option<Duration>) -> Duration {
        match suggested {
            Some(wait) => wait + self.buffer,
            None => self.initial_delay.saturating_mul(2u32.saturating_pow(attempt)),
        }
    }
}

#[derive(Debug, Error)]
pub enum RetryError {
    #[error("Rate limited on all {attempts} attempts: {message}")]
    Exhausted { attempts: u32, message: String },

    #[error("Generation cancelled")]
    Cancelled,

    #[error(transparent)]
    Permanent(BackendError),
}

/// Successful output together with the number of attempts it took.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryOutcome {
    pub text: String,
    pub attempts: u32,
}

/// Calls `backend` until it succeeds, fails with a non-rate-limit error, or the
/// attempt cap is reached. No wait follows the final attempt.
pub async fn call_with_retry(
    backend: &dyn GenerativeBackend,
    prompt: &str,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<RetryOutcome, RetryError> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled);
        }

        let result = tokio::select! {
            _ = cancel.cancelled() => return Err(RetryError::Cancelled),
            result = backend.generate(prompt) => result,
        };

        match result {
            Ok(text) => {
                debug!("{} answered on attempt {}", backend.name(), attempt + 1);
                return Ok(RetryOutcome {
                    text,
                    attempts: attempt + 1,
                });
            }
            Err(BackendError::RateLimited {
                message,
                suggested_wait,
            }) => {
                if attempt + 1 >= max_attempts {
                    return Err(RetryError::Exhausted {
                        attempts: max_attempts,
                        message,
                    });
                }
                let wait = policy.delay_for(attempt, suggested_wait);
                warn!(
                    "Rate limit hit. Waiting {:.1}s before retry {}/{}",
                    wait.as_secs_f64(),
                    attempt + 1,
                    max_attempts
                );
                tokio::select! {
                    _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                    _ = tokio::time::sleep(wait) => {}
                }
                attempt += 1;
            }
            Err(other) => return Err(RetryError::Permanent(other)),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Replays scripted responses and counts calls. Once the script runs out it
    /// keeps answering with `fallback`.
    pub(crate) struct ScriptedBackend {
        script: Mutex<VecDeque<Result<String, BackendError>>>,
        fallback: String,
        pub calls: AtomicUsize,
    }

    impl ScriptedBackend {
        pub(crate) fn new(script: Vec<Result<String, BackendError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                fallback: "ok".to_string(),
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn answering(text: &str) -> Self {
            Self {
                fallback: text.to_string(),
                ..Self::new(Vec::new())
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GenerativeBackend for ScriptedBackend {
        async fn generate(&self, _prompt: &str) -> Result<String, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(self.fallback.clone()))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    pub(crate) fn rate_limited(hint: Option<u64>) -> Result<String, BackendError> {
        Err(BackendError::RateLimited {
            message: "429 Quota exceeded".to_string(),
            suggested_wait: hint.map(Duration::from_secs),
        })
    }

    #[test]
    fn test_delay_doubles_from_initial() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0, None), Duration::from_secs(10));
        assert_eq!(policy.delay_for(1, None), Duration::from_secs(20));
        assert_eq!(policy.delay_for(3, None), Duration::from_secs(80));
    }

    #[test]
    fn test_suggested_wait_overrides_backoff_plus_buffer() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.delay_for(3, Some(Duration::from_secs(30))),
            Duration::from_secs(32)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_rate_limit_then_succeeds() {
        let backend = ScriptedBackend::new(vec![
            rate_limited(None),
            rate_limited(None),
            Ok("answer".into()),
        ]);
        let start = Instant::now();
        let outcome = call_with_retry(
            &backend,
            "prompt",
            &RetryPolicy::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(outcome.text, "answer");
        assert_eq!(outcome.attempts, 3);
        assert_eq!(backend.calls(), 3);
        // 10s then 20s of virtual time.
        assert!(start.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_suggested_wait_is_honoured() {
        let backend = ScriptedBackend::new(vec![rate_limited(Some(3)), Ok("done".into())]);
        let start = Instant::now();
        call_with_retry(
            &backend,
            "prompt",
            &RetryPolicy::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(5));
        assert!(elapsed < Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_cap_surfaces_exhausted() {
        let backend = ScriptedBackend::new((0..10).map(|_| rate_limited(None)).collect());
        let policy = RetryPolicy {
            max_attempts: 3,
            ..RetryPolicy::default()
        };
        let err = call_with_retry(&backend, "prompt", &policy, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RetryError::Exhausted { attempts: 3, .. }));
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_is_not_retried() {
        let backend = ScriptedBackend::new(vec![Err(BackendError::Api {
            status: 400,
            message: "bad request".into(),
        })]);
        let err = call_with_retry(
            &backend,
            "prompt",
            &RetryPolicy::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RetryError::Permanent(BackendError::Api { status: 400, .. })));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_aborts_pending_backoff() {
        let backend = ScriptedBackend::new(vec![rate_limited(None)]);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });
        let err = call_with_retry(&backend, "prompt", &RetryPolicy::default(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, RetryError::Cancelled));
        assert_eq!(backend.calls(), 1);
    }
}
