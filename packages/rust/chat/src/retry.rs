//! Bounded retry around chat calls.
//!
//! Every [`RankPagesError::Service`] failure is followed by an exponentially
//! growing, jittered wait, up to `max_attempts` attempts in total. Any other
//! error is returned immediately.

use std::time::Duration;

use tracing::{debug, warn};
use uuid::Uuid;

use rankpages_shared::{RankPagesError, Result, RetryConfig};

use crate::{ChatRequest, ChatService};

/// Largest exponent applied to the base delay.
const MAX_BACKOFF_EXPONENT: u32 = 20;

/// Retry limits and backoff shape.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per call, including the first. At least 1.
    pub max_attempts: u32,
    /// Wait after the first failure.
    pub base_delay: Duration,
    /// Upper bound for any single wait.
    pub max_delay: Duration,
    /// Stretch each wait by a random 0–50 %.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.base_delay(),
            max_delay: config.max_delay(),
            jitter: config.jitter,
        }
    }
}

impl RetryPolicy {
    /// Wait before the attempt following the `failures`-th failure (1-based).
    pub fn delay_for(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
        let backoff = self.base_delay.saturating_mul(1 << exponent);

        let delay = if self.jitter {
            backoff + backoff.mul_f64(0.5 * jitter_fraction())
        } else {
            backoff
        };

        delay.min(self.max_delay)
    }
}

/// Uniform value in `[0, 1)` taken from the random bits of a UUID v7.
fn jitter_fraction() -> f64 {
    let random_bits = (Uuid::now_v7().as_u128() as u64) & ((1 << 53) - 1);
    random_bits as f64 / (1u64 << 53) as f64
}

/// Notified after each failed attempt.
pub trait RetryObserver: Send + Sync {
    /// `failures` counts failed attempts so far; `next_delay` is `None` when
    /// the retry budget is spent and the call is about to give up.
    fn on_failure(&self, failures: u32, error: &RankPagesError, next_delay: Option<Duration>);
}

/// Observer that ignores all notifications.
pub struct NoopRetryObserver;

impl RetryObserver for NoopRetryObserver {
    fn on_failure(&self, _failures: u32, _error: &RankPagesError, _next_delay: Option<Duration>) {}
}

/// Call `service` until it succeeds or the policy's attempt budget runs out.
///
/// Exhaustion yields [`RankPagesError::RetriesExhausted`] carrying the last
/// failure. Non-retryable errors are returned as they are.
pub async fn complete_with_retry<S: ChatService>(
    service: &S,
    request: &ChatRequest,
    policy: &RetryPolicy,
    observer: &dyn RetryObserver,
) -> Result<String> {
    let max_attempts = policy.max_attempts.max(1);
    let mut failures = 0u32;

    loop {
        match service.complete(request).await {
            Ok(text) => {
                if failures > 0 {
                    debug!(failures, "chat call succeeded after retries");
                }
                return Ok(text);
            }
            Err(e) if e.is_retryable() => {
                failures += 1;

                if failures >= max_attempts {
                    warn!(failures, error = %e, "chat call failed, giving up");
                    observer.on_failure(failures, &e, None);
                    return Err(RankPagesError::RetriesExhausted {
                        attempts: failures,
                        last_error: e.to_string(),
                    });
                }

                let delay = policy.delay_for(failures);
                warn!(
                    failures,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "chat call failed, retrying"
                );
                observer.on_failure(failures, &e, Some(delay));
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    /// Fails the first `failures` calls, then answers with the call number.
    struct FlakyService {
        failures: u32,
        calls: AtomicU32,
    }

    impl FlakyService {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
            }
        }
    }

    impl ChatService for FlakyService {
        async fn complete(&self, _request: &ChatRequest) -> Result<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                Err(RankPagesError::Service(format!("boom {call}")))
            } else {
                Ok(format!("response {call}"))
            }
        }
    }

    struct BrokenTemplateService;

    impl ChatService for BrokenTemplateService {
        async fn complete(&self, _request: &ChatRequest) -> Result<String> {
            Err(RankPagesError::validation("not a service failure"))
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        events: Mutex<Vec<(u32, Option<Duration>)>>,
    }

    impl RetryObserver for RecordingObserver {
        fn on_failure(&self, failures: u32, _error: &RankPagesError, next_delay: Option<Duration>) {
            self.events.lock().unwrap().push((failures, next_delay));
        }
    }

    fn request() -> ChatRequest {
        ChatRequest {
            prompt: "p".into(),
            model: "m".into(),
            timeout: Duration::from_secs(1),
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
            jitter: false,
        }
    }

    #[tokio::test]
    async fn two_failures_then_success() {
        let service = FlakyService::new(2);
        let observer = RecordingObserver::default();

        let text = complete_with_retry(&service, &request(), &fast_policy(5), &observer)
            .await
            .unwrap();

        assert_eq!(text, "response 3");
        assert_eq!(service.calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            *observer.events.lock().unwrap(),
            vec![
                (1, Some(Duration::from_millis(1))),
                (2, Some(Duration::from_millis(2))),
            ]
        );
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let service = FlakyService::new(u32::MAX);
        let observer = RecordingObserver::default();

        let err = complete_with_retry(&service, &request(), &fast_policy(3), &observer)
            .await
            .unwrap_err();

        match err {
            RankPagesError::RetriesExhausted {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("boom 3"));
            }
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
        assert_eq!(service.calls.load(Ordering::SeqCst), 3);

        let events = observer.events.lock().unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[2], (3, None));
    }

    #[tokio::test]
    async fn single_attempt_policy_never_waits() {
        let service = FlakyService::new(1);
        let observer = RecordingObserver::default();

        let err = complete_with_retry(&service, &request(), &fast_policy(1), &observer)
            .await
            .unwrap_err();

        assert!(matches!(err, RankPagesError::RetriesExhausted { attempts: 1, .. }));
        assert_eq!(*observer.events.lock().unwrap(), vec![(1, None)]);
    }

    #[tokio::test]
    async fn non_service_errors_are_not_retried() {
        let observer = RecordingObserver::default();

        let err = complete_with_retry(&BrokenTemplateService, &request(), &fast_policy(5), &observer)
            .await
            .unwrap_err();

        assert!(matches!(err, RankPagesError::Validation { .. }));
        assert!(observer.events.lock().unwrap().is_empty());
    }

    #[test]
    fn backoff_doubles_and_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_secs(3),
            max_delay: Duration::from_secs(20),
            jitter: false,
        };

        assert_eq!(policy.delay_for(1), Duration::from_secs(3));
        assert_eq!(policy.delay_for(2), Duration::from_secs(6));
        assert_eq!(policy.delay_for(3), Duration::from_secs(12));
        assert_eq!(policy.delay_for(4), Duration::from_secs(20));
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(20));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_secs(3),
            max_delay: Duration::from_secs(60),
            jitter: true,
        };

        for _ in 0..100 {
            let delay = policy.delay_for(2);
            assert!(delay >= Duration::from_secs(6));
            assert!(delay <= Duration::from_secs(9));
        }
        assert_eq!(policy.delay_for(30), Duration::from_secs(60));
    }

    #[test]
    fn policy_from_default_config() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay, Duration::from_secs(3));
        assert!(policy.jitter);
    }

    #[tokio::test]
    async fn retries_against_http_service() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(
                serde_json::json!({ "choices": [{ "message": { "content": "third time" } }] }),
            ))
            .mount(&server)
            .await;

        let client = crate::ChatClient::new(server.uri(), "k").unwrap();
        let observer = RecordingObserver::default();

        let text = complete_with_retry(&client, &request(), &fast_policy(5), &observer)
            .await
            .unwrap();

        assert_eq!(text, "third time");
        assert_eq!(observer.events.lock().unwrap().len(), 2);
    }
}
