//! Bounded retry with escalating per-attempt timeouts
//!
//! Attempt *n* (1-based) is given `n × base_timeout`. Attempts follow each other
//! immediately; the growing timeout is the only escalation. Retrying stops as
//! soon as the server answers 200, including a 200 whose body is not JSON. The policy knows
//! nothing about domains: paginated runs call it once per page.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::domain::outcome::{FetchFailure, FetchOutcome, TransportErrorKind};
use crate::domain::task::RetrievalParams;
use crate::infrastructure::http_client::{ApiRequest, FetchClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_timeout: Duration,
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least one attempt
    #[must_use]
    pub fn new(max_attempts: u32, base_timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_timeout,
        }
    }

    #[must_use]
    pub fn from_params(params: &RetrievalParams) -> Self {
        Self::new(params.max_attempts, params.base_timeout)
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Timeout of the 1-based `attempt`
    #[must_use]
    pub fn timeout_for_attempt(&self, attempt: u32) -> Duration {
        self.base_timeout.saturating_mul(attempt.max(1))
    }

    /// Run `request` until it succeeds or the attempts are used up
    pub async fn execute(&self, client: &dyn FetchClient, request: &ApiRequest) -> FetchOutcome {
        let mut last_failure = None;

        for attempt in 1..=self.max_attempts {
            let timeout = self.timeout_for_attempt(attempt);
            debug!(
                "🔄 {} attempt {}/{} (timeout {:?})",
                request.key, attempt, self.max_attempts, timeout
            );

            match client.fetch(request, timeout).await {
                Ok(payload) => {
                    info!(
                        "✅ {} (page {:?}) succeeded on attempt {}",
                        request.key, request.page, attempt
                    );
                    return FetchOutcome::Success {
                        payload,
                        attempts: attempt,
                    };
                }
                Err(failure) if !failure.is_retryable() => {
                    warn!(
                        "❌ {} (page {:?}) answered 200 with an unusable body, not retrying: {}",
                        request.key, request.page, failure
                    );
                    return FetchOutcome::Failure {
                        failure,
                        attempts: attempt,
                    };
                }
                Err(failure) => {
                    warn!(
                        "⚠️ Attempt {}/{} failed for {} (page {:?}): {}",
                        attempt, self.max_attempts, request.key, request.page, failure
                    );
                    last_failure = Some(failure);
                }
            }
        }

        let failure = last_failure.unwrap_or_else(|| {
            FetchFailure::transport(TransportErrorKind::Internal, "no attempt was made")
        });
        warn!(
            "❌ {} failed after {} attempts: {}",
            request.key, self.max_attempts, failure
        );
        FetchOutcome::Failure {
            failure,
            attempts: self.max_attempts,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_params(&RetrievalParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schema::Endpoint;
    use crate::test_utils::ScriptedClient;
    use proptest::prelude::*;
    use serde_json::json;

    const PRODUCT: Endpoint = Endpoint {
        path: "/api/apiextraction",
        key_param: "skus",
        paged: false,
    };

    fn request(key: &str) -> ApiRequest {
        ApiRequest::new(PRODUCT, key, None)
    }

    #[tokio::test]
    async fn test_stops_at_first_success() {
        let client = ScriptedClient::new()
            .respond("a", None, Err(FetchFailure::status(503, "busy")))
            .respond("a", None, Ok(json!({"ok": true})));
        let policy = RetryPolicy::new(3, Duration::from_millis(10));

        let outcome = policy.execute(&client, &request("a")).await;
        assert_eq!(
            outcome,
            FetchOutcome::Success {
                payload: json!({"ok": true}),
                attempts: 2
            }
        );
        assert_eq!(client.calls_for("a", None), 2);
    }

    #[tokio::test]
    async fn test_exhausted_attempts_keep_last_failure() {
        let client = ScriptedClient::new()
            .respond("b", None, Err(FetchFailure::status(500, "first")))
            .respond("b", None, Err(FetchFailure::status(500, "second")))
            .respond("b", None, Err(FetchFailure::status(502, "last")));
        let policy = RetryPolicy::new(3, Duration::from_millis(10));

        let outcome = policy.execute(&client, &request("b")).await;
        assert_eq!(
            outcome,
            FetchOutcome::Failure {
                failure: FetchFailure::status(502, "last"),
                attempts: 3
            }
        );
    }

    #[tokio::test]
    async fn test_timeouts_escalate_per_attempt() {
        let client = ScriptedClient::new();
        let policy = RetryPolicy::new(3, Duration::from_secs(2));

        let _ = policy.execute(&client, &request("c")).await;
        assert_eq!(
            client.timeouts_for("c", None),
            vec![Duration::from_secs(2), Duration::from_secs(4), Duration::from_secs(6)]
        );
    }

    #[tokio::test]
    async fn test_undecodable_200_is_not_retried() {
        let client = ScriptedClient::new().always(
            "d",
            None,
            Err(FetchFailure::transport(TransportErrorKind::Decode, "invalid JSON payload")),
        );
        let policy = RetryPolicy::new(3, Duration::from_millis(10));

        let outcome = policy.execute(&client, &request("d")).await;
        assert_eq!(outcome.attempts(), 1);
        assert!(!outcome.is_success());
        assert_eq!(client.calls_for("d", None), 1);
    }

    #[tokio::test]
    async fn test_transport_errors_are_retried() {
        let client = ScriptedClient::new().always(
            "t",
            None,
            Err(FetchFailure::transport(TransportErrorKind::Timeout, "timed out")),
        );
        let outcome = RetryPolicy::new(3, Duration::from_millis(10))
            .execute(&client, &request("t"))
            .await;
        assert_eq!(outcome.attempts(), 3);
        assert_eq!(client.calls_for("t", None), 3);
    }

    #[test]
    fn test_zero_attempts_is_clamped() {
        assert_eq!(RetryPolicy::new(0, Duration::from_secs(1)).max_attempts(), 1);
    }

    proptest! {
        #[test]
        fn prop_never_exceeds_max_attempts(max_attempts in 1u32..6, base_ms in 1u64..5_000) {
            let client = ScriptedClient::new();
            let policy = RetryPolicy::new(max_attempts, Duration::from_millis(base_ms));

            let outcome = tokio_test::block_on(policy.execute(&client, &request("k")));
            prop_assert_eq!(outcome.attempts(), max_attempts);
            prop_assert_eq!(client.calls_for("k", None), max_attempts as usize);
        }

        #[test]
        fn prop_timeouts_strictly_increase(max_attempts in 2u32..10, base_ms in 1u64..60_000) {
            let policy = RetryPolicy::new(max_attempts, Duration::from_millis(base_ms));
            for attempt in 2..=max_attempts {
                prop_assert!(policy.timeout_for_attempt(attempt) > policy.timeout_for_attempt(attempt - 1));
            }
        }
    }
}
