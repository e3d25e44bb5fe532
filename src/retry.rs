//! Bounded-retry wrapper for generative-AI calls.
//!
//! Every outbound generation request goes through [`call_with_retry`]:
//! transient backend overload is retried with exponential backoff up to a
//! fixed attempt ceiling, credential and unclassified failures surface
//! immediately, and an optional observer is told about each scheduled retry
//! so a front end can show "retrying (2/3)…" status.
//!
//! The wrapper switches on [`GenAiError`] variants only. Mapping raw backend
//! messages onto those variants is the client boundary's job
//! (`genai::gemini::classify`) — no message sniffing happens here.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::genai::GenAiError;

/// Fixed user-facing message returned when every attempt hit an overloaded
/// backend. Deliberately generic so repeated 503s never leak backend text.
pub const OVERLOADED_MESSAGE: &str =
    "The AI service is busy right now. Please try again in a few minutes.";

/// Shared retry policy: attempt ceiling and backoff base.
///
/// One value of this type is threaded through every call site; the defaults
/// (3 attempts, 2 s base) are the contract — callers must not re-declare
/// them locally.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, backoff_base: Duration::from_secs(2) }
    }
}

impl RetryPolicy {
    /// Delay inserted after failed attempt `n` (1-indexed) before attempt
    /// `n + 1`: `base * 2^(n-1)`. With the default base that is 2 s after
    /// the 1st attempt and 4 s after the 2nd. Pure function of the attempt
    /// index — no jitter.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_base * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Observer for call sites that have no progress UI.
pub fn no_progress(_attempt: u32, _max_attempts: u32) {}

/// Run `op` until it succeeds, retrying transient-overload failures.
///
/// - `label` names the guarded operation; it prefixes the message of
///   unclassified terminal failures (`"{label} failed: {message}"`).
/// - `on_retry(attempt, max_attempts)` is invoked exactly once per scheduled
///   retry, before the backoff sleep. It is never invoked for a terminal
///   failure, including an overload on the final attempt.
/// - `Auth` and `InvalidInput` failures propagate unchanged on the attempt
///   that produced them, regardless of remaining attempts.
/// - If all attempts fail with `Overloaded`, the returned error is
///   `Overloaded(OVERLOADED_MESSAGE)` — the raw backend text is logged,
///   not surfaced.
///
/// Attempts are strictly sequential; state is local to one invocation, so
/// repeated calls are fully independent.
pub async fn call_with_retry<T, Op, Fut, Obs>(
    label: &str,
    policy: RetryPolicy,
    mut on_retry: Obs,
    mut op: Op,
) -> Result<T, GenAiError>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GenAiError>>,
    Obs: FnMut(u32, u32),
{
    for attempt in 1..=policy.max_attempts {
        match op().await {
            Ok(value) => {
                debug!(%label, attempt, "call succeeded");
                return Ok(value);
            }
            Err(e @ (GenAiError::Auth(_) | GenAiError::InvalidInput(_))) => {
                warn!(%label, attempt, error = %e, "non-retryable failure");
                return Err(e);
            }
            Err(GenAiError::Overloaded(msg)) => {
                warn!(
                    %label,
                    attempt,
                    max_attempts = policy.max_attempts,
                    error = %msg,
                    "backend overloaded"
                );
                if attempt < policy.max_attempts {
                    on_retry(attempt, policy.max_attempts);
                    tokio::time::sleep(policy.backoff_delay(attempt)).await;
                }
            }
            Err(GenAiError::Request(msg)) => {
                warn!(%label, attempt, error = %msg, "unclassified failure");
                return Err(GenAiError::Request(format!("{label} failed: {msg}")));
            }
        }
    }

    // Only reachable when every attempt ended in Overloaded.
    Err(GenAiError::Overloaded(OVERLOADED_MESSAGE.to_string()))
}
