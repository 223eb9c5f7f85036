// ============================================================================
// Retrying Profile Fetcher
// ============================================================================
//
// Two-phase lookup against the eventually consistent profile store: a
// bounded run of fast attempts with linearly escalating timeouts and
// jittered geometric backoff, then exactly one patient final attempt with a
// long fixed timeout. Fast retries keep the common case (store healthy but
// briefly slow) responsive; the final attempt tolerates a genuinely
// degraded store without blocking the request indefinitely.
//
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::time::{sleep, timeout};

use gatehouse_config::RetryConfig;
use gatehouse_error::{AppError, AppResult};

use crate::profile::{Profile, ProfileStore};

/// Retry parameters, kept separate from the store client so the arithmetic
/// is unit-testable on its own.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_timeout: Duration,
    timeout_step: Duration,
    base_backoff: Duration,
    backoff_multiplier: f64,
    max_jitter: Duration,
    final_timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(cfg: &RetryConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts,
            base_timeout: Duration::from_millis(cfg.base_timeout_ms),
            timeout_step: Duration::from_millis(cfg.timeout_step_ms),
            base_backoff: Duration::from_millis(cfg.base_backoff_ms),
            backoff_multiplier: cfg.backoff_multiplier,
            max_jitter: Duration::from_millis(cfg.max_jitter_ms),
            final_timeout: Duration::from_millis(cfg.final_timeout_ms),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn final_timeout(&self) -> Duration {
        self.final_timeout
    }

    /// Per-attempt timeout, escalating linearly with the attempt index
    pub fn attempt_timeout(&self, attempt: u32) -> Duration {
        self.base_timeout + self.timeout_step * attempt
    }

    /// Backoff before the next attempt: geometric growth plus random
    /// jitter, so concurrent retries for the same user fan out instead of
    /// hammering the store in lockstep
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.base_backoff.mul_f64(self.backoff_multiplier.powi(attempt as i32));
        let jitter_ms = if self.max_jitter.is_zero() {
            0
        } else {
            rand::thread_rng().gen_range(0..=self.max_jitter.as_millis() as u64)
        };
        base + Duration::from_millis(jitter_ms)
    }
}

/// Successful lookup: the store answered, possibly with "no such profile"
#[derive(Debug)]
pub struct Fetched {
    pub profile: Option<Profile>,
    pub attempts: u32,
}

pub struct RetryingFetcher {
    store: Arc<dyn ProfileStore>,
    policy: RetryPolicy,
}

impl RetryingFetcher {
    pub fn new(store: Arc<dyn ProfileStore>, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    /// Fetch a profile with bounded retries.
    ///
    /// A timed-out or failed attempt is not terminal; only exhausting every
    /// attempt is, surfaced as `AppError::ProfileLookupExhausted`. A store
    /// answer of "no profile" ends the retry loop: that is a successful
    /// fetch of nothing.
    pub async fn fetch(&self, user_id: &str) -> AppResult<Fetched> {
        let mut attempts = 0;

        for attempt in 0..self.policy.max_attempts() {
            attempts += 1;
            let per_attempt = self.policy.attempt_timeout(attempt);

            match timeout(per_attempt, self.store.fetch_profile(user_id)).await {
                Ok(Ok(profile)) => {
                    if attempt > 0 {
                        tracing::info!(
                            user_id = %user_id,
                            attempt = attempts,
                            "Profile lookup succeeded after retry"
                        );
                    }
                    return Ok(Fetched { profile, attempts });
                }
                Ok(Err(e)) => {
                    tracing::warn!(
                        user_id = %user_id,
                        attempt = attempts,
                        error = %e,
                        "Profile lookup attempt failed, will retry"
                    );
                }
                Err(_) => {
                    tracing::warn!(
                        user_id = %user_id,
                        attempt = attempts,
                        timeout_ms = per_attempt.as_millis() as u64,
                        "Profile lookup attempt timed out, will retry"
                    );
                }
            }

            sleep(self.policy.backoff_delay(attempt)).await;
        }

        // Final patient attempt with a long fixed timeout
        attempts += 1;
        match timeout(self.policy.final_timeout(), self.store.fetch_profile(user_id)).await {
            Ok(Ok(profile)) => {
                tracing::info!(
                    user_id = %user_id,
                    attempt = attempts,
                    "Profile lookup succeeded on final patient attempt"
                );
                Ok(Fetched { profile, attempts })
            }
            Ok(Err(e)) => {
                tracing::error!(
                    user_id = %user_id,
                    attempts = attempts,
                    error = %e,
                    "Profile lookup exhausted"
                );
                Err(AppError::ProfileLookupExhausted {
                    user_id: user_id.to_string(),
                    attempts,
                })
            }
            Err(_) => {
                tracing::error!(
                    user_id = %user_id,
                    attempts = attempts,
                    "Profile lookup exhausted after final timeout"
                );
                Err(AppError::ProfileLookupExhausted {
                    user_id: user_id.to_string(),
                    attempts,
                })
            }
        }
    }
}
