// ============================================================================
// Gate Configuration
// ============================================================================
// Windows and thresholds for the request-gating pipeline: profile cache TTL,
// submission grace window, and failure-circuit behavior.

use std::time::Duration;

use crate::constants::*;
use crate::env_parse;

/// Timing windows and thresholds for the gate decision engine
#[derive(Clone, Debug)]
pub struct GateConfig {
    /// TTL for cached profiles (seconds)
    pub profile_cache_ttl_secs: u64,
    /// Grace window after a profile submission during which gating is
    /// suppressed for that user (seconds)
    pub submission_grace_secs: u64,
    /// Consecutive failed lookups before the circuit opens and the user is
    /// allowed through without a profile
    pub failure_threshold: u32,
    /// Inactivity window after which a failure record resets (seconds)
    pub failure_window_secs: u64,
}

impl GateConfig {
    pub(crate) fn from_env() -> Self {
        Self {
            profile_cache_ttl_secs: env_parse(
                "GATE_PROFILE_CACHE_TTL_SECS",
                DEFAULT_PROFILE_CACHE_TTL_SECS,
            ),
            submission_grace_secs: env_parse(
                "GATE_SUBMISSION_GRACE_SECS",
                DEFAULT_SUBMISSION_GRACE_SECS,
            ),
            failure_threshold: env_parse("GATE_FAILURE_THRESHOLD", DEFAULT_FAILURE_THRESHOLD),
            failure_window_secs: env_parse("GATE_FAILURE_WINDOW_SECS", DEFAULT_FAILURE_WINDOW_SECS),
        }
    }

    pub fn profile_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.profile_cache_ttl_secs)
    }

    pub fn submission_grace(&self) -> Duration {
        Duration::from_secs(self.submission_grace_secs)
    }

    pub fn failure_window(&self) -> Duration {
        Duration::from_secs(self.failure_window_secs)
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            profile_cache_ttl_secs: DEFAULT_PROFILE_CACHE_TTL_SECS,
            submission_grace_secs: DEFAULT_SUBMISSION_GRACE_SECS,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            failure_window_secs: DEFAULT_FAILURE_WINDOW_SECS,
        }
    }
}

/// Retry policy parameters for the profile fetcher.
///
/// Attempt `i` (zero-based) races the store call against a timeout of
/// `base_timeout_ms + i * timeout_step_ms`; between attempts the fetcher
/// sleeps `base_backoff_ms * backoff_multiplier^i` plus up to
/// `max_jitter_ms` of random jitter. After `max_attempts` bounded attempts,
/// one final attempt runs with `final_timeout_ms`.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_timeout_ms: u64,
    pub timeout_step_ms: u64,
    pub base_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub max_jitter_ms: u64,
    pub final_timeout_ms: u64,
}

impl RetryConfig {
    pub(crate) fn from_env() -> Self {
        Self {
            max_attempts: env_parse("FETCH_MAX_ATTEMPTS", DEFAULT_FETCH_MAX_ATTEMPTS),
            base_timeout_ms: env_parse("FETCH_BASE_TIMEOUT_MS", DEFAULT_FETCH_BASE_TIMEOUT_MS),
            timeout_step_ms: env_parse("FETCH_TIMEOUT_STEP_MS", DEFAULT_FETCH_TIMEOUT_STEP_MS),
            base_backoff_ms: env_parse("FETCH_BASE_BACKOFF_MS", DEFAULT_FETCH_BASE_BACKOFF_MS),
            backoff_multiplier: env_parse(
                "FETCH_BACKOFF_MULTIPLIER",
                DEFAULT_FETCH_BACKOFF_MULTIPLIER,
            ),
            max_jitter_ms: env_parse("FETCH_MAX_JITTER_MS", DEFAULT_FETCH_MAX_JITTER_MS),
            final_timeout_ms: env_parse("FETCH_FINAL_TIMEOUT_MS", DEFAULT_FETCH_FINAL_TIMEOUT_MS),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_FETCH_MAX_ATTEMPTS,
            base_timeout_ms: DEFAULT_FETCH_BASE_TIMEOUT_MS,
            timeout_step_ms: DEFAULT_FETCH_TIMEOUT_STEP_MS,
            base_backoff_ms: DEFAULT_FETCH_BASE_BACKOFF_MS,
            backoff_multiplier: DEFAULT_FETCH_BACKOFF_MULTIPLIER,
            max_jitter_ms: DEFAULT_FETCH_MAX_JITTER_MS,
            final_timeout_ms: DEFAULT_FETCH_FINAL_TIMEOUT_MS,
        }
    }
}
