// ============================================================================
// Configuration Constants
// ============================================================================

// Default server values
pub(crate) const DEFAULT_PORT: u16 = 8080;
pub(crate) const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

// Default gating windows (in seconds)
// Cache TTL is deliberately short: the store is the source of truth and a
// stale "incomplete" entry self-heals within one TTL.
pub(crate) const DEFAULT_PROFILE_CACHE_TTL_SECS: u64 = 300;
// Grace window covers store propagation delay after a profile submission.
pub(crate) const DEFAULT_SUBMISSION_GRACE_SECS: u64 = 30;
pub(crate) const DEFAULT_FAILURE_WINDOW_SECS: u64 = 60;
pub(crate) const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

// Default retry policy for profile lookups
pub(crate) const DEFAULT_FETCH_MAX_ATTEMPTS: u32 = 5;
pub(crate) const DEFAULT_FETCH_BASE_TIMEOUT_MS: u64 = 1000;
pub(crate) const DEFAULT_FETCH_TIMEOUT_STEP_MS: u64 = 500;
pub(crate) const DEFAULT_FETCH_BASE_BACKOFF_MS: u64 = 500;
pub(crate) const DEFAULT_FETCH_BACKOFF_MULTIPLIER: f64 = 1.5;
pub(crate) const DEFAULT_FETCH_MAX_JITTER_MS: u64 = 200;
pub(crate) const DEFAULT_FETCH_FINAL_TIMEOUT_MS: u64 = 5000;

// Route tables: static configuration, not re-derivable at runtime
pub(crate) const DEFAULT_PUBLIC_PREFIXES: &str = "/login,/api/auth";
pub(crate) const DEFAULT_PROFILE_EXEMPT_PREFIXES: &str =
    "/login,/profile,/api/auth,/_next/static,/_next/image,/favicon.ico,/images";
pub(crate) const DEFAULT_BYPASS_API_PREFIXES: &str = "/api/chat,/api/completion,/api/tools";
pub(crate) const DEFAULT_LOGIN_PATH: &str = "/login";
pub(crate) const DEFAULT_PROFILE_PATH: &str = "/profile";
pub(crate) const DEFAULT_API_PREFIX: &str = "/api";

// Profile store key schema: "user:profile:{user_id}"
pub(crate) const DEFAULT_PROFILE_KEY_PREFIX: &str = "user:profile:";
