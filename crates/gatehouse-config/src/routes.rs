// ============================================================================
// Route Table Configuration
// ============================================================================
// Static route classification tables. These are configuration, not derivable
// at runtime: public paths skip authentication entirely, profile-exempt
// paths skip the onboarding check, and bypass-API paths must never receive
// an HTML redirect because their callers expect a machine-readable payload.

use crate::constants::*;
use crate::env_list;

#[derive(Clone, Debug)]
pub struct RoutesConfig {
    /// Prefixes reachable without a session (login page, auth callbacks)
    pub public_prefixes: Vec<String>,
    /// Prefixes exempt from the profile-completeness check (the profile
    /// edit page itself, static assets, auth endpoints)
    pub profile_exempt_prefixes: Vec<String>,
    /// API prefixes whose callers expect JSON and must never be redirected
    pub bypass_api_prefixes: Vec<String>,
    /// Exact path of the login page
    pub login_path: String,
    /// Exact path of the profile edit page (also the redirect target for
    /// incomplete onboarding, and the referer that opens a grace window)
    pub profile_path: String,
    /// Generic API prefix; unauthenticated requests below it get 401 JSON
    /// instead of a login redirect
    pub api_prefix: String,
}

impl RoutesConfig {
    pub(crate) fn from_env() -> Self {
        Self {
            public_prefixes: env_list("ROUTES_PUBLIC_PREFIXES", DEFAULT_PUBLIC_PREFIXES),
            profile_exempt_prefixes: env_list(
                "ROUTES_PROFILE_EXEMPT_PREFIXES",
                DEFAULT_PROFILE_EXEMPT_PREFIXES,
            ),
            bypass_api_prefixes: env_list(
                "ROUTES_BYPASS_API_PREFIXES",
                DEFAULT_BYPASS_API_PREFIXES,
            ),
            login_path: std::env::var("ROUTES_LOGIN_PATH")
                .unwrap_or_else(|_| DEFAULT_LOGIN_PATH.to_string()),
            profile_path: std::env::var("ROUTES_PROFILE_PATH")
                .unwrap_or_else(|_| DEFAULT_PROFILE_PATH.to_string()),
            api_prefix: std::env::var("ROUTES_API_PREFIX")
                .unwrap_or_else(|_| DEFAULT_API_PREFIX.to_string()),
        }
    }
}

impl Default for RoutesConfig {
    fn default() -> Self {
        let split = |s: &str| s.split(',').map(str::to_string).collect();
        Self {
            public_prefixes: split(DEFAULT_PUBLIC_PREFIXES),
            profile_exempt_prefixes: split(DEFAULT_PROFILE_EXEMPT_PREFIXES),
            bypass_api_prefixes: split(DEFAULT_BYPASS_API_PREFIXES),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            profile_path: DEFAULT_PROFILE_PATH.to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
        }
    }
}
