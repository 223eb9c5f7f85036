// ============================================================================
// Gate Decision Engine
// ============================================================================
//
// Resolves every request into one of exactly three outcomes: allow,
// redirect, or a 401 JSON failure. The rules form an ordered cascade with
// early return so the precedence stays auditable rule by rule:
// authentication before profile completeness, exemptions before any store
// access, then the grace and circuit overrides, and only last the cache
// and the retrying fetch. No state survives a request beyond the three
// shared maps.
//
// ============================================================================

pub mod cache;
pub mod circuit;
pub mod fetch;
pub mod grace;

use std::sync::Arc;

use axum::http::StatusCode;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use gatehouse_config::{GateConfig, RetryConfig, RoutesConfig};
use gatehouse_error::{AppError, AppResult};

use crate::auth::TokenOutcome;
use crate::paths::RouteTables;
use crate::profile::{Profile, ProfileStore};

use cache::ProfileCache;
use circuit::FailureCircuit;
use fetch::{Fetched, RetryPolicy, RetryingFetcher};
use grace::SubmissionGrace;

/// Where the gate learned the onboarding state it acted on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileSource {
    Cache,
    Fetch,
    BypassAfterFailures,
}

impl ProfileSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileSource::Cache => "cache",
            ProfileSource::Fetch => "fetch",
            ProfileSource::BypassAfterFailures => "bypass-after-failures",
        }
    }
}

/// Diagnostic annotations for an allowed request, surfaced as response
/// headers by the middleware
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pub onboarding_completed: Option<bool>,
    pub source: Option<ProfileSource>,
    pub attempts: Option<u32>,
}

/// Terminal outcomes of the gate; there are exactly three
#[derive(Debug, Clone)]
pub enum GateOutcome {
    Allow(Diagnostics),
    Redirect(String),
    Fail(StatusCode, &'static str),
}

/// Everything the engine needs to know about one request
#[derive(Debug, Clone)]
pub struct GateRequest {
    /// Request path, e.g. "/search/abc"
    pub path: String,
    /// Full original URL, used as the login callback target
    pub original_url: String,
    /// Session verification outcome
    pub token: TokenOutcome,
    /// Raw Referer header, if any
    pub referer: Option<String>,
}

pub struct GateEngine {
    tables: RouteTables,
    grace: SubmissionGrace,
    cache: ProfileCache,
    circuit: FailureCircuit,
    fetcher: RetryingFetcher,
    failure_threshold: u32,
}

impl GateEngine {
    pub fn new(
        routes: RoutesConfig,
        gate: &GateConfig,
        retry: &RetryConfig,
        store: Arc<dyn ProfileStore>,
    ) -> Self {
        Self {
            tables: RouteTables::new(routes),
            grace: SubmissionGrace::new(gate.submission_grace()),
            cache: ProfileCache::new(gate.profile_cache_ttl()),
            circuit: FailureCircuit::new(gate.failure_threshold, gate.failure_window()),
            fetcher: RetryingFetcher::new(store, RetryPolicy::from_config(retry)),
            failure_threshold: gate.failure_threshold,
        }
    }

    /// Evaluate one request. First matching rule wins.
    pub async fn evaluate(&self, request: &GateRequest) -> AppResult<GateOutcome> {
        let class = self.tables.classify(&request.path);

        // Rules 1-2: the login page itself. Authenticated visitors bounce
        // home; everyone else gets the page.
        if class.is_login_page {
            if request.token.is_valid() {
                return Ok(GateOutcome::Redirect("/".to_string()));
            }
            return Ok(GateOutcome::Allow(Diagnostics::default()));
        }

        // Rule 3: unauthenticated on a protected path. API callers expect a
        // machine-readable payload and must never see an HTML redirect.
        if !class.is_public && !request.token.is_valid() {
            if class.is_bypass_api || class.is_api {
                return Ok(GateOutcome::Fail(
                    StatusCode::UNAUTHORIZED,
                    "Authentication required",
                ));
            }
            return Ok(GateOutcome::Redirect(self.login_redirect(&request.original_url)));
        }

        // Rule 4: exemptions short-circuit before any store access. A
        // public path without claims also lands here.
        if class.skips_profile_check || class.is_bypass_api || !request.token.is_valid() {
            return Ok(GateOutcome::Allow(Diagnostics::default()));
        }

        // From here on the request is authenticated and profile-gated.
        let user_id = match request.token.claims() {
            Some(claims) => claims.sub.clone(),
            None => return Ok(GateOutcome::Allow(Diagnostics::default())),
        };

        // Rule 5: navigation straight from the profile edit page. The store
        // may not reflect the just-submitted flag yet; open a grace window.
        if self.referer_is_profile_page(request.referer.as_deref()) {
            self.grace.record(&user_id);
            return Ok(GateOutcome::Allow(Diagnostics::default()));
        }

        // Rule 6: a live grace window suppresses gating outright.
        if self.grace.is_active(&user_id) {
            return Ok(GateOutcome::Allow(Diagnostics::default()));
        }

        // Rule 7: open circuit. Store trouble must never turn into a
        // permanent redirect loop.
        if self.circuit.is_open(&user_id) {
            tracing::warn!(
                user_id = %user_id,
                "Failure circuit open, allowing request without profile check"
            );
            return Ok(GateOutcome::Allow(Diagnostics {
                onboarding_completed: None,
                source: Some(ProfileSource::BypassAfterFailures),
                attempts: None,
            }));
        }

        // Rule 8: cached profile.
        if let Some(profile) = self.cache.get(&user_id) {
            return Ok(self.branch_on_profile(&profile, ProfileSource::Cache, None));
        }

        // Rule 9: full retrying fetch.
        match self.fetcher.fetch(&user_id).await {
            Ok(Fetched { profile, attempts }) => {
                self.circuit.reset(&user_id);
                match profile {
                    Some(profile) => {
                        self.cache.insert(profile.clone());
                        Ok(self.branch_on_profile(&profile, ProfileSource::Fetch, Some(attempts)))
                    }
                    // The store answered: no profile exists, so onboarding
                    // has not happened.
                    None => Ok(GateOutcome::Redirect(self.tables.profile_path().to_string())),
                }
            }
            Err(AppError::ProfileLookupExhausted { attempts, .. }) => {
                // Strictly above the threshold: a request that raced past
                // rule 7 before the circuit opened still gets the override.
                // At exactly the threshold the next request takes rule 7.
                let failures = self.circuit.record_failure(&user_id);
                if failures > self.failure_threshold {
                    Ok(GateOutcome::Allow(Diagnostics {
                        onboarding_completed: None,
                        source: Some(ProfileSource::BypassAfterFailures),
                        attempts: Some(attempts),
                    }))
                } else {
                    // Unknown profile state is treated as incomplete.
                    Ok(GateOutcome::Redirect(self.tables.profile_path().to_string()))
                }
            }
            Err(other) => Err(other),
        }
    }

    fn branch_on_profile(
        &self,
        profile: &Profile,
        source: ProfileSource,
        attempts: Option<u32>,
    ) -> GateOutcome {
        if !profile.onboarding_completed {
            return GateOutcome::Redirect(self.tables.profile_path().to_string());
        }
        GateOutcome::Allow(Diagnostics {
            onboarding_completed: Some(true),
            source: Some(source),
            attempts,
        })
    }

    fn login_redirect(&self, original_url: &str) -> String {
        format!(
            "{}?callbackUrl={}",
            self.tables.login_path(),
            utf8_percent_encode(original_url, NON_ALPHANUMERIC)
        )
    }

    /// Does the Referer header point at the profile edit page?
    fn referer_is_profile_page(&self, referer: Option<&str>) -> bool {
        let Some(referer) = referer else {
            return false;
        };
        referer_path(referer)
            .map(|path| path == self.tables.profile_path())
            .unwrap_or(false)
    }
}

/// Path component of a Referer value, which may be absolute or path-only
fn referer_path(referer: &str) -> Option<&str> {
    let rest = match referer.find("://") {
        Some(idx) => {
            let after_scheme = &referer[idx + 3..];
            match after_scheme.find('/') {
                Some(slash) => &after_scheme[slash..],
                None => "/",
            }
        }
        None if referer.starts_with('/') => referer,
        None => return None,
    };
    Some(rest.split(['?', '#']).next().unwrap_or(rest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Claims;
    use crate::profile::ProfileStore;
    use async_trait::async_trait;
    use gatehouse_error::AppError;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Scripted store: each call pops the next response
    #[derive(Default)]
    struct ScriptedStore {
        calls: AtomicU32,
        responses: Mutex<Vec<ScriptedResponse>>,
    }

    enum ScriptedResponse {
        Profile(HashMap<String, String>),
        NotFound,
        Error,
        Hang,
    }

    impl ScriptedStore {
        fn scripted(responses: Vec<ScriptedResponse>) -> Self {
            Self {
                calls: AtomicU32::new(0),
                responses: Mutex::new(responses),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProfileStore for ScriptedStore {
        async fn fetch_profile(&self, user_id: &str) -> gatehouse_error::AppResult<Option<Profile>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.responses.lock().unwrap().pop();
            match next {
                Some(ScriptedResponse::Profile(raw)) => Ok(Profile::from_wire(user_id, raw)),
                Some(ScriptedResponse::NotFound) => Ok(None),
                Some(ScriptedResponse::Error) => Err(AppError::internal("store down")),
                Some(ScriptedResponse::Hang) | None => {
                    std::future::pending::<()>().await;
                    unreachable!()
                }
            }
        }
    }

    fn completed_profile() -> ScriptedResponse {
        let mut raw = HashMap::new();
        raw.insert("onboardingCompleted".to_string(), "true".to_string());
        ScriptedResponse::Profile(raw)
    }

    fn incomplete_profile(flag: &str) -> ScriptedResponse {
        let mut raw = HashMap::new();
        raw.insert("onboardingCompleted".to_string(), flag.to_string());
        ScriptedResponse::Profile(raw)
    }

    fn engine_with(store: Arc<dyn ProfileStore>) -> GateEngine {
        GateEngine::new(
            RoutesConfig::default(),
            &GateConfig::default(),
            &RetryConfig::default(),
            store,
        )
    }

    fn authed_request(path: &str, user_id: &str) -> GateRequest {
        GateRequest {
            path: path.to_string(),
            original_url: format!("http://localhost:3000{}", path),
            token: TokenOutcome::Valid(Claims {
                sub: user_id.to_string(),
                exp: i64::MAX,
                iat: 0,
            }),
            referer: None,
        }
    }

    fn anon_request(path: &str) -> GateRequest {
        GateRequest {
            path: path.to_string(),
            original_url: format!("http://localhost:3000{}", path),
            token: TokenOutcome::Absent,
            referer: None,
        }
    }

    fn assert_allow(outcome: &GateOutcome) -> &Diagnostics {
        match outcome {
            GateOutcome::Allow(diag) => diag,
            other => panic!("expected Allow, got {:?}", other),
        }
    }

    fn assert_redirect(outcome: &GateOutcome) -> &str {
        match outcome {
            GateOutcome::Redirect(url) => url,
            other => panic!("expected Redirect, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn authenticated_visitor_on_login_page_goes_home() {
        let engine = engine_with(Arc::new(ScriptedStore::default()));
        let outcome = engine.evaluate(&authed_request("/login", "u1")).await.unwrap();
        assert_eq!(assert_redirect(&outcome), "/");
    }

    #[tokio::test]
    async fn anonymous_visitor_gets_login_page() {
        let engine = engine_with(Arc::new(ScriptedStore::default()));
        let outcome = engine.evaluate(&anon_request("/login")).await.unwrap();
        assert_allow(&outcome);
    }

    #[tokio::test]
    async fn anonymous_page_request_redirects_to_login_with_callback() {
        let engine = engine_with(Arc::new(ScriptedStore::default()));
        let outcome = engine.evaluate(&anon_request("/search/xyz")).await.unwrap();
        let url = assert_redirect(&outcome);
        assert!(url.starts_with("/login?callbackUrl="));
        assert!(url.contains("search"));
        // The callback target is percent-encoded, not raw
        assert!(!url.contains("http://"));
    }

    #[tokio::test]
    async fn anonymous_bypass_api_request_fails_with_401() {
        let engine = engine_with(Arc::new(ScriptedStore::default()));
        let outcome = engine.evaluate(&anon_request("/api/chat")).await.unwrap();
        match outcome {
            GateOutcome::Fail(status, _) => assert_eq!(status, StatusCode::UNAUTHORIZED),
            other => panic!("expected Fail, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn anonymous_generic_api_request_also_gets_401() {
        let engine = engine_with(Arc::new(ScriptedStore::default()));
        let outcome = engine.evaluate(&anon_request("/api/history")).await.unwrap();
        assert!(matches!(outcome, GateOutcome::Fail(StatusCode::UNAUTHORIZED, _)));
    }

    #[tokio::test]
    async fn authenticated_bypass_api_skips_profile_check() {
        let store = Arc::new(ScriptedStore::default());
        let engine = engine_with(store.clone());
        let outcome = engine.evaluate(&authed_request("/api/chat", "u1")).await.unwrap();
        assert_allow(&outcome);
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn exempt_path_never_touches_the_store() {
        let store = Arc::new(ScriptedStore::default());
        let engine = engine_with(store.clone());
        let outcome = engine.evaluate(&authed_request("/profile", "u1")).await.unwrap();
        assert_allow(&outcome);
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn completed_profile_allows_and_caches() {
        let store = Arc::new(ScriptedStore::scripted(vec![completed_profile()]));
        let engine = engine_with(store.clone());

        let outcome = engine.evaluate(&authed_request("/", "u1")).await.unwrap();
        let diag = assert_allow(&outcome);
        assert_eq!(diag.onboarding_completed, Some(true));
        assert_eq!(diag.source, Some(ProfileSource::Fetch));
        assert_eq!(diag.attempts, Some(1));

        // Second evaluation is a pure cache hit: no further store access
        let outcome = engine.evaluate(&authed_request("/", "u1")).await.unwrap();
        let diag = assert_allow(&outcome);
        assert_eq!(diag.source, Some(ProfileSource::Cache));
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn string_false_flag_redirects_to_profile() {
        let store = Arc::new(ScriptedStore::scripted(vec![incomplete_profile("false")]));
        let engine = engine_with(store);
        let outcome = engine.evaluate(&authed_request("/", "u1")).await.unwrap();
        assert_eq!(assert_redirect(&outcome), "/profile");
    }

    #[tokio::test]
    async fn missing_profile_redirects_to_profile() {
        let store = Arc::new(ScriptedStore::scripted(vec![ScriptedResponse::NotFound]));
        let engine = engine_with(store);
        let outcome = engine.evaluate(&authed_request("/", "u1")).await.unwrap();
        assert_eq!(assert_redirect(&outcome), "/profile");
    }

    #[tokio::test]
    async fn profile_referer_opens_grace_window() {
        // Store would report incomplete, but the user just navigated away
        // from the edit form
        let store = Arc::new(ScriptedStore::scripted(vec![incomplete_profile("false")]));
        let engine = engine_with(store.clone());

        let mut request = authed_request("/", "u1");
        request.referer = Some("http://localhost:3000/profile".to_string());
        assert_allow(&engine.evaluate(&request).await.unwrap());
        assert_eq!(store.calls(), 0);

        // Follow-up request without the referer still rides the window
        let outcome = engine.evaluate(&authed_request("/", "u1")).await.unwrap();
        assert_allow(&outcome);
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn success_on_third_attempt_resets_circuit() {
        let store = Arc::new(ScriptedStore::scripted(vec![
            completed_profile(),
            ScriptedResponse::Error,
            ScriptedResponse::Error,
        ]));
        let engine = engine_with(store.clone());

        let outcome = engine.evaluate(&authed_request("/", "u1")).await.unwrap();
        let diag = assert_allow(&outcome);
        assert_eq!(diag.attempts, Some(3));
        assert_eq!(store.calls(), 3);
        assert_eq!(engine.circuit.failures("u1"), 0);
        assert!(engine.cache.get("u1").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_increments_circuit_and_redirects() {
        let store = Arc::new(ScriptedStore::default());
        let engine = engine_with(store.clone());

        let outcome = engine.evaluate(&authed_request("/", "u2")).await.unwrap();
        assert_eq!(assert_redirect(&outcome), "/profile");
        // 5 bounded attempts + 1 patient attempt, all hung
        assert_eq!(store.calls(), 6);
        assert_eq!(engine.circuit.failures("u2"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn circuit_opens_after_threshold_and_bypasses() {
        let store = Arc::new(ScriptedStore::default());
        let engine = engine_with(store.clone());

        // Three exhausted lookups in a row, each redirecting toward
        // re-onboarding
        for _ in 0..3 {
            let outcome = engine.evaluate(&authed_request("/", "u3")).await.unwrap();
            assert_eq!(assert_redirect(&outcome), "/profile");
        }
        assert_eq!(engine.circuit.failures("u3"), 3);

        // Fourth request short-circuits at the open circuit with no store
        // access at all
        let calls_before = store.calls();
        let outcome = engine.evaluate(&authed_request("/", "u3")).await.unwrap();
        let diag = assert_allow(&outcome);
        assert_eq!(diag.source, Some(ProfileSource::BypassAfterFailures));
        assert_eq!(diag.onboarding_completed, None);
        assert_eq!(store.calls(), calls_before);
    }

    #[test]
    fn referer_path_parsing() {
        assert_eq!(referer_path("http://localhost:3000/profile"), Some("/profile"));
        assert_eq!(
            referer_path("https://app.example.com/profile?tab=1"),
            Some("/profile")
        );
        assert_eq!(referer_path("/profile"), Some("/profile"));
        assert_eq!(referer_path("https://app.example.com"), Some("/"));
        assert_eq!(referer_path("garbage"), None);
    }
}
