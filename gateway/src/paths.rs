// ============================================================================
// Path Classification
// ============================================================================
//
// Pure prefix-set membership against the static route tables. Runs on every
// request before any I/O, so this stays allocation-free and deterministic.
//
// ============================================================================

use gatehouse_config::RoutesConfig;

/// Route categories a request path falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteClass {
    /// Reachable without a session
    pub is_public: bool,
    /// Exempt from the profile-completeness check
    pub skips_profile_check: bool,
    /// API whose callers expect JSON and must never see an HTML redirect
    pub is_bypass_api: bool,
    /// Exactly the login page
    pub is_login_page: bool,
    /// Under the generic API prefix
    pub is_api: bool,
}

pub struct RouteTables {
    routes: RoutesConfig,
}

impl RouteTables {
    pub fn new(routes: RoutesConfig) -> Self {
        Self { routes }
    }

    pub fn login_path(&self) -> &str {
        &self.routes.login_path
    }

    pub fn profile_path(&self) -> &str {
        &self.routes.profile_path
    }

    /// Classify a request path against the three static route lists
    pub fn classify(&self, path: &str) -> RouteClass {
        RouteClass {
            is_public: matches_prefix(&self.routes.public_prefixes, path),
            skips_profile_check: matches_prefix(&self.routes.profile_exempt_prefixes, path),
            is_bypass_api: matches_prefix(&self.routes.bypass_api_prefixes, path),
            is_login_page: path == self.routes.login_path,
            is_api: path.starts_with(&self.routes.api_prefix),
        }
    }
}

fn matches_prefix(prefixes: &[String], path: &str) -> bool {
    prefixes.iter().any(|prefix| path.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> RouteTables {
        RouteTables::new(RoutesConfig::default())
    }

    #[test]
    fn login_page_is_public_and_exempt() {
        let class = tables().classify("/login");
        assert!(class.is_public);
        assert!(class.skips_profile_check);
        assert!(class.is_login_page);
        assert!(!class.is_bypass_api);
    }

    #[test]
    fn auth_callback_is_public() {
        let class = tables().classify("/api/auth/callback/google");
        assert!(class.is_public);
        assert!(class.skips_profile_check);
        assert!(class.is_api);
    }

    #[test]
    fn chat_api_bypasses_but_is_not_public() {
        let class = tables().classify("/api/chat");
        assert!(!class.is_public);
        assert!(class.is_bypass_api);
        assert!(class.is_api);
    }

    #[test]
    fn profile_page_skips_its_own_check() {
        let class = tables().classify("/profile");
        assert!(!class.is_public);
        assert!(class.skips_profile_check);
    }

    #[test]
    fn static_assets_are_exempt() {
        assert!(tables().classify("/_next/static/css/app.css").skips_profile_check);
        assert!(tables().classify("/favicon.ico").skips_profile_check);
        assert!(tables().classify("/images/logo.png").skips_profile_check);
    }

    #[test]
    fn ordinary_page_is_fully_gated() {
        let class = tables().classify("/search/abc123");
        assert!(!class.is_public);
        assert!(!class.skips_profile_check);
        assert!(!class.is_bypass_api);
        assert!(!class.is_api);
        assert!(!class.is_login_page);
    }
}
