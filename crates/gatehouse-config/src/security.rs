// ============================================================================
// Security Configuration
// ============================================================================

/// Session verification settings.
///
/// The gateway only verifies sessions; token issuance lives with the
/// identity provider. HS256 with a shared secret matches what the provider
/// signs session cookies with.
#[derive(Clone, Debug)]
pub struct SecurityConfig {
    /// Shared secret used to verify session JWTs
    pub session_secret: String,
    /// Cookie name carrying the session token
    pub session_cookie_name: String,
    /// When true, expect the __Secure- prefixed cookie name (production)
    pub secure_cookies: bool,
}

impl SecurityConfig {
    pub(crate) fn from_env() -> anyhow::Result<Self> {
        let session_secret = std::env::var("SESSION_SECRET")
            .map_err(|_| anyhow::anyhow!("SESSION_SECRET is not set in environment variables"))?;

        Ok(Self {
            session_secret,
            session_cookie_name: std::env::var("SESSION_COOKIE_NAME")
                .unwrap_or_else(|_| "session-token".to_string()),
            secure_cookies: std::env::var("SECURE_COOKIES")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        })
    }

    /// Effective cookie name, honoring the __Secure- prefix in secure mode
    pub fn cookie_name(&self) -> String {
        if self.secure_cookies {
            format!("__Secure-{}", self.session_cookie_name)
        } else {
            self.session_cookie_name.clone()
        }
    }
}
