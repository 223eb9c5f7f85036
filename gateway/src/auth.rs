// ============================================================================
// Session Verification
// ============================================================================
//
// Wraps the identity provider's session token format. The gateway is
// verify-only: it never issues tokens, it only checks the HS256 signature
// and expiry of the session cookie the provider set. Verification is local
// cryptography, so there is no retry or timeout handling here.
//
// ============================================================================

use axum::http::HeaderMap;
use axum::http::header::COOKIE;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use gatehouse_config::SecurityConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    /// Expiration time (unix seconds)
    pub exp: i64,
    /// Issued at (unix seconds)
    #[serde(default)]
    pub iat: i64,
}

/// Outcome of session verification for a single request.
///
/// `Invalid` covers malformed and expired tokens as well as verifier
/// failures; for routing it behaves exactly like `Absent`, but the two are
/// logged distinctly.
#[derive(Debug, Clone)]
pub enum TokenOutcome {
    Valid(Claims),
    Absent,
    Invalid,
}

impl TokenOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, TokenOutcome::Valid(_))
    }

    /// Claims if the session verified, None for Absent and Invalid alike
    pub fn claims(&self) -> Option<&Claims> {
        match self {
            TokenOutcome::Valid(claims) => Some(claims),
            _ => None,
        }
    }
}

pub struct SessionVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
    cookie_name: String,
}

impl SessionVerifier {
    pub fn new(security: &SecurityConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        // Session tokens carry no audience claim
        validation.validate_aud = false;

        Self {
            decoding_key: DecodingKey::from_secret(security.session_secret.as_bytes()),
            validation,
            cookie_name: security.cookie_name(),
        }
    }

    /// Verify the session carried by this request's headers.
    ///
    /// No cookie means an anonymous request; a cookie that fails
    /// verification is treated the same for routing but logged separately.
    pub fn verify(&self, headers: &HeaderMap) -> TokenOutcome {
        let Some(token) = extract_cookie(headers, &self.cookie_name) else {
            return TokenOutcome::Absent;
        };

        match self.verify_token(&token) {
            Ok(claims) => TokenOutcome::Valid(claims),
            Err(e) => {
                tracing::warn!(error = %e, "Session token failed verification");
                TokenOutcome::Invalid
            }
        }
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }
}

/// Pull a single cookie value out of the Cookie header(s)
fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get_all(COOKIE).iter().find_map(|value| {
        value.to_str().ok().and_then(|raw| {
            raw.split(';').find_map(|pair| {
                let (key, val) = pair.trim().split_once('=')?;
                if key == name {
                    Some(val.to_string())
                } else {
                    None
                }
            })
        })
    })
}
