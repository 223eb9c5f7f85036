// ============================================================================
// Gate Middleware
// ============================================================================
//
// The axum boundary of the gating pipeline. Reconstructs the external URL
// from forwarded headers, runs session verification and the decision
// engine, and converts the verdict into an HTTP response. Allowed responses
// carry diagnostic headers so operators can see which tier answered the
// profile question. Any unexpected pipeline error is caught here and fails
// safe: API callers get 401 JSON, page loads get sent to login.
//
// ============================================================================

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::REFERER;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde_json::json;
use uuid::Uuid;

use gatehouse_config::Config;

use crate::auth::SessionVerifier;
use crate::gate::{Diagnostics, GateEngine, GateOutcome, GateRequest};

// Diagnostic response headers
const HEADER_URL: &str = "x-url";
const HEADER_HOST: &str = "x-host";
const HEADER_PROTOCOL: &str = "x-protocol";
const HEADER_BASE_URL: &str = "x-base-url";
const HEADER_REQUEST_ID: &str = "x-request-id";
const HEADER_ONBOARDING_COMPLETED: &str = "x-onboarding-completed";
const HEADER_PROFILE_SOURCE: &str = "x-profile-source";
const HEADER_PROFILE_ATTEMPTS: &str = "x-profile-attempts";

pub struct GatewayState {
    pub config: Arc<Config>,
    pub verifier: SessionVerifier,
    pub engine: GateEngine,
}

/// Request-gating middleware, applied to every route the gateway fronts
pub async fn gate(
    State(state): State<Arc<GatewayState>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let request_id = Uuid::new_v4().to_string();

    let (protocol, host, base_url) = external_base_url(request.headers());
    let original_url = format!(
        "{}{}",
        base_url,
        request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or(&path)
    );

    let token = state.verifier.verify(request.headers());
    let referer = request
        .headers()
        .get(REFERER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let gate_request = GateRequest {
        path: path.clone(),
        original_url: original_url.clone(),
        token,
        referer,
    };

    match state.engine.evaluate(&gate_request).await {
        Ok(GateOutcome::Allow(diagnostics)) => {
            let mut response = next.run(request).await;
            annotate(
                response.headers_mut(),
                &request_id,
                &original_url,
                &host,
                &protocol,
                &base_url,
                &diagnostics,
            );
            response
        }
        Ok(GateOutcome::Redirect(url)) => {
            tracing::debug!(path = %path, target = %url, "Gate redirect");
            Redirect::temporary(&url).into_response()
        }
        Ok(GateOutcome::Fail(status, reason)) => {
            tracing::debug!(path = %path, status = %status.as_u16(), "Gate rejection");
            (status, Json(json!({ "error": reason }))).into_response()
        }
        Err(e) => {
            // Fail safe toward the most restrictive outcome: nothing inside
            // the gate may surface as an unhandled fault.
            tracing::error!(error = %e, path = %path, "Gate pipeline error");
            if path.starts_with(&state.config.routes.api_prefix) {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "error": "Authentication error" })),
                )
                    .into_response()
            } else {
                Redirect::temporary(&state.config.routes.login_path).into_response()
            }
        }
    }
}

/// Derive the externally visible base URL, trusting forwarded headers from
/// the fronting proxy when present
fn external_base_url(headers: &HeaderMap) -> (String, String, String) {
    let protocol = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http")
        .trim_end_matches(':')
        .to_string();
    let host = headers
        .get("x-forwarded-host")
        .or_else(|| headers.get(axum::http::header::HOST))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let base_url = format!("{}://{}", protocol, host);
    (protocol, host, base_url)
}

#[allow(clippy::too_many_arguments)]
fn annotate(
    headers: &mut HeaderMap,
    request_id: &str,
    original_url: &str,
    host: &str,
    protocol: &str,
    base_url: &str,
    diagnostics: &Diagnostics,
) {
    set_header(headers, HEADER_REQUEST_ID, request_id);
    set_header(headers, HEADER_URL, original_url);
    set_header(headers, HEADER_HOST, host);
    set_header(headers, HEADER_PROTOCOL, protocol);
    set_header(headers, HEADER_BASE_URL, base_url);

    if let Some(completed) = diagnostics.onboarding_completed {
        set_header(headers, HEADER_ONBOARDING_COMPLETED, if completed { "true" } else { "false" });
    }
    if let Some(source) = diagnostics.source {
        set_header(headers, HEADER_PROFILE_SOURCE, source.as_str());
    }
    if let Some(attempts) = diagnostics.attempts {
        set_header(headers, HEADER_PROFILE_ATTEMPTS, &attempts.to_string());
    }
}

fn set_header(headers: &mut HeaderMap, name: &'static str, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(HeaderName::from_static(name), value);
    }
}
