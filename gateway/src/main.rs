// ============================================================================
// Gatehouse Gateway - service entry point
// ============================================================================
//
// Boots the request-gating pipeline:
// - configuration from environment
// - session verifier (verify-only, shared secret with the identity provider)
// - profile store client (redis hash per user)
// - gate middleware layered over every fronted route
//
// Health probes are mounted outside the gate.
//
// ============================================================================

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gatehouse_config::Config;
use gatehouse_gateway::auth::SessionVerifier;
use gatehouse_gateway::gate::GateEngine;
use gatehouse_gateway::health;
use gatehouse_gateway::middleware::{gate, GatewayState};
use gatehouse_gateway::profile::RedisProfileStore;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Arc::new(Config::from_env().context("Failed to load configuration")?);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.rust_log.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store = RedisProfileStore::connect(&config.redis_url, &config.profile_key_prefix)
        .await
        .context("Failed to connect to profile store")?;

    let verifier = SessionVerifier::new(&config.security);
    let engine = GateEngine::new(
        config.routes.clone(),
        &config.gate,
        &config.retry,
        Arc::new(store),
    );

    let state = Arc::new(GatewayState {
        config: config.clone(),
        verifier,
        engine,
    });

    // Everything the gateway fronts goes through the gate; the fallback
    // answers for paths the gate allowed but no downstream claims.
    let gated = Router::new()
        .fallback(downstream_placeholder)
        .layer(axum::middleware::from_fn_with_state(state.clone(), gate))
        .layer(TraceLayer::new_for_http());

    let app = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::health_live))
        .route("/health/ready", get(health::health_ready))
        .merge(gated);

    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(address = %addr, "Gatehouse gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn downstream_placeholder() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "No downstream route" })),
    )
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install shutdown signal handler");
        return;
    }
    info!("Shutdown signal received");
}
