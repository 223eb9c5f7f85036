// ============================================================================
// Gatehouse Gateway
// ============================================================================
//
// Request-gating pipeline: every inbound request is classified, its session
// verified, and its profile-onboarding state resolved into one of three
// outcomes (allow / redirect / 401 JSON). The gate runs on the hot path of
// every page load, so everything before the profile fetch is free of I/O.
//
// ============================================================================

pub mod auth;
pub mod gate;
pub mod health;
pub mod middleware;
pub mod paths;
pub mod profile;
