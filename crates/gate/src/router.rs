//! HTTP endpoints for subrequest authorization.
//!
//! A fronting proxy sends each protected request's headers to `/auth` and
//! reads only the status code: 200 allows, 401 denies, 500 means the
//! registry could not be consulted.

use crate::gate::AuthGate;
use crate::registry::TokenRegistry;
use axum::Router;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use http::HeaderMap;

/// Path of the authorization endpoint.
pub const AUTH_PATH: &str = "/auth";

/// Path of the liveness endpoint. Not gated.
pub const HEALTH_PATH: &str = "/health";

/// Build the authorizer router around `gate`.
pub fn router<R>(gate: AuthGate<R>) -> Router
where
    R: TokenRegistry,
{
    Router::new()
        .route(AUTH_PATH, any(authorize::<R>))
        .route(HEALTH_PATH, get(health))
        .with_state(gate)
}

async fn authorize<R>(State(gate): State<AuthGate<R>>, headers: HeaderMap) -> Response
where
    R: TokenRegistry,
{
    gate.evaluate(&headers).await.into_response()
}

async fn health() -> &'static str {
    "ok"
}
