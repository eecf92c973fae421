//! Inline authorization middleware.
//!
//! Applies the same decision as the `/auth` endpoint directly in front of
//! another service. Authorized requests are forwarded with their [`Token`]
//! inserted into `http::Extensions`; all others get the decision's response
//! and never reach the inner service.
//!
//! ```rust,ignore
//! use tokengate::{AuthGate, AuthLayer, RedisRegistry};
//!
//! let gate = AuthGate::new(RedisRegistry::new(config));
//! let app = axum::Router::new()
//!     .route("/v1/chat", post(chat))
//!     .layer(AuthLayer::new(gate));
//! ```
//!
//! [`Token`]: crate::header::Token

use crate::gate::{AuthGate, Decision};
use crate::registry::TokenRegistry;
use axum::response::IntoResponse;
use futures::future::BoxFuture;
use http::{Request, Response};
use std::task::{Context, Poll};

/// Tower [`Layer`](tower::Layer) that applies [`AuthService`].
#[derive(Clone)]
pub struct AuthLayer<R> {
    gate: AuthGate<R>,
}

impl<R> AuthLayer<R> {
    pub fn new(gate: AuthGate<R>) -> Self {
        Self { gate }
    }
}

impl<R, S> tower::Layer<S> for AuthLayer<R>
where
    R: Clone,
{
    type Service = AuthService<R, S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            gate: self.gate.clone(),
            inner,
        }
    }
}

/// Tower service that authorizes requests before forwarding them.
#[derive(Clone)]
pub struct AuthService<R, S> {
    gate: AuthGate<R>,
    inner: S,
}

impl<R, S, B> tower::Service<Request<B>> for AuthService<R, S>
where
    R: TokenRegistry,
    S: tower::Service<Request<B>, Response = Response<axum::body::Body>> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: Send,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let gate = self.gate.clone();
        let mut inner = self.inner.clone();
        // swap to ensure poll_ready state is preserved
        std::mem::swap(&mut self.inner, &mut inner);

        Box::pin(async move {
            let (parts, body) = req.into_parts();

            match gate.evaluate(&parts.headers).await {
                Decision::Authorized(token) => {
                    let mut req = Request::from_parts(parts, body);
                    req.extensions_mut().insert(token);
                    inner.call(req).await
                }
                decision => Ok(decision.into_response()),
            }
        })
    }
}
