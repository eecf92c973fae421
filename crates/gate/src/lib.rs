//! # tokengate
//!
//! Bearer token authorization against a revocable token set kept in Redis.
//!
//! A request is admitted only if its `Authorization: Bearer <token>` header
//! names a member of the configured set. Anything else is denied, and any
//! failure to reach the registry is reported as a server error, never as an
//! allow.
//!
//! ## Subrequest authorizer
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tokengate::{AuthGate, RedisRegistry, RegistryConfig, router};
//!
//! let config = Arc::new(RegistryConfig::resolve("", "", "")?);
//! let app = router(AuthGate::new(RedisRegistry::new(config)));
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8081").await?;
//! axum::serve(listener, app).await?;
//! ```
//!
//! ## Inline middleware
//!
//! [`AuthLayer`] applies the same decision in front of any axum service.

pub mod config;
pub mod gate;
pub mod header;
pub mod layer;
pub mod registry;
pub mod response;
pub mod router;

#[cfg(test)]
mod testing;

pub use axum;

pub use config::{ConfigError, RegistryConfig};
pub use gate::{AuthContext, AuthGate, Decision, DenyReason};
pub use header::{MalformedHeader, Token};
pub use layer::{AuthLayer, AuthService};
pub use registry::{
    Membership, PooledRedisRegistry, RedisBackend, RedisRegistry, RegistryError, RetryPolicy,
    Retrying, TokenRegistry,
};
pub use router::router;
