//! Token registry lookups.
//!
//! A registry answers one question: is this token an element of the set of
//! currently valid tokens? Implementations must report every failure as a
//! [`RegistryError`] and never guess an answer.

mod client;
mod pool;
mod retry;

pub use self::client::RedisRegistry;
pub use self::pool::PooledRedisRegistry;
pub use self::retry::{RetryPolicy, Retrying};

use crate::config::RegistryConfig;
use crate::header::Token;
use std::time::Duration;
use thiserror::Error;

/// Default bound on registry connect and query operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Answer to a membership query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    Member,
    NotMember,
}

impl From<bool> for Membership {
    fn from(present: bool) -> Self {
        if present {
            Membership::Member
        } else {
            Membership::NotMember
        }
    }
}

/// Failure to obtain a membership answer from the registry.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("failed to connect to registry at {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: redis::RedisError,
    },

    #[error("connecting to registry at {addr} timed out after {timeout:?}")]
    ConnectTimeout { addr: String, timeout: Duration },

    #[error("membership query against {addr} failed: {source}")]
    Query {
        addr: String,
        #[source]
        source: redis::RedisError,
    },

    #[error("membership query against {addr} timed out after {timeout:?}")]
    QueryTimeout { addr: String, timeout: Duration },
}

impl RegistryError {
    /// Registry address the failed operation targeted.
    pub fn addr(&self) -> &str {
        match self {
            Self::Connect { addr, .. }
            | Self::ConnectTimeout { addr, .. }
            | Self::Query { addr, .. }
            | Self::QueryTimeout { addr, .. } => addr,
        }
    }

    /// Whether the failure happened before a query could be sent.
    pub fn is_connect(&self) -> bool {
        matches!(self, Self::Connect { .. } | Self::ConnectTimeout { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ConnectTimeout { .. } | Self::QueryTimeout { .. })
    }
}

/// A source of truth for valid tokens.
///
/// Implemented for Redis in [`RedisRegistry`] and [`PooledRedisRegistry`];
/// wrap any implementation in [`Retrying`] to add bounded retries.
pub trait TokenRegistry: Clone + Send + Sync + 'static {
    /// Check whether `token` is currently registered.
    fn is_member(
        &self,
        token: &Token,
    ) -> impl Future<Output = Result<Membership, RegistryError>> + Send;

    /// Settings of the registry behind this implementation, if it has any.
    fn config(&self) -> Option<&RegistryConfig> {
        None
    }
}

/// Redis registry with the connection strategy chosen at startup.
#[derive(Clone)]
pub enum RedisBackend {
    /// A fresh connection for every check.
    PerRequest(RedisRegistry),
    /// Connections reused from a bounded pool.
    Pooled(PooledRedisRegistry),
}

impl TokenRegistry for RedisBackend {
    async fn is_member(&self, token: &Token) -> Result<Membership, RegistryError> {
        match self {
            Self::PerRequest(registry) => registry.is_member(token).await,
            Self::Pooled(registry) => registry.is_member(token).await,
        }
    }

    fn config(&self) -> Option<&RegistryConfig> {
        match self {
            Self::PerRequest(registry) => TokenRegistry::config(registry),
            Self::Pooled(registry) => TokenRegistry::config(registry),
        }
    }
}
