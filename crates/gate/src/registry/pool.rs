//! Redis registry backed by a bounded set of reusable connections.

use crate::config::RegistryConfig;
use crate::header::Token;
use crate::registry::client::{open_client, query};
use crate::registry::{DEFAULT_TIMEOUT, Membership, RegistryError, TokenRegistry};
use redis::Client;
use redis::aio::ConnectionManager;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time::timeout;

/// Checks tokens over pooled connections, picked round-robin.
///
/// Each slot connects lazily under the same timeout as a per-request
/// connection. A slot that failed to connect is retried by the next check
/// that lands on it, so an outage never leaves the pool permanently empty.
#[derive(Clone)]
pub struct PooledRedisRegistry {
    config: Arc<RegistryConfig>,
    client: Client,
    slots: Arc<[OnceCell<ConnectionManager>]>,
    next: Arc<AtomicUsize>,
    timeout: Duration,
}

impl PooledRedisRegistry {
    /// Create a pool with `size` slots (at least one). No connection is made
    /// until the first check.
    pub fn new(config: Arc<RegistryConfig>, size: usize) -> Result<Self, RegistryError> {
        let client = open_client(&config).map_err(|source| RegistryError::Connect {
            addr: config.addr(),
            source,
        })?;
        let slots = (0..size.max(1)).map(|_| OnceCell::new()).collect();

        Ok(Self {
            config,
            client,
            slots,
            next: Arc::new(AtomicUsize::new(0)),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Connection for `slot`, connecting first if the slot is still empty.
    ///
    /// The connect runs outside the slot, so concurrent checks never wait on
    /// each other: each is bounded by its own timeout, and the first
    /// successful connection is kept for later checks.
    async fn connection(&self, slot: usize) -> Result<ConnectionManager, RegistryError> {
        let cell = &self.slots[slot];
        if let Some(manager) = cell.get() {
            return Ok(manager.clone());
        }

        let addr = self.config.addr();
        let manager = match timeout(self.timeout, ConnectionManager::new(self.client.clone())).await
        {
            Ok(Ok(manager)) => manager,
            Ok(Err(source)) => return Err(RegistryError::Connect { addr, source }),
            Err(_) => {
                return Err(RegistryError::ConnectTimeout {
                    addr,
                    timeout: self.timeout,
                });
            }
        };

        match cell.set(manager.clone()) {
            Ok(()) => {
                tracing::debug!(%addr, slot, "pooled registry connection established");
                Ok(manager)
            }
            // Another check filled the slot first; ours is dropped.
            Err(_) => Ok(cell.get().cloned().unwrap_or(manager)),
        }
    }
}

impl TokenRegistry for PooledRedisRegistry {
    async fn is_member(&self, token: &Token) -> Result<Membership, RegistryError> {
        let slot = self.next.fetch_add(1, Ordering::Relaxed) % self.slots.len();
        let mut conn = self.connection(slot).await?;
        query(
            &mut conn,
            &self.config.set_key,
            token,
            self.timeout,
            self.config.addr(),
        )
        .await
    }

    fn config(&self) -> Option<&RegistryConfig> {
        Some(&*self.config)
    }
}
