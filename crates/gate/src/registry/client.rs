//! Redis registry using a dedicated connection per check.

use crate::config::RegistryConfig;
use crate::header::Token;
use crate::registry::{DEFAULT_TIMEOUT, Membership, RegistryError, TokenRegistry};
use redis::aio::ConnectionLike;
use redis::{AsyncCommands, Client, ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// Checks tokens with `SISMEMBER`, opening a new connection for every call.
///
/// The connection lives only for the duration of [`TokenRegistry::is_member`]
/// and is dropped on every exit path.
#[derive(Clone, Debug)]
pub struct RedisRegistry {
    config: Arc<RegistryConfig>,
    timeout: Duration,
}

impl RedisRegistry {
    pub fn new(config: Arc<RegistryConfig>) -> Self {
        Self {
            config,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Bound applied separately to the connect and to the query.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }
}

impl TokenRegistry for RedisRegistry {
    async fn is_member(&self, token: &Token) -> Result<Membership, RegistryError> {
        let addr = self.config.addr();
        let client = open_client(&self.config).map_err(|source| RegistryError::Connect {
            addr: addr.clone(),
            source,
        })?;

        let mut conn = match timeout(self.timeout, client.get_multiplexed_async_connection()).await
        {
            Ok(Ok(conn)) => conn,
            Ok(Err(source)) => return Err(RegistryError::Connect { addr, source }),
            Err(_) => {
                return Err(RegistryError::ConnectTimeout {
                    addr,
                    timeout: self.timeout,
                });
            }
        };
        tracing::trace!(%addr, "registry connection established");

        query(&mut conn, &self.config.set_key, token, self.timeout, addr).await
    }

    fn config(&self) -> Option<&RegistryConfig> {
        Some(&*self.config)
    }
}

/// Build a client for the configured TCP address. Does not connect.
pub(super) fn open_client(config: &RegistryConfig) -> redis::RedisResult<Client> {
    Client::open(ConnectionInfo {
        addr: ConnectionAddr::Tcp(config.host.clone(), config.port),
        redis: RedisConnectionInfo::default(),
    })
}

/// Run `SISMEMBER set_key token` on an open connection, bounded by `limit`.
pub(super) async fn query<C>(
    conn: &mut C,
    set_key: &str,
    token: &Token,
    limit: Duration,
    addr: String,
) -> Result<Membership, RegistryError>
where
    C: ConnectionLike + Send,
{
    let answer: Result<redis::RedisResult<bool>, _> =
        timeout(limit, conn.sismember(set_key, token.as_str())).await;

    match answer {
        Ok(Ok(present)) => Ok(Membership::from(present)),
        Ok(Err(source)) => Err(RegistryError::Query { addr, source }),
        Err(_) => Err(RegistryError::QueryTimeout {
            addr,
            timeout: limit,
        }),
    }
}
