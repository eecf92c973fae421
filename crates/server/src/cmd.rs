//! Command-line interface for the authorizer.
//!
//! Every flag can also be set through the environment. The three registry
//! settings keep their historical variable names and treat an empty value as
//! unset.

use crate::error::Error;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokengate::{
    AuthGate, ConfigError, PooledRedisRegistry, RedisBackend, RedisRegistry, RegistryConfig,
    RegistryError, RetryPolicy, Retrying, router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

const MAX_RETRY_DELAY_MS: u64 = 60_000;

/// Bearer token authorizer for reverse-proxy subrequests.
#[derive(Parser, Debug)]
#[command(name = "tokengate", version, about)]
pub struct App {
    /// Address to serve `/auth` and `/health` on.
    #[arg(long, env = "TOKENGATE_LISTEN", default_value = "127.0.0.1:8081")]
    pub listen: SocketAddr,

    /// Registry host. Empty means 127.0.0.1.
    #[arg(long = "redis-host", env = "ACCESS_REDIS_HOST", default_value = "")]
    pub redis_host: String,

    /// Registry port. Empty means 6379.
    #[arg(long = "redis-port", env = "ACCESS_REDIS_PORT", default_value = "")]
    pub redis_port: String,

    /// Name of the set holding valid tokens. Empty means nginx_tokens:bearer.
    #[arg(long = "token-set", env = "ACCESS_TOKEN_SET", default_value = "")]
    pub token_set: String,

    /// Bound on each registry connect and query, in milliseconds.
    #[arg(
        long = "timeout-ms",
        env = "TOKENGATE_TIMEOUT_MS",
        default_value_t = 1000,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout_ms: u64,

    /// Number of reusable registry connections. 0 opens one per request.
    #[arg(long = "pool-size", env = "TOKENGATE_POOL_SIZE", default_value_t = 0)]
    pub pool_size: usize,

    /// Extra attempts after a registry error.
    #[arg(long, env = "TOKENGATE_RETRIES", default_value_t = 0)]
    pub retries: u32,

    /// Base delay between retries, in milliseconds. At most one minute.
    #[arg(
        long = "retry-delay-ms",
        env = "TOKENGATE_RETRY_DELAY_MS",
        default_value_t = 25,
        value_parser = clap::value_parser!(u64).range(..=MAX_RETRY_DELAY_MS)
    )]
    pub retry_delay_ms: u64,
}

impl App {
    /// Parse CLI arguments and serve until shutdown.
    pub async fn run() -> Result<(), Error> {
        App::parse().serve().await
    }

    pub fn registry_config(&self) -> Result<RegistryConfig, ConfigError> {
        RegistryConfig::resolve(&self.redis_host, &self.redis_port, &self.token_set)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.retries,
            base_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    /// Build the registry selected by the flags.
    pub fn registry(
        &self,
        config: Arc<RegistryConfig>,
    ) -> Result<Retrying<RedisBackend>, RegistryError> {
        let timeout = Duration::from_millis(self.timeout_ms);
        let backend = if self.pool_size == 0 {
            RedisBackend::PerRequest(RedisRegistry::new(config).with_timeout(timeout))
        } else {
            RedisBackend::Pooled(
                PooledRedisRegistry::new(config, self.pool_size)?.with_timeout(timeout),
            )
        };
        Ok(Retrying::new(backend, self.retry_policy()))
    }

    /// Bind the listener and serve the authorizer until Ctrl-C or SIGTERM.
    pub async fn serve(self) -> Result<(), Error> {
        let config = Arc::new(self.registry_config()?);
        let registry = self.registry(config.clone())?;
        tracing::info!(
            registry = %config.addr(),
            set = %config.set_key,
            timeout_ms = self.timeout_ms,
            pool_size = self.pool_size,
            retries = self.retries,
            "registry configured"
        );

        let app = router(AuthGate::new(registry)).layer(TraceLayer::new_for_http());
        let listener = TcpListener::bind(self.listen).await?;
        tracing::info!(addr = %listener.local_addr()?, "tokengate listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        tracing::info!("tokengate stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown requested, finishing in-flight checks");
}

#[cfg(test)]
mod tests {
    use crate::cmd::App;
    use clap::Parser;
    use std::sync::Arc;
    use std::time::Duration;
    use tokengate::{RedisBackend, RegistryConfig};

    fn parse(args: &[&str]) -> App {
        let mut argv = vec!["tokengate"];
        argv.extend_from_slice(args);
        App::try_parse_from(argv).unwrap()
    }

    #[test]
    fn empty_port_resolves_to_default() {
        let app = parse(&["--redis-port", ""]);
        let config = app.registry_config().unwrap();
        assert_eq!(config.port, 6379);
    }

    #[test]
    fn explicit_values_are_kept() {
        let app = parse(&[
            "--redis-host",
            "redis.internal",
            "--redis-port",
            "6380",
            "--token-set",
            "gateway:tokens",
        ]);
        let config = app.registry_config().unwrap();
        assert_eq!(config.host, "redis.internal");
        assert_eq!(config.port, 6380);
        assert_eq!(config.set_key, "gateway:tokens");
    }

    #[test]
    fn invalid_port_is_a_config_error() {
        let app = parse(&["--redis-port", "not-a-port"]);
        assert!(app.registry_config().is_err());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        assert!(App::try_parse_from(["tokengate", "--timeout-ms", "0"]).is_err());
    }

    #[test]
    fn pool_size_selects_backend() {
        let config = Arc::new(RegistryConfig::default());

        let registry = parse(&[]).registry(config.clone()).unwrap();
        assert!(matches!(registry.inner(), RedisBackend::PerRequest(_)));

        let registry = parse(&["--pool-size", "4"]).registry(config).unwrap();
        match registry.inner() {
            RedisBackend::Pooled(pool) => assert_eq!(pool.size(), 4),
            RedisBackend::PerRequest(_) => panic!("expected pooled backend"),
        }
    }

    #[test]
    fn retry_flags_build_policy() {
        let policy = parse(&["--retries", "2", "--retry-delay-ms", "10"]).retry_policy();
        assert_eq!(policy.retries, 2);
        assert_eq!(policy.base_delay, Duration::from_millis(10));
    }

    #[test]
    fn retry_delay_is_bounded() {
        let policy = parse(&["--retry-delay-ms", "60000"]).retry_policy();
        assert_eq!(policy.base_delay, Duration::from_secs(60));
        assert!(App::try_parse_from(["tokengate", "--retry-delay-ms", "60001"]).is_err());
        let huge = u64::MAX.to_string();
        assert!(App::try_parse_from(["tokengate", "--retry-delay-ms", huge.as_str()]).is_err());
    }
}
