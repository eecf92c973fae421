//! Bounded retries around a registry.

use crate::config::RegistryConfig;
use crate::header::Token;
use crate::registry::{Membership, RegistryError, TokenRegistry};
use rand::Rng;
use std::time::Duration;

/// How many extra attempts to make after a registry error, and how long to
/// wait between them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first. Zero means a single attempt.
    pub retries: u32,
    /// Base delay; attempt `n` waits `base * (n + 1)` plus up to `base` of jitter,
    /// saturating rather than overflowing.
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub const NONE: RetryPolicy = RetryPolicy {
        retries: 0,
        base_delay: Duration::ZERO,
    };

    fn delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_millis() as u64;
        let jitter = if base == 0 {
            0
        } else {
            rand::rng().random_range(0..=base)
        };
        Duration::from_millis(base.saturating_mul(u64::from(attempt) + 1).saturating_add(jitter))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::NONE
    }
}

/// Retries a registry on [`RegistryError`] only.
///
/// A definite answer, including [`Membership::NotMember`], is returned as is.
/// When retries run out the last error is returned, so the caller still
/// fails closed.
#[derive(Clone)]
pub struct Retrying<R> {
    inner: R,
    policy: RetryPolicy,
}

impl<R> Retrying<R> {
    pub fn new(inner: R, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

impl<R> TokenRegistry for Retrying<R>
where
    R: TokenRegistry,
{
    async fn is_member(&self, token: &Token) -> Result<Membership, RegistryError> {
        let mut attempt = 0;
        loop {
            match self.inner.is_member(token).await {
                Err(err) if attempt < self.policy.retries => {
                    let delay = self.policy.delay(attempt);
                    tracing::warn!(
                        error = %err,
                        attempt = attempt + 1,
                        ?delay,
                        "registry check failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                answer => return answer,
            }
        }
    }

    fn config(&self) -> Option<&RegistryConfig> {
        self.inner.config()
    }
}
