//! The authorization decision.
//!
//! [`AuthGate::evaluate`] walks a request through the decision steps:
//!
//! - Start: extract the bearer token. On failure the request is Denied.
//! - Queried: ask the registry. `Member` is Authorized, `NotMember` is
//!   Denied, and any registry error is Failed.
//!
//! Errors and timeouts never produce Authorized.

use crate::config::RegistryConfig;
use crate::header::{self, MalformedHeader, Token};
use crate::registry::{Membership, RegistryError, TokenRegistry};
use http::{HeaderMap, HeaderValue};
use http::header::AUTHORIZATION;
use thiserror::Error;

/// Why a request was denied.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    #[error(transparent)]
    Malformed(#[from] MalformedHeader),
    #[error("token is not registered")]
    NotMember,
}

/// Terminal outcome of evaluating one request.
#[derive(Debug)]
pub enum Decision {
    /// The token is in the registry.
    Authorized(Token),
    Denied(DenyReason),
    /// The registry could not be consulted.
    Failed(RegistryError),
}

impl Decision {
    pub fn is_authorized(&self) -> bool {
        matches!(self, Decision::Authorized(_))
    }
}

/// Per-request state for one evaluation: the raw credential, the token once
/// extracted, and the settings of the registry it will be checked against.
///
/// Borrows from the request headers and the registry; dropped when the
/// evaluation ends.
#[derive(Debug, Clone)]
pub struct AuthContext<'a> {
    /// First `Authorization` header, if present.
    pub raw: Option<&'a HeaderValue>,
    /// Set by [`AuthContext::extract`] on success.
    pub token: Option<Token>,
    /// `None` for registries without Redis settings.
    pub config: Option<&'a RegistryConfig>,
}

impl<'a> AuthContext<'a> {
    pub fn new(headers: &'a HeaderMap, config: Option<&'a RegistryConfig>) -> Self {
        Self {
            raw: headers.get(AUTHORIZATION),
            token: None,
            config,
        }
    }

    /// Extract the token from the raw header and keep it in the context.
    ///
    /// The value must be valid UTF-8; beyond that the credential is taken
    /// byte for byte.
    pub fn extract(&mut self) -> Result<&Token, MalformedHeader> {
        let value = match self.raw {
            None => None,
            Some(value) => Some(
                std::str::from_utf8(value.as_bytes())
                    .map_err(|_| MalformedHeader::InvalidEncoding)?,
            ),
        };
        let token = header::extract(value)?;
        Ok(&*self.token.insert(token))
    }
}

/// Decides whether requests carry a registered bearer token.
#[derive(Clone)]
pub struct AuthGate<R> {
    registry: R,
}

impl<R> AuthGate<R> {
    pub fn new(registry: R) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }
}

impl<R> AuthGate<R>
where
    R: TokenRegistry,
{
    /// Evaluate a request by its headers.
    pub async fn evaluate(&self, headers: &HeaderMap) -> Decision {
        let mut ctx = AuthContext::new(headers, self.registry.config());

        let token = match ctx.extract() {
            Ok(token) => token.clone(),
            Err(reason) => {
                tracing::debug!(%reason, "request denied");
                return Decision::Denied(reason.into());
            }
        };

        match self.registry.is_member(&token).await {
            Ok(Membership::Member) => {
                tracing::trace!(%token, "request authorized");
                Decision::Authorized(token)
            }
            Ok(Membership::NotMember) => {
                tracing::debug!(%token, "request denied: token not registered");
                Decision::Denied(DenyReason::NotMember)
            }
            Err(err) => {
                tracing::error!(
                    registry = err.addr(),
                    set = ctx.config.map_or("", |c| c.set_key.as_str()),
                    error = %err,
                    %token,
                    "registry check failed"
                );
                Decision::Failed(err)
            }
        }
    }
}
