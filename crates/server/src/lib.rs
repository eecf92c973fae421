//! Standalone HTTP authorizer serving the [`tokengate`] decision.

pub mod cmd;
pub mod error;
