//! Bearer credential extraction.
//!
//! Parses `Authorization: <scheme> <credential>` with a single split at the
//! first space. Only the scheme is matched case-insensitively; the credential
//! is passed on byte for byte, including any leading spaces left over from
//! the split.

use std::fmt;
use thiserror::Error;

const SCHEME: &str = "bearer";

/// Why an `Authorization` header did not yield a token.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedHeader {
    #[error("missing Authorization header")]
    Missing,
    #[error("Authorization header has no scheme separator")]
    NoSeparator,
    #[error("Authorization scheme is not Bearer")]
    WrongScheme,
    #[error("empty bearer credential")]
    EmptyCredential,
    /// The header value is not valid UTF-8.
    #[error("Authorization header is not valid text")]
    InvalidEncoding,
}

/// An opaque, non-empty bearer credential.
///
/// `Debug` and `Display` print a redacted form; use [`Token::as_str`] to get
/// the raw value.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    /// Raw credential, as presented by the client.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// At most the first four characters followed by `***`.
    pub fn redacted(&self) -> String {
        let prefix: String = self.0.chars().take(4).collect();
        format!("{prefix}***")
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Token").field(&self.redacted()).finish()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

/// Extract the bearer token from a raw `Authorization` header value.
pub fn extract(header: Option<&str>) -> Result<Token, MalformedHeader> {
    let header = header.ok_or(MalformedHeader::Missing)?;
    let (scheme, credential) = header
        .split_once(' ')
        .ok_or(MalformedHeader::NoSeparator)?;

    if !scheme.eq_ignore_ascii_case(SCHEME) {
        return Err(MalformedHeader::WrongScheme);
    }
    if credential.is_empty() {
        return Err(MalformedHeader::EmptyCredential);
    }

    Ok(Token(credential.to_string()))
}
