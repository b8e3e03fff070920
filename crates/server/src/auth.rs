//! Shared-token authentication.
//!
//! Each known client has one shared secret. A request names its client in
//! `x-client-name` and proves it with `Authorization: Bearer <token>`.
//! Checks run in a fixed order and the first failure is reported.

use std::collections::HashMap;

use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Header carrying the client identifier.
pub const CLIENT_NAME_HEADER: &str = "x-client-name";

/// Lookup failure inside a credential backend.
#[derive(Debug, Error)]
#[error("credential store unavailable: {0}")]
pub struct CredentialStoreError(pub String);

/// Source of client tokens.
pub trait CredentialStore: Send + Sync {
    /// Token registered for `client`, or `None` for an unknown client.
    fn lookup(&self, client: &str) -> Result<Option<String>, CredentialStoreError>;
}

/// In-memory client-to-token table.
#[derive(Debug, Clone, Default)]
pub struct SharedTokens {
    tokens: HashMap<String, String>,
}

impl SharedTokens {
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl FromIterator<(String, String)> for SharedTokens {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl CredentialStore for SharedTokens {
    fn lookup(&self, client: &str) -> Result<Option<String>, CredentialStoreError> {
        Ok(self.tokens.get(client).cloned())
    }
}

/// Authenticated caller, stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub name: String,
}

/// Why a request was not authenticated.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Client identifier missing")]
    ClientIdentifierMissing,

    #[error("Unknown client")]
    UnknownClient,

    #[error("Authorization header missing")]
    AuthorizationMissing,

    #[error("Invalid authorization format")]
    InvalidAuthFormat,

    #[error("Invalid token for this client")]
    InvalidToken,

    #[error("credential lookup failed: {0}")]
    Internal(#[from] CredentialStoreError),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::ClientIdentifierMissing => StatusCode::BAD_REQUEST,
            AuthError::UnknownClient
            | AuthError::AuthorizationMissing
            | AuthError::InvalidAuthFormat
            | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Extra hint returned to the caller.
    pub fn details(&self) -> Option<&'static str> {
        match self {
            AuthError::ClientIdentifierMissing => Some("Include x-client-name header"),
            AuthError::InvalidAuthFormat => Some("Expected: Bearer <token>"),
            _ => None,
        }
    }
}

/// Authenticate a request from its headers.
pub fn authenticate(
    headers: &HeaderMap,
    credentials: &dyn CredentialStore,
) -> Result<ClientIdentity, AuthError> {
    let client = headers
        .get(CLIENT_NAME_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .ok_or(AuthError::ClientIdentifierMissing)?;

    let expected = credentials
        .lookup(client)?
        .ok_or(AuthError::UnknownClient)?;

    let header = headers
        .get(AUTHORIZATION)
        .filter(|value| !value.is_empty())
        .ok_or(AuthError::AuthorizationMissing)?;
    let token = header
        .to_str()
        .ok()
        .and_then(parse_bearer)
        .ok_or(AuthError::InvalidAuthFormat)?;

    if !bool::from(token.as_bytes().ct_eq(expected.as_bytes())) {
        return Err(AuthError::InvalidToken);
    }

    Ok(ClientIdentity {
        name: client.to_string(),
    })
}

fn parse_bearer(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    if scheme != "Bearer" || token.is_empty() || token.contains(char::is_whitespace) {
        return None;
    }
    Some(token)
}
