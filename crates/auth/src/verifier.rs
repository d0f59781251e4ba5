use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::{claims::TokenValidationError, principal::Principal};

/// Why a token was not accepted.
///
/// Callers collapse every variant into the same "unauthenticated" outcome;
/// the detail is for logs only.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("invalid token: {0}")]
    Invalid(String),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),

    #[error("token has no email claim")]
    MissingEmail,

    #[error("no signing key for kid {0:?}")]
    UnknownKey(Option<String>),

    #[error("fetching signing keys failed: {0}")]
    KeyFetch(String),
}

impl From<jsonwebtoken::errors::Error> for VerifyError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        Self::Invalid(value.to_string())
    }
}

/// Validates a bearer credential and yields the verified principal.
///
/// Implementations are injected into the HTTP layer, so tests can substitute
/// their own.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Principal, VerifyError>;
}

#[async_trait]
impl<V> IdentityVerifier for Arc<V>
where
    V: IdentityVerifier + ?Sized,
{
    async fn verify(&self, token: &str) -> Result<Principal, VerifyError> {
        (**self).verify(token).await
    }
}
