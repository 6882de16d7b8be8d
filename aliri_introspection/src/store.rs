//! The interface used by request handlers to check bearer tokens

use std::error;

use async_trait::async_trait;

use crate::{IntrospectionError, RemoteTokenValidator, TokenRecord};

/// A source of truth about whether bearer tokens are currently valid
///
/// Request handlers depend on this trait rather than on a concrete
/// validator so that other token stores can be substituted.
#[async_trait]
pub trait TokenIntrospector: Send + Sync {
    /// The error type returned when no trustworthy answer can be obtained
    type Error: error::Error + Send + Sync + 'static;

    /// Looks up a token, returning `None` if it is not currently valid
    async fn validate(&self, token_id: &str) -> Result<Option<TokenRecord>, Self::Error>;

    /// Revokes a token so that it will no longer be accepted
    async fn revoke(&self, token_id: &str) -> Result<(), Self::Error>;
}

#[async_trait]
impl TokenIntrospector for RemoteTokenValidator {
    type Error = IntrospectionError;

    async fn validate(&self, token_id: &str) -> Result<Option<TokenRecord>, Self::Error> {
        RemoteTokenValidator::validate(self, token_id).await
    }

    async fn revoke(&self, token_id: &str) -> Result<(), Self::Error> {
        RemoteTokenValidator::revoke(self, token_id).await
    }
}
