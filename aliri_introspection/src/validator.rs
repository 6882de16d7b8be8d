use std::time::Duration;

use reqwest::{
    header::{self, HeaderValue, InvalidHeaderValue},
    StatusCode, Url,
};
use reqwest_middleware::ClientWithMiddleware;
use thiserror::Error;

use crate::{
    credentials::ClientCredentials,
    dto::{IntrospectionResponse, SchemaViolation},
    tls::{self, TlsError, TrustAnchors},
    InvalidTokenId, TokenIdRef, TokenRecord,
};

/// Default time allowed for a complete exchange with the authorization server
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default time allowed to establish a connection to the authorization server
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

const TOKEN_TYPE_HINT: &str = "access_token";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Configuration for a [`RemoteTokenValidator`]
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// The authorization server's token introspection endpoint
    pub introspection_url: Url,

    /// The authorization server's token revocation endpoint
    pub revocation_url: Url,

    /// The credentials used to authenticate to the authorization server
    pub credentials: ClientCredentials,

    /// The certificate authorities trusted to identify the authorization server
    pub trust_anchors: TrustAnchors,

    /// Time allowed for a complete exchange, including reading the response
    pub timeout: Duration,

    /// Time allowed to establish a connection
    pub connect_timeout: Duration,
}

impl ValidatorConfig {
    /// Constructs a new configuration using the default timeouts
    pub fn new(
        introspection_url: Url,
        revocation_url: Url,
        credentials: ClientCredentials,
        trust_anchors: TrustAnchors,
    ) -> Self {
        Self {
            introspection_url,
            revocation_url,
            credentials,
            trust_anchors,
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Overrides the time allowed for a complete exchange
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overrides the time allowed to establish a connection
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }
}

/// An error constructing a [`RemoteTokenValidator`]
#[derive(Debug, Error)]
pub enum BuildError {
    /// The secure transport could not be initialized
    #[error("unable to initialize secure transport")]
    Tls(#[from] TlsError),
    /// An endpoint does not use `https`
    #[error("endpoint {0} does not use https")]
    InsecureEndpoint(Url),
    /// The credentials cannot be sent in an HTTP header
    #[error("client credentials cannot be encoded as an authorization header")]
    Credentials(#[from] InvalidHeaderValue),
}

/// An error while validating or revoking a token
///
/// A token the authorization server does not recognize is never an error;
/// these all indicate that no trustworthy answer could be obtained.
#[derive(Debug, Error)]
pub enum IntrospectionError {
    /// The token identifier is malformed
    #[error("invalid token")]
    InvalidToken(#[from] InvalidTokenId),
    /// Unable to send a request to the authorization server
    #[error("error sending request to authorization server")]
    RequestSend(#[source] reqwest_middleware::Error),
    /// Unable to read the response
    #[error("error reading response body")]
    BodyRead(#[source] reqwest::Error),
    /// The response body was not an introspection response
    #[error("error deserializing introspection response")]
    MalformedResponse(#[from] serde_json::Error),
    /// The response lacked information required to describe the token
    #[error(transparent)]
    SchemaViolation(#[from] SchemaViolation),
}

/// Validates and revokes opaque bearer tokens using a remote authorization
/// server's introspection and revocation endpoints
///
/// Nothing is cached: every call is answered by the authorization server.
/// The validator is cheap to clone and can be shared between tasks, all
/// of which reuse the same connection pool.
#[derive(Debug, Clone)]
pub struct RemoteTokenValidator {
    client: ClientWithMiddleware,
    introspection_url: Url,
    revocation_url: Url,
    authorization: HeaderValue,
}

impl RemoteTokenValidator {
    /// Constructs a new validator over a hardened TLS transport
    pub fn new(config: ValidatorConfig) -> Result<Self, BuildError> {
        for url in [&config.introspection_url, &config.revocation_url] {
            if url.scheme() != "https" {
                return Err(BuildError::InsecureEndpoint(url.clone()));
            }
        }

        let client = tls::build_client(
            &config.trust_anchors,
            config.timeout,
            config.connect_timeout,
        )?;

        tracing::debug!(
            introspection.url = %config.introspection_url,
            revocation.url = %config.revocation_url,
            client_id = %config.credentials.client_id(),
            trust_anchors = config.trust_anchors.len(),
            "constructed remote token validator"
        );

        Self::with_client(
            client,
            config.introspection_url,
            config.revocation_url,
            &config.credentials,
        )
    }

    /// Constructs a new validator that sends requests using the provided client
    ///
    /// The caller is responsible for the security of the client's transport.
    pub fn with_client(
        client: impl Into<ClientWithMiddleware>,
        introspection_url: Url,
        revocation_url: Url,
        credentials: &ClientCredentials,
    ) -> Result<Self, BuildError> {
        Ok(Self {
            client: client.into(),
            introspection_url,
            revocation_url,
            authorization: credentials.authorization_header()?,
        })
    }

    /// Asks the authorization server whether a token is active
    ///
    /// Returns `Ok(None)` without contacting the server when `token_id` is
    /// not a syntactically valid token identifier.
    pub async fn validate(&self, token_id: &str) -> Result<Option<TokenRecord>, IntrospectionError> {
        match TokenIdRef::from_str(token_id) {
            Ok(token_id) => self.validate_token(token_id).await,
            Err(error) => {
                tracing::debug!(%error, "rejected malformed token identifier");
                Ok(None)
            }
        }
    }

    /// Asks the authorization server whether a token is active
    ///
    /// Returns `Ok(None)` if the token is inactive, if the server responds
    /// with anything other than `200 OK`, or if the server does not name the
    /// token's subject.
    #[tracing::instrument(
        level = "debug",
        err,
        skip_all,
        fields(introspection.url = %self.introspection_url),
    )]
    pub async fn validate_token(
        &self,
        token_id: &TokenIdRef,
    ) -> Result<Option<TokenRecord>, IntrospectionError> {
        let resp = self.post_token(&self.introspection_url, token_id).await?;

        tracing::debug!(
            response.status = resp.status().as_u16(),
            "received introspection response"
        );

        if resp.status() != StatusCode::OK {
            return Ok(None);
        }

        let body = resp.bytes().await.map_err(IntrospectionError::BodyRead)?;
        let resp = IntrospectionResponse::from_slice(&body)?;

        if !resp.active {
            tracing::debug!("authorization server reported token as inactive");
            return Ok(None);
        }

        match resp.into_record() {
            Ok(Some(record)) => {
                tracing::debug!(
                    subject = %record.subject(),
                    expiry = record.expiry().0,
                    "authorization server reported token as active"
                );
                Ok(Some(record))
            }
            Ok(None) => {
                tracing::warn!("active token has no subject; discarding");
                Ok(None)
            }
            Err(violation) => {
                tracing::warn!(%violation, "authorization server sent a malformed response");
                Err(violation.into())
            }
        }
    }

    /// Asks the authorization server to revoke a token
    ///
    /// A malformed token identifier is rejected without contacting the server.
    pub async fn revoke(&self, token_id: &str) -> Result<(), IntrospectionError> {
        let token_id = TokenIdRef::from_str(token_id)?;
        self.revoke_token(token_id).await
    }

    /// Asks the authorization server to revoke a token
    ///
    /// Succeeds once any response has been received, whatever its status.
    #[tracing::instrument(
        level = "debug",
        err,
        skip_all,
        fields(revocation.url = %self.revocation_url),
    )]
    pub async fn revoke_token(&self, token_id: &TokenIdRef) -> Result<(), IntrospectionError> {
        let resp = self.post_token(&self.revocation_url, token_id).await?;

        let status = resp.status();
        if status.is_success() {
            tracing::debug!(response.status = status.as_u16(), "revocation request sent");
        } else {
            tracing::warn!(
                response.status = status.as_u16(),
                "authorization server responded to revocation with an error"
            );
        }

        Ok(())
    }

    async fn post_token(
        &self,
        url: &Url,
        token_id: &TokenIdRef,
    ) -> Result<reqwest::Response, IntrospectionError> {
        let form = form_urlencoded::Serializer::new(String::new())
            .append_pair("token", token_id.as_str())
            .append_pair("token_type_hint", TOKEN_TYPE_HINT)
            .finish();

        self.client
            .post(url.clone())
            .header(header::CONTENT_TYPE, FORM_CONTENT_TYPE)
            .header(header::AUTHORIZATION, self.authorization.clone())
            .body(form)
            .send()
            .await
            .map_err(IntrospectionError::RequestSend)
    }
}
