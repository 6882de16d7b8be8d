//! Validation and revocation of opaque bearer tokens using a remote OAuth2
//! authorization server
//!
//! Opaque tokens carry no information of their own, so a resource server has
//! to ask the authorization server that issued them whether they are still
//! valid. This crate implements the client side of that conversation using
//! the token introspection ([RFC 7662]) and token revocation ([RFC 7009])
//! endpoints.
//!
//! Every call is answered by the authorization server. Nothing is cached,
//! and the validator does not second-guess the server: a token reported as
//! active is returned along with its expiry even if that expiry has passed.
//!
//! The outcome of a validation is one of three things:
//!
//! * `Ok(Some(record))`: the token is active.
//! * `Ok(None)`: the token is malformed, inactive, unknown, or otherwise
//!   rejected. No reason is given, so callers cannot be used as an oracle.
//! * `Err(_)`: the authorization server could not be reached, or it sent a
//!   response that cannot be trusted. Callers should fail closed.
//!
//! # Transport security
//!
//! [`RemoteTokenValidator::new`] builds its own HTTPS client. That client
//! only negotiates TLS 1.3 or TLS 1.2 with AEAD cipher suites, verifies the
//! server's hostname, and trusts only the certificate authorities given in
//! [`TrustAnchors`].
//!
//! ```no_run
//! use aliri_introspection::{
//!     ClientCredentials, ClientId, ClientSecret, RemoteTokenValidator, TrustAnchors,
//!     ValidatorConfig,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ValidatorConfig::new(
//!     "https://as.example.com/oauth2/introspect".parse()?,
//!     "https://as.example.com/oauth2/revoke".parse()?,
//!     ClientCredentials::new(
//!         ClientId::from_static("resource-server"),
//!         ClientSecret::new(std::env::var("CLIENT_SECRET")?),
//!     ),
//!     TrustAnchors::from_pem_file("as.example.com.pem")?,
//! );
//!
//! let validator = RemoteTokenValidator::new(config)?;
//!
//! match validator.validate("2YotnFZFEjr1zCsicMWpAA").await? {
//!     Some(token) => tracing::info!(subject = %token.subject(), scope = token.scope(), "access granted"),
//!     None => tracing::info!("access denied"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//!   [RFC 7662]: https://datatracker.ietf.org/doc/html/rfc7662
//!   [RFC 7009]: https://datatracker.ietf.org/doc/html/rfc7009

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

mod braids;
pub mod credentials;
mod dto;
mod record;
pub mod store;
pub mod tls;
mod validator;

pub use braids::*;
pub use credentials::ClientCredentials;
pub use dto::SchemaViolation;
pub use record::{TokenRecord, CLIENT_ID_ATTRIBUTE, SCOPE_ATTRIBUTE};
pub use store::TokenIntrospector;
pub use tls::{TlsError, TrustAnchors};
pub use validator::{
    BuildError, IntrospectionError, RemoteTokenValidator, ValidatorConfig,
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT,
};
