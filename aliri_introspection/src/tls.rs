//! Hardened transport used to reach the authorization server
//!
//! The client only speaks TLS 1.3 and TLS 1.2, restricted to AEAD cipher
//! suites with forward secrecy, and trusts only the certificate authorities
//! that it was explicitly handed. The platform trust store is never
//! consulted.

use std::{
    fs::File,
    io::{self, BufReader},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use rustls::{
    crypto::{ring, CryptoProvider},
    pki_types::CertificateDer,
    ClientConfig, RootCertStore, SupportedCipherSuite,
};
use thiserror::Error;

/// An error while preparing the secure transport
#[derive(Debug, Error)]
pub enum TlsError {
    /// The trust anchor file could not be read
    #[error("unable to read trust anchors from {path}")]
    TrustAnchorRead {
        /// The path of the trust anchor file
        path: PathBuf,
        /// The underlying I/O error
        source: io::Error,
    },
    /// The PEM-encoded trust material could not be parsed
    #[error("malformed PEM trust material")]
    MalformedPem(#[source] io::Error),
    /// No certificates were found in the supplied trust material
    #[error("no trust anchor certificates were supplied")]
    NoCertificates,
    /// A certificate in the trust material could not be parsed
    #[error("invalid trust anchor certificate")]
    InvalidCertificate(#[source] rustls::Error),
    /// The TLS configuration was rejected
    #[error("unable to configure TLS")]
    Config(#[from] rustls::Error),
    /// The HTTP client could not be built
    #[error("unable to build HTTP client")]
    Client(#[from] reqwest::Error),
}

/// The set of certificate authorities trusted to vouch for the authorization
/// server
#[derive(Clone)]
pub struct TrustAnchors {
    certificates: Vec<CertificateDer<'static>>,
}

impl std::fmt::Debug for TrustAnchors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustAnchors")
            .field("certificates", &self.certificates.len())
            .finish()
    }
}

impl TrustAnchors {
    /// Loads PEM-encoded certificates from a file
    pub fn from_pem_file(path: impl AsRef<Path>) -> Result<Self, TlsError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| TlsError::TrustAnchorRead {
            path: path.to_owned(),
            source,
        })?;

        Self::read_pem(&mut BufReader::new(file)).map_err(|source| TlsError::TrustAnchorRead {
            path: path.to_owned(),
            source,
        })
    }

    /// Parses PEM-encoded certificates
    ///
    /// Any PEM sections that are not certificates are ignored.
    pub fn from_pem(pem: &[u8]) -> Result<Self, TlsError> {
        Self::read_pem(&mut &*pem).map_err(TlsError::MalformedPem)
    }

    /// Uses a set of DER-encoded certificates
    pub fn from_der<I>(certificates: I) -> Self
    where
        I: IntoIterator<Item = CertificateDer<'static>>,
    {
        Self {
            certificates: certificates.into_iter().collect(),
        }
    }

    fn read_pem(reader: &mut dyn io::BufRead) -> Result<Self, io::Error> {
        let certificates = rustls_pemfile::certs(reader).collect::<Result<Vec<_>, _>>()?;
        Ok(Self { certificates })
    }

    /// The number of certificates in this set
    #[inline]
    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    /// Whether this set contains no certificates
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    fn root_store(&self) -> Result<RootCertStore, TlsError> {
        if self.certificates.is_empty() {
            return Err(TlsError::NoCertificates);
        }

        let mut roots = RootCertStore::empty();
        for cert in &self.certificates {
            roots
                .add(cert.clone())
                .map_err(TlsError::InvalidCertificate)?;
        }

        Ok(roots)
    }
}

/// Cipher suites offered to the authorization server, in order of preference
pub fn allowed_cipher_suites() -> Vec<SupportedCipherSuite> {
    use rustls::crypto::ring::cipher_suite::*;

    vec![
        TLS13_AES_128_GCM_SHA256,
        TLS13_AES_256_GCM_SHA384,
        TLS13_CHACHA20_POLY1305_SHA256,
        TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
        TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
        TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,
        TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,
        TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256,
        TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256,
    ]
}

/// Builds the TLS client configuration
///
/// Server certificates are verified, including the hostname, against
/// `trust_anchors` only.
pub fn client_config(trust_anchors: &TrustAnchors) -> Result<ClientConfig, TlsError> {
    let provider = CryptoProvider {
        cipher_suites: allowed_cipher_suites(),
        ..ring::default_provider()
    };

    let config = ClientConfig::builder_with_provider(Arc::new(provider))
        .with_protocol_versions(&[&rustls::version::TLS13, &rustls::version::TLS12])?
        .with_root_certificates(trust_anchors.root_store()?)
        .with_no_client_auth();

    Ok(config)
}

/// Builds an HTTPS-only client over the hardened TLS configuration
pub(crate) fn build_client(
    trust_anchors: &TrustAnchors,
    timeout: Duration,
    connect_timeout: Duration,
) -> Result<reqwest::Client, TlsError> {
    let tls = client_config(trust_anchors)?;

    let client = reqwest::Client::builder()
        .user_agent(concat!("aliri_introspection/", env!("CARGO_PKG_VERSION")))
        .https_only(true)
        .tls_built_in_root_certs(false)
        .use_preconfigured_tls(tls)
        .timeout(timeout)
        .connect_timeout(connect_timeout)
        .build()?;

    Ok(client)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn generate_test_cert() -> rcgen::CertifiedKey {
        rcgen::generate_simple_self_signed(vec!["as.example.com".to_string()])
            .expect("failed to generate test certificate")
    }

    #[test]
    fn parses_pem_certificates() {
        let cert = generate_test_cert();
        let mut pem = cert.cert.pem();
        pem.push_str(&generate_test_cert().cert.pem());

        let anchors = TrustAnchors::from_pem(pem.as_bytes()).unwrap();
        assert_eq!(anchors.len(), 2);
    }

    #[test]
    fn ignores_private_keys_in_pem() {
        let cert = generate_test_cert();
        let pem = format!("{}{}", cert.key_pair.serialize_pem(), cert.cert.pem());

        let anchors = TrustAnchors::from_pem(pem.as_bytes()).unwrap();
        assert_eq!(anchors.len(), 1);
    }

    #[test]
    fn loads_pem_file() {
        let cert = generate_test_cert();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(cert.cert.pem().as_bytes()).unwrap();

        let anchors = TrustAnchors::from_pem_file(file.path()).unwrap();
        assert_eq!(anchors.len(), 1);
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = TrustAnchors::from_pem_file("/nonexistent/as.example.com.pem");
        assert!(matches!(result, Err(TlsError::TrustAnchorRead { .. })));
    }

    #[test]
    fn empty_trust_anchors_are_rejected() {
        let anchors = TrustAnchors::from_pem(b"").unwrap();
        assert!(anchors.is_empty());

        let result = client_config(&anchors);
        assert!(matches!(result, Err(TlsError::NoCertificates)));
    }

    #[test]
    fn garbage_der_is_rejected() {
        let anchors = TrustAnchors::from_der([CertificateDer::from(vec![0x30, 0x03, 0x01])]);

        let result = client_config(&anchors);
        assert!(matches!(result, Err(TlsError::InvalidCertificate(_))));
    }

    #[test]
    fn builds_config_from_der() {
        let cert = generate_test_cert();
        let anchors = TrustAnchors::from_der([cert.cert.der().clone()]);

        let config = client_config(&anchors).unwrap();
        assert_eq!(config.crypto_provider().cipher_suites.len(), 9);
    }

    #[test]
    fn config_excludes_legacy_cipher_suites() {
        let suites = allowed_cipher_suites();
        assert!(suites.iter().all(|s| {
            let name = format!("{:?}", s.suite());
            name.contains("GCM") || name.contains("CHACHA20_POLY1305")
        }));
    }

    #[test]
    fn builds_https_only_client() {
        let cert = generate_test_cert();
        let anchors = TrustAnchors::from_der([cert.cert.der().clone()]);

        let result = build_client(&anchors, Duration::from_secs(10), Duration::from_secs(5));
        assert!(result.is_ok());
    }
}
