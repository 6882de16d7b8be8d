//! Client credentials used to authenticate to the authorization server

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{HeaderValue, InvalidHeaderValue};

use crate::{ClientId, ClientIdRef, ClientSecret};

/// The credentials a resource server uses to authenticate itself when calling
/// the introspection and revocation endpoints
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    /// The client ID
    pub client_id: ClientId,

    /// The client secret
    pub client_secret: ClientSecret,
}

impl ClientCredentials {
    /// Constructs a new set of client credentials
    pub fn new(client_id: ClientId, client_secret: ClientSecret) -> Self {
        Self {
            client_id,
            client_secret,
        }
    }

    /// The client ID of these credentials
    #[inline]
    pub fn client_id(&self) -> &ClientIdRef {
        &self.client_id
    }

    /// Computes the value of the HTTP Basic `Authorization` header
    ///
    /// Both halves are form-urlencoded before being joined with a `:`, so a
    /// client ID containing a colon cannot be confused with the separator.
    pub fn basic_authorization(&self) -> String {
        let credentials = format!(
            "{}:{}",
            urlencode(self.client_id.as_str()),
            urlencode(self.client_secret.as_str()),
        );
        format!("Basic {}", STANDARD.encode(credentials))
    }

    pub(crate) fn authorization_header(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        let mut value = HeaderValue::try_from(self.basic_authorization())?;
        value.set_sensitive(true);
        Ok(value)
    }
}

fn urlencode(raw: &str) -> String {
    form_urlencoded::byte_serialize(raw.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials(id: &'static str, secret: &'static str) -> ClientCredentials {
        ClientCredentials::new(ClientId::from_static(id), ClientSecret::from_static(secret))
    }

    #[test]
    fn encodes_plain_credentials() {
        let creds = credentials("resource-server", "hunter2");
        assert_eq!(
            creds.basic_authorization(),
            "Basic cmVzb3VyY2Utc2VydmVyOmh1bnRlcjI="
        );
    }

    #[test]
    fn percent_encodes_reserved_characters_before_joining() {
        let creds = credentials("test-client", "s3cr:et/+");
        assert_eq!(
            creds.basic_authorization(),
            "Basic dGVzdC1jbGllbnQ6czNjciUzQWV0JTJGJTJC"
        );
    }

    #[test]
    fn encodes_spaces_as_plus() {
        let creds = credentials("my client", "p@ss word");
        assert_eq!(
            creds.basic_authorization(),
            "Basic bXkrY2xpZW50OnAlNDBzcyt3b3Jk"
        );
    }

    #[test]
    fn header_value_is_marked_sensitive() {
        let creds = credentials("resource-server", "hunter2");
        let header = creds.authorization_header().unwrap();
        assert!(header.is_sensitive());
        assert_eq!(header, "Basic cmVzb3VyY2Utc2VydmVyOmh1bnRlcjI=");
    }
}
