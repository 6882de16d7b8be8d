use std::collections::BTreeMap;

use aliri_clock::{Clock, DurationSecs, System, UnixTime};

use crate::{Subject, SubjectRef};

/// The attribute holding the space-delimited scope granted to the token
pub const SCOPE_ATTRIBUTE: &str = "scope";

/// The attribute holding the ID of the client the token was issued to
pub const CLIENT_ID_ATTRIBUTE: &str = "client_id";

/// A token that the authorization server has reported as active
///
/// Records are only produced from a response received over the trusted
/// channel and cannot be modified afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenRecord {
    expiry: UnixTime,
    subject: Subject,
    attributes: BTreeMap<String, String>,
}

impl TokenRecord {
    pub(crate) fn new(
        expiry: UnixTime,
        subject: Subject,
        attributes: BTreeMap<String, String>,
    ) -> Self {
        Self {
            expiry,
            subject,
            attributes,
        }
    }

    /// The time after which the token must no longer be honored
    #[inline]
    pub fn expiry(&self) -> UnixTime {
        self.expiry
    }

    /// The principal the token was issued to
    #[inline]
    pub fn subject(&self) -> &SubjectRef {
        &self.subject
    }

    /// All attributes of the token
    #[inline]
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    /// Gets a single attribute by name
    #[inline]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// The space-delimited scope granted to the token
    #[inline]
    pub fn scope(&self) -> &str {
        self.attribute(SCOPE_ATTRIBUTE).unwrap_or_default()
    }

    /// The client the token was issued to, or the empty string if the
    /// authorization server did not say
    #[inline]
    pub fn client_id(&self) -> &str {
        self.attribute(CLIENT_ID_ATTRIBUTE).unwrap_or_default()
    }

    /// Whether the token has expired according to the system clock
    ///
    /// The validator never checks this itself; whether a token is active is
    /// decided by the authorization server.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_with_clock(&System)
    }

    /// Whether the token has expired according to the provided clock
    #[inline]
    pub fn is_expired_with_clock<C: Clock>(&self, clock: &C) -> bool {
        self.is_expired_at(clock.now())
    }

    /// Whether the token would be expired as of the provided time
    #[inline]
    pub fn is_expired_at(&self, time: UnixTime) -> bool {
        time >= self.expiry
    }

    /// Gets a duration for how much longer the token would be valid as of the
    /// provided time
    #[inline]
    pub fn until_expired_at(&self, time: UnixTime) -> DurationSecs {
        if time < self.expiry {
            self.expiry - time
        } else {
            DurationSecs(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use aliri_clock::TestClock;

    use super::*;

    fn record(expiry: u64) -> TokenRecord {
        let mut attributes = BTreeMap::new();
        attributes.insert(SCOPE_ATTRIBUTE.to_owned(), "read write".to_owned());
        attributes.insert(CLIENT_ID_ATTRIBUTE.to_owned(), String::new());
        TokenRecord::new(UnixTime(expiry), Subject::from_static("alice"), attributes)
    }

    #[test]
    fn exposes_well_known_attributes() {
        let token = record(1_700_000_000);
        assert_eq!(token.subject().as_str(), "alice");
        assert_eq!(token.scope(), "read write");
        assert_eq!(token.client_id(), "");
        assert_eq!(token.attribute("username"), None);
    }

    #[test]
    fn is_expired_at_the_expiry_instant() {
        let token = record(1_000);
        assert!(!token.is_expired_at(UnixTime(999)));
        assert!(token.is_expired_at(UnixTime(1_000)));
    }

    #[test]
    fn expiry_follows_the_provided_clock() {
        let token = record(1_000);
        let clock = TestClock::new(UnixTime(900));
        assert!(!token.is_expired_with_clock(&clock));
        assert_eq!(token.until_expired_at(clock.now()), DurationSecs(100));

        clock.advance(DurationSecs(100));
        assert!(token.is_expired_with_clock(&clock));
        assert_eq!(token.until_expired_at(clock.now()), DurationSecs(0));
    }
}
