use aliri_braid::braid;
use std::fmt;
use thiserror::Error;

/// The longest token identifier that will be sent to the authorization server
pub const MAX_TOKEN_ID_LEN: usize = 1024;

macro_rules! limited_reveal {
    ($ty:ty: $hidden:literal, $default:literal) => {
        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                if f.alternate() {
                    f.write_str("\"")?;
                    limited_reveal(self.as_str(), &mut *f, $default)?;
                    f.write_str("\"")
                } else {
                    f.write_str(concat!("***", $hidden, "***"))
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                if f.alternate() {
                    limited_reveal(self.as_str(), &mut *f, usize::MAX)
                } else {
                    f.write_str(concat!("***", $hidden, "***"))
                }
            }
        }
    };
}

fn limited_reveal(unprotected: &str, f: &mut fmt::Formatter, default_len: usize) -> fmt::Result {
    let max_len = f.width().unwrap_or(default_len);
    if max_len <= 1 {
        f.write_str("…")
    } else if max_len > unprotected.len() {
        f.write_str(unprotected)
    } else {
        match unprotected.char_indices().nth(max_len - 2) {
            Some((idx, c)) if idx + c.len_utf8() < unprotected.len() => {
                f.write_str(&unprotected[0..idx + c.len_utf8()])?;
                f.write_str("…")
            }
            _ => f.write_str(unprotected),
        }
    }
}

/// A client ID, used to authenticate to the authorization server
#[braid(serde)]
pub struct ClientId;

/// A client secret
#[braid(serde, debug = "owned", display = "owned")]
pub struct ClientSecret;

limited_reveal!(ClientSecretRef: "CLIENT SECRET", 5);

/// The subject (principal) that a token was issued to
#[braid(serde, ref_doc = "A borrowed reference to a [`Subject`]")]
pub struct Subject;

/// An invalid token identifier
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidTokenId {
    /// The token identifier was the empty string
    #[error("token identifier cannot be empty")]
    EmptyString,
    /// The token identifier exceeded the maximum length
    #[error("token identifier is {length} bytes long, exceeding the limit of 1024")]
    TooLong {
        /// The length of the rejected token identifier
        length: usize,
    },
    /// The token identifier contained a byte outside of printable ASCII
    #[error("invalid token identifier byte at position {position}: 0x{value:02x}")]
    InvalidByte {
        /// The index in the token identifier where the invalid byte was found
        position: usize,
        /// The invalid byte value
        value: u8,
    },
}

impl From<std::convert::Infallible> for InvalidTokenId {
    fn from(x: std::convert::Infallible) -> Self {
        match x {}
    }
}

/// An opaque bearer token identifier
///
/// A token identifier must be between 1 and 1024 characters long and be
/// composed only of printable ASCII characters (`0x20` through `0x7E`).
/// This says nothing about whether the token is valid; only the authorization
/// server can answer that.
#[braid(
    validator,
    debug = "owned",
    display = "owned",
    ref_doc = "A borrowed reference to a [`TokenId`]"
)]
pub struct TokenId;

impl aliri_braid::Validator for TokenId {
    type Error = InvalidTokenId;

    fn validate(s: &str) -> Result<(), Self::Error> {
        if s.is_empty() {
            Err(InvalidTokenId::EmptyString)
        } else if s.len() > MAX_TOKEN_ID_LEN {
            Err(InvalidTokenId::TooLong { length: s.len() })
        } else if let Some((position, &value)) = s
            .as_bytes()
            .iter()
            .enumerate()
            .find(|(_, &b)| !(0x20..=0x7E).contains(&b))
        {
            Err(InvalidTokenId::InvalidByte { position, value })
        } else {
            Ok(())
        }
    }
}

limited_reveal!(TokenIdRef: "TOKEN", 8);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_printable_ascii() {
        let x = TokenIdRef::from_str("validtoken123").unwrap();
        assert_eq!(x.as_str(), "validtoken123");
    }

    #[test]
    fn accepts_space_and_tilde_boundaries() {
        assert!(TokenIdRef::from_str(" ~").is_ok());
    }

    #[test]
    fn accepts_exactly_max_length() {
        let raw = "a".repeat(MAX_TOKEN_ID_LEN);
        assert!(TokenId::new(raw).is_ok());
    }

    #[test]
    fn converts_from_owned_strings() {
        let x = TokenId::try_from(String::from("validtoken123")).unwrap();
        assert_eq!(x.as_str(), "validtoken123");

        let x = TokenId::try_from(String::new());
        assert_eq!(x.unwrap_err(), InvalidTokenId::EmptyString);
    }

    #[test]
    fn owned_token_is_redacted() {
        let x = TokenId::from_static("abcdefghijklmnop");
        assert_eq!(format!("{:?}", x), "***TOKEN***");
        assert_eq!(format!("{}", x), "***TOKEN***");
    }

    #[test]
    fn rejects_empty() {
        let x = TokenIdRef::from_str("");
        assert_eq!(x.unwrap_err(), InvalidTokenId::EmptyString);
    }

    #[test]
    fn rejects_too_long() {
        let raw = "a".repeat(MAX_TOKEN_ID_LEN + 1);
        let x = TokenId::new(raw);
        assert_eq!(x.unwrap_err(), InvalidTokenId::TooLong { length: 1025 });
    }

    #[test]
    fn rejects_control_characters() {
        let x = TokenIdRef::from_str("abc\r\ntoken_type_hint=refresh_token");
        assert_eq!(
            x.unwrap_err(),
            InvalidTokenId::InvalidByte {
                position: 3,
                value: 0x0d
            }
        );
    }

    #[test]
    fn rejects_delete() {
        let x = TokenIdRef::from_str("abc\x7F");
        assert!(matches!(x, Err(InvalidTokenId::InvalidByte { value: 0x7f, .. })));
    }

    #[test]
    fn rejects_non_ascii() {
        let x = TokenIdRef::from_str("tök");
        assert!(matches!(x, Err(InvalidTokenId::InvalidByte { position: 1, .. })));
    }

    #[test]
    fn token_is_redacted_unless_alternate() {
        let x = TokenIdRef::from_str("abcdefghijklmnop").unwrap();
        assert_eq!(format!("{:?}", x), "***TOKEN***");
        assert_eq!(format!("{}", x), "***TOKEN***");
        assert_eq!(format!("{:#?}", x), "\"abcdefg…\"");
    }

    #[test]
    fn client_secret_is_redacted() {
        let x = ClientSecret::from_static("hunter2");
        assert_eq!(format!("{:?}", x), "***CLIENT SECRET***");
        assert_eq!(format!("{}", x), "***CLIENT SECRET***");
    }
}
