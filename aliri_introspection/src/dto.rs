//! DTOs for the introspection endpoint

use std::collections::BTreeMap;

use aliri_clock::UnixTime;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{
    record::{CLIENT_ID_ATTRIBUTE, SCOPE_ATTRIBUTE},
    Subject, TokenRecord,
};

/// The schema of a trusted introspection response was violated
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SchemaViolation {
    /// A required field was missing
    #[error("introspection response is missing required field `{0}`")]
    MissingField(&'static str),
    /// A field held a value that cannot be interpreted
    #[error("introspection response has an invalid `{0}` field")]
    InvalidField(&'static str),
}

/// The parts of an introspection response that are mapped into a token record
#[derive(Debug, Deserialize)]
pub(crate) struct IntrospectionResponse {
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub exp: Option<serde_json::Number>,
    #[serde(default)]
    pub sub: Option<Subject>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
}

impl IntrospectionResponse {
    /// Decodes a response body, which must be a JSON object
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        let fields: Map<String, Value> = serde_json::from_slice(body)?;
        serde_json::from_value(Value::Object(fields))
    }

    /// Maps an active response into a token record
    ///
    /// Returns `Ok(None)` if the response does not name a subject, as such a
    /// token cannot be attributed to anyone. A missing scope is a schema
    /// violation.
    pub fn into_record(self) -> Result<Option<TokenRecord>, SchemaViolation> {
        debug_assert!(self.active);

        let scope = self
            .scope
            .ok_or(SchemaViolation::MissingField(SCOPE_ATTRIBUTE))?;

        let subject = match self.sub {
            Some(sub) if !sub.as_str().is_empty() => sub,
            _ => return Ok(None),
        };

        let expiry = match self.exp {
            Some(exp) => epoch_seconds(&exp).ok_or(SchemaViolation::InvalidField("exp"))?,
            None => UnixTime::default(),
        };

        let mut attributes = BTreeMap::new();
        attributes.insert(SCOPE_ATTRIBUTE.to_owned(), scope);
        attributes.insert(
            CLIENT_ID_ATTRIBUTE.to_owned(),
            self.client_id.unwrap_or_default(),
        );

        Ok(Some(TokenRecord::new(expiry, subject, attributes)))
    }
}

fn epoch_seconds(exp: &serde_json::Number) -> Option<UnixTime> {
    if let Some(secs) = exp.as_u64() {
        Some(UnixTime(secs))
    } else {
        exp.as_f64()
            .filter(|secs| secs.is_finite() && *secs >= 0.0 && *secs < u64::MAX as f64)
            .map(|secs| UnixTime(secs.trunc() as u64))
    }
}
