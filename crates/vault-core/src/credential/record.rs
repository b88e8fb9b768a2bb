//! Credential record codec
//!
//! The canonical serializable form of one user's OAuth2 authorization
//! state. Both storage backends persist records through this codec.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tracing::warn;

use crate::error::Result;

/// Timestamp format used when rendering `expiry`
const EXPIRY_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// One user's OAuth2 credential fields
///
/// Every field is optional. When deserializing, a missing or
/// type-mismatched field degrades to `None` instead of failing the
/// whole record; only a payload that is not valid JSON is an error.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Current access token
    #[serde(default, deserialize_with = "lenient")]
    pub token: Option<String>,

    /// Refresh token used to mint new access tokens
    #[serde(default, deserialize_with = "lenient")]
    pub refresh_token: Option<String>,

    /// Token endpoint URL
    #[serde(default, deserialize_with = "lenient")]
    pub token_uri: Option<String>,

    /// OAuth2 application identity
    #[serde(default, deserialize_with = "lenient")]
    pub client_id: Option<String>,

    #[serde(default, deserialize_with = "lenient")]
    pub client_secret: Option<String>,

    /// Granted scopes, in the order they were requested
    #[serde(default, deserialize_with = "lenient")]
    pub scopes: Option<Vec<String>>,

    /// Access token expiry, always timezone-naive on load
    #[serde(
        default,
        serialize_with = "serialize_expiry",
        deserialize_with = "deserialize_expiry"
    )]
    pub expiry: Option<NaiveDateTime>,
}

impl CredentialRecord {
    /// Render the record as a JSON payload. Absent fields render as null.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a record from a JSON payload.
    ///
    /// Fails only when the payload is not valid JSON. Individual fields
    /// that are missing or malformed come back as `None`; an unparsable
    /// `expiry` additionally logs a warning.
    pub fn from_json(payload: &str) -> Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }
}

impl std::fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("token_uri", &self.token_uri)
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("scopes", &self.scopes)
            .field("expiry", &self.expiry)
            .finish()
    }
}

/// Deserialize a field, degrading missing or mismatched values to None
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

fn serialize_expiry<S>(
    expiry: &Option<NaiveDateTime>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match expiry {
        Some(ts) => serializer.serialize_some(&ts.format(EXPIRY_FORMAT).to_string()),
        None => serializer.serialize_none(),
    }
}

fn deserialize_expiry<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(Value::String(raw)) => match parse_expiry(&raw) {
            Some(ts) => Ok(Some(ts)),
            None => {
                warn!("Could not parse expiry time {:?}, treating as absent", raw);
                Ok(None)
            }
        },
        Some(other) => {
            warn!("Unexpected expiry value {}, treating as absent", other);
            Ok(None)
        }
    }
}

/// Parse an ISO-8601 timestamp, dropping any timezone offset.
///
/// Offset-aware input keeps its wall-clock fields rather than being
/// converted to UTC, matching how stored records are handed to token
/// refresh machinery that expects naive timestamps.
fn parse_expiry(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_local());
    }
    NaiveDateTime::parse_from_str(raw, EXPIRY_FORMAT).ok()
}
