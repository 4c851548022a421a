//! The envelope aggregate and its compact / general JSON projections.
//!
//! Both codecs do structural validation only (segment count, base64url,
//! header JSON, required members). Algorithm and length checks belong to
//! the decrypt paths.

use jose_hpke_crypto::{base64url_encode, decode_field};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::JweError;
use crate::header::ProtectedHeader;
use crate::jwk::EcPublicJwk;
use crate::options::Serialization;

const COMPACT_SEGMENTS: usize = 5;

/// Per-recipient header (mixed mode).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientHeader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epk: Option<EcPublicJwk>,
}

/// One recipient record.
///
/// HPKE recipients carry `kid` and `encapsulated_key` at top level; mixed
/// recipients carry `alg`, `kid` and `epk` in `header`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub kid: Option<String>,
    pub header: Option<RecipientHeader>,
    pub encapsulated_key: Option<Vec<u8>>,
    pub encrypted_key: Vec<u8>,
}

impl Recipient {
    pub fn key_id(&self) -> Option<&str> {
        self.kid
            .as_deref()
            .or_else(|| self.header.as_ref().and_then(|h| h.kid.as_deref()))
    }

    /// `alg` declared by the record itself, if any.
    pub fn alg(&self) -> Option<&str> {
        self.header.as_ref().and_then(|h| h.alg.as_deref())
    }

    pub fn epk(&self) -> Option<&EcPublicJwk> {
        self.header.as_ref().and_then(|h| h.epk.as_ref())
    }
}

/// A JWE envelope independent of its serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub protected: ProtectedHeader,
    pub unprotected: Option<Map<String, Value>>,
    /// External AAD, carried in the clear.
    pub aad: Option<Vec<u8>>,
    /// Compact key encryption: the single recipient's encrypted CEK.
    pub encrypted_key: Option<Vec<u8>>,
    /// Integrated encryption: the HPKE encapsulated key.
    pub encapsulated_key: Option<Vec<u8>>,
    /// Empty in integrated mode.
    pub iv: Vec<u8>,
    pub ciphertext: Vec<u8>,
    /// Empty in integrated mode, where the AEAD tag stays on the ciphertext.
    pub tag: Vec<u8>,
    pub recipients: Vec<Recipient>,
}

impl Envelope {
    /// Serialize in the requested form.
    pub fn encode(&self, serialization: Serialization) -> Result<String, JweError> {
        match serialization {
            Serialization::Compact => self.to_compact(),
            Serialization::GeneralJson => self.to_json(),
        }
    }

    /// Parse either form. Input starting with `{` is general JSON.
    pub fn decode(input: &str) -> Result<Self, JweError> {
        if input.trim_start().starts_with('{') {
            Self::from_json(input)
        } else {
            Self::from_compact(input)
        }
    }

    // --- compact ---

    pub fn to_compact(&self) -> Result<String, JweError> {
        if !self.recipients.is_empty() {
            return Err(JweError::InvalidOptions(
                "compact serialization cannot carry a recipients list".to_string(),
            ));
        }
        if self.aad.is_some() {
            return Err(JweError::InvalidOptions(
                "compact serialization cannot carry external AAD".to_string(),
            ));
        }
        if self.unprotected.is_some() {
            return Err(JweError::InvalidOptions(
                "compact serialization cannot carry an unprotected header".to_string(),
            ));
        }
        let key_slot = match (&self.encrypted_key, &self.encapsulated_key) {
            (Some(_), Some(_)) => {
                return Err(JweError::InvalidOptions(
                    "compact serialization has a single key segment".to_string(),
                ))
            }
            (Some(key), None) | (None, Some(key)) => base64url_encode(key),
            (None, None) => String::new(),
        };
        Ok(format!(
            "{}.{}.{}.{}.{}",
            self.protected.encoded(),
            key_slot,
            base64url_encode(&self.iv),
            base64url_encode(&self.ciphertext),
            base64url_encode(&self.tag)
        ))
    }

    /// Parse `header.key.iv.ciphertext.tag`.
    ///
    /// The key segment is an encrypted CEK when the header names an `enc`,
    /// and an HPKE encapsulated key otherwise.
    pub fn from_compact(input: &str) -> Result<Self, JweError> {
        let parts: Vec<&str> = input.split('.').collect();
        if parts.len() != COMPACT_SEGMENTS {
            return Err(JweError::MalformedEnvelope(format!(
                "expected {} segments, got {}",
                COMPACT_SEGMENTS,
                parts.len()
            )));
        }
        let protected = ProtectedHeader::from_encoded(parts[0])?;
        let key = optional_segment("key", parts[1])?;
        let iv = decode_field("iv", parts[2])?;
        let ciphertext = decode_field("ciphertext", parts[3])?;
        let tag = decode_field("tag", parts[4])?;

        let (encrypted_key, encapsulated_key) = if protected.params().enc.is_some() {
            (key, None)
        } else {
            (None, key)
        };

        Ok(Self {
            protected,
            unprotected: None,
            aad: None,
            encrypted_key,
            encapsulated_key,
            iv,
            ciphertext,
            tag,
            recipients: Vec::new(),
        })
    }

    // --- general JSON ---

    pub fn to_json_value(&self) -> Result<Value, JweError> {
        let wire = GeneralJson {
            protected: Some(self.protected.encoded().to_string()),
            unprotected: self.unprotected.clone(),
            encapsulated_key: self.encapsulated_key.as_deref().map(base64url_encode),
            encrypted_key: self.encrypted_key.as_deref().map(base64url_encode),
            recipients: if self.recipients.is_empty() {
                None
            } else {
                Some(self.recipients.iter().map(RecipientJson::from).collect())
            },
            aad: self.aad.as_deref().map(base64url_encode),
            iv: non_empty(&self.iv),
            ciphertext: base64url_encode(&self.ciphertext),
            tag: non_empty(&self.tag),
        };
        Ok(serde_json::to_value(wire)?)
    }

    pub fn to_json(&self) -> Result<String, JweError> {
        Ok(serde_json::to_string(&self.to_json_value()?)?)
    }

    pub fn from_json(input: &str) -> Result<Self, JweError> {
        let value: Value = serde_json::from_str(input)
            .map_err(|e| JweError::MalformedEnvelope(format!("invalid JSON: {}", e)))?;
        Self::from_json_value(value)
    }

    /// Parse a general JSON envelope. Recipients are read from the top level
    /// or, for envelopes in the older layout, from `unprotected.recipients`.
    pub fn from_json_value(value: Value) -> Result<Self, JweError> {
        let mut wire: GeneralJson = serde_json::from_value(value)
            .map_err(|e| JweError::MalformedEnvelope(e.to_string()))?;

        let legacy = match wire.unprotected.as_mut() {
            Some(unprotected) => match unprotected.remove("recipients") {
                Some(list) => Some(
                    serde_json::from_value::<Vec<RecipientJson>>(list).map_err(|e| {
                        JweError::MalformedEnvelope(format!("unprotected.recipients: {}", e))
                    })?,
                ),
                None => None,
            },
            None => None,
        };
        if wire.unprotected.as_ref().is_some_and(Map::is_empty) {
            wire.unprotected = None;
        }
        let recipients = match (wire.recipients.take(), legacy) {
            (Some(_), Some(_)) => {
                return Err(JweError::MalformedEnvelope(
                    "recipients present both at top level and in unprotected".to_string(),
                ))
            }
            (Some(list), None) | (None, Some(list)) => list,
            (None, None) => Vec::new(),
        };

        // Required: `enc` and the AAD binding both live in the protected header.
        let protected = wire.protected.as_deref().ok_or_else(|| {
            JweError::MalformedEnvelope("general JSON envelope has no protected header".to_string())
        })?;

        Ok(Self {
            protected: ProtectedHeader::from_encoded(protected)?,
            unprotected: wire.unprotected,
            aad: wire.aad.as_deref().map(|s| decode_field("aad", s)).transpose()?,
            encrypted_key: wire
                .encrypted_key
                .as_deref()
                .map(|s| decode_field("encrypted_key", s))
                .transpose()?,
            encapsulated_key: wire
                .encapsulated_key
                .as_deref()
                .map(|s| decode_field("encapsulated_key", s))
                .transpose()?,
            iv: wire.iv.as_deref().map(|s| decode_field("iv", s)).transpose()?.unwrap_or_default(),
            ciphertext: decode_field("ciphertext", &wire.ciphertext)?,
            tag: wire.tag.as_deref().map(|s| decode_field("tag", s)).transpose()?.unwrap_or_default(),
            recipients: recipients
                .into_iter()
                .map(Recipient::try_from)
                .collect::<Result<Vec<_>, _>>()?,
        })
    }
}

fn optional_segment(field: &'static str, segment: &str) -> Result<Option<Vec<u8>>, JweError> {
    if segment.is_empty() {
        return Ok(None);
    }
    Ok(Some(decode_field(field, segment)?))
}

fn non_empty(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        None
    } else {
        Some(base64url_encode(bytes))
    }
}

// Wire structs. Field order here is the output member order.

#[derive(Serialize, Deserialize)]
struct GeneralJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    protected: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unprotected: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    encapsulated_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    encrypted_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    recipients: Option<Vec<RecipientJson>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    aad: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iv: Option<String>,
    ciphertext: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tag: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct RecipientJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    encapsulated_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    header: Option<RecipientHeader>,
    encrypted_key: String,
}

impl From<&Recipient> for RecipientJson {
    fn from(r: &Recipient) -> Self {
        Self {
            kid: r.kid.clone(),
            encapsulated_key: r.encapsulated_key.as_deref().map(base64url_encode),
            header: r.header.clone(),
            encrypted_key: base64url_encode(&r.encrypted_key),
        }
    }
}

impl TryFrom<RecipientJson> for Recipient {
    type Error = JweError;

    fn try_from(r: RecipientJson) -> Result<Self, JweError> {
        Ok(Self {
            kid: r.kid,
            header: r.header,
            encapsulated_key: r
                .encapsulated_key
                .as_deref()
                .map(|s| decode_field("encapsulated_key", s))
                .transpose()?,
            encrypted_key: decode_field("encrypted_key", &r.encrypted_key)?,
        })
    }
}
