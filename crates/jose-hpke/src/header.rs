//! Protected header: parameters plus the exact encoded string they came from.
//!
//! The encoded form is produced once on encrypt and kept verbatim on parse.
//! Every AAD computation reads that string, never a re-serialization.

use jose_hpke_crypto::{base64url_decode, base64url_encode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::JweError;
use crate::jwk::EcPublicJwk;

/// Header parameters. Serialized in declaration order with absent fields
/// omitted, so the encoding of a given parameter set is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// HPKE encapsulated key (base64url), compact key encryption only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ek: Option<String>,
    /// Ephemeral public key, compact ECDH-ES only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epk: Option<EcPublicJwk>,
    /// Parameters this crate does not interpret. Kept so callers can read
    /// them back after decrypt.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl HeaderParams {
    pub fn with_enc(enc: &str) -> Self {
        Self {
            enc: Some(enc.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedHeader {
    encoded: String,
    params: HeaderParams,
}

impl ProtectedHeader {
    /// Serialize `params` and encode them. The result is fixed from here on.
    pub fn new(params: HeaderParams) -> Result<Self, JweError> {
        let json = serde_json::to_vec(&params)?;
        Ok(Self {
            encoded: base64url_encode(&json),
            params,
        })
    }

    /// Parse a received header, keeping `encoded` exactly as given.
    pub fn from_encoded(encoded: &str) -> Result<Self, JweError> {
        let bytes = base64url_decode(encoded).map_err(|e| {
            JweError::MalformedEnvelope(format!("protected header: invalid base64url: {}", e))
        })?;
        let value: Value = serde_json::from_slice(&bytes).map_err(|e| {
            JweError::MalformedEnvelope(format!("protected header: invalid JSON: {}", e))
        })?;
        if !value.is_object() {
            return Err(JweError::MalformedEnvelope(
                "protected header: not a JSON object".to_string(),
            ));
        }
        let params: HeaderParams = serde_json::from_value(value).map_err(|e| {
            JweError::MalformedEnvelope(format!("protected header: {}", e))
        })?;
        Ok(Self {
            encoded: encoded.to_string(),
            params,
        })
    }

    pub fn encoded(&self) -> &str {
        &self.encoded
    }

    pub fn params(&self) -> &HeaderParams {
        &self.params
    }

    /// AAD for per-recipient HPKE seal/open: the encoded header's ASCII bytes.
    pub fn aad_bytes(&self) -> &[u8] {
        self.encoded.as_bytes()
    }

    /// AAD for content encryption (RFC 7516 §5.1 step 14).
    pub fn content_aad(&self, external_aad: Option<&[u8]>) -> Vec<u8> {
        match external_aad {
            Some(aad) => {
                let mut out = self.encoded.clone().into_bytes();
                out.push(b'.');
                out.extend_from_slice(base64url_encode(aad).as_bytes());
                out
            }
            None => self.encoded.as_bytes().to_vec(),
        }
    }
}
