//! JWK Thumbprint (RFC 7638) and thumbprint URI (RFC 9278) computation.

use jose_hpke_crypto::base64url_encode;
use sha2::{Digest, Sha256};

use crate::error::JweError;
use crate::jwk::Jwk;

/// URI prefix for SHA-256 JWK thumbprints (RFC 9278).
pub const THUMBPRINT_URI_PREFIX: &str = "urn:ietf:params:oauth:jwk-thumbprint:sha-256:";

/// Compute JWK thumbprint per RFC 7638.
///
/// For EC keys, the thumbprint input is `{"crv","kty","x","y"}` in lexicographic order.
/// Returns a base64url-encoded SHA-256 hash (43 characters).
pub fn compute_jwk_thumbprint(kty: &str, crv: &str, x: &str, y: &str) -> Result<String, JweError> {
    if kty != "EC" {
        return Err(JweError::InvalidKeyMaterial(format!(
            "thumbprint only supports EC keys, got kty={}",
            kty
        )));
    }
    if crv.is_empty() || x.is_empty() || y.is_empty() {
        return Err(JweError::InvalidKeyMaterial(
            "missing required EC fields for thumbprint (crv, x, y)".to_string(),
        ));
    }

    // RFC 7638: members are in lexicographic order
    let thumbprint_input = format!(
        r#"{{"crv":"{}","kty":"{}","x":"{}","y":"{}"}}"#,
        crv, kty, x, y
    );

    let hash = Sha256::digest(thumbprint_input.as_bytes());
    Ok(base64url_encode(&hash))
}

/// Thumbprint URI for a JWK; private members do not take part.
pub fn thumbprint_uri(jwk: &Jwk) -> Result<String, JweError> {
    let thumbprint = compute_jwk_thumbprint(&jwk.kty, &jwk.crv, &jwk.x, &jwk.y)?;
    Ok(format!("{}{}", THUMBPRINT_URI_PREFIX, thumbprint))
}
