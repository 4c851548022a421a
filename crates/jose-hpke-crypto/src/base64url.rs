use base64ct::{Base64UrlUnpadded, Encoding};

use crate::error::CryptoError;

/// Base64url encode bytes without padding.
pub fn base64url_encode(data: &[u8]) -> String {
    Base64UrlUnpadded::encode_string(data)
}

/// Base64url decode a string to bytes.
pub fn base64url_decode(s: &str) -> Result<Vec<u8>, base64ct::Error> {
    Base64UrlUnpadded::decode_vec(s)
}

/// Decode a named envelope field, rejecting padding and non-URL-safe input.
///
/// The field name ends up in the error so structural failures point at the
/// offending member (`iv`, `tag`, `encrypted_key`).
pub fn decode_field(field: &'static str, s: &str) -> Result<Vec<u8>, CryptoError> {
    base64url_decode(s).map_err(|e| CryptoError::Base64Decode {
        field,
        reason: e.to_string(),
    })
}
