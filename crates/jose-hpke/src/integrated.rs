//! Integrated encryption: HPKE seals the plaintext itself.
//!
//! There is no CEK, IV or detached tag. The header names the ciphersuite and
//! the recipient's `kid`; the encapsulated key takes the key slot.

use tracing::debug;

use crate::alg::{Ciphersuite, KeyManagement};
use crate::encapsulation::{create_recipient_context, create_sender_context};
use crate::envelope::Envelope;
use crate::error::JweError;
use crate::header::{HeaderParams, ProtectedHeader};
use crate::jwk::{private_key_from, public_key_from, Jwk};
use crate::key_encryption::Decryption;
use crate::options::{EncryptOptions, Serialization};

fn suite_for(alg: &str) -> Result<Ciphersuite, JweError> {
    match KeyManagement::from_alg(alg)? {
        KeyManagement::Hpke(suite) => Ok(suite),
        other => Err(JweError::UnsupportedAlgorithm(format!(
            "{} cannot be used for integrated encryption",
            other
        ))),
    }
}

/// Seal `plaintext` directly to `recipient`.
///
/// Without options the envelope is meant for compact serialization, which
/// cannot carry `aad`.
pub fn encrypt(
    plaintext: &[u8],
    recipient: &Jwk,
    aad: Option<&[u8]>,
    options: Option<&EncryptOptions>,
) -> Result<Envelope, JweError> {
    let serialization = options
        .map(|o| o.serialization)
        .unwrap_or(Serialization::Compact);
    let suite = suite_for(&recipient.alg)?;
    if serialization == Serialization::Compact && aad.is_some() {
        return Err(JweError::InvalidOptions(
            "compact serialization cannot carry external AAD".to_string(),
        ));
    }
    let public_key = public_key_from(recipient)?;
    debug!("integrated encryption to {} with {}", recipient.kid, suite.alg());

    let mut sender = create_sender_context(suite, &public_key)?;
    let protected = ProtectedHeader::new(HeaderParams {
        alg: Some(suite.alg().to_string()),
        kid: Some(recipient.kid.clone()),
        ..HeaderParams::default()
    })?;
    let ciphertext = sender.seal(plaintext, &protected.content_aad(aad))?;

    Ok(Envelope {
        protected,
        unprotected: None,
        aad: aad.map(<[u8]>::to_vec),
        encrypted_key: None,
        encapsulated_key: Some(sender.encapsulated_key().to_vec()),
        iv: Vec::new(),
        ciphertext,
        tag: Vec::new(),
        recipients: Vec::new(),
    })
}

/// Open an integrated-encryption envelope with `private_key`.
pub fn decrypt(envelope: &Envelope, private_key: &Jwk) -> Result<Decryption, JweError> {
    let params = envelope.protected.params();
    if params.enc.is_some() {
        return Err(JweError::MalformedEnvelope(
            "integrated envelope must not name a content algorithm".to_string(),
        ));
    }
    let alg = params.alg.as_deref().ok_or_else(|| {
        JweError::MalformedEnvelope("protected header has no alg".to_string())
    })?;
    let suite = suite_for(alg)?;
    let encapsulated_key = envelope.encapsulated_key.as_deref().ok_or_else(|| {
        JweError::MalformedEnvelope("envelope has no encapsulated key".to_string())
    })?;
    if !envelope.iv.is_empty() || !envelope.tag.is_empty() {
        return Err(JweError::MalformedEnvelope(
            "integrated envelope carries no iv or tag".to_string(),
        ));
    }
    if !envelope.recipients.is_empty() || envelope.encrypted_key.is_some() {
        return Err(JweError::MalformedEnvelope(
            "integrated envelope has no per-recipient keys".to_string(),
        ));
    }

    if let Some(kid) = params.kid.as_deref() {
        if kid != private_key.kid {
            return Err(JweError::NoMatchingRecipient);
        }
    }
    if suite_for(&private_key.alg)? != suite {
        return Err(JweError::InvalidKeyMaterial(format!(
            "envelope uses {} but key {} is for {}",
            alg, private_key.kid, private_key.alg
        )));
    }

    let key = private_key_from(private_key)?;
    let mut ctx = create_recipient_context(suite, &key, encapsulated_key)?;
    let plaintext = ctx.open(
        &envelope.ciphertext,
        &envelope.protected.content_aad(envelope.aad.as_deref()),
    )?;

    Ok(Decryption {
        plaintext,
        aad: envelope.aad.clone(),
        protected_header: params.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alg::{ALG_ECDH_ES_A128KW, ALG_HPKE_P256_SHA256_A128GCM, ALG_HPKE_P384_SHA384_A128GCM};
    use crate::keys::generate;

    #[test]
    fn compact_round_trip() {
        let private = generate(ALG_HPKE_P256_SHA256_A128GCM).unwrap();
        let envelope = encrypt(b"direct", &private.to_public(), None, None).unwrap();
        let compact = envelope.to_compact().unwrap();

        // header.encapsulated_key..ciphertext.
        let parts: Vec<&str> = compact.split('.').collect();
        assert_eq!(parts.len(), 5);
        assert!(!parts[1].is_empty());
        assert!(parts[2].is_empty());
        assert!(parts[4].is_empty());

        let parsed = Envelope::from_compact(&compact).unwrap();
        let result = decrypt(&parsed, &private).unwrap();
        assert_eq!(result.plaintext, b"direct");
        assert_eq!(
            result.protected_header.alg.as_deref(),
            Some(ALG_HPKE_P256_SHA256_A128GCM)
        );
    }

    #[test]
    fn json_round_trip_with_aad() {
        let private = generate(ALG_HPKE_P384_SHA384_A128GCM).unwrap();
        let envelope = encrypt(
            b"direct",
            &private.to_public(),
            Some(b"bound"),
            Some(&EncryptOptions::general_json()),
        )
        .unwrap();
        let value = envelope.to_json_value().unwrap();
        assert!(value.get("iv").is_none());
        assert!(value.get("tag").is_none());
        assert!(value.get("encrypted_key").is_none());
        assert!(value.get("encapsulated_key").is_some());

        let parsed = Envelope::from_json_value(value).unwrap();
        let result = decrypt(&parsed, &private).unwrap();
        assert_eq!(result.plaintext, b"direct");
        assert_eq!(result.aad.as_deref(), Some(&b"bound"[..]));

        let mut tampered = parsed;
        tampered.aad = Some(b"other".to_vec());
        assert!(matches!(
            decrypt(&tampered, &private),
            Err(JweError::AuthenticationFailed)
        ));
    }

    #[test]
    fn compact_default_rejects_aad() {
        let private = generate(ALG_HPKE_P256_SHA256_A128GCM).unwrap();
        assert!(matches!(
            encrypt(b"x", &private.to_public(), Some(b"aad"), None),
            Err(JweError::InvalidOptions(_))
        ));
    }

    #[test]
    fn mixed_alg_cannot_be_used() {
        let private = generate(ALG_ECDH_ES_A128KW).unwrap();
        assert!(matches!(
            encrypt(b"x", &private.to_public(), None, None),
            Err(JweError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn other_kid_is_no_matching_recipient() {
        let private = generate(ALG_HPKE_P256_SHA256_A128GCM).unwrap();
        let other = generate(ALG_HPKE_P256_SHA256_A128GCM).unwrap();
        let envelope = encrypt(b"x", &private.to_public(), None, None).unwrap();
        assert!(matches!(
            decrypt(&envelope, &other),
            Err(JweError::NoMatchingRecipient)
        ));
    }

    #[test]
    fn key_encryption_envelope_is_malformed_here() {
        let private = generate(ALG_HPKE_P256_SHA256_A128GCM).unwrap();
        let mut envelope = encrypt(b"x", &private.to_public(), None, None).unwrap();
        envelope.iv = vec![0; 12];
        assert!(matches!(
            decrypt(&envelope, &private),
            Err(JweError::MalformedEnvelope(_))
        ));
    }
}
