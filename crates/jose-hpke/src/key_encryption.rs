//! Key encryption: one content key, delivered to every recipient.
//!
//! The plaintext is encrypted once under a fresh CEK. Each recipient gets the
//! CEK either sealed with HPKE or wrapped after ECDH-ES, chosen by the `alg`
//! on that recipient's JWK.

use std::borrow::Cow;

use jose_hpke_crypto::{
    base64url_decode, base64url_encode, content, generate_iv, generate_key, join_tag, split_tag,
    Cek, ContentAlgorithm,
};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::alg::KeyManagement;
use crate::ecdh_es;
use crate::encapsulation::{create_recipient_context, create_sender_context};
use crate::envelope::{Envelope, Recipient, RecipientHeader};
use crate::error::JweError;
use crate::header::{HeaderParams, ProtectedHeader};
use crate::jwk::{private_key_from, public_key_from, require_curve, Jwk, Jwks, PublicKeyMaterial};
use crate::options::{EncryptOptions, Serialization};

/// Result of a successful decrypt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decryption {
    pub plaintext: Vec<u8>,
    /// External AAD the sender bound, if any.
    pub aad: Option<Vec<u8>>,
    pub protected_header: HeaderParams,
}

/// A recipient whose algorithm and key have been checked.
struct PlannedRecipient<'a> {
    jwk: &'a Jwk,
    management: KeyManagement,
    public_key: PublicKeyMaterial,
}

/// Resolve every recipient before any randomness is drawn, so an unsupported
/// algorithm or bad key never leaves a partial envelope behind.
fn plan(recipients: &Jwks) -> Result<Vec<PlannedRecipient<'_>>, JweError> {
    if recipients.keys.is_empty() {
        return Err(JweError::InvalidOptions(
            "at least one recipient is required".to_string(),
        ));
    }
    let managements = recipients
        .keys
        .iter()
        .map(|jwk| KeyManagement::from_alg(&jwk.alg))
        .collect::<Result<Vec<_>, _>>()?;

    recipients
        .keys
        .iter()
        .zip(managements)
        .map(|(jwk, management)| {
            let public_key = public_key_from(jwk)?;
            require_curve(public_key.curve, management.curve())?;
            Ok(PlannedRecipient {
                jwk,
                management,
                public_key,
            })
        })
        .collect()
}

/// Encrypt `plaintext` to every key in `recipients`.
///
/// `enc` names the content algorithm. With [`Serialization::Compact`] there
/// must be exactly one recipient and no `aad`; that recipient's `kid` and
/// encapsulated or ephemeral key go in the protected header.
pub fn encrypt(
    enc: &str,
    plaintext: &[u8],
    aad: Option<&[u8]>,
    recipients: &Jwks,
    options: &EncryptOptions,
) -> Result<Envelope, JweError> {
    let content_alg = ContentAlgorithm::from_enc(enc)?;
    let planned = plan(recipients)?;
    debug!(
        "encrypting to {} recipient(s) with {content_alg}",
        planned.len()
    );

    match options.serialization {
        Serialization::Compact => {
            if aad.is_some() {
                return Err(JweError::InvalidOptions(
                    "compact serialization cannot carry external AAD".to_string(),
                ));
            }
            match planned.as_slice() {
                [single] => encrypt_compact(content_alg, plaintext, single),
                _ => Err(JweError::InvalidOptions(format!(
                    "compact serialization needs exactly one recipient, got {}",
                    planned.len()
                ))),
            }
        }
        Serialization::GeneralJson => encrypt_general(content_alg, plaintext, aad, &planned),
    }
}

fn encrypt_general(
    content_alg: ContentAlgorithm,
    plaintext: &[u8],
    aad: Option<&[u8]>,
    planned: &[PlannedRecipient<'_>],
) -> Result<Envelope, JweError> {
    let cek = generate_key(content_alg)?;
    let iv = generate_iv(content_alg)?;
    let protected = ProtectedHeader::new(HeaderParams::with_enc(content_alg.as_str()))?;

    let sealed = content::encrypt(
        content_alg,
        plaintext,
        &iv,
        Some(&protected.content_aad(aad)),
        cek.as_bytes(),
    )?;
    let (ciphertext, tag) = split_tag(content_alg, &sealed)?;

    // All recipients or none.
    let recipients = planned
        .iter()
        .map(|r| deliver_cek(r, &cek, &protected))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Envelope {
        protected,
        unprotected: None,
        aad: aad.map(<[u8]>::to_vec),
        encrypted_key: None,
        encapsulated_key: None,
        iv,
        ciphertext: ciphertext.to_vec(),
        tag: tag.to_vec(),
        recipients,
    })
}

fn deliver_cek(
    recipient: &PlannedRecipient<'_>,
    cek: &Cek,
    protected: &ProtectedHeader,
) -> Result<Recipient, JweError> {
    debug!("delivering CEK to {} via {}", recipient.jwk.kid, recipient.management);
    match recipient.management {
        KeyManagement::Hpke(suite) => {
            let mut sender = create_sender_context(suite, &recipient.public_key)?;
            let encrypted_key = sender.seal(cek.as_bytes(), protected.aad_bytes())?;
            Ok(Recipient {
                kid: Some(recipient.jwk.kid.clone()),
                header: None,
                encapsulated_key: Some(sender.encapsulated_key().to_vec()),
                encrypted_key,
            })
        }
        KeyManagement::EcdhEsKeyWrap(kw) => {
            let (encrypted_key, epk) =
                ecdh_es::wrap_for_recipient(kw, &recipient.public_key, cek)?;
            Ok(Recipient {
                kid: None,
                header: Some(RecipientHeader {
                    alg: Some(recipient.management.as_str().to_string()),
                    kid: Some(recipient.jwk.kid.clone()),
                    epk: Some(epk),
                }),
                encapsulated_key: None,
                encrypted_key,
            })
        }
    }
}

fn encrypt_compact(
    content_alg: ContentAlgorithm,
    plaintext: &[u8],
    recipient: &PlannedRecipient<'_>,
) -> Result<Envelope, JweError> {
    let cek = generate_key(content_alg)?;
    let iv = generate_iv(content_alg)?;
    let mut params = HeaderParams {
        alg: Some(recipient.management.as_str().to_string()),
        enc: Some(content_alg.as_str().to_string()),
        kid: Some(recipient.jwk.kid.clone()),
        ..HeaderParams::default()
    };

    // The header is fixed only once the recipient's key material is known.
    let (protected, encrypted_key) = match recipient.management {
        KeyManagement::Hpke(suite) => {
            let mut sender = create_sender_context(suite, &recipient.public_key)?;
            params.ek = Some(base64url_encode(sender.encapsulated_key()));
            let protected = ProtectedHeader::new(params)?;
            let encrypted_key = sender.seal(cek.as_bytes(), protected.aad_bytes())?;
            (protected, encrypted_key)
        }
        KeyManagement::EcdhEsKeyWrap(kw) => {
            let (encrypted_key, epk) =
                ecdh_es::wrap_for_recipient(kw, &recipient.public_key, &cek)?;
            params.epk = Some(epk);
            (ProtectedHeader::new(params)?, encrypted_key)
        }
    };

    let sealed = content::encrypt(
        content_alg,
        plaintext,
        &iv,
        Some(&protected.content_aad(None)),
        cek.as_bytes(),
    )?;
    let (ciphertext, tag) = split_tag(content_alg, &sealed)?;

    Ok(Envelope {
        protected,
        unprotected: None,
        aad: None,
        encrypted_key: Some(encrypted_key),
        encapsulated_key: None,
        iv,
        ciphertext: ciphertext.to_vec(),
        tag: tag.to_vec(),
        recipients: Vec::new(),
    })
}

/// The single recipient a compact envelope describes in its header.
fn compact_recipient(envelope: &Envelope) -> Result<Recipient, JweError> {
    let params = envelope.protected.params();
    let encrypted_key = envelope.encrypted_key.clone().ok_or_else(|| {
        JweError::MalformedEnvelope("envelope has no recipients and no encrypted key".to_string())
    })?;
    let encapsulated_key = params
        .ek
        .as_deref()
        .map(|ek| {
            base64url_decode(ek)
                .map_err(|e| JweError::MalformedEnvelope(format!("ek: invalid base64url: {}", e)))
        })
        .transpose()?;
    Ok(Recipient {
        kid: params.kid.clone(),
        header: Some(RecipientHeader {
            alg: params.alg.clone(),
            kid: None,
            epk: params.epk.clone(),
        }),
        encapsulated_key,
        encrypted_key,
    })
}

/// Decrypt with the first key in `private_keys` whose `kid` names a
/// recipient of `envelope`. Only that one candidate is tried.
pub fn decrypt(envelope: &Envelope, private_keys: &Jwks) -> Result<Decryption, JweError> {
    let params = envelope.protected.params();
    let enc = params.enc.as_deref().ok_or_else(|| {
        JweError::MalformedEnvelope("protected header has no enc".to_string())
    })?;
    let content_alg = ContentAlgorithm::from_enc(enc)?;
    if envelope.iv.len() != content_alg.iv_length() {
        return Err(JweError::MalformedEnvelope(format!(
            "iv: expected {} bytes, got {}",
            content_alg.iv_length(),
            envelope.iv.len()
        )));
    }
    if envelope.tag.len() != content_alg.tag_length() {
        return Err(JweError::MalformedEnvelope(format!(
            "tag: expected {} bytes, got {}",
            content_alg.tag_length(),
            envelope.tag.len()
        )));
    }

    let recipients: Cow<'_, [Recipient]> = if envelope.recipients.is_empty() {
        Cow::Owned(vec![compact_recipient(envelope)?])
    } else {
        Cow::Borrowed(&envelope.recipients)
    };

    let (recipient, jwk) = private_keys
        .keys
        .iter()
        .find_map(|jwk| {
            recipients
                .iter()
                .find(|r| r.key_id() == Some(jwk.kid.as_str()))
                .map(|r| (r, jwk))
        })
        .ok_or_else(|| {
            warn!(
                "no private key matches any of {} recipient(s)",
                recipients.len()
            );
            JweError::NoMatchingRecipient
        })?;
    debug!("decrypting as recipient {}", jwk.kid);

    let management = resolve_management(recipient, jwk)?;
    let cek = recover_cek(management, recipient, jwk, &envelope.protected)?;
    let cek = Cek::from_bytes(content_alg, cek.to_vec())
        .map_err(|_| JweError::AuthenticationFailed)?;

    let sealed = join_tag(&envelope.ciphertext, &envelope.tag);
    let plaintext = content::decrypt(
        content_alg,
        &sealed,
        &envelope.iv,
        Some(&envelope.protected.content_aad(envelope.aad.as_deref())),
        cek.as_bytes(),
    )?;

    Ok(Decryption {
        plaintext,
        aad: envelope.aad.clone(),
        protected_header: params.clone(),
    })
}

/// The record's own `alg` wins when present; it must agree with the key.
fn resolve_management(recipient: &Recipient, jwk: &Jwk) -> Result<KeyManagement, JweError> {
    let from_key = KeyManagement::from_alg(&jwk.alg)?;
    match recipient.alg().map(KeyManagement::from_alg).transpose()? {
        Some(declared) if declared != from_key => Err(JweError::InvalidKeyMaterial(format!(
            "recipient declares {} but key {} is for {}",
            declared, jwk.kid, from_key
        ))),
        _ => Ok(from_key),
    }
}

fn recover_cek(
    management: KeyManagement,
    recipient: &Recipient,
    jwk: &Jwk,
    protected: &ProtectedHeader,
) -> Result<Zeroizing<Vec<u8>>, JweError> {
    match management {
        KeyManagement::Hpke(suite) => {
            let encapsulated_key = recipient.encapsulated_key.as_deref().ok_or_else(|| {
                JweError::MalformedEnvelope("HPKE recipient has no encapsulated_key".to_string())
            })?;
            let private_key = private_key_from(jwk)?;
            let mut ctx = create_recipient_context(suite, &private_key, encapsulated_key)?;
            Ok(Zeroizing::new(
                ctx.open(&recipient.encrypted_key, protected.aad_bytes())?,
            ))
        }
        KeyManagement::EcdhEsKeyWrap(kw) => {
            let epk = recipient.epk().ok_or_else(|| {
                JweError::MalformedEnvelope("ECDH-ES recipient has no epk".to_string())
            })?;
            let private_key = private_key_from(jwk)?;
            ecdh_es::unwrap_for_recipient(kw, &private_key, epk, &recipient.encrypted_key)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alg::{ALG_ECDH_ES_A128KW, ALG_HPKE_P256_SHA256_A128GCM};
    use crate::keys::generate;

    fn key(alg: &str) -> Jwk {
        generate(alg).unwrap()
    }

    #[test]
    fn general_round_trip_single_recipient() {
        let private = key(ALG_HPKE_P256_SHA256_A128GCM);
        let public = Jwks::new(vec![private.to_public()]);
        let envelope = encrypt(
            "A128GCM",
            b"hello",
            None,
            &public,
            &EncryptOptions::default(),
        )
        .unwrap();
        assert_eq!(envelope.recipients.len(), 1);
        assert_eq!(envelope.iv.len(), 12);
        assert_eq!(envelope.tag.len(), 16);

        let result = decrypt(&envelope, &Jwks::new(vec![private])).unwrap();
        assert_eq!(result.plaintext, b"hello");
        assert_eq!(result.aad, None);
        assert_eq!(result.protected_header.enc.as_deref(), Some("A128GCM"));
    }

    #[test]
    fn hpke_recipient_has_top_level_kid() {
        let private = key(ALG_HPKE_P256_SHA256_A128GCM);
        let envelope = encrypt(
            "A128GCM",
            b"x",
            None,
            &Jwks::new(vec![private.to_public()]),
            &EncryptOptions::default(),
        )
        .unwrap();
        let r = &envelope.recipients[0];
        assert_eq!(r.kid.as_deref(), Some(private.kid.as_str()));
        assert_eq!(r.encapsulated_key.as_ref().map(Vec::len), Some(65));
        // 16-byte CEK plus 16-byte tag.
        assert_eq!(r.encrypted_key.len(), 32);
        assert!(r.header.is_none());
    }

    #[test]
    fn mixed_recipient_has_header_with_epk() {
        let private = key(ALG_ECDH_ES_A128KW);
        let envelope = encrypt(
            "A128GCM",
            b"x",
            None,
            &Jwks::new(vec![private.to_public()]),
            &EncryptOptions::default(),
        )
        .unwrap();
        let r = &envelope.recipients[0];
        assert!(r.kid.is_none());
        assert_eq!(r.key_id(), Some(private.kid.as_str()));
        assert_eq!(r.alg(), Some(ALG_ECDH_ES_A128KW));
        assert!(r.epk().is_some());
        assert_eq!(r.encrypted_key.len(), 24);
    }

    #[test]
    fn unsupported_enc_and_alg() {
        let private = key(ALG_HPKE_P256_SHA256_A128GCM);
        let public = Jwks::new(vec![private.to_public()]);
        assert!(matches!(
            encrypt("A256GCM", b"x", None, &public, &EncryptOptions::default()),
            Err(JweError::UnsupportedAlgorithm(_))
        ));

        let mut bad = private.to_public();
        bad.alg = "RSA-OAEP".to_string();
        let mixed = Jwks::new(vec![private.to_public(), bad]);
        assert!(matches!(
            encrypt("A128GCM", b"x", None, &mixed, &EncryptOptions::default()),
            Err(JweError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn empty_recipient_set_is_rejected() {
        assert!(matches!(
            encrypt(
                "A128GCM",
                b"x",
                None,
                &Jwks::default(),
                &EncryptOptions::default()
            ),
            Err(JweError::InvalidOptions(_))
        ));
    }

    #[test]
    fn compact_rejects_two_recipients_and_aad() {
        let a = key(ALG_HPKE_P256_SHA256_A128GCM);
        let b = key(ALG_HPKE_P256_SHA256_A128GCM);
        let both = Jwks::new(vec![a.to_public(), b.to_public()]);
        assert!(matches!(
            encrypt("A128GCM", b"x", None, &both, &EncryptOptions::compact()),
            Err(JweError::InvalidOptions(_))
        ));
        let one = Jwks::new(vec![a.to_public()]);
        assert!(matches!(
            encrypt("A128GCM", b"x", Some(b"aad"), &one, &EncryptOptions::compact()),
            Err(JweError::InvalidOptions(_))
        ));
    }

    #[test]
    fn compact_header_carries_recipient_parameters() {
        let hpke = key(ALG_HPKE_P256_SHA256_A128GCM);
        let envelope = encrypt(
            "A128GCM",
            b"x",
            None,
            &Jwks::new(vec![hpke.to_public()]),
            &EncryptOptions::compact(),
        )
        .unwrap();
        let params = envelope.protected.params();
        assert_eq!(params.alg.as_deref(), Some(ALG_HPKE_P256_SHA256_A128GCM));
        assert_eq!(params.kid.as_deref(), Some(hpke.kid.as_str()));
        assert!(params.ek.is_some());
        assert!(params.epk.is_none());

        let mixed = key(ALG_ECDH_ES_A128KW);
        let envelope = encrypt(
            "A128GCM",
            b"x",
            None,
            &Jwks::new(vec![mixed.to_public()]),
            &EncryptOptions::compact(),
        )
        .unwrap();
        let params = envelope.protected.params();
        assert!(params.ek.is_none());
        assert!(params.epk.is_some());
        let result = decrypt(&envelope, &Jwks::new(vec![mixed])).unwrap();
        assert_eq!(result.plaintext, b"x");
    }

    #[test]
    fn recipient_alg_must_agree_with_key() {
        let private = key(ALG_ECDH_ES_A128KW);
        let mut envelope = encrypt(
            "A128GCM",
            b"x",
            None,
            &Jwks::new(vec![private.to_public()]),
            &EncryptOptions::default(),
        )
        .unwrap();
        if let Some(header) = envelope.recipients[0].header.as_mut() {
            header.alg = Some(ALG_HPKE_P256_SHA256_A128GCM.to_string());
        }
        assert!(matches!(
            decrypt(&envelope, &Jwks::new(vec![private])),
            Err(JweError::InvalidKeyMaterial(_))
        ));
    }

    #[test]
    fn structural_checks_precede_crypto() {
        let private = key(ALG_HPKE_P256_SHA256_A128GCM);
        let envelope = encrypt(
            "A128GCM",
            b"x",
            None,
            &Jwks::new(vec![private.to_public()]),
            &EncryptOptions::default(),
        )
        .unwrap();
        let keys = Jwks::new(vec![private]);

        let mut short_iv = envelope.clone();
        short_iv.iv.truncate(8);
        assert!(matches!(
            decrypt(&short_iv, &keys),
            Err(JweError::MalformedEnvelope(_))
        ));

        let mut no_tag = envelope.clone();
        no_tag.tag.clear();
        assert!(matches!(
            decrypt(&no_tag, &keys),
            Err(JweError::MalformedEnvelope(_))
        ));

        let mut no_ek = envelope;
        no_ek.recipients[0].encapsulated_key = None;
        assert!(matches!(
            decrypt(&no_ek, &keys),
            Err(JweError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn public_key_cannot_decrypt() {
        let private = key(ALG_HPKE_P256_SHA256_A128GCM);
        let public = Jwks::new(vec![private.to_public()]);
        let envelope =
            encrypt("A128GCM", b"x", None, &public, &EncryptOptions::default()).unwrap();
        assert!(matches!(
            decrypt(&envelope, &public),
            Err(JweError::InvalidKeyMaterial(_))
        ));
    }
}
