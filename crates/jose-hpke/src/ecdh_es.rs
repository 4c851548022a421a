//! ECDH-ES key agreement with AES key wrap (RFC 7518 §4.6).
//!
//! A fresh ephemeral P-256 key per recipient, Concat KDF over the raw shared
//! secret, then AES-KW around the CEK. The ephemeral public key travels as
//! `epk` in the recipient header.

use jose_hpke_crypto::{concat_kdf, key_wrap, Cek, KeyWrapAlgorithm};
use p256::elliptic_curve::rand_core::OsRng;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{PublicKey, SecretKey};
use zeroize::Zeroizing;

use crate::alg::KeyManagement;
use crate::error::JweError;
use crate::jwk::{
    ec_public_key_from, require_curve, Curve, EcPublicJwk, PrivateKeyMaterial, PublicKeyMaterial,
};

/// Derive the key-encryption key from an ECDH shared secret.
///
/// `apu` and `apv` are empty; the algorithm id is the full `alg` value.
pub fn derive_key(
    alg: KeyWrapAlgorithm,
    public_key: &PublicKey,
    secret_key: &SecretKey,
) -> Result<Zeroizing<Vec<u8>>, JweError> {
    let shared =
        p256::ecdh::diffie_hellman(secret_key.to_nonzero_scalar(), public_key.as_affine());
    let bits = (alg.kek_length() * 8) as u32;
    let kek = concat_kdf(
        shared.raw_secret_bytes().as_slice(),
        KeyManagement::EcdhEsKeyWrap(alg).as_str(),
        &[],
        &[],
        bits,
    )?;
    Ok(Zeroizing::new(kek))
}

fn p256_public(material: &PublicKeyMaterial) -> Result<PublicKey, JweError> {
    require_curve(material.curve, Curve::P256)?;
    PublicKey::from_sec1_bytes(&material.sec1)
        .map_err(|e| JweError::InvalidKeyMaterial(format!("P-256 public key: {}", e)))
}

fn p256_secret(material: &PrivateKeyMaterial) -> Result<SecretKey, JweError> {
    require_curve(material.curve, Curve::P256)?;
    SecretKey::from_slice(material.scalar())
        .map_err(|e| JweError::InvalidKeyMaterial(format!("P-256 private key: {}", e)))
}

/// Wrap `cek` for one recipient. Returns the wrapped key and the ephemeral
/// public key to publish as `epk`.
pub fn wrap_for_recipient(
    alg: KeyWrapAlgorithm,
    recipient: &PublicKeyMaterial,
    cek: &Cek,
) -> Result<(Vec<u8>, EcPublicJwk), JweError> {
    let recipient_key = p256_public(recipient)?;

    let ephemeral = SecretKey::random(&mut OsRng);
    let ephemeral_point = ephemeral.public_key().to_encoded_point(false);
    let epk = EcPublicJwk::from_sec1(Curve::P256, ephemeral_point.as_bytes())?;

    let kek = derive_key(alg, &recipient_key, &ephemeral)?;
    let encrypted_key = key_wrap::wrap(alg, &kek, cek.as_bytes())?;
    Ok((encrypted_key, epk))
}

/// Recover the CEK bytes from `encrypted_key` using the sender's `epk`.
///
/// An `epk` that does not decode to a point on P-256 is
/// [`JweError::DecapsulationFailed`]; an integrity-check failure on unwrap is
/// [`JweError::UnwrapIntegrityCheckFailed`].
pub fn unwrap_for_recipient(
    alg: KeyWrapAlgorithm,
    private_key: &PrivateKeyMaterial,
    epk: &EcPublicJwk,
    encrypted_key: &[u8],
) -> Result<Zeroizing<Vec<u8>>, JweError> {
    let secret = p256_secret(private_key)?;
    let ephemeral = ec_public_key_from(&epk.kty, &epk.crv, &epk.x, &epk.y)
        .and_then(|material| {
            require_curve(material.curve, Curve::P256)?;
            PublicKey::from_sec1_bytes(&material.sec1)
                .map_err(|e| JweError::InvalidKeyMaterial(e.to_string()))
        })
        .map_err(|_| JweError::DecapsulationFailed)?;

    let kek = derive_key(alg, &ephemeral, &secret)?;
    let cek = key_wrap::unwrap(alg, &kek, encrypted_key)?;
    Ok(Zeroizing::new(cek))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jose_hpke_crypto::{generate_key, ContentAlgorithm};

    fn key_pair() -> (PublicKeyMaterial, PrivateKeyMaterial) {
        let secret = SecretKey::random(&mut OsRng);
        let public = PublicKeyMaterial {
            curve: Curve::P256,
            sec1: secret.public_key().to_encoded_point(false).as_bytes().to_vec(),
        };
        let private = PrivateKeyMaterial::new(Curve::P256, secret.to_bytes().to_vec());
        (public, private)
    }

    #[test]
    fn wrap_unwrap_round_trip() {
        let (public, private) = key_pair();
        let cek = generate_key(ContentAlgorithm::A128Gcm).unwrap();

        let (encrypted_key, epk) =
            wrap_for_recipient(KeyWrapAlgorithm::A128Kw, &public, &cek).unwrap();
        assert_eq!(encrypted_key.len(), 24);
        assert_eq!(epk.crv, "P-256");

        let recovered =
            unwrap_for_recipient(KeyWrapAlgorithm::A128Kw, &private, &epk, &encrypted_key)
                .unwrap();
        assert_eq!(recovered.as_slice(), cek.as_bytes());
    }

    #[test]
    fn kdf_algorithm_id_is_the_header_alg() {
        let own = SecretKey::random(&mut OsRng);
        let peer = SecretKey::random(&mut OsRng).public_key();
        let kek = derive_key(KeyWrapAlgorithm::A128Kw, &peer, &own).unwrap();

        let shared = p256::ecdh::diffie_hellman(own.to_nonzero_scalar(), peer.as_affine());
        let expected = concat_kdf(
            shared.raw_secret_bytes().as_slice(),
            "ECDH-ES+A128KW",
            &[],
            &[],
            128,
        )
        .unwrap();
        assert_eq!(kek.as_slice(), expected.as_slice());
    }

    #[test]
    fn fresh_ephemeral_per_call() {
        let (public, _) = key_pair();
        let cek = generate_key(ContentAlgorithm::A128Gcm).unwrap();
        let (_, a) = wrap_for_recipient(KeyWrapAlgorithm::A128Kw, &public, &cek).unwrap();
        let (_, b) = wrap_for_recipient(KeyWrapAlgorithm::A128Kw, &public, &cek).unwrap();
        assert_ne!(a.x, b.x);
    }

    #[test]
    fn wrong_key_fails_integrity_check() {
        let (public, _) = key_pair();
        let (_, other) = key_pair();
        let cek = generate_key(ContentAlgorithm::A128Gcm).unwrap();
        let (encrypted_key, epk) =
            wrap_for_recipient(KeyWrapAlgorithm::A128Kw, &public, &cek).unwrap();

        assert!(matches!(
            unwrap_for_recipient(KeyWrapAlgorithm::A128Kw, &other, &epk, &encrypted_key),
            Err(JweError::UnwrapIntegrityCheckFailed)
        ));
    }

    #[test]
    fn invalid_epk_is_decapsulation_failure() {
        let (_, private) = key_pair();
        let epk = EcPublicJwk {
            kty: "EC".to_string(),
            crv: "P-256".to_string(),
            x: jose_hpke_crypto::base64url_encode(&[0x11; 32]),
            y: jose_hpke_crypto::base64url_encode(&[0x22; 32]),
        };
        assert!(matches!(
            unwrap_for_recipient(KeyWrapAlgorithm::A128Kw, &private, &epk, &[0u8; 24]),
            Err(JweError::DecapsulationFailed)
        ));
    }

    #[test]
    fn p384_recipient_is_rejected() {
        let public = PublicKeyMaterial {
            curve: Curve::P384,
            sec1: vec![0x04; 97],
        };
        let cek = generate_key(ContentAlgorithm::A128Gcm).unwrap();
        assert!(matches!(
            wrap_for_recipient(KeyWrapAlgorithm::A128Kw, &public, &cek),
            Err(JweError::InvalidKeyMaterial(_))
        ));
    }
}
