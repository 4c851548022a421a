//! HPKE key encapsulation (RFC 9180, Base mode).
//!
//! Each ciphersuite is a set of zero-sized type parameters, so contexts are
//! built per call and nothing is shared between calls. `info` is empty; the
//! protected header is bound through the AEAD associated data instead.

use hpke::aead::{AeadCtxR, AeadCtxS, AesGcm128};
use hpke::kdf::{HkdfSha256, HkdfSha384, Kdf as KdfTrait};
use hpke::kem::{DhP256HkdfSha256, DhP384HkdfSha384};
use hpke::{Deserializable, Kem as KemTrait, OpModeR, OpModeS, Serializable};
use p256::elliptic_curve::rand_core::OsRng;
use zeroize::Zeroizing;

use crate::alg::Ciphersuite;
use crate::error::JweError;
use crate::jwk::{require_curve, PrivateKeyMaterial, PublicKeyMaterial};

const HPKE_INFO: &[u8] = b"";

type P256Sender = AeadCtxS<AesGcm128, HkdfSha256, DhP256HkdfSha256>;
type P384Sender = AeadCtxS<AesGcm128, HkdfSha384, DhP384HkdfSha384>;
type P256Recipient = AeadCtxR<AesGcm128, HkdfSha256, DhP256HkdfSha256>;
type P384Recipient = AeadCtxR<AesGcm128, HkdfSha384, DhP384HkdfSha384>;

enum SenderInner {
    P256(Box<P256Sender>),
    P384(Box<P384Sender>),
}

enum RecipientInner {
    P256(Box<P256Recipient>),
    P384(Box<P384Recipient>),
}

/// Sender side of one encapsulation: the encapsulated key plus a context
/// that seals under the derived secret.
pub struct SenderContext {
    encapsulated_key: Vec<u8>,
    inner: SenderInner,
}

impl SenderContext {
    /// KEM output to send alongside the ciphertext.
    pub fn encapsulated_key(&self) -> &[u8] {
        &self.encapsulated_key
    }

    pub fn seal(&mut self, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, JweError> {
        match &mut self.inner {
            SenderInner::P256(ctx) => ctx.seal(plaintext, aad),
            SenderInner::P384(ctx) => ctx.seal(plaintext, aad),
        }
        .map_err(|e| JweError::Encryption(format!("HPKE seal: {:?}", e)))
    }
}

/// Recipient side, reconstructed from the private key and the sender's
/// encapsulated key.
pub struct RecipientContext {
    inner: RecipientInner,
}

impl RecipientContext {
    /// Open a sealed message. A tag mismatch is [`JweError::AuthenticationFailed`].
    pub fn open(&mut self, ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>, JweError> {
        match &mut self.inner {
            RecipientInner::P256(ctx) => ctx.open(ciphertext, aad),
            RecipientInner::P384(ctx) => ctx.open(ciphertext, aad),
        }
        .map_err(|_| JweError::AuthenticationFailed)
    }
}

fn setup_sender<Kdf: KdfTrait, Kem: KemTrait>(
    recipient: &PublicKeyMaterial,
) -> Result<(Vec<u8>, AeadCtxS<AesGcm128, Kdf, Kem>), JweError> {
    let pk = <Kem as KemTrait>::PublicKey::from_bytes(&recipient.sec1)
        .map_err(|e| JweError::InvalidKeyMaterial(format!("HPKE public key: {:?}", e)))?;
    let (encapped, ctx) =
        hpke::setup_sender::<AesGcm128, Kdf, Kem, _>(&OpModeS::Base, &pk, HPKE_INFO, &mut OsRng)
            .map_err(|e| JweError::Encryption(format!("HPKE encapsulation: {:?}", e)))?;
    Ok((encapped.to_bytes().to_vec(), ctx))
}

fn setup_receiver<Kdf: KdfTrait, Kem: KemTrait>(
    private_key: &PrivateKeyMaterial,
    encapsulated_key: &[u8],
) -> Result<AeadCtxR<AesGcm128, Kdf, Kem>, JweError> {
    let sk = <Kem as KemTrait>::PrivateKey::from_bytes(private_key.scalar())
        .map_err(|e| JweError::InvalidKeyMaterial(format!("HPKE private key: {:?}", e)))?;
    let encapped = <Kem as KemTrait>::EncappedKey::from_bytes(encapsulated_key)
        .map_err(|_| JweError::DecapsulationFailed)?;
    hpke::setup_receiver::<AesGcm128, Kdf, Kem>(&OpModeR::Base, &sk, &encapped, HPKE_INFO)
        .map_err(|_| JweError::DecapsulationFailed)
}

/// Encapsulate to `recipient`. Every call draws a fresh ephemeral secret.
pub fn create_sender_context(
    suite: Ciphersuite,
    recipient: &PublicKeyMaterial,
) -> Result<SenderContext, JweError> {
    require_curve(recipient.curve, suite.curve())?;
    let (encapsulated_key, inner) = match suite {
        Ciphersuite::P256Sha256Aes128Gcm => {
            let (ek, ctx) = setup_sender::<HkdfSha256, DhP256HkdfSha256>(recipient)?;
            (ek, SenderInner::P256(Box::new(ctx)))
        }
        Ciphersuite::P384Sha384Aes128Gcm => {
            let (ek, ctx) = setup_sender::<HkdfSha384, DhP384HkdfSha384>(recipient)?;
            (ek, SenderInner::P384(Box::new(ctx)))
        }
    };
    Ok(SenderContext {
        encapsulated_key,
        inner,
    })
}

/// Decapsulate `encapsulated_key` with `private_key`.
///
/// A malformed encapsulated key, or one that fails KEM validation, is
/// [`JweError::DecapsulationFailed`].
pub fn create_recipient_context(
    suite: Ciphersuite,
    private_key: &PrivateKeyMaterial,
    encapsulated_key: &[u8],
) -> Result<RecipientContext, JweError> {
    require_curve(private_key.curve, suite.curve())?;
    let inner = match suite {
        Ciphersuite::P256Sha256Aes128Gcm => RecipientInner::P256(Box::new(setup_receiver::<
            HkdfSha256,
            DhP256HkdfSha256,
        >(
            private_key,
            encapsulated_key,
        )?)),
        Ciphersuite::P384Sha384Aes128Gcm => RecipientInner::P384(Box::new(setup_receiver::<
            HkdfSha384,
            DhP384HkdfSha384,
        >(
            private_key,
            encapsulated_key,
        )?)),
    };
    Ok(RecipientContext { inner })
}

/// Generate a key pair for `suite`: uncompressed SEC1 public point and
/// big-endian private scalar.
pub fn generate_key_pair(suite: Ciphersuite) -> (Vec<u8>, Zeroizing<Vec<u8>>) {
    fn generate<Kem: KemTrait>() -> (Vec<u8>, Zeroizing<Vec<u8>>) {
        let (sk, pk) = Kem::gen_keypair(&mut OsRng);
        (
            pk.to_bytes().to_vec(),
            Zeroizing::new(sk.to_bytes().to_vec()),
        )
    }
    match suite {
        Ciphersuite::P256Sha256Aes128Gcm => generate::<DhP256HkdfSha256>(),
        Ciphersuite::P384Sha384Aes128Gcm => generate::<DhP384HkdfSha384>(),
    }
}
