//! AES-GCM content encryption for JWE envelopes.
//!
//! The AEAD output is kept as one `ciphertext || tag` blob here; the
//! envelope codec splits it at the serialization boundary.

use std::fmt;
use std::str::FromStr;

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes128Gcm, Nonce};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;
use crate::types::{AES_128_KEY_LENGTH, AES_GCM_IV_LENGTH, AES_GCM_TAG_LENGTH, ENC_A128GCM};

/// Content encryption algorithms (`enc` header parameter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentAlgorithm {
    A128Gcm,
}

impl ContentAlgorithm {
    /// Resolve an `enc` identifier.
    pub fn from_enc(enc: &str) -> Result<Self, CryptoError> {
        match enc {
            ENC_A128GCM => Ok(Self::A128Gcm),
            other => Err(CryptoError::UnsupportedAlgorithm(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A128Gcm => ENC_A128GCM,
        }
    }

    pub fn key_length(&self) -> usize {
        match self {
            Self::A128Gcm => AES_128_KEY_LENGTH,
        }
    }

    pub fn iv_length(&self) -> usize {
        match self {
            Self::A128Gcm => AES_GCM_IV_LENGTH,
        }
    }

    pub fn tag_length(&self) -> usize {
        match self {
            Self::A128Gcm => AES_GCM_TAG_LENGTH,
        }
    }
}

impl FromStr for ContentAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_enc(s)
    }
}

impl fmt::Display for ContentAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content encryption key. Wiped on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Cek(Vec<u8>);

impl Cek {
    /// Adopt recovered key bytes, checking the length the algorithm requires.
    pub fn from_bytes(alg: ContentAlgorithm, bytes: Vec<u8>) -> Result<Self, CryptoError> {
        if bytes.len() != alg.key_length() {
            let got = bytes.len();
            let mut bytes = bytes;
            bytes.zeroize();
            return Err(CryptoError::InvalidKeyLength {
                expected: alg.key_length(),
                got,
            });
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Cek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cek([REDACTED; {}])", self.0.len())
    }
}

/// Generate a fresh content encryption key from the OS CSPRNG.
pub fn generate_key(alg: ContentAlgorithm) -> Result<Cek, CryptoError> {
    let mut key = vec![0u8; alg.key_length()];
    getrandom::getrandom(&mut key).map_err(|e| CryptoError::RngFailed(e.to_string()))?;
    Ok(Cek(key))
}

/// Generate a fresh IV. Every call draws new randomness; IVs are never derived.
pub fn generate_iv(alg: ContentAlgorithm) -> Result<Vec<u8>, CryptoError> {
    let mut iv = vec![0u8; alg.iv_length()];
    getrandom::getrandom(&mut iv).map_err(|e| CryptoError::RngFailed(e.to_string()))?;
    Ok(iv)
}

fn check_inputs(alg: ContentAlgorithm, iv: &[u8], key: &[u8]) -> Result<(), CryptoError> {
    if key.len() != alg.key_length() {
        return Err(CryptoError::InvalidKeyLength {
            expected: alg.key_length(),
            got: key.len(),
        });
    }
    if iv.len() != alg.iv_length() {
        return Err(CryptoError::InvalidIvLength {
            expected: alg.iv_length(),
            got: iv.len(),
        });
    }
    Ok(())
}

/// Encrypt `plaintext`, returning `ciphertext || tag`.
pub fn encrypt(
    alg: ContentAlgorithm,
    plaintext: &[u8],
    iv: &[u8],
    aad: Option<&[u8]>,
    key: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    check_inputs(alg, iv, key)?;
    match alg {
        ContentAlgorithm::A128Gcm => {
            let cipher = Aes128Gcm::new_from_slice(key)
                .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
            let nonce = Nonce::from_slice(iv);
            match aad {
                Some(aad) => cipher.encrypt(
                    nonce,
                    Payload {
                        msg: plaintext,
                        aad,
                    },
                ),
                None => cipher.encrypt(nonce, plaintext),
            }
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))
        }
    }
}

/// Decrypt `ciphertext || tag`.
///
/// Every verification failure (wrong key, IV, AAD, or tampered bytes) maps to
/// the same [`CryptoError::AuthenticationFailed`].
pub fn decrypt(
    alg: ContentAlgorithm,
    ciphertext_with_tag: &[u8],
    iv: &[u8],
    aad: Option<&[u8]>,
    key: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    check_inputs(alg, iv, key)?;
    if ciphertext_with_tag.len() < alg.tag_length() {
        return Err(CryptoError::DataTooShort);
    }
    match alg {
        ContentAlgorithm::A128Gcm => {
            let cipher = Aes128Gcm::new_from_slice(key)
                .map_err(|_| CryptoError::AuthenticationFailed)?;
            let nonce = Nonce::from_slice(iv);
            match aad {
                Some(aad) => cipher.decrypt(
                    nonce,
                    Payload {
                        msg: ciphertext_with_tag,
                        aad,
                    },
                ),
                None => cipher.decrypt(nonce, ciphertext_with_tag),
            }
            .map_err(|_| CryptoError::AuthenticationFailed)
        }
    }
}

/// Split an AEAD output into `(ciphertext, tag)`.
pub fn split_tag(
    alg: ContentAlgorithm,
    ciphertext_with_tag: &[u8],
) -> Result<(&[u8], &[u8]), CryptoError> {
    if ciphertext_with_tag.len() < alg.tag_length() {
        return Err(CryptoError::DataTooShort);
    }
    Ok(ciphertext_with_tag.split_at(ciphertext_with_tag.len() - alg.tag_length()))
}

/// Rejoin a detached tag for decryption.
pub fn join_tag(ciphertext: &[u8], tag: &[u8]) -> Vec<u8> {
    let mut joined = Vec::with_capacity(ciphertext.len() + tag.len());
    joined.extend_from_slice(ciphertext);
    joined.extend_from_slice(tag);
    joined
}
