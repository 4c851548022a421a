//! AES key wrap (RFC 3394) with the default integrity check value
//! `A6A6A6A6A6A6A6A6`.
//!
//! Wrapped output is always the input length plus 8 bytes.

use std::fmt;

use aes_kw::KekAes128;

use crate::error::CryptoError;
use crate::types::{AES_128_KEY_LENGTH, AES_KW_OVERHEAD, ALG_A128KW};

/// Key wrap algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyWrapAlgorithm {
    A128Kw,
}

impl KeyWrapAlgorithm {
    pub fn from_alg(alg: &str) -> Result<Self, CryptoError> {
        match alg {
            ALG_A128KW => Ok(Self::A128Kw),
            other => Err(CryptoError::UnsupportedAlgorithm(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A128Kw => ALG_A128KW,
        }
    }

    /// Length of the key-encryption key in bytes.
    pub fn kek_length(&self) -> usize {
        match self {
            Self::A128Kw => AES_128_KEY_LENGTH,
        }
    }
}

impl fmt::Display for KeyWrapAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn kek_for(alg: KeyWrapAlgorithm, kek: &[u8]) -> Result<KekAes128, CryptoError> {
    match alg {
        KeyWrapAlgorithm::A128Kw => {
            let kek_array: [u8; AES_128_KEY_LENGTH] =
                kek.try_into().map_err(|_| CryptoError::InvalidKeyLength {
                    expected: AES_128_KEY_LENGTH,
                    got: kek.len(),
                })?;
            Ok(KekAes128::from(kek_array))
        }
    }
}

/// Wrap `key` under `kek`.
///
/// `key` must be a non-empty multiple of 8 bytes, at least 16 bytes long.
pub fn wrap(alg: KeyWrapAlgorithm, kek: &[u8], key: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let kek = kek_for(alg, kek)?;
    let mut wrapped = vec![0u8; key.len() + AES_KW_OVERHEAD];
    kek.wrap(key, &mut wrapped)
        .map_err(|e| CryptoError::WrapFailed(format!("{:?}", e)))?;
    Ok(wrapped)
}

/// Unwrap `wrapped` under `kek`.
///
/// A mismatched integrity check value (wrong KEK or corrupted input) yields
/// [`CryptoError::UnwrapIntegrityCheckFailed`].
pub fn unwrap(alg: KeyWrapAlgorithm, kek: &[u8], wrapped: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if wrapped.len() < 3 * AES_KW_OVERHEAD || wrapped.len() % 8 != 0 {
        return Err(CryptoError::UnwrapFailed(format!(
            "invalid wrapped key length {}",
            wrapped.len()
        )));
    }
    let kek = kek_for(alg, kek)?;
    let mut key = vec![0u8; wrapped.len() - AES_KW_OVERHEAD];
    kek.unwrap(wrapped, &mut key).map_err(|e| match e {
        aes_kw::Error::IntegrityCheckFailed => CryptoError::UnwrapIntegrityCheckFailed,
        other => CryptoError::UnwrapFailed(format!("{:?}", other)),
    })?;
    Ok(key)
}
