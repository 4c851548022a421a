//! Closed set of key management algorithms.
//!
//! Resolution from the JWK `alg` string is total: every identifier maps to
//! a [`KeyManagement`] variant or to [`JweError::UnsupportedAlgorithm`].

use std::fmt;

use jose_hpke_crypto::KeyWrapAlgorithm;

use crate::error::JweError;
use crate::jwk::Curve;

/// DHKEM(P-256, HKDF-SHA256), HKDF-SHA256, AES-128-GCM.
pub const ALG_HPKE_P256_SHA256_A128GCM: &str = "HPKE-Base-P256-SHA256-AES128GCM";
/// DHKEM(P-384, HKDF-SHA384), HKDF-SHA384, AES-128-GCM.
pub const ALG_HPKE_P384_SHA384_A128GCM: &str = "HPKE-Base-P384-SHA384-AES128GCM";
/// ECDH-ES key agreement with AES-128 key wrap (RFC 7518 §4.6).
pub const ALG_ECDH_ES_A128KW: &str = "ECDH-ES+A128KW";

/// HPKE ciphersuites (RFC 9180, Base mode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ciphersuite {
    P256Sha256Aes128Gcm,
    P384Sha384Aes128Gcm,
}

impl Ciphersuite {
    pub fn alg(&self) -> &'static str {
        match self {
            Self::P256Sha256Aes128Gcm => ALG_HPKE_P256_SHA256_A128GCM,
            Self::P384Sha384Aes128Gcm => ALG_HPKE_P384_SHA384_A128GCM,
        }
    }

    pub fn curve(&self) -> Curve {
        match self {
            Self::P256Sha256Aes128Gcm => Curve::P256,
            Self::P384Sha384Aes128Gcm => Curve::P384,
        }
    }
}

/// How the content encryption key reaches one recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyManagement {
    /// CEK sealed under an HPKE sender context.
    Hpke(Ciphersuite),
    /// CEK wrapped under a key derived from ECDH with a fresh ephemeral key.
    EcdhEsKeyWrap(KeyWrapAlgorithm),
}

impl KeyManagement {
    pub fn from_alg(alg: &str) -> Result<Self, JweError> {
        match alg {
            ALG_HPKE_P256_SHA256_A128GCM => Ok(Self::Hpke(Ciphersuite::P256Sha256Aes128Gcm)),
            ALG_HPKE_P384_SHA384_A128GCM => Ok(Self::Hpke(Ciphersuite::P384Sha384Aes128Gcm)),
            ALG_ECDH_ES_A128KW => Ok(Self::EcdhEsKeyWrap(KeyWrapAlgorithm::A128Kw)),
            other => Err(JweError::UnsupportedAlgorithm(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hpke(suite) => suite.alg(),
            Self::EcdhEsKeyWrap(KeyWrapAlgorithm::A128Kw) => ALG_ECDH_ES_A128KW,
        }
    }

    /// Curve the recipient's key must be on.
    pub fn curve(&self) -> Curve {
        match self {
            Self::Hpke(suite) => suite.curve(),
            Self::EcdhEsKeyWrap(_) => Curve::P256,
        }
    }
}

impl fmt::Display for KeyManagement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
