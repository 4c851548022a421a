//! Multi-recipient envelope encryption with HPKE key encapsulation.
//!
//! This crate provides:
//! - Key encryption: one AES-GCM content key delivered to N recipients, each
//!   by HPKE (P-256 or P-384) or by ECDH-ES+A128KW
//! - Integrated encryption: HPKE sealing the plaintext to one recipient
//! - JWE compact and general JSON serialization of the resulting envelope
//! - EC JWK import, key generation and RFC 7638 thumbprints
//!
//! Symmetric primitives live in `jose-hpke-crypto`.

pub mod alg;
mod ecdh_es;
mod encapsulation;
pub mod envelope;
mod error;
pub mod header;
pub mod integrated;
pub mod jwk;
mod key_encryption;
pub mod keys;
mod options;
mod thumbprint;

pub use alg::{
    Ciphersuite, KeyManagement, ALG_ECDH_ES_A128KW, ALG_HPKE_P256_SHA256_A128GCM,
    ALG_HPKE_P384_SHA384_A128GCM,
};
pub use ecdh_es::{derive_key, unwrap_for_recipient, wrap_for_recipient};
pub use encapsulation::{
    create_recipient_context, create_sender_context, generate_key_pair, RecipientContext,
    SenderContext,
};
pub use envelope::{Envelope, Recipient, RecipientHeader};
pub use error::JweError;
pub use header::{HeaderParams, ProtectedHeader};
pub use jose_hpke_crypto::{CryptoError, ENC_A128GCM};
pub use jwk::{private_key_from, public_key_from, Curve, EcPublicJwk, Jwk, Jwks};
pub use key_encryption::{decrypt, encrypt, Decryption};
pub use options::{EncryptOptions, Serialization};
pub use thumbprint::{compute_jwk_thumbprint, thumbprint_uri, THUMBPRINT_URI_PREFIX};
