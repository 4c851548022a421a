//! Symmetric primitives for JWE envelopes: AES-GCM content encryption,
//! Concat KDF, AES key wrap, and base64url helpers.

pub mod base64url;
pub mod concat_kdf;
pub mod content;
pub mod error;
pub mod key_wrap;
pub mod types;

pub use base64url::{base64url_decode, base64url_encode, decode_field};
pub use concat_kdf::concat_kdf;
pub use content::{generate_iv, generate_key, join_tag, split_tag, Cek, ContentAlgorithm};
pub use error::CryptoError;
pub use key_wrap::KeyWrapAlgorithm;
pub use types::{
    AES_128_KEY_LENGTH, AES_GCM_IV_LENGTH, AES_GCM_TAG_LENGTH, AES_KW_OVERHEAD, ALG_A128KW,
    ENC_A128GCM,
};
