use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Invalid key length: expected {expected} bytes, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("Invalid IV length: expected {expected} bytes, got {got}")]
    InvalidIvLength { expected: usize, got: usize },

    #[error("Invalid Concat KDF output length: {0} bits")]
    InvalidKdfLength(u32),

    #[error("Encrypted data too short")]
    DataTooShort,

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Tag verification failed. Carries no detail.
    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("AES-KW wrap failed: {0}")]
    WrapFailed(String),

    #[error("AES-KW unwrap integrity check failed")]
    UnwrapIntegrityCheckFailed,

    #[error("AES-KW unwrap failed: {0}")]
    UnwrapFailed(String),

    #[error("Base64url decode error in {field}: {reason}")]
    Base64Decode { field: &'static str, reason: String },

    #[error("Random number generation failed: {0}")]
    RngFailed(String),
}
