use jose_hpke_crypto::CryptoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JweError {
    /// Declared `alg`/`enc` is not one this crate implements. Raised before
    /// any key material is imported.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Structural or encoding violation, detected before any cryptography.
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("Invalid key material: {0}")]
    InvalidKeyMaterial(String),

    #[error("Key decapsulation failed")]
    DecapsulationFailed,

    #[error("Key unwrap integrity check failed")]
    UnwrapIntegrityCheckFailed,

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("No supplied private key matches a recipient of this envelope")]
    NoMatchingRecipient,

    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl JweError {
    /// True for failures raised after structural validation while recovering
    /// the key or the content.
    ///
    /// Anything externally observable should collapse these into one
    /// "decryption failed" signal; see [`JweError::external_message`].
    pub fn is_decryption_failure(&self) -> bool {
        matches!(
            self,
            Self::DecapsulationFailed | Self::UnwrapIntegrityCheckFailed | Self::AuthenticationFailed
        )
    }

    /// Message safe to surface to a remote party.
    pub fn external_message(&self) -> String {
        if self.is_decryption_failure() {
            "decryption failed".to_string()
        } else {
            self.to_string()
        }
    }
}

impl From<CryptoError> for JweError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::UnsupportedAlgorithm(alg) => Self::UnsupportedAlgorithm(alg),
            CryptoError::AuthenticationFailed => Self::AuthenticationFailed,
            CryptoError::UnwrapIntegrityCheckFailed => Self::UnwrapIntegrityCheckFailed,
            CryptoError::Base64Decode { .. }
            | CryptoError::InvalidIvLength { .. }
            | CryptoError::DataTooShort
            | CryptoError::UnwrapFailed(_) => Self::MalformedEnvelope(err.to_string()),
            CryptoError::InvalidKeyLength { .. } => Self::InvalidKeyMaterial(err.to_string()),
            CryptoError::InvalidKdfLength(_)
            | CryptoError::EncryptionFailed(_)
            | CryptoError::WrapFailed(_)
            | CryptoError::RngFailed(_) => Self::Encryption(err.to_string()),
        }
    }
}
