/// AES-GCM IV length in bytes (96 bits per NIST recommendation).
pub const AES_GCM_IV_LENGTH: usize = 12;

/// AES-GCM tag length in bytes (128 bits).
pub const AES_GCM_TAG_LENGTH: usize = 16;

/// AES-128 key length in bytes.
pub const AES_128_KEY_LENGTH: usize = 16;

/// RFC 3394 adds one 64-bit integrity block to the wrapped key.
pub const AES_KW_OVERHEAD: usize = 8;

/// Output size of one Concat KDF round (SHA-256).
pub const CONCAT_KDF_ROUND_LENGTH: usize = 32;

/// Content encryption algorithm identifier for AES-128-GCM (RFC 7518 §5.3).
pub const ENC_A128GCM: &str = "A128GCM";

/// Key wrap algorithm identifier for AES-128 key wrap (RFC 7518 §4.4).
pub const ALG_A128KW: &str = "A128KW";
