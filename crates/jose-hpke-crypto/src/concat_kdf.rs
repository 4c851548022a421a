//! Concat KDF (NIST SP 800-56A §5.8.1) as profiled by RFC 7518 §4.6.2.
//!
//! Each round hashes:
//!   round(4 BE) || Z || algID || partyUInfo || partyVInfo || suppPubInfo
//!
//! Where:
//!   algID       = [len:4 BE][alg bytes]
//!   partyUInfo  = [len:4 BE][apu bytes]
//!   partyVInfo  = [len:4 BE][apv bytes]
//!   suppPubInfo = [keydatalen in bits:4 BE]

use sha2::{Digest, Sha256};

use crate::error::CryptoError;
use crate::types::CONCAT_KDF_ROUND_LENGTH;

fn length_prefixed(hasher: &mut Sha256, data: &[u8]) {
    hasher.update((data.len() as u32).to_be_bytes());
    hasher.update(data);
}

/// Derive `key_data_len_bits / 8` bytes from the shared secret `z`.
///
/// Runs `ceil(bytes / 32)` SHA-256 rounds and truncates the concatenation.
pub fn concat_kdf(
    z: &[u8],
    alg: &str,
    apu: &[u8],
    apv: &[u8],
    key_data_len_bits: u32,
) -> Result<Vec<u8>, CryptoError> {
    if key_data_len_bits == 0 || key_data_len_bits % 8 != 0 {
        return Err(CryptoError::InvalidKdfLength(key_data_len_bits));
    }
    let key_len = (key_data_len_bits / 8) as usize;
    let rounds = key_len.div_ceil(CONCAT_KDF_ROUND_LENGTH);

    let mut output = Vec::with_capacity(rounds * CONCAT_KDF_ROUND_LENGTH);
    for round in 1..=rounds as u32 {
        let mut hasher = Sha256::new();
        hasher.update(round.to_be_bytes());
        hasher.update(z);
        length_prefixed(&mut hasher, alg.as_bytes());
        length_prefixed(&mut hasher, apu);
        length_prefixed(&mut hasher, apv);
        hasher.update(key_data_len_bits.to_be_bytes());
        output.extend_from_slice(&hasher.finalize());
    }
    output.truncate(key_len);
    Ok(output)
}
