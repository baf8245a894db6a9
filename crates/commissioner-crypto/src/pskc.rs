//! PSKc (Pre-Shared Key for the Commissioner) derivation.
//!
//! Thread derives PSKc from an installer-facing passphrase via a single
//! PBKDF2 pass of 16384 iterations, using AES-128-CMAC (RFC 4615) as the
//! PRF rather than an HMAC, per Thread 1.2.0 §8.4.1.2.2 (OpenThread's
//! `otPbkdf2Cmac`). The salt is `"Thread" || extended_pan_id ||
//! network_name`; the output is the 16-byte PSKc directly — there is no
//! intermediate-key stage.

use aes::Aes128;
use cmac::Cmac;
use pbkdf2::pbkdf2;

use crate::{CryptoError, Result};

const SALT_PREFIX: &[u8] = b"Thread";
const ITERATIONS: u32 = 16384;
const PSKC_LEN: usize = 16;

const MIN_PASSPHRASE_LEN: usize = 6;
const MAX_PASSPHRASE_LEN: usize = 255;
const MAX_NETWORK_NAME_LEN: usize = 16;

/// Derive the 16-byte PSKc from a commissioning passphrase, network name,
/// and extended PAN ID.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidInput`] if `passphrase` is outside
/// `6..=255` bytes or `network_name` exceeds 16 bytes.
pub fn generate(passphrase: &str, network_name: &str, extended_pan_id: &[u8; 8]) -> Result<[u8; 16]> {
    if passphrase.len() < MIN_PASSPHRASE_LEN || passphrase.len() > MAX_PASSPHRASE_LEN {
        return Err(CryptoError::InvalidInput(format!(
            "passphrase must be {MIN_PASSPHRASE_LEN}..={MAX_PASSPHRASE_LEN} bytes, got {}",
            passphrase.len()
        )));
    }
    if network_name.len() > MAX_NETWORK_NAME_LEN {
        return Err(CryptoError::InvalidInput(format!(
            "network name must be at most {MAX_NETWORK_NAME_LEN} bytes, got {}",
            network_name.len()
        )));
    }

    let mut salt = Vec::with_capacity(SALT_PREFIX.len() + 8 + network_name.len());
    salt.extend_from_slice(SALT_PREFIX);
    salt.extend_from_slice(extended_pan_id);
    salt.extend_from_slice(network_name.as_bytes());

    let mut pskc = [0u8; PSKC_LEN];
    pbkdf2::<Cmac<Aes128>>(passphrase.as_bytes(), &salt, ITERATIONS, &mut pskc)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    Ok(pskc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_known_answer_vector() {
        let extended_pan_id = [0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];
        let pskc = generate("12SECRETPASSWORD34", "Test Network", &extended_pan_id)
            .expect("valid inputs");
        assert_eq!(hex::encode(pskc), "c3f59368445a1b6106be420a706d4cc9");
    }

    #[test]
    fn passphrase_too_short_rejected() {
        let err = generate("12S", "Test Network", &[0u8; 8]).expect_err("must reject");
        assert!(matches!(err, CryptoError::InvalidInput(_)));
    }

    #[test]
    fn passphrase_too_long_rejected() {
        let passphrase = "a".repeat(256);
        let err = generate(&passphrase, "Test Network", &[0u8; 8]).expect_err("must reject");
        assert!(matches!(err, CryptoError::InvalidInput(_)));
    }

    #[test]
    fn network_name_too_long_rejected() {
        let err = generate("12SECRETPASSWORD34", "Too Long network name", &[0u8; 8])
            .expect_err("must reject");
        assert!(matches!(err, CryptoError::InvalidInput(_)));
    }

    #[test]
    fn boundary_lengths_are_accepted() {
        let min_passphrase = "a".repeat(MIN_PASSPHRASE_LEN);
        assert!(generate(&min_passphrase, "", &[0u8; 8]).is_ok());
        let max_passphrase = "a".repeat(MAX_PASSPHRASE_LEN);
        let max_name = "a".repeat(MAX_NETWORK_NAME_LEN);
        assert!(generate(&max_passphrase, &max_name, &[0u8; 8]).is_ok());
    }
}
