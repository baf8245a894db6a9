//! ECDSA signing and verification over the three NIST curves CCM's
//! COM_TOK exchange supports.
//!
//! COSE names these algorithms ES256/ES384/ES512 (RFC 8152 §8.1) — note
//! the P-521 curve is paired with the "ES512" algorithm identifier, not
//! "ES521"; that naming is RFC 8152's, not a typo here.

use ecdsa::signature::{Signer, Verifier};
use elliptic_curve::sec1::ToEncodedPoint;
use zeroize::Zeroizing;

use crate::{CryptoError, Result};

/// COSE algorithm identifier, doubling as the curve selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Algorithm {
    Es256,
    Es384,
    Es512,
}

impl Algorithm {
    /// The RFC 8152 COSE algorithm integer for this curve.
    pub fn cose_value(self) -> i64 {
        match self {
            Algorithm::Es256 => -7,
            Algorithm::Es384 => -35,
            Algorithm::Es512 => -36,
        }
    }

    pub fn from_cose_value(value: i64) -> Result<Self> {
        match value {
            -7 => Ok(Algorithm::Es256),
            -35 => Ok(Algorithm::Es384),
            -36 => Ok(Algorithm::Es512),
            other => Err(CryptoError::Cose(format!(
                "unsupported COSE algorithm {other}"
            ))),
        }
    }
}

/// An ECDSA private key over one of the three supported curves.
///
/// Wrapped in [`Zeroizing`] so the SEC1 scalar is wiped on drop, matching
/// how key material is handled throughout this crate.
pub enum SigningKey {
    P256(p256::ecdsa::SigningKey),
    P384(p384::ecdsa::SigningKey),
    P521(p521::ecdsa::SigningKey),
}

/// The public counterpart of a [`SigningKey`].
#[derive(Clone)]
pub enum VerifyingKey {
    P256(p256::ecdsa::VerifyingKey),
    P384(p384::ecdsa::VerifyingKey),
    P521(p521::ecdsa::VerifyingKey),
}

/// A fixed-size `r || s` ECDSA signature.
pub enum Signature {
    P256(p256::ecdsa::Signature),
    P384(p384::ecdsa::Signature),
    P521(p521::ecdsa::Signature),
}

impl SigningKey {
    /// Generate a new random key for the given curve.
    pub fn generate(algorithm: Algorithm) -> Self {
        let mut rng = rand::rngs::OsRng;
        match algorithm {
            Algorithm::Es256 => SigningKey::P256(p256::ecdsa::SigningKey::random(&mut rng)),
            Algorithm::Es384 => SigningKey::P384(p384::ecdsa::SigningKey::random(&mut rng)),
            Algorithm::Es512 => SigningKey::P521(p521::ecdsa::SigningKey::random(&mut rng)),
        }
    }

    /// Parse a private key from its SEC1 (raw scalar) encoding.
    pub fn from_sec1_bytes(algorithm: Algorithm, bytes: &[u8]) -> Result<Self> {
        let bytes = Zeroizing::new(bytes.to_vec());
        match algorithm {
            Algorithm::Es256 => p256::ecdsa::SigningKey::from_slice(&bytes)
                .map(SigningKey::P256)
                .map_err(|e| CryptoError::InvalidKey(e.to_string())),
            Algorithm::Es384 => p384::ecdsa::SigningKey::from_slice(&bytes)
                .map(SigningKey::P384)
                .map_err(|e| CryptoError::InvalidKey(e.to_string())),
            Algorithm::Es512 => p521::ecdsa::SigningKey::from_slice(&bytes)
                .map(SigningKey::P521)
                .map_err(|e| CryptoError::InvalidKey(e.to_string())),
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        match self {
            SigningKey::P256(_) => Algorithm::Es256,
            SigningKey::P384(_) => Algorithm::Es384,
            SigningKey::P521(_) => Algorithm::Es512,
        }
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        match self {
            SigningKey::P256(k) => VerifyingKey::P256(*k.verifying_key()),
            SigningKey::P384(k) => VerifyingKey::P384(*k.verifying_key()),
            SigningKey::P521(k) => VerifyingKey::P521(*k.verifying_key()),
        }
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        match self {
            SigningKey::P256(k) => Signature::P256(k.sign(message)),
            SigningKey::P384(k) => Signature::P384(k.sign(message)),
            SigningKey::P521(k) => Signature::P521(k.sign(message)),
        }
    }
}

impl VerifyingKey {
    /// Parse a public key from its SEC1 (compressed or uncompressed) point
    /// encoding.
    pub fn from_sec1_bytes(algorithm: Algorithm, bytes: &[u8]) -> Result<Self> {
        match algorithm {
            Algorithm::Es256 => p256::ecdsa::VerifyingKey::from_sec1_bytes(bytes)
                .map(VerifyingKey::P256)
                .map_err(|e| CryptoError::InvalidKey(e.to_string())),
            Algorithm::Es384 => p384::ecdsa::VerifyingKey::from_sec1_bytes(bytes)
                .map(VerifyingKey::P384)
                .map_err(|e| CryptoError::InvalidKey(e.to_string())),
            Algorithm::Es512 => p521::ecdsa::VerifyingKey::from_sec1_bytes(bytes)
                .map(VerifyingKey::P521)
                .map_err(|e| CryptoError::InvalidKey(e.to_string())),
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        match self {
            VerifyingKey::P256(_) => Algorithm::Es256,
            VerifyingKey::P384(_) => Algorithm::Es384,
            VerifyingKey::P521(_) => Algorithm::Es512,
        }
    }

    pub fn to_sec1_bytes(&self) -> Vec<u8> {
        match self {
            VerifyingKey::P256(k) => k.to_encoded_point(false).as_bytes().to_vec(),
            VerifyingKey::P384(k) => k.to_encoded_point(false).as_bytes().to_vec(),
            VerifyingKey::P521(k) => k.to_encoded_point(false).as_bytes().to_vec(),
        }
    }

    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<()> {
        match (self, signature) {
            (VerifyingKey::P256(k), Signature::P256(s)) => k
                .verify(message, s)
                .map_err(|_| CryptoError::SignatureVerification),
            (VerifyingKey::P384(k), Signature::P384(s)) => k
                .verify(message, s)
                .map_err(|_| CryptoError::SignatureVerification),
            (VerifyingKey::P521(k), Signature::P521(s)) => k
                .verify(message, s)
                .map_err(|_| CryptoError::SignatureVerification),
            _ => Err(CryptoError::InvalidKey(
                "signature algorithm does not match key algorithm".to_string(),
            )),
        }
    }
}

impl Signature {
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Signature::P256(s) => s.to_bytes().to_vec(),
            Signature::P384(s) => s.to_bytes().to_vec(),
            Signature::P521(s) => s.to_bytes().to_vec(),
        }
    }

    pub fn from_bytes(algorithm: Algorithm, bytes: &[u8]) -> Result<Self> {
        match algorithm {
            Algorithm::Es256 => p256::ecdsa::Signature::from_slice(bytes)
                .map(Signature::P256)
                .map_err(|e| CryptoError::InvalidKey(e.to_string())),
            Algorithm::Es384 => p384::ecdsa::Signature::from_slice(bytes)
                .map(Signature::P384)
                .map_err(|e| CryptoError::InvalidKey(e.to_string())),
            Algorithm::Es512 => p521::ecdsa::Signature::from_slice(bytes)
                .map(Signature::P521)
                .map_err(|e| CryptoError::InvalidKey(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_verify_roundtrip_p256() {
        let key = SigningKey::generate(Algorithm::Es256);
        let sig = key.sign(b"MGMT_ACTIVE_SET.req");
        assert!(key.verifying_key().verify(b"MGMT_ACTIVE_SET.req", &sig).is_ok());
    }

    #[test]
    fn sign_verify_roundtrip_p384() {
        let key = SigningKey::generate(Algorithm::Es384);
        let sig = key.sign(b"petition");
        assert!(key.verifying_key().verify(b"petition", &sig).is_ok());
    }

    #[test]
    fn sign_verify_roundtrip_p521() {
        let key = SigningKey::generate(Algorithm::Es512);
        let sig = key.sign(b"token request");
        assert!(key.verifying_key().verify(b"token request", &sig).is_ok());
    }

    #[test]
    fn tampered_message_fails_verification() {
        let key = SigningKey::generate(Algorithm::Es256);
        let sig = key.sign(b"original");
        assert!(key.verifying_key().verify(b"tampered", &sig).is_err());
    }

    #[test]
    fn cose_algorithm_values_match_rfc_8152() {
        assert_eq!(Algorithm::Es256.cose_value(), -7);
        assert_eq!(Algorithm::Es384.cose_value(), -35);
        assert_eq!(Algorithm::Es512.cose_value(), -36);
        assert_eq!(Algorithm::from_cose_value(-36).expect("known"), Algorithm::Es512);
    }
}
