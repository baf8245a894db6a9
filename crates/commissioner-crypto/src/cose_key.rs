//! COSE_Key (RFC 8152 §13) representation for COM_TOK's `cnf`/`req_cnf`
//! claims.
//!
//! The original commissioner's `cose.cpp` only ever round-trips the raw
//! SEC1 point through `cnf`; this restates that as the structured map spec
//! §3/§6 calls for (`kty=EC2`, `crv`, `x`, `y`, `kid`) so a `kid` actually
//! travels with the key instead of being re-derived from the commissioner
//! id every time a message is signed.

use ciborium::value::Value;

use crate::ecdsa::{Algorithm, VerifyingKey};
use crate::{CryptoError, Result};

/// COSE elliptic curve identifiers (RFC 8152 §13.1 registry) for the three
/// curves CCM's COM_TOK exchange supports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Curve {
    P256,
    P384,
    P521,
}

impl Curve {
    pub fn cose_value(self) -> i64 {
        match self {
            Curve::P256 => 1,
            Curve::P384 => 2,
            Curve::P521 => 3,
        }
    }

    pub fn from_cose_value(value: i64) -> Result<Self> {
        match value {
            1 => Ok(Curve::P256),
            2 => Ok(Curve::P384),
            3 => Ok(Curve::P521),
            other => Err(CryptoError::Cose(format!("unsupported COSE curve {other}"))),
        }
    }

    fn from_algorithm(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Es256 => Curve::P256,
            Algorithm::Es384 => Curve::P384,
            Algorithm::Es512 => Curve::P521,
        }
    }

    fn to_algorithm(self) -> Algorithm {
        match self {
            Curve::P256 => Algorithm::Es256,
            Curve::P384 => Algorithm::Es384,
            Curve::P521 => Algorithm::Es512,
        }
    }
}

const KTY_EC2: i64 = 2;
const LABEL_KTY: i64 = 1;
const LABEL_CRV: i64 = -1;
const LABEL_X: i64 = -2;
const LABEL_Y: i64 = -3;
const LABEL_KID: i64 = 2;

/// An EC2 COSE_Key: `{1: kty=EC2, -1: crv, -2: x, -3: y, 2: kid}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoseKey {
    pub crv: Curve,
    pub x: Vec<u8>,
    pub y: Vec<u8>,
    pub kid: Vec<u8>,
}

impl CoseKey {
    /// Build a COSE_Key from a verifying key and a `kid`, splitting the
    /// uncompressed SEC1 point (`0x04 || x || y`) into its two halves.
    pub fn from_verifying_key(verifying_key: &VerifyingKey, kid: Vec<u8>) -> Self {
        let point = verifying_key.to_sec1_bytes();
        let field_len = (point.len() - 1) / 2;
        let x = point[1..1 + field_len].to_vec();
        let y = point[1 + field_len..].to_vec();
        Self {
            crv: Curve::from_algorithm(verifying_key.algorithm()),
            x,
            y,
            kid,
        }
    }

    /// Reconstruct the verifying key this COSE_Key describes.
    pub fn to_verifying_key(&self) -> Result<VerifyingKey> {
        let mut point = Vec::with_capacity(1 + self.x.len() + self.y.len());
        point.push(0x04);
        point.extend_from_slice(&self.x);
        point.extend_from_slice(&self.y);
        VerifyingKey::from_sec1_bytes(self.crv.to_algorithm(), &point)
    }

    pub fn to_value(&self) -> Value {
        let entries = vec![
            (LABEL_KTY, Value::Integer(KTY_EC2.into())),
            (LABEL_CRV, Value::Integer(self.crv.cose_value().into())),
            (LABEL_X, Value::Bytes(self.x.clone())),
            (LABEL_Y, Value::Bytes(self.y.clone())),
            (LABEL_KID, Value::Bytes(self.kid.clone())),
        ];
        crate::cbor::canonical_map(entries)
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let kty = crate::cbor::map_get(value, LABEL_KTY)
            .and_then(Value::as_integer)
            .ok_or_else(|| CryptoError::Cose("COSE_Key missing kty".to_string()))?;
        if kty != KTY_EC2.into() {
            return Err(CryptoError::Cose("COSE_Key kty is not EC2".to_string()));
        }
        let crv = crate::cbor::map_get(value, LABEL_CRV)
            .and_then(Value::as_integer)
            .and_then(|i| i128::from(i).try_into().ok())
            .ok_or_else(|| CryptoError::Cose("COSE_Key missing crv".to_string()))?;
        let crv = Curve::from_cose_value(crv)?;
        let x = crate::cbor::map_get(value, LABEL_X)
            .and_then(Value::as_bytes)
            .cloned()
            .ok_or_else(|| CryptoError::Cose("COSE_Key missing x".to_string()))?;
        let y = crate::cbor::map_get(value, LABEL_Y)
            .and_then(Value::as_bytes)
            .cloned()
            .ok_or_else(|| CryptoError::Cose("COSE_Key missing y".to_string()))?;
        let kid = crate::cbor::map_get(value, LABEL_KID)
            .and_then(Value::as_bytes)
            .cloned()
            .unwrap_or_default();
        Ok(Self { crv, x, y, kid })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecdsa::SigningKey;

    #[test]
    fn roundtrips_through_cbor() {
        let key = SigningKey::generate(Algorithm::Es256);
        let cose_key = CoseKey::from_verifying_key(&key.verifying_key(), b"kid-123".to_vec());
        let decoded = CoseKey::from_value(&cose_key.to_value()).expect("decode");
        assert_eq!(cose_key, decoded);
    }

    #[test]
    fn recovers_the_original_verifying_key() {
        for algorithm in [Algorithm::Es256, Algorithm::Es384, Algorithm::Es512] {
            let key = SigningKey::generate(algorithm);
            let verifying_key = key.verifying_key();
            let cose_key = CoseKey::from_verifying_key(&verifying_key, b"kid".to_vec());
            let recovered = cose_key.to_verifying_key().expect("recover key");
            assert_eq!(recovered.to_sec1_bytes(), verifying_key.to_sec1_bytes());
        }
    }

    #[test]
    fn rejects_non_ec2_kty() {
        let entries = vec![(LABEL_KTY, Value::Integer(1.into()))];
        let value = crate::cbor::canonical_map(entries);
        assert!(CoseKey::from_value(&value).is_err());
    }
}
