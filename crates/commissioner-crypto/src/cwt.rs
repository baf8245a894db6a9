//! CWT (CBOR Web Token, RFC 8392) claim constants and (de)serialization.
//!
//! Claim key integers are taken directly from the original commissioner's
//! `cwt.hpp`: `iss`/`aud`/`exp` use the standard RFC 8392 registry values,
//! while `grant_type`/`req_aud`/`req_cnf`/`client_id` are the ACE-OAuth
//! (RFC 9200) extension claims the COM_TOK request and response carry.

use ciborium::value::Value;

use crate::cbor;
use crate::cose_key::CoseKey;
use crate::{CryptoError, Result};

pub const CLAIM_ISS: i64 = 1;
pub const CLAIM_AUD: i64 = 3;
pub const CLAIM_EXP: i64 = 4;
pub const CLAIM_CNF: i64 = 8;
pub const CLAIM_CLIENT_ID: i64 = 24;
pub const CLAIM_GRANT_TYPE: i64 = 33;
pub const CLAIM_REQ_AUD: i64 = 3;
pub const CLAIM_REQ_CNF: i64 = 12;

pub const COSE_KEY_LABEL: i64 = 1;

/// `grant_type` value for the client-credentials flow COM_TOK uses.
pub const GRANT_TYPE_CLIENT_CREDENTIALS: i64 = 2;

/// The claims carried by an issued COM_TOK (the COSE_Sign1 payload the
/// registrar returns).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenClaims {
    pub iss: Option<String>,
    pub aud: Option<String>,
    pub exp: Option<i64>,
    /// `cnf.COSE_Key`: the commissioner's public key as bound into the
    /// token by the registrar, complete with the `kid` that subsequent
    /// signed messages must carry (spec §3/§4.5 "Storage").
    pub cnf: Option<CoseKey>,
}

impl TokenClaims {
    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        let mut entries = Vec::new();
        if let Some(iss) = &self.iss {
            entries.push((CLAIM_ISS, Value::Text(iss.clone())));
        }
        if let Some(aud) = &self.aud {
            entries.push((CLAIM_AUD, Value::Text(aud.clone())));
        }
        if let Some(exp) = self.exp {
            entries.push((CLAIM_EXP, Value::Integer(exp.into())));
        }
        if let Some(cnf) = &self.cnf {
            let cose_key = Value::Map(vec![(Value::Integer(COSE_KEY_LABEL.into()), cnf.to_value())]);
            entries.push((CLAIM_CNF, cose_key));
        }
        cbor::to_vec(&cbor::canonical_map(entries))
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        let value = cbor::from_slice(bytes)?;
        let iss = cbor::map_get(&value, CLAIM_ISS)
            .and_then(Value::as_text)
            .map(str::to_string);
        let aud = cbor::map_get(&value, CLAIM_AUD)
            .and_then(Value::as_text)
            .map(str::to_string);
        let exp = cbor::map_get(&value, CLAIM_EXP)
            .and_then(Value::as_integer)
            .and_then(|i| i128::from(i).try_into().ok());
        let cnf = cbor::map_get(&value, CLAIM_CNF)
            .and_then(|cnf| cbor::map_get(cnf, COSE_KEY_LABEL))
            .map(CoseKey::from_value)
            .transpose()?;

        Ok(Self { iss, aud, exp, cnf })
    }
}

/// The claims sent in a COM_TOK request body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenRequestClaims {
    pub client_id: String,
    pub req_aud: String,
    /// Our own public key, to be echoed back as the issued token's
    /// `cnf.COSE_Key`.
    pub req_cnf: CoseKey,
}

impl TokenRequestClaims {
    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        let cose_key = Value::Map(vec![(Value::Integer(COSE_KEY_LABEL.into()), self.req_cnf.to_value())]);
        let entries = vec![
            (CLAIM_GRANT_TYPE, Value::Integer(GRANT_TYPE_CLIENT_CREDENTIALS.into())),
            (CLAIM_CLIENT_ID, Value::Text(self.client_id.clone())),
            (CLAIM_REQ_AUD, Value::Text(self.req_aud.clone())),
            (CLAIM_REQ_CNF, cose_key),
        ];
        cbor::to_vec(&cbor::canonical_map(entries))
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        let value = cbor::from_slice(bytes)?;
        let client_id = cbor::map_get(&value, CLAIM_CLIENT_ID)
            .and_then(Value::as_text)
            .ok_or_else(|| CryptoError::Cbor("missing client_id claim".to_string()))?
            .to_string();
        let req_aud = cbor::map_get(&value, CLAIM_REQ_AUD)
            .and_then(Value::as_text)
            .ok_or_else(|| CryptoError::Cbor("missing req_aud claim".to_string()))?
            .to_string();
        let req_cnf = cbor::map_get(&value, CLAIM_REQ_CNF)
            .and_then(|cnf| cbor::map_get(cnf, COSE_KEY_LABEL))
            .ok_or_else(|| CryptoError::Cbor("missing req_cnf claim".to_string()))
            .and_then(CoseKey::from_value)?;

        Ok(Self {
            client_id,
            req_aud,
            req_cnf,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cose_key::Curve;

    fn sample_cose_key() -> CoseKey {
        CoseKey {
            crv: Curve::P256,
            x: vec![0x01; 32],
            y: vec![0x02; 32],
            kid: b"OT-Commissioner".to_vec(),
        }
    }

    #[test]
    fn token_claims_roundtrip() {
        let claims = TokenClaims {
            iss: Some("registrar.example.com".to_string()),
            aud: Some("Thread".to_string()),
            exp: Some(1_900_000_000),
            cnf: Some(sample_cose_key()),
        };
        let encoded = claims.to_cbor().expect("encode");
        let decoded = TokenClaims::from_cbor(&encoded).expect("decode");
        assert_eq!(claims, decoded);
        assert_eq!(decoded.cnf.expect("cnf present").kid, b"OT-Commissioner");
    }

    #[test]
    fn token_request_claims_roundtrip() {
        let claims = TokenRequestClaims {
            client_id: "OT-Commissioner".to_string(),
            req_aud: "registrar.example.com".to_string(),
            req_cnf: sample_cose_key(),
        };
        let encoded = claims.to_cbor().expect("encode");
        let decoded = TokenRequestClaims::from_cbor(&encoded).expect("decode");
        assert_eq!(claims, decoded);
    }

    #[test]
    fn token_request_missing_claim_is_rejected() {
        let value = cbor::canonical_map(vec![(CLAIM_CLIENT_ID, Value::Text("x".to_string()))]);
        let encoded = cbor::to_vec(&value).expect("encode");
        assert!(TokenRequestClaims::from_cbor(&encoded).is_err());
    }
}
