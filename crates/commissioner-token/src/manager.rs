//! `TokenManager`: COM_TOK lifecycle and message signing.
//!
//! Ported from the original's `TokenManager` class:
//!
//! - `request_token` / `set_token` correspond to `RequestToken`/`SetToken`,
//!   including the original's rollback-on-failure behavior: the previous
//!   token and claims are kept until the new one validates, and restored on
//!   any validation failure.
//! - `sign_message` / `verify_signature` correspond to `SignMessage` plus
//!   `PrepareSigningContent`/`ShouldBeSerialized`'s three-way TLV
//!   canonicalization branch.

use std::net::SocketAddr;
use std::sync::Arc;

use coap_lite::RequestType;
use commissioner_crypto::cose::Sign1;
use commissioner_crypto::cose_key::CoseKey;
use commissioner_crypto::cwt::{TokenClaims, TokenRequestClaims};
use commissioner_crypto::ecdsa::{Algorithm, SigningKey, VerifyingKey};
use commissioner_transport::coap::{CoapEngine, ContentFormat};
use commissioner_transport::dtls::DtlsEndpoint;
use commissioner_types::meshcop::{self, ACTIVE_DATASET_PARAMETERS, PENDING_DATASET_PARAMETERS, SIGNING_EXCLUDED};
use commissioner_types::tlv::{Tlv, TlvSet};
use commissioner_types::uri;

use crate::{Result, TokenError};

/// `kMaxCoseKeyIdLength` in the original: COSE `kid` values this manager
/// generates are truncated to 16 bytes.
const MAX_COSE_KEY_ID_LENGTH: usize = 16;

/// Tracks the commissioner's currently-issued COM_TOK and signs/verifies
/// messages with it.
pub struct TokenManager {
    commissioner_id: String,
    domain_name: String,
    signing_key: SigningKey,
    sequence_number: u32,
    signed_token: Option<Vec<u8>>,
    claims: Option<TokenClaims>,
}

impl TokenManager {
    pub fn new(commissioner_id: String, domain_name: String, signing_key: SigningKey) -> Self {
        Self {
            commissioner_id,
            domain_name,
            signing_key,
            sequence_number: 0,
            signed_token: None,
            claims: None,
        }
    }

    /// Pre-seed an already-issued token (e.g. loaded from the embedding
    /// application's own storage) instead of requesting a fresh one.
    pub fn set_token(&mut self, signed_token: Vec<u8>, registrar_key: &VerifyingKey) -> Result<()> {
        self.install_token(signed_token, registrar_key)
    }

    /// Request a fresh COM_TOK from the domain registrar over a
    /// certificate-authenticated DTLS session, POSTing to the well-known
    /// COM_TOK endpoint.
    pub async fn request_token(
        &mut self,
        registrar_addr: SocketAddr,
        client_cert: webrtc_dtls::crypto::Certificate,
        trust_anchor_der: Vec<u8>,
        registrar_key: &VerifyingKey,
    ) -> Result<()> {
        let endpoint = DtlsEndpoint::connect_cert(registrar_addr, client_cert, trust_anchor_der).await?;
        let (engine, _inbound) = CoapEngine::new(Arc::new(endpoint));

        let request_claims = TokenRequestClaims {
            client_id: self.commissioner_id.clone(),
            req_aud: self.domain_name.clone(),
            req_cnf: CoseKey::from_verifying_key(&self.signing_key.verifying_key(), self.kid()),
        };
        let body = request_claims.to_cbor()?;

        let response = engine
            .request(RequestType::Post, uri::COM_TOKEN_REQUEST, body, Some(ContentFormat::Cwt))
            .await?;

        if response.content_format != Some(ContentFormat::CoseSign1) {
            return Err(TokenError::BadFormat(format!(
                "expected application/cose;cose-type=\"cose-sign1\" response, got {:?}",
                response.content_format
            )));
        }

        self.install_token(response.payload, registrar_key)
    }

    fn install_token(&mut self, signed_token: Vec<u8>, registrar_key: &VerifyingKey) -> Result<()> {
        let old_signed_token = self.signed_token.take();
        let old_claims = self.claims.take();

        let result = self.validate_and_install(&signed_token, registrar_key);

        match result {
            Ok(claims) => {
                self.signed_token = Some(signed_token);
                self.claims = Some(claims);
                self.sequence_number = 0;
                Ok(())
            }
            Err(e) => {
                self.signed_token = old_signed_token;
                self.claims = old_claims;
                Err(e)
            }
        }
    }

    fn validate_and_install(&self, signed_token: &[u8], registrar_key: &VerifyingKey) -> Result<TokenClaims> {
        let sign1 = Sign1::from_bytes(registrar_key.algorithm(), signed_token)
            .map_err(|e| TokenError::BadFormat(e.to_string()))?;
        sign1
            .verify(registrar_key, b"")
            .map_err(|e| TokenError::BadFormat(e.to_string()))?;

        let payload = sign1
            .payload()
            .ok_or_else(|| TokenError::BadFormat("COM_TOK response carried no payload".to_string()))?;
        let claims = TokenClaims::from_cbor(payload)?;

        if claims.aud.as_deref() != Some(self.domain_name.as_str()) {
            return Err(TokenError::Security(format!(
                "token aud {:?} does not match domain name {:?}",
                claims.aud, self.domain_name
            )));
        }

        if let Some(exp) = claims.exp {
            let now = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or(i64::MAX);
            if now >= exp {
                return Err(TokenError::Expired);
            }
        }

        Ok(claims)
    }

    pub fn has_token(&self) -> bool {
        self.signed_token.is_some()
    }

    /// The `kid` to tag signed messages with: the commissioner id truncated
    /// to 16 bytes (`kMaxCoseKeyIdLength` in the original) when building a
    /// token *request*, or whatever `cnf.COSE_Key.kid` the installed token
    /// carries once one has been issued — matching the original's
    /// `TokenManager::GetKeyId`, since the registrar is free to assign a
    /// different `kid` than the one requested.
    fn kid(&self) -> Vec<u8> {
        if let Some(claims) = &self.claims {
            if let Some(cnf) = &claims.cnf {
                if !cnf.kid.is_empty() {
                    return cnf.kid.clone();
                }
            }
        }
        let mut id = self.commissioner_id.as_bytes().to_vec();
        id.truncate(MAX_COSE_KEY_ID_LENGTH);
        id
    }

    /// Sign a CoAP request's MeshCoP TLVs, appending the `CommissionerToken`
    /// and `CommissionerSignature` TLVs that authenticate it under CCM.
    pub fn sign_message(&mut self, uri_path: &str, tlvs: &TlvSet) -> Result<TlvSet> {
        let signed_token = self
            .signed_token
            .as_ref()
            .ok_or(TokenError::NoToken)?
            .clone();

        let content = prepare_signing_content(uri_path, tlvs);
        let sign1 = Sign1::sign(&self.signing_key, &self.kid(), None, &content)
            .map_err(TokenError::Crypto)?;
        let signature = sign1.to_bytes().map_err(TokenError::Crypto)?;

        self.sequence_number += 1;

        let mut out = tlvs.clone();
        out.push(Tlv::new(meshcop::COMMISSIONER_TOKEN, signed_token));
        out.push(Tlv::new(meshcop::COMMISSIONER_SIGNATURE, signature));
        Ok(out)
    }

    /// Verify a signed message's `CommissionerSignature` TLV against the
    /// commissioner's own verifying key (used by a Border Agent /
    /// Leader-side implementation; included here for symmetry and testing).
    pub fn verify_signature(
        uri_path: &str,
        tlvs_without_signature: &TlvSet,
        signature: &[u8],
        commissioner_key: &VerifyingKey,
        algorithm: Algorithm,
    ) -> Result<()> {
        let content = prepare_signing_content(uri_path, tlvs_without_signature);
        let sign1 = Sign1::from_bytes(algorithm, signature).map_err(TokenError::Crypto)?;
        sign1
            .verify(commissioner_key, &content)
            .map_err(TokenError::Crypto)?;
        Ok(())
    }
}

/// Whether `tlv_type` is included in the signing content for `uri_path`,
/// ported from `ShouldBeSerialized`'s three-way branch.
fn should_be_serialized(uri_path: &str, tlv_type: u8) -> bool {
    if uri_path == uri::MGMT_ACTIVE_SET {
        ACTIVE_DATASET_PARAMETERS.contains(&tlv_type)
    } else if uri_path == uri::MGMT_PENDING_SET || uri_path == uri::MGMT_SECURE_PENDING_SET {
        PENDING_DATASET_PARAMETERS.contains(&tlv_type) && tlv_type != meshcop::DELAY_TIMER
    } else {
        !SIGNING_EXCLUDED.contains(&tlv_type)
    }
}

/// Build the canonical signing content: the URI-Path bytes followed by the
/// message's TLVs, sorted by type and filtered by [`should_be_serialized`].
/// Ported from `PrepareSigningContent`.
fn prepare_signing_content(uri_path: &str, tlvs: &TlvSet) -> Vec<u8> {
    let mut content = uri_path.as_bytes().to_vec();
    let filtered = tlvs
        .sorted_by_type()
        .filter(|tlv_type| should_be_serialized(uri_path, tlv_type));
    if let Ok(encoded) = filtered.encode() {
        content.extend_from_slice(&encoded);
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_be_serialized_excludes_token_tlvs_by_default() {
        assert!(!should_be_serialized(uri::KEEP_ALIVE, meshcop::COMMISSIONER_TOKEN));
        assert!(!should_be_serialized(uri::KEEP_ALIVE, meshcop::COMMISSIONER_SIGNATURE));
        assert!(should_be_serialized(uri::KEEP_ALIVE, meshcop::STATE));
    }

    #[test]
    fn should_be_serialized_restricts_active_set_to_dataset_parameters() {
        assert!(should_be_serialized(uri::MGMT_ACTIVE_SET, meshcop::CHANNEL));
        assert!(!should_be_serialized(uri::MGMT_ACTIVE_SET, meshcop::BORDER_AGENT_LOCATOR));
    }

    #[test]
    fn should_be_serialized_excludes_delay_timer_from_pending_set() {
        assert!(should_be_serialized(uri::MGMT_PENDING_SET, meshcop::PENDING_TIMESTAMP));
        assert!(!should_be_serialized(uri::MGMT_PENDING_SET, meshcop::DELAY_TIMER));
    }

    #[test]
    fn prepare_signing_content_is_order_independent() {
        let a = TlvSet::new()
            .with(Tlv::new(meshcop::CHANNEL, vec![0, 0, 0, 15]))
            .with(Tlv::new(meshcop::PAN_ID, vec![0x12, 0x34]));
        let b = TlvSet::new()
            .with(Tlv::new(meshcop::PAN_ID, vec![0x12, 0x34]))
            .with(Tlv::new(meshcop::CHANNEL, vec![0, 0, 0, 15]));
        assert_eq!(
            prepare_signing_content(uri::MGMT_ACTIVE_SET, &a),
            prepare_signing_content(uri::MGMT_ACTIVE_SET, &b)
        );
    }

    #[test]
    fn sign_message_requires_token() {
        let signing_key = SigningKey::generate(Algorithm::Es256);
        let mut manager = TokenManager::new("OT-Commissioner".to_string(), "Thread".to_string(), signing_key);
        let err = manager
            .sign_message(uri::KEEP_ALIVE, &TlvSet::new())
            .expect_err("must fail without a token");
        assert!(matches!(err, TokenError::NoToken));
    }

    #[test]
    fn kid_is_truncated_to_sixteen_bytes_before_a_token_is_installed() {
        let signing_key = SigningKey::generate(Algorithm::Es256);
        let manager = TokenManager::new("a".repeat(40), "Thread".to_string(), signing_key);
        assert_eq!(manager.kid().len(), MAX_COSE_KEY_ID_LENGTH);
    }

    /// Builds a COSE_Sign1-wrapped CWT the way a domain registrar would,
    /// binding `kid` into `cnf.COSE_Key` as spec scenario 5 requires.
    fn build_signed_token(
        registrar_key: &SigningKey,
        aud: &str,
        verifying_key: &commissioner_crypto::ecdsa::VerifyingKey,
        kid: &[u8],
    ) -> Vec<u8> {
        let cose_key = commissioner_crypto::cose_key::CoseKey::from_verifying_key(verifying_key, kid.to_vec());
        let claims = commissioner_crypto::cwt::TokenClaims {
            iss: Some("registrar.example.com".to_string()),
            aud: Some(aud.to_string()),
            exp: Some(1_900_000_000),
            cnf: Some(cose_key),
        };
        let payload = claims.to_cbor().expect("encode claims");
        Sign1::sign(registrar_key, b"registrar", Some(payload), b"")
            .expect("sign token")
            .to_bytes()
            .expect("serialize token")
    }

    #[test]
    fn installing_a_token_adopts_its_cnf_kid_for_signing() {
        let commissioner_key = SigningKey::generate(Algorithm::Es256);
        let registrar_key = SigningKey::generate(Algorithm::Es256);
        let mut manager = TokenManager::new(
            "OT-Commissioner".to_string(),
            "Thread".to_string(),
            commissioner_key,
        );

        let signed_token = build_signed_token(
            &registrar_key,
            "Thread",
            &manager.signing_key.verifying_key(),
            b"registrar-assigned-kid",
        );
        manager
            .set_token(signed_token, &registrar_key.verifying_key())
            .expect("install token");

        assert_eq!(manager.kid(), b"registrar-assigned-kid".to_vec());

        let tlvs = TlvSet::new().with(Tlv::new(meshcop::COMMISSIONER_ID, b"OT-Commissioner".to_vec()));
        let signed = manager.sign_message(uri::KEEP_ALIVE, &tlvs).expect("sign message");
        let signature_tlv = signed
            .iter()
            .find(|tlv| tlv.tlv_type == meshcop::COMMISSIONER_SIGNATURE)
            .expect("signature tlv present");

        let content = prepare_signing_content(uri::KEEP_ALIVE, &tlvs);
        let sign1 = Sign1::from_bytes(Algorithm::Es256, &signature_tlv.value).expect("parse signature");
        sign1
            .verify(&manager.signing_key.verifying_key(), &content)
            .expect("signature self-verifies under the commissioner's own key");
    }

    #[test]
    fn wrong_aud_is_rejected_and_does_not_disturb_a_prior_token() {
        let commissioner_key = SigningKey::generate(Algorithm::Es256);
        let registrar_key = SigningKey::generate(Algorithm::Es256);
        let mut manager = TokenManager::new(
            "OT-Commissioner".to_string(),
            "Thread".to_string(),
            commissioner_key,
        );

        let good_token = build_signed_token(
            &registrar_key,
            "Thread",
            &manager.signing_key.verifying_key(),
            b"first-kid",
        );
        manager
            .set_token(good_token, &registrar_key.verifying_key())
            .expect("install first token");
        assert_eq!(manager.sequence_number, 0);

        let bad_token = build_signed_token(
            &registrar_key,
            "WrongDomain",
            &manager.signing_key.verifying_key(),
            b"second-kid",
        );
        let err = manager
            .set_token(bad_token, &registrar_key.verifying_key())
            .expect_err("aud mismatch must be rejected");
        assert!(matches!(err, TokenError::Security(_)));

        assert_eq!(manager.kid(), b"first-kid".to_vec());
    }

    #[test]
    fn expired_token_is_rejected() {
        let commissioner_key = SigningKey::generate(Algorithm::Es256);
        let registrar_key = SigningKey::generate(Algorithm::Es256);
        let mut manager = TokenManager::new(
            "OT-Commissioner".to_string(),
            "Thread".to_string(),
            commissioner_key,
        );

        let cose_key = commissioner_crypto::cose_key::CoseKey::from_verifying_key(
            &manager.signing_key.verifying_key(),
            b"kid".to_vec(),
        );
        let claims = commissioner_crypto::cwt::TokenClaims {
            iss: Some("registrar.example.com".to_string()),
            aud: Some("Thread".to_string()),
            exp: Some(1), // long expired
            cnf: Some(cose_key),
        };
        let payload = claims.to_cbor().expect("encode claims");
        let expired_token = Sign1::sign(&registrar_key, b"registrar", Some(payload), b"")
            .expect("sign token")
            .to_bytes()
            .expect("serialize token");

        let err = manager
            .set_token(expired_token, &registrar_key.verifying_key())
            .expect_err("expired token must be rejected");
        assert!(matches!(err, TokenError::Expired));
        assert!(!manager.has_token());
    }
}
