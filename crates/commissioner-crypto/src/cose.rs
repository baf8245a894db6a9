//! COSE_Sign1 (RFC 8152 §4.2) construction, signing and verification.
//!
//! Grounded on the original commissioner's `cose.cpp` `Sign1Message` API
//! (`Init`/`Sign`/`Validate`/`SetContent`/`SetExternalData`), reimplemented
//! on the `coset` crate instead of hand-rolled mbedtls + cn-cbor. Detached
//! payloads are the default path — the token manager signs CoAP request
//! content that is transmitted separately from the signature TLV — with
//! non-detached signing supported for the COM_TOK response itself, which
//! wraps the CWT claims map directly in the COSE_Sign1 payload.
//!
//! For the detached path, `payload` is `None` on both sides of the
//! exchange and the signed content travels only as `external_aad`: the
//! `Sig_structure`'s payload element is the empty byte string for a
//! detached [`sign`](Sign1::sign)/[`verify`](Sign1::verify) pair, never
//! the detached content itself. That keeps the two sides trivially
//! symmetric and matches spec §4.5's "external_aad = canonical signing
//! content, detached payload" construction, where the content is already
//! fully captured by `external_aad`.

use coset::{iana, CborSerializable, CoseSign1, CoseSign1Builder, HeaderBuilder};

use crate::ecdsa::{Algorithm, Signature, SigningKey, VerifyingKey};
use crate::{CryptoError, Result};

fn iana_algorithm(algorithm: Algorithm) -> iana::Algorithm {
    match algorithm {
        Algorithm::Es256 => iana::Algorithm::ES256,
        Algorithm::Es384 => iana::Algorithm::ES384,
        Algorithm::Es512 => iana::Algorithm::ES512,
    }
}

/// A signed COSE_Sign1 envelope.
pub struct Sign1 {
    inner: CoseSign1,
    algorithm: Algorithm,
}

impl Sign1 {
    /// Sign `payload` (or, if `payload` is `None`, treat this as a detached
    /// signature over content supplied only via `external_aad`) under
    /// `signing_key`, tagging the protected header with `kid`.
    pub fn sign(
        signing_key: &SigningKey,
        kid: &[u8],
        payload: Option<Vec<u8>>,
        external_aad: &[u8],
    ) -> Result<Self> {
        let algorithm = signing_key.algorithm();
        let protected = HeaderBuilder::new().algorithm(iana_algorithm(algorithm)).build();
        let unprotected = HeaderBuilder::new().key_id(kid.to_vec()).build();

        let mut builder = CoseSign1Builder::new()
            .protected(protected)
            .unprotected(unprotected);
        if let Some(payload) = payload {
            builder = builder.payload(payload);
        }

        let inner = builder
            .create_signature(external_aad, |tbs| signing_key.sign(tbs).to_bytes())
            .build();

        Ok(Self { inner, algorithm })
    }

    /// Verify this envelope's signature under `verifying_key`.
    ///
    /// `external_aad` must be exactly the bytes passed as `external_aad`
    /// to the [`sign`](Self::sign) call that produced this envelope. For
    /// a detached signature the signed content never occupies the COSE
    /// payload slot on either side of the exchange — it travels only as
    /// `external_aad` — so there is nothing to re-attach here; this
    /// verifies `self.inner.payload` exactly as the envelope carries it
    /// (`None` for the detached case, matching what `sign` built the
    /// `Sig_structure` over).
    pub fn verify(&self, verifying_key: &VerifyingKey, external_aad: &[u8]) -> Result<()> {
        if verifying_key.algorithm() != self.algorithm {
            return Err(CryptoError::Cose("algorithm mismatch".to_string()));
        }

        self.inner
            .verify_signature(external_aad, |sig_bytes, tbs| {
                let signature = Signature::from_bytes(self.algorithm, sig_bytes)
                    .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
                verifying_key.verify(tbs, &signature)
            })
            .map_err(|_| CryptoError::SignatureVerification)
    }

    /// The `kid` carried in the unprotected header, if present.
    pub fn kid(&self) -> Option<&[u8]> {
        if self.inner.unprotected.key_id.is_empty() {
            None
        } else {
            Some(self.inner.unprotected.key_id.as_slice())
        }
    }

    /// The non-detached payload, if this envelope carries one.
    pub fn payload(&self) -> Option<&[u8]> {
        self.inner.payload.as_deref()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.inner
            .clone()
            .to_vec()
            .map_err(|e| CryptoError::Cose(e.to_string()))
    }

    pub fn from_bytes(algorithm: Algorithm, bytes: &[u8]) -> Result<Self> {
        let inner = CoseSign1::from_slice(bytes).map_err(|e| CryptoError::Cose(e.to_string()))?;
        let declared_alg = inner
            .protected
            .header
            .alg
            .as_ref()
            .ok_or_else(|| CryptoError::Cose("missing protected algorithm header".to_string()))?;
        let declared_alg = match declared_alg {
            coset::RegisteredLabelWithPrivate::Assigned(iana::Algorithm::ES256) => Algorithm::Es256,
            coset::RegisteredLabelWithPrivate::Assigned(iana::Algorithm::ES384) => Algorithm::Es384,
            coset::RegisteredLabelWithPrivate::Assigned(iana::Algorithm::ES512) => Algorithm::Es512,
            _ => return Err(CryptoError::Cose("unsupported COSE algorithm".to_string())),
        };
        if declared_alg != algorithm {
            return Err(CryptoError::Cose(format!(
                "expected algorithm {:?}, header declared {:?}",
                algorithm, declared_alg
            )));
        }
        Ok(Self { inner, algorithm })
    }
}

impl std::fmt::Debug for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Algorithm::Es256 => "ES256",
            Algorithm::Es384 => "ES384",
            Algorithm::Es512 => "ES512",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_non_detached() {
        let key = SigningKey::generate(Algorithm::Es256);
        let sign1 = Sign1::sign(&key, b"kid-1", Some(b"claims payload".to_vec()), b"")
            .expect("sign");
        assert_eq!(sign1.payload(), Some(b"claims payload".as_slice()));
        sign1.verify(&key.verifying_key(), b"").expect("verify");
    }

    #[test]
    fn sign_and_verify_detached() {
        let key = SigningKey::generate(Algorithm::Es384);
        let content = b"MGMT_ACTIVE_SET.req TLVs";
        let sign1 = Sign1::sign(&key, b"kid-2", None, content).expect("sign");
        assert!(sign1.payload().is_none());
        sign1.verify(&key.verifying_key(), content).expect("verify");
    }

    #[test]
    fn detached_verification_fails_if_external_aad_does_not_match() {
        let key = SigningKey::generate(Algorithm::Es256);
        let sign1 = Sign1::sign(&key, b"kid", None, b"original content").expect("sign");
        assert!(sign1.verify(&key.verifying_key(), b"tampered content").is_err());
    }

    #[test]
    fn wrong_key_fails_verification() {
        let key = SigningKey::generate(Algorithm::Es256);
        let other = SigningKey::generate(Algorithm::Es256);
        let sign1 = Sign1::sign(&key, b"kid", Some(b"payload".to_vec()), b"").expect("sign");
        assert!(sign1.verify(&other.verifying_key(), b"").is_err());
    }
}
