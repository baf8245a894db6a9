//! # commissioner-crypto
//!
//! Cryptographic primitives for the Thread commissioner core: PSKc
//! derivation, ECDSA over the NIST curves CCM uses for COM_TOK
//! (ES256/ES384/ES512), and the COSE_Sign1/CWT envelope the domain
//! registrar and token manager exchange.
//!
//! ## Modules
//!
//! - [`pskc`] — PSKc generation (Thread PBKDF2-AES-CMAC construction)
//! - [`ecdsa`] — P-256/P-384/P-521 signing and verification keys
//! - [`cbor`] — canonical CBOR map construction over `ciborium::Value`
//! - [`cose`] — COSE_Sign1 construction, signing and verification
//! - [`cose_key`] — structured COSE_Key (`kty`/`crv`/`x`/`y`/`kid`)
//! - [`cwt`] — CBOR Web Token claim map constants and (de)serialization

pub mod cbor;
pub mod cose;
pub mod cose_key;
pub mod cwt;
pub mod ecdsa;
pub mod pskc;

/// Error type for cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// ECDSA signature verification failed.
    #[error("signature verification failed")]
    SignatureVerification,

    /// Key derivation failed (PSKc, PBKDF2).
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Invalid key length or malformed key material.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// CBOR encode/decode error.
    #[error("CBOR error: {0}")]
    Cbor(String),

    /// COSE_Sign1 structural error (missing header, unsupported algorithm).
    #[error("COSE error: {0}")]
    Cose(String),

    /// Invalid input data (bad passphrase length, bad network name length).
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
