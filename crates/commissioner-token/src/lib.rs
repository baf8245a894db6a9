//! # commissioner-token
//!
//! The CCM Token Manager: acquires a COM_TOK from the domain registrar,
//! validates and stores it, and signs/verifies commissioner messages with
//! it. Grounded directly on the original commissioner's `token_manager.cpp`.
//!
//! ## Modules
//!
//! - [`manager`] — `TokenManager`: request/set/sign/verify

pub mod manager;

/// Error type for token manager operations.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// The registrar response was not a valid COSE_Sign1-wrapped CWT, or
    /// its content-format was not `application/cose; cose-type="cose-sign1"`.
    #[error("malformed token response: {0}")]
    BadFormat(String),

    /// The token's `aud` claim does not match the configured Domain Name,
    /// or its signature does not verify under the trust anchor.
    #[error("token security check failed: {0}")]
    Security(String),

    /// The commissioner has no COM_TOK to sign with.
    #[error("no token set")]
    NoToken,

    /// The token has expired (`exp` claim in the past).
    #[error("token expired")]
    Expired,

    /// A lower-layer transport error occurred while contacting the
    /// registrar.
    #[error(transparent)]
    Transport(#[from] commissioner_transport::TransportError),

    /// A lower-layer cryptographic error occurred.
    #[error(transparent)]
    Crypto(#[from] commissioner_crypto::CryptoError),

    /// A lower-layer TLV error occurred.
    #[error(transparent)]
    Tlv(#[from] commissioner_types::TlvError),
}

pub type Result<T> = std::result::Result<T, TokenError>;
