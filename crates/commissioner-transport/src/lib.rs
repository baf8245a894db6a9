//! # commissioner-transport
//!
//! DTLS transport and CoAP message engine for the Thread commissioner.
//!
//! - **DTLS** via [`dtls`] — PSK (non-CCM) and certificate (CCM/registrar)
//!   handshakes over a UDP socket.
//! - **CoAP** via [`coap`] — request/response messaging on top of a DTLS
//!   connection: token correlation, exponential-backoff retransmission,
//!   and cancellation, per RFC 7252 §4.2.

pub mod coap;
pub mod dtls;

/// Error type for transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The DTLS handshake failed (PSK mismatch, certificate rejected, peer
    /// unreachable).
    #[error("DTLS handshake failed: {0}")]
    Handshake(String),

    /// A CoAP message could not be encoded or decoded.
    #[error("CoAP codec error: {0}")]
    Codec(String),

    /// A request exhausted `MAX_RETRANSMIT` without receiving an ACK.
    #[error("request timed out after {0} retransmissions")]
    Timeout(u8),

    /// The request was cancelled before a response arrived.
    #[error("request cancelled")]
    Cancelled,

    /// I/O error on the underlying socket.
    #[error("I/O error: {0}")]
    Io(String),

    /// Internal error (should not occur in normal operation).
    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, TransportError>;
