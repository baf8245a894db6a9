//! # commissioner-types
//!
//! Shared data model for the Thread commissioner core: the MeshCoP TLV
//! codec, dataset structures, joiner/session identifiers, and the MeshCoP
//! URI registry. Every other crate in this workspace depends on this one
//! for its wire-level vocabulary.
//!
//! ## Modules
//!
//! - [`tlv`] — TLV codec (type/length/value records and `TlvSet`)
//! - [`meshcop`] — MeshCoP TLV type constants
//! - [`dataset`] — Active/Pending/Commissioner/BBR dataset structures
//! - [`ids`] — session id, joiner id, steering data
//! - [`hexutil`] — strict hex encode/decode helpers
//! - [`pem`] — PEM to DER extraction helpers
//! - [`uri`] — MeshCoP CoAP URI path registry

pub mod dataset;
pub mod hexutil;
pub mod ids;
pub mod meshcop;
pub mod pem;
pub mod tlv;
pub mod uri;

/// Error type for TLV and dataset operations.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TlvError {
    /// The byte stream ended before a length or value was fully read.
    #[error("truncated TLV: {0}")]
    Truncated(String),

    /// A TLV used the extended length form where the short form was required,
    /// or the reverse.
    #[error("non-canonical TLV length encoding: {0}")]
    NonCanonical(String),

    /// A TLV value exceeded the maximum allowed for its type.
    #[error("TLV value too long: {0}")]
    TooLong(String),

    /// Strict decode encountered a type the caller did not expect.
    #[error("unexpected TLV type {0}")]
    UnexpectedType(u8),

    /// A mandatory TLV was missing from a decoded set.
    #[error("missing mandatory TLV type {0}")]
    MissingMandatory(u8),

    /// Generic malformed input (bad hex, bad PEM, ...).
    #[error("invalid argument: {0}")]
    InvalidArgs(String),
}

pub type Result<T> = std::result::Result<T, TlvError>;
