//! # commissioner-session
//!
//! The Commissioner Session state machine: petition, keep-alive, dataset
//! GET/SET, and the MeshCoP management command set.
//!
//! ## Modules
//!
//! - [`state`] — `CommissionerState` and its transition table
//! - [`session`] — `CommissionerSession`: petition/resign/keep-alive,
//!   dataset operations, management commands

pub mod session;
pub mod state;

/// Error type for commissioner session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The configured `keep_alive_interval` was outside `[30, 45]` seconds.
    #[error("keep-alive interval {0}s out of range [30, 45]")]
    InvalidKeepAliveInterval(u64),

    /// An operation was attempted in a state that does not permit it (e.g.
    /// a dataset GET while `Disabled`).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The Leader rejected a petition or dataset SET.
    #[error("rejected by leader (existing commissioner id: {existing_commissioner_id:?})")]
    Rejected {
        existing_commissioner_id: Option<String>,
    },

    /// The keep-alive timer missed a response or was explicitly rejected.
    #[error("keep-alive failed: {0}")]
    KeepAliveFailed(String),

    #[error(transparent)]
    Transport(#[from] commissioner_transport::TransportError),

    #[error(transparent)]
    Token(#[from] commissioner_token::TokenError),

    #[error(transparent)]
    Tlv(#[from] commissioner_types::TlvError),
}

pub type Result<T> = std::result::Result<T, SessionError>;
