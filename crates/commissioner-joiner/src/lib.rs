//! L5: Joiner Session Pool.
//!
//! Accepts relayed `RELAY_RX.ntf` frames from the commissioner session,
//! runs each admitted joiner's DTLS handshake and `JOIN_FIN` exchange over
//! an in-process [`relay_conn::RelayConn`], and dispatches vendor/admission
//! decisions to an application-supplied [`handler::JoinerHandler`].

pub mod handler;
pub mod pool;
pub mod relay_conn;
pub mod session;

use commissioner_types::tlv::TlvError;
use thiserror::Error;

pub use handler::{JoinerHandler, VendorInfo};
pub use pool::{JoinerPool, RelayTxSink, DEFAULT_MAX_CONNECTIONS};

#[derive(Debug, Error)]
pub enum JoinerError {
    #[error("relayed DTLS handshake failed: {0}")]
    Handshake(String),

    #[error("malformed relayed message: {0}")]
    Codec(String),

    #[error(transparent)]
    Tlv(#[from] TlvError),

    #[error("joiner pool is at capacity")]
    PoolFull,

    #[error("joiner not admitted by steering data or unknown to the application")]
    NotAdmitted,

    #[error("joiner finalize was rejected")]
    Rejected,
}

pub type Result<T> = std::result::Result<T, JoinerError>;
