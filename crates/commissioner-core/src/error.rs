//! The facade's unified error type.
//!
//! Every lower-layer error (transport, crypto, token, session, joiner, TLV)
//! collapses into one `Error{code, message}` here: `code` is what callers
//! are expected to match on, `message` is for logs, never for parsing.

use std::fmt;

/// Stable numeric error kind, matching the original commissioner's
/// `otbr::commissioner::Error` enum one for one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    None,
    Cancelled,
    InvalidArgs,
    InvalidCommand,
    Timeout,
    NotFound,
    Security,
    Unimplemented,
    BadFormat,
    Busy,
    OutOfMemory,
    IoError,
    IoBusy,
    AlreadyExists,
    Aborted,
    InvalidState,
    Rejected,
    Unknown,
}

/// A facade-level error: a stable `code` applications can match on, plus a
/// human-readable `message` that is never itself parsed.
#[derive(Clone, Debug)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

impl From<commissioner_session::SessionError> for Error {
    fn from(e: commissioner_session::SessionError) -> Self {
        use commissioner_session::SessionError as S;
        let message = e.to_string();
        let code = match e {
            S::InvalidKeepAliveInterval(_) => ErrorCode::InvalidArgs,
            S::InvalidState(_) => ErrorCode::InvalidState,
            S::Rejected { .. } => ErrorCode::Rejected,
            S::KeepAliveFailed(_) => ErrorCode::Timeout,
            S::Transport(inner) => return inner.into(),
            S::Token(inner) => return inner.into(),
            S::Tlv(inner) => return inner.into(),
        };
        Self::new(code, message)
    }
}

impl From<commissioner_transport::TransportError> for Error {
    fn from(e: commissioner_transport::TransportError) -> Self {
        use commissioner_transport::TransportError as T;
        let code = match &e {
            T::Handshake(_) => ErrorCode::Security,
            T::Codec(_) => ErrorCode::BadFormat,
            T::Timeout(_) => ErrorCode::Timeout,
            T::Cancelled => ErrorCode::Cancelled,
            T::Io(_) => ErrorCode::IoError,
            T::Internal(_) => ErrorCode::Unknown,
        };
        Self::new(code, e.to_string())
    }
}

impl From<commissioner_token::TokenError> for Error {
    fn from(e: commissioner_token::TokenError) -> Self {
        use commissioner_token::TokenError as K;
        let message = e.to_string();
        let code = match e {
            K::BadFormat(_) => ErrorCode::BadFormat,
            K::Security(_) => ErrorCode::Security,
            K::NoToken => ErrorCode::InvalidState,
            K::Expired => ErrorCode::Security,
            K::Transport(inner) => return inner.into(),
            K::Crypto(inner) => return inner.into(),
            K::Tlv(inner) => return inner.into(),
        };
        Self::new(code, message)
    }
}

impl From<commissioner_crypto::CryptoError> for Error {
    fn from(e: commissioner_crypto::CryptoError) -> Self {
        use commissioner_crypto::CryptoError as C;
        let code = match &e {
            C::SignatureVerification => ErrorCode::Security,
            C::KeyDerivation(_) => ErrorCode::Security,
            C::InvalidKey(_) => ErrorCode::InvalidArgs,
            C::Cbor(_) => ErrorCode::BadFormat,
            C::Cose(_) => ErrorCode::BadFormat,
            C::InvalidInput(_) => ErrorCode::InvalidArgs,
        };
        Self::new(code, e.to_string())
    }
}

impl From<commissioner_types::TlvError> for Error {
    fn from(e: commissioner_types::TlvError) -> Self {
        use commissioner_types::TlvError as V;
        let code = match &e {
            V::TooLong(_) | V::Truncated(_) | V::NonCanonical(_) | V::UnexpectedType(_) | V::MissingMandatory(_) => {
                ErrorCode::BadFormat
            }
            V::InvalidArgs(_) => ErrorCode::InvalidArgs,
        };
        Self::new(code, e.to_string())
    }
}

impl From<commissioner_joiner::JoinerError> for Error {
    fn from(e: commissioner_joiner::JoinerError) -> Self {
        use commissioner_joiner::JoinerError as J;
        let code = match &e {
            J::Handshake(_) => ErrorCode::Security,
            J::Codec(_) => ErrorCode::BadFormat,
            J::Tlv(_) => ErrorCode::BadFormat,
            J::PoolFull => ErrorCode::Busy,
            J::NotAdmitted => ErrorCode::Security,
            J::Rejected => ErrorCode::Rejected,
        };
        Self::new(code, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_rejected_maps_to_rejected_code() {
        let e: Error = commissioner_session::SessionError::Rejected {
            existing_commissioner_id: Some("OT-Commissioner".to_string()),
        }
        .into();
        assert_eq!(e.code, ErrorCode::Rejected);
    }

    #[test]
    fn nested_transport_error_unwraps_to_its_own_code() {
        let inner = commissioner_transport::TransportError::Timeout(4);
        let e: Error = commissioner_session::SessionError::Transport(inner).into();
        assert_eq!(e.code, ErrorCode::Timeout);
    }
}
