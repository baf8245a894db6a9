//! Strict hex encode/decode helpers.
//!
//! Thin wrappers over the [`hex`] crate that normalize failure modes to
//! [`TlvError::InvalidArgs`] — odd-length input and non-hex digits are both
//! treated as a caller mistake rather than a generic decode error, so
//! higher layers can map them straight onto `ErrorCode::InvalidArgs`.

use crate::{Result, TlvError};

pub fn hex_encode(data: impl AsRef<[u8]>) -> String {
    hex::encode(data)
}

pub fn hex_decode(s: impl AsRef<str>) -> Result<Vec<u8>> {
    hex::decode(s.as_ref()).map_err(|e| TlvError::InvalidArgs(format!("invalid hex: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let data = [0u8, 1, 2, 3];
        assert_eq!(hex_decode(hex_encode(data)).expect("decode"), data);
    }

    #[test]
    fn odd_length_rejected() {
        assert!(matches!(
            hex_decode("00010"),
            Err(TlvError::InvalidArgs(_))
        ));
    }

    #[test]
    fn non_hex_digit_rejected() {
        assert!(matches!(
            hex_decode("00010g"),
            Err(TlvError::InvalidArgs(_))
        ));
    }
}
