//! PEM to DER extraction helpers.
//!
//! CCM configuration (`private_key`, `certificate`, `trust_anchor`) is
//! supplied as PEM text; this module strips the PEM envelope down to the
//! raw DER bytes that `commissioner-crypto` and the certificate parser
//! expect. Parsing of the DER content itself is out of scope here.

use crate::{Result, TlvError};

/// Extract the DER bytes from a single PEM-encoded block.
///
/// Accepts `CERTIFICATE`, `PRIVATE KEY`, and `EC PRIVATE KEY` labels, which
/// covers everything the CCM configuration surface can carry.
///
/// # Errors
///
/// Returns [`TlvError::InvalidArgs`] if the input contains no PEM block or
/// is not validly base64-encoded between its `BEGIN`/`END` markers.
pub fn pem_to_der(pem_text: &str) -> Result<Vec<u8>> {
    let mut reader = std::io::Cursor::new(pem_text.as_bytes());
    let item = rustls_pemfile::read_one(&mut reader)
        .map_err(|e| TlvError::InvalidArgs(format!("malformed PEM: {e}")))?
        .ok_or_else(|| TlvError::InvalidArgs("no PEM block found".to_string()))?;

    let der = match item {
        rustls_pemfile::Item::X509Certificate(cert) => cert.as_ref().to_vec(),
        rustls_pemfile::Item::Pkcs8Key(key) => key.secret_pkcs8_der().to_vec(),
        rustls_pemfile::Item::Sec1Key(key) => key.secret_sec1_der().to_vec(),
        rustls_pemfile::Item::Pkcs1Key(key) => key.secret_pkcs1_der().to_vec(),
        other => {
            return Err(TlvError::InvalidArgs(format!(
                "unsupported PEM item type: {other:?}"
            )))
        }
    };
    Ok(der)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_pem_input() {
        assert!(pem_to_der("not a pem file").is_err());
    }

    #[test]
    fn rejects_empty_input() {
        assert!(pem_to_der("").is_err());
    }
}
