//! Commissioner configuration.
//!
//! Every field here mirrors a configuration option spec §6 names; parsing
//! a config file, discovering a Border Agent, and locating security
//! material on disk are all the embedding application's job (spec §1
//! Non-goals) — this struct only holds the already-resolved values.

use std::path::PathBuf;
use std::time::Duration;

use commissioner_crypto::ecdsa::{SigningKey, VerifyingKey};
use commissioner_session::state::{validate_keep_alive_interval, KEEP_ALIVE_MIN_SECS};
use commissioner_types::ids::validate_commissioner_id;
use commissioner_joiner::DEFAULT_MAX_CONNECTIONS;

use crate::error::{Error, ErrorCode};

/// Credentials for the CCM registrar's certificate-authenticated DTLS
/// session and for signing/verifying COM_TOK-bearing messages.
///
/// Resolves Open Question (a): rather than this crate parsing PEM or
/// touching a filesystem path, the caller hands over already-constructed
/// key material — the same seam `commissioner_transport::dtls` and
/// `commissioner_token::manager` already take their certificate and keys
/// through. Converting PEM/DER bytes into these types belongs to the
/// embedding application, consistent with "building a generic PKI" being
/// an explicit non-goal.
pub struct CcmCredentials {
    /// Client certificate presented to the domain registrar.
    pub client_certificate: webrtc_dtls::crypto::Certificate,
    /// DER-encoded trust anchor verifying the registrar's certificate.
    pub trust_anchor_der: Vec<u8>,
    /// The registrar's public key, used to verify the COM_TOK it issues.
    pub registrar_key: VerifyingKey,
    /// This commissioner's own signing key; its public half is what the
    /// registrar binds into the COM_TOK's `cnf` claim.
    pub signing_key: SigningKey,
}

/// Full commissioner configuration (spec §6 "Configuration options").
pub struct CommissionerConfig {
    /// `Id`: ≤ 64 bytes, sent in the Commissioner ID TLV.
    pub commissioner_id: String,
    /// `EnableCcm`.
    pub enable_ccm: bool,
    /// `KeepAliveInterval`, must fall in `[30, 45]` seconds.
    pub keep_alive_interval: Duration,
    /// `MaxConnectionNum`: bounds the joiner pool's concurrent sessions.
    pub max_connection_num: usize,
    /// `DomainName`, required when `enable_ccm` is set.
    pub domain_name: Option<String>,
    /// `PSKc`, used for the non-CCM Border Agent DTLS handshake.
    pub pskc: Option<[u8; 16]>,
    /// CCM-only certificate/key material; required when `enable_ccm` is set.
    pub ccm_credentials: Option<CcmCredentials>,
    /// `CommissionerToken`: a pre-seeded COM_TOK, skipping the initial
    /// registrar round trip.
    pub commissioner_token: Option<Vec<u8>>,
    /// `EnableDtlsDebugLogging`.
    pub enable_dtls_debug_logging: bool,
    /// Tracing verbosity; the embedding application still owns the
    /// subscriber (file path, format) — this only sets this crate's
    /// default filter level when it installs one itself (see [`crate::init_tracing`]).
    pub log_level: tracing::Level,
    /// Opaque root path for on-disk security materials. Never read by this
    /// crate; carried only so callers can round-trip it through one config
    /// object.
    pub security_material_root: Option<PathBuf>,
}

impl CommissionerConfig {
    /// Build a non-CCM configuration from a PSKc.
    pub fn new_psk(commissioner_id: impl Into<String>, pskc: [u8; 16]) -> Self {
        Self {
            commissioner_id: commissioner_id.into(),
            enable_ccm: false,
            keep_alive_interval: Duration::from_secs(KEEP_ALIVE_MIN_SECS),
            max_connection_num: DEFAULT_MAX_CONNECTIONS,
            domain_name: None,
            pskc: Some(pskc),
            ccm_credentials: None,
            commissioner_token: None,
            enable_dtls_debug_logging: false,
            log_level: tracing::Level::INFO,
            security_material_root: None,
        }
    }

    /// Build a CCM configuration from registrar credentials and a domain
    /// name.
    pub fn new_ccm(commissioner_id: impl Into<String>, domain_name: impl Into<String>, credentials: CcmCredentials) -> Self {
        Self {
            commissioner_id: commissioner_id.into(),
            enable_ccm: true,
            keep_alive_interval: Duration::from_secs(KEEP_ALIVE_MIN_SECS),
            max_connection_num: DEFAULT_MAX_CONNECTIONS,
            domain_name: Some(domain_name.into()),
            pskc: None,
            ccm_credentials: Some(credentials),
            commissioner_token: None,
            enable_dtls_debug_logging: false,
            log_level: tracing::Level::INFO,
            security_material_root: None,
        }
    }

    /// Validate internal consistency. `Commissioner::new` calls this so a
    /// misconfigured caller fails fast with `InvalidArgs` rather than
    /// surfacing a confusing error deep in the session layer.
    pub fn validate(&self) -> crate::error::Result<()> {
        validate_commissioner_id(&self.commissioner_id)
            .map_err(|e| Error::new(ErrorCode::InvalidArgs, e.to_string()))?;

        validate_keep_alive_interval(self.keep_alive_interval)
            .map_err(|e| Error::new(ErrorCode::InvalidArgs, e.to_string()))?;

        if self.enable_ccm {
            if self.domain_name.is_none() {
                return Err(Error::new(ErrorCode::InvalidArgs, "CCM requires a domain name"));
            }
            if self.ccm_credentials.is_none() {
                return Err(Error::new(
                    ErrorCode::InvalidArgs,
                    "CCM requires client certificate, trust anchor, and signing key",
                ));
            }
        } else if self.pskc.is_none() {
            return Err(Error::new(ErrorCode::InvalidArgs, "non-CCM requires a PSKc"));
        }

        if self.max_connection_num == 0 {
            return Err(Error::new(ErrorCode::InvalidArgs, "max_connection_num must be at least 1"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn psk_config_with_valid_fields_validates() {
        let config = CommissionerConfig::new_psk("OT-Commissioner", [0u8; 16]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn commissioner_id_over_64_bytes_rejected() {
        let mut config = CommissionerConfig::new_psk("a".repeat(65), [0u8; 16]);
        config.pskc = Some([0u8; 16]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn ccm_without_credentials_rejected() {
        let mut config = CommissionerConfig::new_psk("OT-Commissioner", [0u8; 16]);
        config.enable_ccm = true;
        config.domain_name = Some("Thread".to_string());
        config.pskc = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_max_connections_rejected() {
        let mut config = CommissionerConfig::new_psk("OT-Commissioner", [0u8; 16]);
        config.max_connection_num = 0;
        assert!(config.validate().is_err());
    }
}
