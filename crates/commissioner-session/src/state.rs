//! `CommissionerState` and its transition table.
//!
//! ```text
//! Disabled --Connect--> Connected --Petition--> Petitioning
//! Petitioning --accept--> Active
//! Petitioning --reject--> Connected
//! Active --periodic keep-alive ok--> Active
//! Active --reject/timeout--> Disabled
//! Active --Resign--> Disabled
//! any --DTLS error or peer close--> Disabled
//! ```

use std::time::Duration;

use crate::{Result, SessionError};

/// Keep-alive interval bounds, clamped at construction (spec boundary:
/// failing at `Init` rather than silently clamping the caller's value).
pub const KEEP_ALIVE_MIN_SECS: u64 = 30;
pub const KEEP_ALIVE_MAX_SECS: u64 = 45;

/// The commissioner session's lifecycle state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CommissionerState {
    #[default]
    Disabled,
    Connected,
    Petitioning,
    Active,
}

impl CommissionerState {
    pub fn is_active(self) -> bool {
        matches!(self, CommissionerState::Active)
    }
}

/// Validate and return a keep-alive interval, failing rather than clamping
/// if it falls outside `[30, 45]` seconds.
pub fn validate_keep_alive_interval(interval: Duration) -> Result<Duration> {
    let secs = interval.as_secs();
    if !(KEEP_ALIVE_MIN_SECS..=KEEP_ALIVE_MAX_SECS).contains(&secs) {
        return Err(SessionError::InvalidKeepAliveInterval(secs));
    }
    Ok(interval)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_active_reports_is_active() {
        assert!(!CommissionerState::Disabled.is_active());
        assert!(!CommissionerState::Connected.is_active());
        assert!(!CommissionerState::Petitioning.is_active());
        assert!(CommissionerState::Active.is_active());
    }

    #[test]
    fn keep_alive_interval_boundaries() {
        assert!(validate_keep_alive_interval(Duration::from_secs(30)).is_ok());
        assert!(validate_keep_alive_interval(Duration::from_secs(45)).is_ok());
        assert!(validate_keep_alive_interval(Duration::from_secs(29)).is_err());
        assert!(validate_keep_alive_interval(Duration::from_secs(46)).is_err());
    }
}
