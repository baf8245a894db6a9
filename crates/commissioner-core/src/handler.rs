//! The application-facing event surface, unifying
//! `commissioner_session::SessionHandler` and `commissioner_joiner::JoinerHandler`
//! into the one trait callers implement against the facade.

use commissioner_joiner::{JoinerHandler, VendorInfo};
use commissioner_session::session::SessionHandler;
use commissioner_types::ids::JoinerId;
use commissioner_types::tlv::TlvSet;

/// Every unsolicited event the facade can deliver.
///
/// Implementations run serialized behind the facade (spec §4.7): no two
/// calls into the same `CommissionerHandler` ever overlap, so an
/// implementation does not need its own locking, but it must not call back
/// into the facade's synchronous API (that would deadlock; the facade
/// detects this and returns `InvalidState` instead).
pub trait CommissionerHandler: Send + Sync {
    /// The commissioner session's keep-alive cycle failed; the session has
    /// already transitioned to `Disabled`.
    fn on_keep_alive_failed(&self, _reason: &str) {}
    /// `MGMT_PANID_CONFLICT.ans` arrived.
    fn on_pan_id_conflict(&self, _tlvs: &TlvSet) {}
    /// `MGMT_ED_REPORT.ans` arrived.
    fn on_energy_report(&self, _tlvs: &TlvSet) {}
    /// `MGMT_DATASET_CHANGED.ans` arrived.
    fn on_dataset_changed(&self) {}
    /// `DIAG_GET.ans` arrived.
    fn on_diag_get_answer(&self, _tlvs: &TlvSet) {}

    /// An unknown joiner id was admitted by steering data; return its
    /// PSKd, or `None` to reject it.
    fn on_joiner_request(&self, joiner_id: JoinerId) -> Option<Vec<u8>>;
    /// A relayed joiner's DTLS handshake completed.
    fn on_joiner_connected(&self, _joiner_id: JoinerId) {}
    /// `JOIN_FIN.req` arrived with vendor fields; return `true` to accept.
    fn on_joiner_finalize(&self, joiner_id: JoinerId, vendor: &VendorInfo) -> bool;
}

/// Adapts a shared [`CommissionerHandler`] to the session layer's narrower
/// [`SessionHandler`] trait.
pub(crate) struct SessionHandlerAdapter(pub std::sync::Arc<dyn CommissionerHandler>);

impl SessionHandler for SessionHandlerAdapter {
    fn on_keep_alive_failed(&self, reason: &str) {
        self.0.on_keep_alive_failed(reason);
    }
    fn on_pan_id_conflict(&self, tlvs: &TlvSet) {
        self.0.on_pan_id_conflict(tlvs);
    }
    fn on_energy_report(&self, tlvs: &TlvSet) {
        self.0.on_energy_report(tlvs);
    }
    fn on_dataset_changed(&self) {
        self.0.on_dataset_changed();
    }
    fn on_diag_get_answer(&self, tlvs: &TlvSet) {
        self.0.on_diag_get_answer(tlvs);
    }
}

/// Adapts a shared [`CommissionerHandler`] to the joiner pool's narrower
/// [`JoinerHandler`] trait.
pub(crate) struct JoinerHandlerAdapter(pub std::sync::Arc<dyn CommissionerHandler>);

impl JoinerHandler for JoinerHandlerAdapter {
    fn on_joiner_request(&self, joiner_id: JoinerId) -> Option<Vec<u8>> {
        self.0.on_joiner_request(joiner_id)
    }
    fn on_joiner_connected(&self, joiner_id: JoinerId) {
        self.0.on_joiner_connected(joiner_id);
    }
    fn on_joiner_finalize(&self, joiner_id: JoinerId, vendor: &VendorInfo) -> bool {
        self.0.on_joiner_finalize(joiner_id, vendor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingHandler;
    impl CommissionerHandler for RecordingHandler {
        fn on_joiner_request(&self, _joiner_id: JoinerId) -> Option<Vec<u8>> {
            Some(b"PSKD".to_vec())
        }
        fn on_joiner_finalize(&self, _joiner_id: JoinerId, _vendor: &VendorInfo) -> bool {
            true
        }
    }

    #[test]
    fn session_adapter_delegates_dataset_changed() {
        let handler: std::sync::Arc<dyn CommissionerHandler> = std::sync::Arc::new(RecordingHandler);
        let adapter = SessionHandlerAdapter(handler);
        adapter.on_dataset_changed();
    }

    #[test]
    fn joiner_adapter_delegates_request() {
        let handler: std::sync::Arc<dyn CommissionerHandler> = std::sync::Arc::new(RecordingHandler);
        let adapter = JoinerHandlerAdapter(handler);
        let joiner_id = JoinerId([1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(adapter.on_joiner_request(joiner_id), Some(b"PSKD".to_vec()));
    }
}
