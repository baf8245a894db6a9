//! `JoinerPool`: per-joiner relayed DTLS sessions, steering-data admission,
//! and the at-most-one-handshake-per-joiner concurrency rule (spec §4.6).

use std::collections::HashMap;
use std::sync::Arc;

use commissioner_types::ids::{JoinerId, SteeringData};
use tokio::sync::{mpsc, Mutex};

use crate::handler::JoinerHandler;
use crate::relay_conn::RelayConn;
use crate::session::JoinerSession;
use crate::{JoinerError, Result};

/// Forwards a relayed joiner session's outbound DTLS datagrams to the
/// Border Agent as `RELAY_TX.ntf`. Implemented by the facade, which owns
/// the CoAP engine the commissioner session already has open.
pub trait RelayTxSink: Send + Sync {
    fn send_relay_tx(&self, joiner_id: JoinerId, frame: Vec<u8>);
}

/// Default `MaxConnectionNum` (spec §4.6/§6).
pub const DEFAULT_MAX_CONNECTIONS: usize = 100;

struct PoolEntry {
    /// Feeds additional `RELAY_RX` frames for this joiner into its
    /// in-flight handshake — this *is* the "inbound queue" spec §4.6
    /// describes: an unbounded channel the handshake task consumes from,
    /// so a second `RELAY_RX` while the handshake runs queues rather than
    /// starting a competing session.
    inbound: mpsc::UnboundedSender<Vec<u8>>,
}

/// Owns every in-flight relayed joiner session, keyed by joiner id.
pub struct JoinerPool {
    sessions: Arc<Mutex<HashMap<JoinerId, PoolEntry>>>,
    max_connections: usize,
    steering: Mutex<SteeringData>,
    handler: Arc<dyn JoinerHandler>,
    relay_tx: Arc<dyn RelayTxSink>,
}

impl JoinerPool {
    pub fn new(
        max_connections: usize,
        steering: SteeringData,
        handler: Arc<dyn JoinerHandler>,
        relay_tx: Arc<dyn RelayTxSink>,
    ) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            max_connections,
            steering: Mutex::new(steering),
            handler,
            relay_tx,
        }
    }

    /// Replace the currently installed steering data (`MGMT_COMMISSIONER_SET`
    /// / the dataset's `STEERING_DATA` TLV changes which joiners are
    /// admitted going forward; sessions already in flight are unaffected).
    pub async fn set_steering_data(&self, steering: SteeringData) {
        *self.steering.lock().await = steering;
    }

    pub async fn active_session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Handle one `RELAY_RX.ntf` frame for `joiner_id`.
    ///
    /// Routes to an existing in-flight session if one exists; otherwise
    /// checks steering-data admission and the `MaxConnectionNum` bound
    /// before spawning a new handshake task.
    pub async fn on_relay_rx(&self, joiner_id: JoinerId, frame: Vec<u8>) -> Result<()> {
        let mut sessions = self.sessions.lock().await;

        if let Some(entry) = sessions.get(&joiner_id) {
            // Already mid-handshake: queue rather than start a second one.
            let _ = entry.inbound.send(frame);
            return Ok(());
        }

        if !self.steering.lock().await.is_member(&joiner_id) {
            return Err(JoinerError::NotAdmitted);
        }

        if sessions.len() >= self.max_connections {
            return Err(JoinerError::PoolFull);
        }

        let Some(pskd) = self.handler.on_joiner_request(joiner_id) else {
            return Err(JoinerError::NotAdmitted);
        };

        let (relay_conn, inbound_tx, mut outbound_rx) = RelayConn::pair();
        let _ = inbound_tx.send(frame);
        sessions.insert(
            joiner_id,
            PoolEntry {
                inbound: inbound_tx,
            },
        );
        drop(sessions);

        let relay_tx = self.relay_tx.clone();
        tokio::spawn(async move {
            while let Some(outbound_frame) = outbound_rx.recv().await {
                relay_tx.send_relay_tx(joiner_id, outbound_frame);
            }
        });

        let session = JoinerSession::new(joiner_id, pskd, self.handler.clone());
        let sessions_ref = self.sessions.clone();
        tokio::spawn(async move {
            if let Err(e) = session.run(relay_conn).await {
                tracing::debug!(?joiner_id, error = %e, "joiner session ended");
            }
            sessions_ref.lock().await.remove(&joiner_id);
        });

        Ok(())
    }

    /// Drop a joiner's in-flight session without completing its handshake
    /// (e.g. on disconnect or idle timeout, spec §3 Joiner Session
    /// lifecycle).
    pub async fn evict(&self, joiner_id: JoinerId) {
        self.sessions.lock().await.remove(&joiner_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RejectAllHandler;
    impl JoinerHandler for RejectAllHandler {
        fn on_joiner_request(&self, _joiner_id: JoinerId) -> Option<Vec<u8>> {
            None
        }
        fn on_joiner_finalize(&self, _joiner_id: JoinerId, _vendor: &crate::handler::VendorInfo) -> bool {
            false
        }
    }

    struct CountingSink(Arc<AtomicUsize>);
    impl RelayTxSink for CountingSink {
        fn send_relay_tx(&self, _joiner_id: JoinerId, _frame: Vec<u8>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn unadmitted_joiner_is_rejected_before_handler_lookup() {
        let pool = JoinerPool::new(
            DEFAULT_MAX_CONNECTIONS,
            SteeringData::admit_none(2),
            Arc::new(RejectAllHandler),
            Arc::new(CountingSink(Arc::new(AtomicUsize::new(0)))),
        );
        let joiner_id = JoinerId([1, 2, 3, 4, 5, 6, 7, 8]);
        let err = pool.on_relay_rx(joiner_id, vec![0u8; 4]).await.unwrap_err();
        assert!(matches!(err, JoinerError::NotAdmitted));
        assert_eq!(pool.active_session_count().await, 0);
    }

    #[tokio::test]
    async fn pskd_lookup_miss_is_not_admitted() {
        let pool = JoinerPool::new(
            DEFAULT_MAX_CONNECTIONS,
            SteeringData::admit_all(2),
            Arc::new(RejectAllHandler),
            Arc::new(CountingSink(Arc::new(AtomicUsize::new(0)))),
        );
        let joiner_id = JoinerId([1, 2, 3, 4, 5, 6, 7, 8]);
        let err = pool.on_relay_rx(joiner_id, vec![0u8; 4]).await.unwrap_err();
        assert!(matches!(err, JoinerError::NotAdmitted));
    }

    #[tokio::test]
    async fn steering_rejection_takes_priority_over_pool_full() {
        struct AdmitAllHandler;
        impl JoinerHandler for AdmitAllHandler {
            fn on_joiner_request(&self, _joiner_id: JoinerId) -> Option<Vec<u8>> {
                Some(b"pskd".to_vec())
            }
            fn on_joiner_finalize(&self, _joiner_id: JoinerId, _vendor: &crate::handler::VendorInfo) -> bool {
                true
            }
        }

        // Steering data admits nobody and the pool is already full; a
        // joiner failing both checks must surface as `NotAdmitted`, not
        // `PoolFull` — admission is decided before capacity is.
        let pool = JoinerPool::new(
            0,
            SteeringData::admit_none(2),
            Arc::new(AdmitAllHandler),
            Arc::new(CountingSink(Arc::new(AtomicUsize::new(0)))),
        );
        let joiner_id = JoinerId([1, 2, 3, 4, 5, 6, 7, 8]);
        let err = pool.on_relay_rx(joiner_id, vec![0u8; 4]).await.unwrap_err();
        assert!(matches!(err, JoinerError::NotAdmitted));
    }

    #[tokio::test]
    async fn pool_full_rejects_an_admitted_joiner() {
        struct AdmitAllHandler;
        impl JoinerHandler for AdmitAllHandler {
            fn on_joiner_request(&self, _joiner_id: JoinerId) -> Option<Vec<u8>> {
                Some(b"pskd".to_vec())
            }
            fn on_joiner_finalize(&self, _joiner_id: JoinerId, _vendor: &crate::handler::VendorInfo) -> bool {
                true
            }
        }

        let pool = JoinerPool::new(
            0,
            SteeringData::admit_all(2),
            Arc::new(AdmitAllHandler),
            Arc::new(CountingSink(Arc::new(AtomicUsize::new(0)))),
        );
        let joiner_id = JoinerId([1, 2, 3, 4, 5, 6, 7, 8]);
        let err = pool.on_relay_rx(joiner_id, vec![0u8; 4]).await.unwrap_err();
        assert!(matches!(err, JoinerError::PoolFull));
    }
}
