//! `Commissioner`: the façade exposing every layer below as one
//! asynchronous-and-synchronous API, with handler callbacks serialized
//! behind a single lock (spec §4.7).

use std::cell::Cell;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex as StdMutex};

use commissioner_joiner::{JoinerPool, RelayTxSink};
use commissioner_session::session::CommissionerSession;
use commissioner_token::manager::TokenManager;
use commissioner_transport::coap::{CoapEngine, ContentFormat, InboundRequest};
use commissioner_transport::dtls::DtlsEndpoint;
use commissioner_types::dataset::{ActiveDataset, BbrDataset, CommissionerDataset, PendingDataset};
use commissioner_types::ids::{JoinerId, SteeringData};
use commissioner_types::tlv::{Tlv, TlvSet};
use commissioner_types::{meshcop, uri};
use tokio::sync::Mutex;

use crate::config::CommissionerConfig;
use crate::error::{Error, ErrorCode};
use crate::handler::{CommissionerHandler, JoinerHandlerAdapter, SessionHandlerAdapter};

type Result<T> = std::result::Result<T, Error>;

thread_local! {
    /// Set for the duration of any `CommissionerHandler` callback running
    /// on this thread. The synchronous API checks this before blocking, so
    /// a handler that calls back into a sync method fails fast with
    /// `InvalidState` instead of deadlocking against itself.
    static IN_HANDLER: Cell<bool> = const { Cell::new(false) };
}

fn require_not_in_handler() -> Result<()> {
    if IN_HANDLER.with(|f| f.get()) {
        return Err(Error::new(
            ErrorCode::InvalidState,
            "synchronous API called from within a handler callback",
        ));
    }
    Ok(())
}

/// Wraps the application's handler so every callback runs under one lock
/// (no two callbacks overlap, matching spec §4.7) and with `IN_HANDLER`
/// set for the callback's duration.
struct SerializingHandler {
    inner: Arc<dyn CommissionerHandler>,
    lock: StdMutex<()>,
}

impl SerializingHandler {
    fn dispatch<R>(&self, f: impl FnOnce(&dyn CommissionerHandler) -> R) -> R {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        IN_HANDLER.with(|flag| flag.set(true));
        let result = f(self.inner.as_ref());
        IN_HANDLER.with(|flag| flag.set(false));
        result
    }
}

impl CommissionerHandler for SerializingHandler {
    fn on_keep_alive_failed(&self, reason: &str) {
        self.dispatch(|h| h.on_keep_alive_failed(reason));
    }
    fn on_pan_id_conflict(&self, tlvs: &TlvSet) {
        self.dispatch(|h| h.on_pan_id_conflict(tlvs));
    }
    fn on_energy_report(&self, tlvs: &TlvSet) {
        self.dispatch(|h| h.on_energy_report(tlvs));
    }
    fn on_dataset_changed(&self) {
        self.dispatch(|h| h.on_dataset_changed());
    }
    fn on_diag_get_answer(&self, tlvs: &TlvSet) {
        self.dispatch(|h| h.on_diag_get_answer(tlvs));
    }
    fn on_joiner_request(&self, joiner_id: JoinerId) -> Option<Vec<u8>> {
        self.dispatch(|h| h.on_joiner_request(joiner_id))
    }
    fn on_joiner_connected(&self, joiner_id: JoinerId) {
        self.dispatch(|h| h.on_joiner_connected(joiner_id));
    }
    fn on_joiner_finalize(&self, joiner_id: JoinerId, vendor: &commissioner_joiner::VendorInfo) -> bool {
        self.dispatch(|h| h.on_joiner_finalize(joiner_id, vendor))
    }
}

/// Forwards joiner-pool outbound datagrams to the Border Agent as
/// `RELAY_TX.ntf`, wrapping each in the Joiner IID / DTLS Encapsulation
/// TLVs the Border Agent expects.
struct RelayTxForwarder {
    engine: Arc<CoapEngine>,
}

impl RelayTxSink for RelayTxForwarder {
    fn send_relay_tx(&self, joiner_id: JoinerId, frame: Vec<u8>) {
        let engine = self.engine.clone();
        tokio::spawn(async move {
            let tlvs = TlvSet::new()
                .with(Tlv::new(meshcop::JOINER_IID, joiner_id.as_bytes().to_vec()))
                .with(Tlv::new(meshcop::JOINER_DTLS_ENCAPSULATION, frame));
            let encoded = match tlvs.encode() {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to encode RELAY_TX TLVs");
                    return;
                }
            };
            if let Err(e) = engine
                .send_non_confirmable(uri::RELAY_TX, encoded, Some(ContentFormat::OctetStream))
                .await
            {
                tracing::warn!(?joiner_id, error = %e, "RELAY_TX send failed");
            }
        });
    }
}

/// The commissioner façade: one Border Agent session plus its joiner pool.
pub struct Commissioner {
    session: Arc<Mutex<CommissionerSession>>,
    pool: Arc<JoinerPool>,
    token_manager: Option<Arc<Mutex<TokenManager>>>,
    dispatch_task: tokio::task::JoinHandle<()>,
}

impl Commissioner {
    /// Establish the DTLS connection to `border_agent_addr` and build
    /// every layer above it. Does not petition — call [`petition`] next.
    pub async fn connect(
        config: CommissionerConfig,
        border_agent_addr: SocketAddr,
        handler: Arc<dyn CommissionerHandler>,
    ) -> Result<Self> {
        config.validate()?;

        let serialized: Arc<dyn CommissionerHandler> = Arc::new(SerializingHandler {
            inner: handler,
            lock: StdMutex::new(()),
        });

        let CommissionerConfig {
            commissioner_id,
            enable_ccm,
            keep_alive_interval,
            max_connection_num,
            domain_name,
            pskc,
            ccm_credentials,
            commissioner_token,
            ..
        } = config;

        let endpoint = if enable_ccm {
            let credentials = ccm_credentials
                .as_ref()
                .ok_or_else(|| Error::new(ErrorCode::InvalidArgs, "CCM requires credentials"))?;
            DtlsEndpoint::connect_cert(
                border_agent_addr,
                credentials.client_certificate.clone(),
                credentials.trust_anchor_der.clone(),
            )
            .await?
        } else {
            let pskc = pskc.ok_or_else(|| Error::new(ErrorCode::InvalidArgs, "non-CCM requires a PSKc"))?;
            DtlsEndpoint::connect_psk(border_agent_addr, commissioner_id.as_bytes(), pskc).await?
        };

        let (engine, inbound) = CoapEngine::new(Arc::new(endpoint));
        let engine = Arc::new(engine);

        let token_manager = if enable_ccm {
            let credentials = ccm_credentials.expect("validated above");
            let mut manager = TokenManager::new(
                commissioner_id.clone(),
                domain_name.expect("validated above"),
                credentials.signing_key,
            );
            if let Some(token) = commissioner_token {
                manager.set_token(token, &credentials.registrar_key)?;
            }
            Some(Arc::new(Mutex::new(manager)))
        } else {
            None
        };

        let session_handler = Arc::new(SessionHandlerAdapter(serialized.clone()));
        let session = CommissionerSession::new(
            engine.clone(),
            commissioner_id,
            keep_alive_interval,
            enable_ccm,
            token_manager.clone(),
            session_handler,
        )?;
        let session = Arc::new(Mutex::new(session));

        let joiner_handler = Arc::new(JoinerHandlerAdapter(serialized.clone()));
        let relay_tx = Arc::new(RelayTxForwarder { engine: engine.clone() });
        let pool = Arc::new(JoinerPool::new(
            max_connection_num,
            SteeringData::admit_none(0),
            joiner_handler,
            relay_tx,
        ));

        let dispatch_task = spawn_inbound_dispatch(inbound, pool.clone(), serialized.clone());

        Ok(Self {
            session,
            pool,
            token_manager,
            dispatch_task,
        })
    }

    /// Petition the Leader for commissioner authority.
    pub async fn petition(&self) -> Result<()> {
        self.session.lock().await.petition().await.map_err(Into::into)
    }

    pub fn petition_sync(&self) -> Result<()> {
        require_not_in_handler()?;
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(self.petition()))
    }

    /// Resign from the commissioner role.
    pub async fn resign(&self) -> Result<()> {
        self.session.lock().await.resign().await.map_err(Into::into)
    }

    pub fn resign_sync(&self) -> Result<()> {
        require_not_in_handler()?;
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(self.resign()))
    }

    /// Request a fresh COM_TOK from the domain registrar. Only meaningful
    /// under CCM, and only needed if the configuration didn't already seed
    /// one via `CommissionerToken`.
    pub async fn request_token(
        &self,
        registrar_addr: SocketAddr,
        client_cert: webrtc_dtls::crypto::Certificate,
        trust_anchor_der: Vec<u8>,
        registrar_key: &commissioner_crypto::ecdsa::VerifyingKey,
    ) -> Result<()> {
        let manager = self
            .token_manager
            .as_ref()
            .ok_or_else(|| Error::new(ErrorCode::InvalidState, "token manager only exists under CCM"))?;
        manager
            .lock()
            .await
            .request_token(registrar_addr, client_cert, trust_anchor_der, registrar_key)
            .await
            .map_err(Into::into)
    }

    pub fn request_token_sync(
        &self,
        registrar_addr: SocketAddr,
        client_cert: webrtc_dtls::crypto::Certificate,
        trust_anchor_der: Vec<u8>,
        registrar_key: &commissioner_crypto::ecdsa::VerifyingKey,
    ) -> Result<()> {
        require_not_in_handler()?;
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(self.request_token(
                registrar_addr,
                client_cert,
                trust_anchor_der,
                registrar_key,
            ))
        })
    }

    /// Abort every pending CoAP request against the Border Agent with
    /// `Cancelled`; no further completion fires for them (spec §5).
    pub async fn cancel_requests(&self) {
        self.session.lock().await.cancel_requests().await;
    }

    pub fn cancel_requests_sync(&self) {
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(self.cancel_requests()));
    }

    pub async fn get_active_dataset(&self) -> Result<ActiveDataset> {
        self.session.lock().await.get_active_dataset().await.map_err(Into::into)
    }

    pub fn get_active_dataset_sync(&self) -> Result<ActiveDataset> {
        require_not_in_handler()?;
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(self.get_active_dataset()))
    }

    pub async fn set_active_dataset(&self, dataset: &ActiveDataset) -> Result<()> {
        self.session
            .lock()
            .await
            .set_active_dataset(dataset)
            .await
            .map_err(Into::into)
    }

    pub fn set_active_dataset_sync(&self, dataset: &ActiveDataset) -> Result<()> {
        require_not_in_handler()?;
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(self.set_active_dataset(dataset)))
    }

    /// Returns the raw, uninterpreted Active Dataset TLV bytes exactly as
    /// received from the Leader (spec §4.4 "Raw" variants).
    pub async fn get_active_dataset_raw(&self) -> Result<Vec<u8>> {
        self.session.lock().await.get_active_dataset_raw().await.map_err(Into::into)
    }

    pub async fn get_pending_dataset(&self) -> Result<PendingDataset> {
        self.session.lock().await.get_pending_dataset().await.map_err(Into::into)
    }

    pub fn get_pending_dataset_sync(&self) -> Result<PendingDataset> {
        require_not_in_handler()?;
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(self.get_pending_dataset()))
    }

    /// Returns the raw, uninterpreted Pending Dataset TLV bytes exactly as
    /// received from the Leader.
    pub async fn get_pending_dataset_raw(&self) -> Result<Vec<u8>> {
        self.session.lock().await.get_pending_dataset_raw().await.map_err(Into::into)
    }

    pub async fn set_pending_dataset(&self, dataset: &PendingDataset) -> Result<()> {
        self.session
            .lock()
            .await
            .set_pending_dataset(dataset)
            .await
            .map_err(Into::into)
    }

    pub fn set_pending_dataset_sync(&self, dataset: &PendingDataset) -> Result<()> {
        require_not_in_handler()?;
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(self.set_pending_dataset(dataset)))
    }

    pub async fn set_secure_pending_dataset(&self, dataset: &PendingDataset) -> Result<()> {
        self.session
            .lock()
            .await
            .set_secure_pending_dataset(dataset)
            .await
            .map_err(Into::into)
    }

    pub fn set_secure_pending_dataset_sync(&self, dataset: &PendingDataset) -> Result<()> {
        require_not_in_handler()?;
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(self.set_secure_pending_dataset(dataset))
        })
    }

    pub async fn get_commissioner_dataset(&self) -> Result<CommissionerDataset> {
        self.session
            .lock()
            .await
            .get_commissioner_dataset()
            .await
            .map_err(Into::into)
    }

    pub fn get_commissioner_dataset_sync(&self) -> Result<CommissionerDataset> {
        require_not_in_handler()?;
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(self.get_commissioner_dataset()))
    }

    /// Set the commissioner dataset and, if it carries steering data,
    /// install that same admission policy into the joiner pool — the
    /// pool's copy governs `RELAY_RX` admission locally, while the
    /// dataset push is what actually reaches the Leader.
    pub async fn set_commissioner_dataset(&self, dataset: &CommissionerDataset) -> Result<()> {
        self.session
            .lock()
            .await
            .set_commissioner_dataset(dataset)
            .await?;
        if let Some(steering) = &dataset.steering_data {
            self.pool.set_steering_data(SteeringData::from_bytes(steering.clone())).await;
        }
        Ok(())
    }

    pub fn set_commissioner_dataset_sync(&self, dataset: &CommissionerDataset) -> Result<()> {
        require_not_in_handler()?;
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(self.set_commissioner_dataset(dataset))
        })
    }

    pub async fn get_bbr_dataset(&self) -> Result<BbrDataset> {
        self.session.lock().await.get_bbr_dataset().await.map_err(Into::into)
    }

    pub fn get_bbr_dataset_sync(&self) -> Result<BbrDataset> {
        require_not_in_handler()?;
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(self.get_bbr_dataset()))
    }

    pub async fn get_bbr_dataset_raw(&self) -> Result<Vec<u8>> {
        self.session.lock().await.get_bbr_dataset_raw().await.map_err(Into::into)
    }

    pub async fn set_bbr_dataset(&self, dataset: &BbrDataset) -> Result<()> {
        self.session.lock().await.set_bbr_dataset(dataset).await.map_err(Into::into)
    }

    pub fn set_bbr_dataset_sync(&self, dataset: &BbrDataset) -> Result<()> {
        require_not_in_handler()?;
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(self.set_bbr_dataset(dataset)))
    }

    pub async fn set_bbr_dataset_raw(&self, tlvs: TlvSet) -> Result<()> {
        self.session.lock().await.set_bbr_dataset_raw(tlvs).await.map_err(Into::into)
    }

    pub async fn announce_begin(&self, channel_mask: Vec<u8>, count: u8, period: u16) -> Result<()> {
        self.session
            .lock()
            .await
            .announce_begin(channel_mask, count, period)
            .await
            .map_err(Into::into)
    }

    pub fn announce_begin_sync(&self, channel_mask: Vec<u8>, count: u8, period: u16) -> Result<()> {
        require_not_in_handler()?;
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(self.announce_begin(channel_mask, count, period))
        })
    }

    pub async fn pan_id_query(&self, channel_mask: Vec<u8>, pan_id: u16) -> Result<()> {
        self.session
            .lock()
            .await
            .pan_id_query(channel_mask, pan_id)
            .await
            .map_err(Into::into)
    }

    pub fn pan_id_query_sync(&self, channel_mask: Vec<u8>, pan_id: u16) -> Result<()> {
        require_not_in_handler()?;
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(self.pan_id_query(channel_mask, pan_id)))
    }

    pub async fn energy_scan(&self, channel_mask: Vec<u8>, count: u8, period: u16, scan_duration: u16) -> Result<()> {
        self.session
            .lock()
            .await
            .energy_scan(channel_mask, count, period, scan_duration)
            .await
            .map_err(Into::into)
    }

    pub fn energy_scan_sync(&self, channel_mask: Vec<u8>, count: u8, period: u16, scan_duration: u16) -> Result<()> {
        require_not_in_handler()?;
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(self.energy_scan(channel_mask, count, period, scan_duration))
        })
    }

    pub async fn register_multicast_listener(&self, addresses: Vec<[u8; 16]>, timeout: u32) -> Result<()> {
        self.session
            .lock()
            .await
            .register_multicast_listener(addresses, timeout)
            .await
            .map_err(Into::into)
    }

    pub fn register_multicast_listener_sync(&self, addresses: Vec<[u8; 16]>, timeout: u32) -> Result<()> {
        require_not_in_handler()?;
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(self.register_multicast_listener(addresses, timeout))
        })
    }

    /// `MGMT_REENROLL.ntf`: directs a specific device (identified by
    /// `target_tlvs`, typically an EUI-64) to redo its commissioning.
    pub async fn command_reenroll(&self, target_tlvs: TlvSet) -> Result<()> {
        self.session.lock().await.command_reenroll(target_tlvs).await.map_err(Into::into)
    }

    pub fn command_reenroll_sync(&self, target_tlvs: TlvSet) -> Result<()> {
        require_not_in_handler()?;
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(self.command_reenroll(target_tlvs)))
    }

    /// `MGMT_DOMAIN_RESET.ntf`: directs a specific device to leave its
    /// domain and restart commissioning from scratch.
    pub async fn command_domain_reset(&self, target_tlvs: TlvSet) -> Result<()> {
        self.session.lock().await.command_domain_reset(target_tlvs).await.map_err(Into::into)
    }

    pub fn command_domain_reset_sync(&self, target_tlvs: TlvSet) -> Result<()> {
        require_not_in_handler()?;
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(self.command_domain_reset(target_tlvs)))
    }

    /// `MGMT_NET_MIGRATE.ntf`: directs a specific device to migrate to a
    /// different network.
    pub async fn command_migrate(&self, target_tlvs: TlvSet) -> Result<()> {
        self.session.lock().await.command_migrate(target_tlvs).await.map_err(Into::into)
    }

    pub fn command_migrate_sync(&self, target_tlvs: TlvSet) -> Result<()> {
        require_not_in_handler()?;
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(self.command_migrate(target_tlvs)))
    }

    pub async fn command_diag_get_query(&self, diagnostic_tlv_types: Vec<u8>) -> Result<()> {
        self.session
            .lock()
            .await
            .command_diag_get_query(diagnostic_tlv_types)
            .await
            .map_err(Into::into)
    }

    pub fn command_diag_get_query_sync(&self, diagnostic_tlv_types: Vec<u8>) -> Result<()> {
        require_not_in_handler()?;
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(self.command_diag_get_query(diagnostic_tlv_types))
        })
    }

    pub async fn command_diag_reset(&self, diagnostic_tlv_types: Vec<u8>) -> Result<()> {
        self.session
            .lock()
            .await
            .command_diag_reset(diagnostic_tlv_types)
            .await
            .map_err(Into::into)
    }

    pub fn command_diag_reset_sync(&self, diagnostic_tlv_types: Vec<u8>) -> Result<()> {
        require_not_in_handler()?;
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(self.command_diag_reset(diagnostic_tlv_types))
        })
    }

    /// Number of joiner sessions currently mid-handshake.
    pub async fn active_joiner_sessions(&self) -> usize {
        self.pool.active_session_count().await
    }
}

impl Drop for Commissioner {
    fn drop(&mut self) {
        self.dispatch_task.abort();
    }
}

fn spawn_inbound_dispatch(
    mut inbound: tokio::sync::mpsc::UnboundedReceiver<InboundRequest>,
    pool: Arc<JoinerPool>,
    handler: Arc<dyn CommissionerHandler>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(request) = inbound.recv().await {
            if let Err(e) = dispatch_inbound(&request, &pool, handler.as_ref()).await {
                tracing::warn!(uri_path = %request.uri_path, error = %e, "failed to handle inbound notification");
            }
        }
    })
}

async fn dispatch_inbound(request: &InboundRequest, pool: &Arc<JoinerPool>, handler: &dyn CommissionerHandler) -> Result<()> {
    match request.uri_path.as_str() {
        uri::RELAY_RX => {
            let tlvs = TlvSet::decode(&request.payload)?;
            let joiner_id = tlvs
                .get(meshcop::JOINER_IID)
                .and_then(|t| <[u8; 8]>::try_from(t.value.as_slice()).ok())
                .map(JoinerId)
                .ok_or_else(|| Error::new(ErrorCode::BadFormat, "RELAY_RX missing Joiner IID"))?;
            let frame = tlvs
                .get(meshcop::JOINER_DTLS_ENCAPSULATION)
                .map(|t| t.value.clone())
                .ok_or_else(|| Error::new(ErrorCode::BadFormat, "RELAY_RX missing DTLS encapsulation"))?;
            pool.on_relay_rx(joiner_id, frame).await?;
        }
        uri::MGMT_PANID_CONFLICT => {
            let tlvs = TlvSet::decode(&request.payload)?;
            handler.on_pan_id_conflict(&tlvs);
        }
        uri::MGMT_ED_REPORT => {
            let tlvs = TlvSet::decode(&request.payload)?;
            handler.on_energy_report(&tlvs);
        }
        uri::MGMT_DATASET_CHANGED => {
            handler.on_dataset_changed();
        }
        uri::DIAG_GET_ANSWER => {
            let tlvs = TlvSet::decode(&request.payload)?;
            handler.on_diag_get_answer(&tlvs);
        }
        other => {
            tracing::debug!(uri_path = other, "ignoring unrecognized inbound notification");
        }
    }
    Ok(())
}
