//! `CommissionerSession`: petition/resign/keep-alive, dataset GET/SET, and
//! the MeshCoP management command set.

use std::sync::Arc;
use std::time::Duration;

use coap_lite::{MessageClass, RequestType, ResponseType};
use commissioner_token::manager::TokenManager;
use commissioner_transport::coap::{CoapEngine, ContentFormat};
use commissioner_types::dataset::{ActiveDataset, BbrDataset, CommissionerDataset, PendingDataset};
use commissioner_types::meshcop;
use commissioner_types::tlv::{Tlv, TlvSet};
use commissioner_types::uri;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::state::{validate_keep_alive_interval, CommissionerState};
use crate::{Result, SessionError};

/// Reports the Leader/Border Agent pushes to the commissioner
/// unsolicited — i.e. not as the direct response to a request the
/// commissioner sent.
pub trait SessionHandler: Send + Sync {
    /// A keep-alive cycle failed (missed response or explicit reject); the
    /// session has already transitioned to `Disabled`.
    fn on_keep_alive_failed(&self, _reason: &str) {}
    /// `MGMT_PANID_CONFLICT.ans` arrived.
    fn on_pan_id_conflict(&self, _tlvs: &TlvSet) {}
    /// `MGMT_ED_REPORT.ans` arrived.
    fn on_energy_report(&self, _tlvs: &TlvSet) {}
    /// `MGMT_DATASET_CHANGED.ans` arrived.
    fn on_dataset_changed(&self) {}
    /// `DIAG_GET.ans` arrived.
    fn on_diag_get_answer(&self, _tlvs: &TlvSet) {}
}

/// A no-op handler for callers who only care about request/response
/// operations and not unsolicited reports.
pub struct NullSessionHandler;
impl SessionHandler for NullSessionHandler {}

/// A live commissioner session against one Thread Leader.
pub struct CommissionerSession {
    state: CommissionerState,
    engine: Arc<CoapEngine>,
    commissioner_id: String,
    enable_ccm: bool,
    token_manager: Option<Arc<Mutex<TokenManager>>>,
    keep_alive_interval: Duration,
    session_id: Option<u16>,
    keep_alive_task: Option<JoinHandle<()>>,
    handler: Arc<dyn SessionHandler>,
}

impl CommissionerSession {
    /// Construct a session bound to an already-connected CoAP engine. The
    /// keep-alive interval is validated here, per spec: an out-of-range
    /// value fails construction rather than being silently clamped.
    pub fn new(
        engine: Arc<CoapEngine>,
        commissioner_id: String,
        keep_alive_interval: Duration,
        enable_ccm: bool,
        token_manager: Option<Arc<Mutex<TokenManager>>>,
        handler: Arc<dyn SessionHandler>,
    ) -> Result<Self> {
        let keep_alive_interval = validate_keep_alive_interval(keep_alive_interval)?;
        Ok(Self {
            state: CommissionerState::Connected,
            engine,
            commissioner_id,
            enable_ccm,
            token_manager,
            keep_alive_interval,
            session_id: None,
            keep_alive_task: None,
            handler,
        })
    }

    pub fn state(&self) -> CommissionerState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Petition the Leader for commissioner authority.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Rejected`] if the Leader's State TLV is
    /// Reject, carrying the existing commissioner id if the response
    /// included one.
    pub async fn petition(&mut self) -> Result<()> {
        self.state = CommissionerState::Petitioning;

        let mut tlvs = TlvSet::new().with(Tlv::new(meshcop::COMMISSIONER_ID, self.commissioner_id.as_bytes().to_vec()));

        if self.enable_ccm {
            if let Some(token_manager) = &self.token_manager {
                let mut manager = token_manager.lock().await;
                tlvs = manager.sign_message(uri::PETITIONING, &tlvs)?;
            }
        }

        let response = self
            .engine
            .request(RequestType::Post, uri::PETITIONING, tlvs.encode()?, Some(ContentFormat::OctetStream))
            .await?;

        let response_tlvs = decode_response_tlvs(&response)?;
        let accepted = response_state_accepted(&response_tlvs)?;

        if !accepted {
            self.state = CommissionerState::Connected;
            let existing_commissioner_id = response_tlvs
                .get(meshcop::COMMISSIONER_ID)
                .map(|tlv| String::from_utf8_lossy(&tlv.value).to_string());
            return Err(SessionError::Rejected {
                existing_commissioner_id,
            });
        }

        self.session_id = response_tlvs
            .get(meshcop::COMMISSIONER_SESSION_ID)
            .and_then(|tlv| <[u8; 2]>::try_from(tlv.value.as_slice()).ok())
            .map(u16::from_be_bytes);

        self.state = CommissionerState::Active;
        self.start_keep_alive();
        Ok(())
    }

    /// Resign from the commissioner role: send `COMM_KA{Reject}` and close.
    pub async fn resign(&mut self) -> Result<()> {
        self.stop_keep_alive();
        if self.state.is_active() {
            let tlvs = TlvSet::new().with(Tlv::new(meshcop::STATE, vec![meshcop::state::REJECT as u8]));
            let _ = self
                .engine
                .request(RequestType::Post, uri::KEEP_ALIVE, tlvs.encode()?, Some(ContentFormat::OctetStream))
                .await;
        }
        self.engine.cancel_all().await;
        self.state = CommissionerState::Disabled;
        Ok(())
    }

    fn start_keep_alive(&mut self) {
        let engine = self.engine.clone();
        let interval_duration = self.keep_alive_interval;
        let session_id = self.session_id;
        let handler = self.handler.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(interval_duration);
            loop {
                interval.tick().await;
                let tlvs = TlvSet::new().with(Tlv::new(meshcop::STATE, vec![meshcop::state::ACCEPT as u8]));
                let encoded = match tlvs.encode() {
                    Ok(e) => e,
                    Err(_) => continue,
                };
                let result = engine
                    .request(RequestType::Post, uri::KEEP_ALIVE, encoded, Some(ContentFormat::OctetStream))
                    .await;

                match result {
                    Ok(_) => {
                        tracing::debug!(?session_id, "keep-alive ok");
                    }
                    Err(e) => {
                        tracing::warn!(?session_id, error = %e, "keep-alive failed");
                        handler.on_keep_alive_failed(&e.to_string());
                        return;
                    }
                }
            }
        });
        self.keep_alive_task = Some(handle);
    }

    fn stop_keep_alive(&mut self) {
        if let Some(handle) = self.keep_alive_task.take() {
            handle.abort();
        }
    }

    /// Abort every pending CoAP request on this session's engine with
    /// `Cancelled`, without otherwise changing session state (spec §5).
    pub async fn cancel_requests(&self) {
        self.engine.cancel_all().await;
    }

    async fn get_dataset_raw(&self, uri_path: &str, query_tlvs: &[u8]) -> Result<Vec<u8>> {
        self.require_active()?;
        let response = self
            .engine
            .request(RequestType::Get, uri_path, query_tlvs.to_vec(), Some(ContentFormat::OctetStream))
            .await?;
        Ok(response.payload)
    }

    async fn set_dataset_raw(&self, uri_path: &str, tlvs: TlvSet) -> Result<()> {
        self.require_active()?;
        let signed = self.maybe_sign(uri_path, tlvs).await?;
        let response = self
            .engine
            .request(RequestType::Post, uri_path, signed.encode()?, Some(ContentFormat::OctetStream))
            .await?;
        let response_tlvs = decode_response_tlvs(&response)?;
        if !response_state_accepted(&response_tlvs)? {
            return Err(SessionError::Rejected {
                existing_commissioner_id: None,
            });
        }
        Ok(())
    }

    async fn maybe_sign(&self, uri_path: &str, tlvs: TlvSet) -> Result<TlvSet> {
        if !self.enable_ccm {
            return Ok(tlvs);
        }
        let Some(token_manager) = &self.token_manager else {
            return Ok(tlvs);
        };
        let mut manager = token_manager.lock().await;
        Ok(manager.sign_message(uri_path, &tlvs)?)
    }

    fn require_active(&self) -> Result<()> {
        if !self.state.is_active() {
            return Err(SessionError::InvalidState(
                "session must be Active for dataset/management operations".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn get_active_dataset(&self) -> Result<ActiveDataset> {
        let raw = self.get_active_dataset_raw().await?;
        Ok(ActiveDataset::decode(&raw)?)
    }

    pub async fn get_active_dataset_raw(&self) -> Result<Vec<u8>> {
        self.get_dataset_raw(uri::MGMT_ACTIVE_GET, &[]).await
    }

    pub async fn set_active_dataset(&self, dataset: &ActiveDataset) -> Result<()> {
        let tlvs = TlvSet::decode(&dataset.encode()?)?;
        self.set_dataset_raw(uri::MGMT_ACTIVE_SET, tlvs).await
    }

    pub async fn get_pending_dataset(&self) -> Result<PendingDataset> {
        let raw = self.get_pending_dataset_raw().await?;
        Ok(PendingDataset::decode(&raw)?)
    }

    pub async fn get_pending_dataset_raw(&self) -> Result<Vec<u8>> {
        self.get_dataset_raw(uri::MGMT_PENDING_GET, &[]).await
    }

    pub async fn set_pending_dataset(&self, dataset: &PendingDataset) -> Result<()> {
        let tlvs = TlvSet::decode(&dataset.encode()?)?;
        self.set_dataset_raw(uri::MGMT_PENDING_SET, tlvs).await
    }

    /// `MGMT_SEC_PENDING_SET.req`: like [`set_pending_dataset`] but always
    /// signed, used when pushing a pending dataset through an
    /// already-established CCM-secured channel.
    pub async fn set_secure_pending_dataset(&self, dataset: &PendingDataset) -> Result<()> {
        let tlvs = TlvSet::decode(&dataset.encode()?)?;
        self.set_dataset_raw(uri::MGMT_SECURE_PENDING_SET, tlvs).await
    }

    pub async fn get_commissioner_dataset(&self) -> Result<CommissionerDataset> {
        let raw = self.get_dataset_raw(uri::MGMT_COMMISSIONER_GET, &[]).await?;
        Ok(CommissionerDataset::decode(&raw)?)
    }

    pub async fn set_commissioner_dataset(&self, dataset: &CommissionerDataset) -> Result<()> {
        let tlvs = TlvSet::decode(&dataset.encode()?)?;
        self.set_dataset_raw(uri::MGMT_COMMISSIONER_SET, tlvs).await
    }

    pub async fn get_bbr_dataset(&self) -> Result<BbrDataset> {
        let raw = self.get_bbr_dataset_raw().await?;
        Ok(BbrDataset::decode(&raw)?)
    }

    pub async fn get_bbr_dataset_raw(&self) -> Result<Vec<u8>> {
        self.get_dataset_raw(uri::MGMT_BBR_GET, &[]).await
    }

    pub async fn set_bbr_dataset(&self, dataset: &BbrDataset) -> Result<()> {
        let tlvs = TlvSet::decode(&dataset.encode()?)?;
        self.set_bbr_dataset_raw(tlvs).await
    }

    pub async fn set_bbr_dataset_raw(&self, tlvs: TlvSet) -> Result<()> {
        self.set_dataset_raw(uri::MGMT_BBR_SET, tlvs).await
    }

    /// `MGMT_ANNOUNCE_BEGIN.ntf`: multicast, fire-and-forget.
    pub async fn announce_begin(&self, channel_mask: Vec<u8>, count: u8, period: u16) -> Result<()> {
        self.require_active()?;
        let tlvs = TlvSet::new()
            .with(Tlv::new(meshcop::CHANNEL_MASK, channel_mask))
            .with(Tlv::new(meshcop::COUNT, vec![count]))
            .with(Tlv::new(meshcop::PERIOD, period.to_be_bytes().to_vec()))
            .clone();
        self.engine
            .send_non_confirmable(uri::MGMT_ANNOUNCE_BEGIN, tlvs.encode()?, Some(ContentFormat::OctetStream))
            .await?;
        Ok(())
    }

    /// `MGMT_PANID_QUERY.req`: multicast, fire-and-forget; the result
    /// arrives later as `on_pan_id_conflict`.
    pub async fn pan_id_query(&self, channel_mask: Vec<u8>, pan_id: u16) -> Result<()> {
        self.require_active()?;
        let tlvs = TlvSet::new()
            .with(Tlv::new(meshcop::CHANNEL_MASK, channel_mask))
            .with(Tlv::new(meshcop::PAN_ID, pan_id.to_be_bytes().to_vec()))
            .clone();
        self.engine
            .send_non_confirmable(uri::MGMT_PANID_QUERY, tlvs.encode()?, Some(ContentFormat::OctetStream))
            .await?;
        Ok(())
    }

    /// `MGMT_ED_SCAN.req`: multicast, fire-and-forget; the result arrives
    /// later as `on_energy_report`.
    pub async fn energy_scan(&self, channel_mask: Vec<u8>, count: u8, period: u16, scan_duration: u16) -> Result<()> {
        self.require_active()?;
        let tlvs = TlvSet::new()
            .with(Tlv::new(meshcop::CHANNEL_MASK, channel_mask))
            .with(Tlv::new(meshcop::COUNT, vec![count]))
            .with(Tlv::new(meshcop::PERIOD, period.to_be_bytes().to_vec()))
            .with(Tlv::new(meshcop::SCAN_DURATION, scan_duration.to_be_bytes().to_vec()))
            .clone();
        self.engine
            .send_non_confirmable(uri::MGMT_ED_SCAN, tlvs.encode()?, Some(ContentFormat::OctetStream))
            .await?;
        Ok(())
    }

    /// `MLR.req`: unicast to the Primary BBR, Confirmable.
    pub async fn register_multicast_listener(&self, addresses: Vec<[u8; 16]>, timeout: u32) -> Result<()> {
        self.require_active()?;
        let mut tlvs = TlvSet::new();
        for address in addresses {
            tlvs.push(Tlv::new(meshcop::IPV6_ADDRESS, address.to_vec()));
        }
        tlvs.push(Tlv::new(meshcop::DELAY_TIMER, timeout.to_be_bytes().to_vec()));
        let response = self
            .engine
            .request(
                RequestType::Post,
                uri::MULTICAST_LISTENER_REGISTRATION,
                tlvs.encode()?,
                Some(ContentFormat::OctetStream),
            )
            .await?;
        let response_tlvs = decode_response_tlvs(&response)?;
        if !response_state_accepted(&response_tlvs)? {
            return Err(SessionError::Rejected {
                existing_commissioner_id: None,
            });
        }
        Ok(())
    }

    /// `MGMT_REENROLL.ntf`: unicast to a specific device, Confirmable.
    pub async fn command_reenroll(&self, target_tlvs: TlvSet) -> Result<()> {
        self.require_active()?;
        self.engine
            .request(RequestType::Post, uri::MGMT_REENROLL, target_tlvs.encode()?, Some(ContentFormat::OctetStream))
            .await?;
        Ok(())
    }

    /// `MGMT_DOMAIN_RESET.ntf`: unicast, Confirmable.
    pub async fn command_domain_reset(&self, target_tlvs: TlvSet) -> Result<()> {
        self.require_active()?;
        self.engine
            .request(RequestType::Post, uri::MGMT_DOMAIN_RESET, target_tlvs.encode()?, Some(ContentFormat::OctetStream))
            .await?;
        Ok(())
    }

    /// `MGMT_NET_MIGRATE.ntf`: unicast, Confirmable.
    pub async fn command_migrate(&self, target_tlvs: TlvSet) -> Result<()> {
        self.require_active()?;
        self.engine
            .request(RequestType::Post, uri::MGMT_NET_MIGRATE, target_tlvs.encode()?, Some(ContentFormat::OctetStream))
            .await?;
        Ok(())
    }

    /// `DIAG_GET.req` with a query: the answer arrives as
    /// `on_diag_get_answer` rather than as this call's return value,
    /// mirroring how the query can legitimately fan out to many devices.
    pub async fn command_diag_get_query(&self, diagnostic_tlv_types: Vec<u8>) -> Result<()> {
        self.require_active()?;
        let tlvs = TlvSet::new().with(Tlv::new(meshcop::GET, diagnostic_tlv_types)).clone();
        self.engine
            .send_non_confirmable(uri::DIAG_GET_QUERY, tlvs.encode()?, Some(ContentFormat::OctetStream))
            .await?;
        Ok(())
    }

    /// `DIAG_RST.ntf`: unicast, Confirmable.
    pub async fn command_diag_reset(&self, diagnostic_tlv_types: Vec<u8>) -> Result<()> {
        self.require_active()?;
        let tlvs = TlvSet::new().with(Tlv::new(meshcop::GET, diagnostic_tlv_types)).clone();
        self.engine
            .request(RequestType::Post, uri::DIAG_RESET, tlvs.encode()?, Some(ContentFormat::OctetStream))
            .await?;
        Ok(())
    }
}

fn decode_response_tlvs(response: &commissioner_transport::coap::CoapMessage) -> Result<TlvSet> {
    if !matches!(response.code, MessageClass::Response(ResponseType::Content | ResponseType::Changed)) {
        return Err(SessionError::InvalidState(format!(
            "unexpected response code {:?}",
            response.code
        )));
    }
    Ok(TlvSet::decode(&response.payload)?)
}

fn response_state_accepted(tlvs: &TlvSet) -> Result<bool> {
    let state = tlvs
        .get(meshcop::STATE)
        .and_then(|tlv| tlv.value.first())
        .copied()
        .map(|b| b as i8);
    Ok(state == Some(meshcop::state::ACCEPT))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_state_tlv_parses_true() {
        let tlvs = TlvSet::new().with(Tlv::new(meshcop::STATE, vec![meshcop::state::ACCEPT as u8]));
        assert!(response_state_accepted(&tlvs).expect("ok"));
    }

    #[test]
    fn reject_state_tlv_parses_false() {
        let tlvs = TlvSet::new().with(Tlv::new(meshcop::STATE, vec![meshcop::state::REJECT as u8]));
        assert!(!response_state_accepted(&tlvs).expect("ok"));
    }

    #[test]
    fn missing_state_tlv_is_not_accepted() {
        let tlvs = TlvSet::new();
        assert!(!response_state_accepted(&tlvs).expect("ok"));
    }
}
