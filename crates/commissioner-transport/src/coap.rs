//! CoAP request/response engine on top of a DTLS session.
//!
//! Message encode/decode is delegated to `coap-lite`; this module owns the
//! part that actually matters for a commissioner: token correlation,
//! exponential-backoff retransmission, and cancellation, per RFC 7252 §4.2.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use coap_lite::{CoapOption, CoapRequest, MessageClass, MessageType, Packet, RequestType};
use rand::RngCore;
use tokio::sync::{mpsc, oneshot, Mutex};

use crate::dtls::DtlsEndpoint;
use crate::{Result, TransportError};

/// Initial retransmission timeout. RFC 7252 §4.8.
pub const ACK_TIMEOUT: Duration = Duration::from_secs(2);
/// `ACK_TIMEOUT` is jittered by `+/- ACK_RANDOM_FACTOR` before the first
/// send, then doubled on each retransmission.
pub const ACK_RANDOM_FACTOR: f64 = 0.5;
/// Maximum number of retransmissions before a request times out.
pub const MAX_RETRANSMIT: u8 = 4;

/// CoAP Content-Format option values the commissioner protocol uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentFormat {
    OctetStream,
    CoseSign1,
    Cwt,
}

impl ContentFormat {
    fn to_option_value(self) -> u16 {
        match self {
            ContentFormat::OctetStream => 42,
            ContentFormat::CoseSign1 => 18,
            ContentFormat::Cwt => 61,
        }
    }

    fn from_option_value(value: u16) -> Option<Self> {
        match value {
            42 => Some(ContentFormat::OctetStream),
            18 => Some(ContentFormat::CoseSign1),
            61 => Some(ContentFormat::Cwt),
            _ => None,
        }
    }
}

/// A decoded CoAP response, stripped down to what callers need.
#[derive(Clone, Debug)]
pub struct CoapMessage {
    pub code: MessageClass,
    pub content_format: Option<ContentFormat>,
    pub payload: Vec<u8>,
}

/// A request pushed by the peer that doesn't correlate to anything this
/// engine sent — the Border Agent notifying the commissioner of
/// `RELAY_RX`, `PAN_ID_CONFLICT.ans`, `ED_REPORT.ans`, `DATASET_CHANGED.ans`,
/// or `DIAG_GET.ans`. All of these arrive Non-confirmable, so the engine
/// never needs to ACK them.
#[derive(Clone, Debug)]
pub struct InboundRequest {
    pub uri_path: String,
    pub payload: Vec<u8>,
}

struct PendingRequest {
    completion: oneshot::Sender<CoapMessage>,
}

/// Tracks one outstanding request's retransmission state, keyed by
/// `(token, peer)` exactly as the invariant in the commissioning protocol
/// requires (a token is only unique per peer, not globally).
struct RequestKey {
    token: Vec<u8>,
    peer: SocketAddr,
}

impl RequestKey {
    fn map_key(&self) -> (Vec<u8>, SocketAddr) {
        (self.token.clone(), self.peer)
    }
}

/// Owns one DTLS session and implements request/response CoAP messaging
/// over it: token correlation, retransmission, and cancellation.
pub struct CoapEngine {
    endpoint: Arc<DtlsEndpoint>,
    pending: Arc<Mutex<HashMap<(Vec<u8>, SocketAddr), PendingRequest>>>,
}

impl CoapEngine {
    /// Wrap an established DTLS endpoint and start its background receive
    /// loop, which demultiplexes incoming datagrams to pending requests by
    /// token. Datagrams that are themselves requests (peer-pushed
    /// notifications, not responses to anything this engine sent) are
    /// forwarded on the returned channel instead.
    pub fn new(endpoint: Arc<DtlsEndpoint>) -> (Self, mpsc::UnboundedReceiver<InboundRequest>) {
        let pending: Arc<Mutex<HashMap<(Vec<u8>, SocketAddr), PendingRequest>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        let recv_endpoint = endpoint.clone();
        let recv_pending = pending.clone();
        tokio::spawn(async move {
            recv_loop(recv_endpoint, recv_pending, inbound_tx).await;
        });

        (Self { endpoint, pending }, inbound_rx)
    }

    /// Send a confirmable POST/GET and wait for the matching response,
    /// retransmitting with exponential backoff until `MAX_RETRANSMIT` is
    /// exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Timeout`] if no ACK/response arrives
    /// within `MAX_RETRANSMIT` retransmissions.
    pub async fn request(
        &self,
        method: RequestType,
        uri_path: &str,
        payload: Vec<u8>,
        content_format: Option<ContentFormat>,
    ) -> Result<CoapMessage> {
        let token = random_token();
        let peer = self.endpoint.peer_addr();

        let packet = build_request_packet(method, uri_path, &token, payload, content_format)?;
        let encoded = packet
            .to_bytes()
            .map_err(|e| TransportError::Codec(e.to_string()))?;

        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            pending.insert(
                RequestKey {
                    token: token.clone(),
                    peer,
                }
                .map_key(),
                PendingRequest { completion: tx },
            );
        }

        let result = self.send_with_retransmission(&encoded, rx).await;

        if result.is_err() {
            self.cancel(&token, peer).await;
        }
        result
    }

    async fn send_with_retransmission(
        &self,
        encoded: &[u8],
        mut rx: oneshot::Receiver<CoapMessage>,
    ) -> Result<CoapMessage> {
        let mut timeout = jittered_initial_timeout();

        for attempt in 0..=MAX_RETRANSMIT {
            self.endpoint
                .send(encoded)
                .await
                .map_err(|e| TransportError::Io(e.to_string()))?;

            match tokio::time::timeout(timeout, &mut rx).await {
                Ok(Ok(message)) => return Ok(message),
                Ok(Err(_)) => return Err(TransportError::Cancelled),
                Err(_) => {
                    if attempt == MAX_RETRANSMIT {
                        return Err(TransportError::Timeout(MAX_RETRANSMIT));
                    }
                    timeout *= 2;
                }
            }
        }

        Err(TransportError::Timeout(MAX_RETRANSMIT))
    }

    /// Send a Non-confirmable request and return as soon as it is written
    /// to the wire, without waiting for any response. Used for multicast
    /// management commands (e.g. Announce Begin to `ff03::1`), which the
    /// protocol treats as fire-and-forget.
    pub async fn send_non_confirmable(
        &self,
        uri_path: &str,
        payload: Vec<u8>,
        content_format: Option<ContentFormat>,
    ) -> Result<()> {
        let token = random_token();
        let mut packet = build_request_packet(RequestType::Post, uri_path, &token, payload, content_format)?;
        packet.header.set_type(MessageType::NonConfirmable);
        let encoded = packet
            .to_bytes()
            .map_err(|e| TransportError::Codec(e.to_string()))?;
        self.endpoint
            .send(&encoded)
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }

    /// Cancel one outstanding request, releasing its slot without waiting
    /// for a response.
    pub async fn cancel(&self, token: &[u8], peer: SocketAddr) {
        self.pending.lock().await.remove(&(token.to_vec(), peer));
    }

    /// Cancel every outstanding request against this engine's peer — used
    /// when the commissioner session tears down (resign, disconnect).
    pub async fn cancel_all(&self) {
        self.pending.lock().await.clear();
    }
}

async fn recv_loop(
    endpoint: Arc<DtlsEndpoint>,
    pending: Arc<Mutex<HashMap<(Vec<u8>, SocketAddr), PendingRequest>>>,
    inbound_tx: mpsc::UnboundedSender<InboundRequest>,
) {
    let mut buf = vec![0u8; 2048];
    loop {
        let n = match endpoint.recv(&mut buf).await {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(error = %e, "DTLS receive failed, stopping CoAP receive loop");
                return;
            }
        };

        let packet = match Packet::from_bytes(&buf[..n]) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed CoAP datagram");
                continue;
            }
        };

        if matches!(packet.header.code, MessageClass::Request(_)) {
            let _ = inbound_tx.send(InboundRequest {
                uri_path: request_uri_path(&packet),
                payload: packet.payload.clone(),
            });
            continue;
        }

        let token = packet.get_token().to_vec();
        let peer = endpoint.peer_addr();

        let completion = pending.lock().await.remove(&(token, peer));
        if let Some(pending_request) = completion {
            let message = decode_message(&packet);
            let _ = pending_request.completion.send(message);
        }
    }
}

fn request_uri_path(packet: &Packet) -> String {
    packet
        .get_option(CoapOption::UriPath)
        .map(|values| {
            values
                .iter()
                .map(|v| String::from_utf8_lossy(v).to_string())
                .collect::<Vec<_>>()
                .join("/")
        })
        .map(|joined| format!("/{joined}"))
        .unwrap_or_default()
}

fn decode_message(packet: &Packet) -> CoapMessage {
    let content_format = packet
        .get_option(CoapOption::ContentFormat)
        .and_then(|values| values.front())
        .and_then(|bytes| {
            if bytes.len() == 2 {
                Some(u16::from_be_bytes([bytes[0], bytes[1]]))
            } else {
                bytes.first().map(|b| *b as u16)
            }
        })
        .and_then(ContentFormat::from_option_value);

    CoapMessage {
        code: packet.header.code,
        content_format,
        payload: packet.payload.clone(),
    }
}

fn build_request_packet(
    method: RequestType,
    uri_path: &str,
    token: &[u8],
    payload: Vec<u8>,
    content_format: Option<ContentFormat>,
) -> Result<Packet> {
    let mut request: CoapRequest<SocketAddr> = CoapRequest::new();
    request.set_method(method);
    request.set_path(uri_path);
    request.message.header.set_type(MessageType::Confirmable);
    request.message.set_token(token.to_vec());
    request.message.payload = payload;

    if let Some(format) = content_format {
        request
            .message
            .add_option(CoapOption::ContentFormat, format.to_option_value().to_be_bytes().to_vec());
    }

    Ok(request.message)
}

fn random_token() -> Vec<u8> {
    let mut token = vec![0u8; 4];
    rand::thread_rng().fill_bytes(&mut token);
    token
}

fn jittered_initial_timeout() -> Duration {
    let jitter = (rand::thread_rng().next_u32() as f64 / u32::MAX as f64 - 0.5) * 2.0 * ACK_RANDOM_FACTOR;
    let factor = 1.0 + jitter;
    Duration::from_secs_f64(ACK_TIMEOUT.as_secs_f64() * factor.max(0.1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_format_roundtrips() {
        for format in [ContentFormat::OctetStream, ContentFormat::CoseSign1, ContentFormat::Cwt] {
            let value = format.to_option_value();
            assert_eq!(ContentFormat::from_option_value(value), Some(format));
        }
    }

    #[test]
    fn jittered_timeout_stays_within_random_factor_bounds() {
        for _ in 0..100 {
            let t = jittered_initial_timeout();
            assert!(t.as_secs_f64() >= ACK_TIMEOUT.as_secs_f64() * 0.5 - 0.01);
            assert!(t.as_secs_f64() <= ACK_TIMEOUT.as_secs_f64() * 1.5 + 0.01);
        }
    }

    #[test]
    fn random_token_is_four_bytes() {
        assert_eq!(random_token().len(), 4);
    }
}
