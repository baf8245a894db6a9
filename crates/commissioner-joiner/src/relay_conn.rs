//! In-process `Conn` implementation that tunnels DTLS datagrams through
//! `RELAY_RX`/`RELAY_TX` CoAP payloads instead of a real UDP socket.
//!
//! The joiner's DTLS handshake runs the same `webrtc-dtls` state machine
//! `commissioner-transport::dtls` uses for the commissioner-to-Border-Agent
//! link, just in the server role and over a virtual socket: every datagram
//! DTLS would otherwise put on the wire is queued here for the commissioner
//! session to wrap in a `RELAY_TX.ntf`, and every datagram DTLS expects to
//! receive is whatever the Border Agent forwarded in a `RELAY_RX.ntf`.

use std::any::Any;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use webrtc_util::conn::Conn;
use webrtc_util::Error as UtilError;

/// There is no real socket peer for a relayed joiner session, only a relay
/// tunnel identified by joiner id one layer up — `Conn` requires *an*
/// address, so this stands in for it.
fn relay_placeholder_addr() -> SocketAddr {
    "0.0.0.0:0".parse().expect("valid placeholder address")
}

fn closed_channel_error() -> UtilError {
    io::Error::new(io::ErrorKind::ConnectionAborted, "relay tunnel closed").into()
}

/// One end of an in-process relay pipe. `recv`/`send` satisfy `Conn` so
/// `webrtc_dtls::conn::DTLSConn` can run its handshake and record layer
/// over it exactly as it would over a real `UdpConn`.
pub struct RelayConn {
    inbound: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
}

impl RelayConn {
    /// Build a connected pair: the returned `Conn` is handed to
    /// `DTLSConn::new`; the sender feeds inbound `RELAY_RX` frames in, and
    /// the receiver drains frames to forward as `RELAY_TX`.
    pub fn pair() -> (
        Arc<Self>,
        mpsc::UnboundedSender<Vec<u8>>,
        mpsc::UnboundedReceiver<Vec<u8>>,
    ) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let conn = Arc::new(Self {
            inbound: Mutex::new(inbound_rx),
            outbound: outbound_tx,
        });
        (conn, inbound_tx, outbound_rx)
    }
}

#[async_trait]
impl Conn for RelayConn {
    async fn connect(&self, _addr: SocketAddr) -> Result<(), UtilError> {
        Ok(())
    }

    async fn recv(&self, buf: &mut [u8]) -> Result<usize, UtilError> {
        let mut inbound = self.inbound.lock().await;
        let frame = inbound.recv().await.ok_or_else(closed_channel_error)?;
        let n = frame.len().min(buf.len());
        buf[..n].copy_from_slice(&frame[..n]);
        Ok(n)
    }

    async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr), UtilError> {
        let n = self.recv(buf).await?;
        Ok((n, relay_placeholder_addr()))
    }

    async fn send(&self, buf: &[u8]) -> Result<usize, UtilError> {
        self.outbound
            .send(buf.to_vec())
            .map_err(|_| closed_channel_error())?;
        Ok(buf.len())
    }

    async fn send_to(&self, buf: &[u8], _target: SocketAddr) -> Result<usize, UtilError> {
        self.send(buf).await
    }

    fn local_addr(&self) -> Result<SocketAddr, UtilError> {
        Ok(relay_placeholder_addr())
    }

    fn remote_addr(&self) -> Option<SocketAddr> {
        Some(relay_placeholder_addr())
    }

    async fn close(&self) -> Result<(), UtilError> {
        Ok(())
    }

    fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self
    }
}
