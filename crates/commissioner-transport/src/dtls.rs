//! DTLS 1.2 client endpoint.
//!
//! Grounded on the teacher's `quic.rs` connection lifecycle (bind, connect,
//! length-prefixed read/write helpers) but re-targeted at DTLS-over-UDP,
//! since the Border Agent commissioning interface and the CCM registrar
//! interface are both classic DTLS, not QUIC. Built on `webrtc-dtls` (the
//! ecosystem's maintained DTLS implementation) over a `webrtc-util::Conn`
//! wrapping a `tokio::net::UdpSocket`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use webrtc_dtls::cipher_suite::CipherSuiteId;
use webrtc_dtls::config::Config as DtlsConfig;
use webrtc_dtls::conn::DTLSConn;
use webrtc_util::conn::conn_udp::UdpConn;
use webrtc_util::conn::Conn;

use crate::{Result, TransportError};

/// A connected DTLS session to a single peer, used for both the Border
/// Agent commissioning interface (PSK) and the CCM registrar interface
/// (certificate).
pub struct DtlsEndpoint {
    conn: DTLSConn,
    peer_addr: SocketAddr,
}

impl DtlsEndpoint {
    /// Open a PSK-authenticated DTLS session, used for the non-CCM
    /// petition/keep-alive/dataset interface against a Border Agent's
    /// PSKc-derived pre-shared key.
    pub async fn connect_psk(peer_addr: SocketAddr, identity_hint: &[u8], psk: [u8; 16]) -> Result<Self> {
        let socket = bind_connected_udp(peer_addr).await?;
        let psk = psk.to_vec();
        let config = DtlsConfig {
            psk: Some(Arc::new(move |_hint: &[u8]| Ok(psk.clone()))),
            psk_identity_hint: Some(identity_hint.to_vec()),
            cipher_suites: vec![CipherSuiteId::Tls_Psk_With_Aes_128_Ccm_8],
            flight_interval: Some(Duration::from_secs(1)),
            ..Default::default()
        };

        let conn = webrtc_dtls::conn::DTLSConn::new(socket, config, true, None)
            .await
            .map_err(|e| TransportError::Handshake(e.to_string()))?;

        Ok(Self { conn, peer_addr })
    }

    /// Open a certificate-authenticated DTLS session, used for the CCM
    /// registrar's COM_TOK endpoint. `certificate` is the commissioner's
    /// client certificate and private key; `trust_anchor` verifies the
    /// registrar's certificate.
    pub async fn connect_cert(
        peer_addr: SocketAddr,
        certificate: webrtc_dtls::crypto::Certificate,
        trust_anchor_der: Vec<u8>,
    ) -> Result<Self> {
        let socket = bind_connected_udp(peer_addr).await?;
        let config = DtlsConfig {
            certificates: vec![certificate],
            extended_master_secret: webrtc_dtls::config::ExtendedMasterSecretType::Require,
            roots_cas: trust_anchor_der,
            flight_interval: Some(Duration::from_secs(1)),
            ..Default::default()
        };

        let conn = webrtc_dtls::conn::DTLSConn::new(socket, config, true, None)
            .await
            .map_err(|e| TransportError::Handshake(e.to_string()))?;

        Ok(Self { conn, peer_addr })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Send one datagram over the established DTLS session.
    pub async fn send(&self, data: &[u8]) -> Result<()> {
        self.conn
            .send(data)
            .await
            .map_err(|e| TransportError::Io(e.to_string()))?;
        Ok(())
    }

    /// Receive one datagram from the established DTLS session.
    pub async fn recv(&self, buf: &mut [u8]) -> Result<usize> {
        self.conn
            .recv(buf)
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }

    /// Close the DTLS session, sending a close-notify alert.
    pub async fn close(&self) -> Result<()> {
        self.conn
            .close()
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }
}

async fn bind_connected_udp(peer_addr: SocketAddr) -> Result<Arc<dyn Conn + Send + Sync>> {
    let local_addr: SocketAddr = if peer_addr.is_ipv4() {
        "0.0.0.0:0".parse().expect("valid local bind address")
    } else {
        "[::]:0".parse().expect("valid local bind address")
    };
    let socket = UdpSocket::bind(local_addr)
        .await
        .map_err(|e| TransportError::Io(e.to_string()))?;
    socket
        .connect(peer_addr)
        .await
        .map_err(|e| TransportError::Io(e.to_string()))?;
    Ok(Arc::new(UdpConn::new(socket, None)))
}
