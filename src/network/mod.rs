//! Connection & communication with a broker.
//!
//! # Network Module
//!
//! Kafka uses a binary protocol over TCP. The protocol defines all APIs
//! as request response message pairs. All messages are size delimited.
//!
//! The client initiates a socket connection and then writes a sequence
//! of request messages and reads back the corresponding response
//! message. No application handshake is required on connection or
//! disconnection, unless the listener wants TLS or SASL; both have to
//! happen before the first real request. That pre-flight phase lives
//! in [`handshake`], and this module owns the raw transport it runs
//! over.
//!
//! While the handshake runs, the transport is driven synchronously: one
//! deadline-bounded send or receive at a time, single reader. Once the
//! handshake completes the transport is split and handed to the
//! connection task, and nothing outside that task touches the socket
//! again.

use std::fmt;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::config::ConnectionConfig;
use crate::error::{Error, Result};

pub mod handshake;
pub mod sasl;
pub mod tls;

/// Host and port of a single broker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrokerAddress {
    pub host: String,
    pub port: u16,
}

impl BrokerAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for BrokerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Which layers the transport is wearing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportKind {
    Plain,
    Tls,
}

pub(crate) trait AsyncStream: AsyncRead + AsyncWrite + Send + Unpin {}
impl<T: AsyncRead + AsyncWrite + Send + Unpin> AsyncStream for T {}

pub(crate) type BoxedStream = Box<dyn AsyncStream>;

/// An established (and possibly TLS-wrapped) socket, before it is
/// promoted to a connection task.
pub(crate) struct Transport {
    stream: BoxedStream,
    pub(crate) kind: TransportKind,
    pub(crate) local_addr: Option<SocketAddr>,
    pub(crate) peer_addr: Option<SocketAddr>,
}

impl Transport {
    /// Dial a broker within `connect_timeout`, tune the socket, and
    /// upgrade to TLS when the config asks for it.
    pub(crate) async fn connect(addr: &BrokerAddress, config: &ConnectionConfig) -> Result<Self> {
        tracing::debug!("Connecting to {}", addr);

        let stream = timeout(
            config.connect_timeout,
            TcpStream::connect((addr.host.as_str(), addr.port)),
        )
        .await
        .map_err(|_| Error::ConnectionFailure(ErrorKind::TimedOut))?
        .map_err(|e| Error::ConnectionFailure(e.kind()))?;

        tune_socket(&stream)?;
        let local_addr = stream.local_addr().ok();
        let peer_addr = stream.peer_addr().ok();

        if !config.tls.is_enabled() {
            return Ok(Self {
                stream: Box::new(stream),
                kind: TransportKind::Plain,
                local_addr,
                peer_addr,
            });
        }

        let connector = tls::connector(&config.tls)?;
        let domain = rustls_pki_types::ServerName::try_from(addr.host.clone())
            .map_err(|e| Error::FailedToUpgradeToTls(format!("bad server name: {e}")))?;

        let stream = timeout(config.connect_timeout, connector.connect(domain, stream))
            .await
            .map_err(|_| Error::FailedToUpgradeToTls("handshake timed out".into()))?
            .map_err(|e| Error::FailedToUpgradeToTls(e.to_string()))?;
        tracing::debug!("Upgraded connection to {} to TLS", addr);

        Ok(Self {
            stream: Box::new(stream),
            kind: TransportKind::Tls,
            local_addr,
            peer_addr,
        })
    }

    /// Write one pre-framed request, bounded by `deadline`.
    ///
    /// Handshake use only; after promotion the connection task owns all
    /// writes.
    pub(crate) async fn send(&mut self, frame: &[u8], deadline: Duration) -> Result<()> {
        tracing::trace!("Sending {} handshake bytes", frame.len());
        timeout(deadline, self.stream.write_all(frame))
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(|e| Error::SendError(e.kind()))
    }

    /// Read one complete frame (without its length prefix), bounded by
    /// `deadline`. Handshake use only.
    pub(crate) async fn recv_frame(&mut self, deadline: Duration) -> Result<Bytes> {
        let mut header = [0u8; 4];
        timeout(deadline, self.stream.read_exact(&mut header))
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(map_read_error)?;

        let length = i32::from_be_bytes(header);
        if length < 0 {
            return Err(Error::ProtocolError(format!(
                "negative frame length {length}"
            )));
        }

        tracing::trace!("Reading {} handshake bytes", length);
        let mut payload = vec![0u8; length as usize];
        timeout(deadline, self.stream.read_exact(&mut payload))
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(map_read_error)?;

        Ok(Bytes::from(payload))
    }

    /// Hand the socket over to the connection task.
    pub(crate) fn into_split(self) -> (ReadHalf<BoxedStream>, WriteHalf<BoxedStream>) {
        tokio::io::split(self.stream)
    }
}

fn map_read_error(e: std::io::Error) -> Error {
    match e.kind() {
        ErrorKind::UnexpectedEof => Error::TransportClosed,
        kind => Error::TransportError(kind),
    }
}

/// Socket options every broker connection gets: no Nagle delay, and a
/// receive buffer grown to whichever of the two buffers is larger, a
/// well-known tuning for this protocol's large fetch responses.
fn tune_socket(stream: &TcpStream) -> Result<()> {
    let sock = socket2::SockRef::from(stream);
    let to_err = |e: std::io::Error| Error::ConnectionFailure(e.kind());

    sock.set_nodelay(true).map_err(to_err)?;
    let recv = sock.recv_buffer_size().map_err(to_err)?;
    let send = sock.send_buffer_size().map_err(to_err)?;
    if send > recv {
        sock.set_recv_buffer_size(send).map_err(to_err)?;
    }
    Ok(())
}
