//! One task per socket: the connection actor and its handle.
//!
//! The Kafka protocol allows many requests in flight on one socket, with
//! responses matched back by correlation id. The actor here owns the
//! socket exclusively and multiplexes it: callers hand it requests over
//! a mailbox from any task, it serializes them onto the wire in arrival
//! order, and it routes each response frame to exactly the waiter that
//! sent the matching request. Nothing outside the actor ever touches
//! the socket once the handshake is over.
//!
//! The actor dies on the first write failure, on peer close, and when
//! the oldest in-flight request outlives the request timeout; every
//! outstanding waiter then learns the transport is down.

use std::io::Write as _;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::{mpsc, oneshot, OnceCell};
use tokio::time::{interval, timeout, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::config::{ConnectionConfig, DebugSink};
use crate::encode::frame_request;
use crate::error::{Error, Result};
use crate::frame::FrameAccumulator;
use crate::network::{handshake, BoxedStream, BrokerAddress, TransportKind};
use crate::pending::PendingRequests;
use crate::protocol::{split_correlation_id, ApiKey, HeaderRequest, KafkaRequest};
use crate::versions::{self, VersionRanges};

const COMMAND_BUFFER: usize = 64;
const READ_BUFFER: usize = 64 * 1024;
const MAX_LIVENESS_PERIOD: Duration = Duration::from_secs(60);

/// Handle to a live broker connection.
///
/// Cheap to clone; all clones talk to the same actor. Unless the
/// connection was started with `nolink`, the actor shuts down when the
/// last handle is dropped.
#[derive(Clone)]
pub struct Connection {
    commands: mpsc::Sender<Command>,
    addr: BrokerAddress,
    request_timeout: Duration,
    api_versions: Arc<OnceCell<Arc<VersionRanges>>>,
    _link: Option<Arc<DropGuard>>,
}

/// A response that has not arrived yet.
///
/// Dropping this detaches the waiter: the response, when it lands, is
/// silently discarded, and the pending entry is reaped by the response
/// itself or by the liveness check.
#[derive(Debug)]
pub struct PendingResponse {
    rx: oneshot::Receiver<Result<Bytes>>,
}

impl PendingResponse {
    /// Wait up to `deadline` for the response body.
    pub async fn wait(self, deadline: Duration) -> Result<Bytes> {
        match timeout(deadline, self.rx).await {
            Err(_) => Err(Error::Timeout),
            Ok(Err(_)) => Err(Error::TransportDown("connection task exited".into())),
            Ok(Ok(result)) => result,
        }
    }
}

/// Introspection snapshot of a connection actor.
///
/// The socket itself never leaves the actor, so this is the window
/// tests and debug tooling get instead of a raw handle.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub addr: BrokerAddress,
    pub transport: TransportKind,
    pub local_addr: Option<SocketAddr>,
    pub peer_addr: Option<SocketAddr>,
    pub pending_requests: usize,
    pub last_correlation_id: Option<i32>,
    pub oldest_pending_age: Duration,
    /// Bytes buffered toward the next (incomplete) response frame.
    pub buffered_bytes: usize,
}

enum Command {
    Request {
        request: KafkaRequest,
        /// `None` exactly when the request is `no_ack`.
        waiter: Option<oneshot::Sender<Result<Bytes>>>,
        ack: oneshot::Sender<Result<()>>,
    },
    Stop {
        ack: oneshot::Sender<()>,
    },
    SetDebug {
        sink: DebugSink,
    },
    Info {
        reply: oneshot::Sender<ConnectionInfo>,
    },
}

impl Connection {
    /// Connect, run the handshake, and spawn the actor.
    pub async fn start(host: &str, port: u16, config: ConnectionConfig) -> Result<Self> {
        config.validate()?;
        let addr = BrokerAddress::new(host, port);

        let transport = handshake::establish(&addr, &config).await?;
        let kind = transport.kind;
        let local_addr = transport.local_addr;
        let peer_addr = transport.peer_addr;
        let (reader, writer) = transport.into_split();

        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let shutdown = CancellationToken::new();

        let actor = ConnectionActor {
            client_id: config.client_id.clone(),
            addr: addr.clone(),
            kind,
            local_addr,
            peer_addr,
            reader,
            writer,
            commands: commands_rx,
            accumulator: FrameAccumulator::new(),
            pending: PendingRequests::new(),
            request_timeout: config.request_timeout,
            debug: DebugWriter::open(config.debug.clone()),
            shutdown: shutdown.clone(),
        };
        tokio::spawn(actor.run());

        let link = (!config.nolink).then(|| Arc::new(shutdown.drop_guard()));

        Ok(Self {
            commands: commands_tx,
            addr,
            request_timeout: config.request_timeout,
            api_versions: Arc::new(OnceCell::new()),
            _link: link,
        })
    }

    pub fn addr(&self) -> &BrokerAddress {
        &self.addr
    }

    pub(crate) fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Put a request on the wire and return once the write is
    /// acknowledged. For ordinary requests the returned
    /// [`PendingResponse`] collects the response; `no_ack` requests get
    /// `None` back and leave nothing behind.
    pub async fn request_async(&self, request: KafkaRequest) -> Result<Option<PendingResponse>> {
        let (waiter, response) = if request.no_ack {
            (None, None)
        } else {
            let (tx, rx) = oneshot::channel();
            (Some(tx), Some(PendingResponse { rx }))
        };

        let (ack_tx, ack_rx) = oneshot::channel();
        self.commands
            .send(Command::Request {
                request,
                waiter,
                ack: ack_tx,
            })
            .await
            .map_err(|_| transport_down())?;

        ack_rx.await.map_err(|_| transport_down())??;
        Ok(response)
    }

    /// Send and wait for the response, up to `deadline`.
    ///
    /// Returns `Ok(None)` for `no_ack` requests, which are done the
    /// moment the write succeeds.
    pub async fn request_sync(
        &self,
        request: KafkaRequest,
        deadline: Duration,
    ) -> Result<Option<Bytes>> {
        match self.request_async(request).await? {
            None => Ok(None),
            Some(response) => response.wait(deadline).await.map(Some),
        }
    }

    /// Close the socket and terminate the actor. Idempotent; stopping a
    /// dead connection is fine.
    pub async fn stop(&self) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self
            .commands
            .send(Command::Stop { ack: ack_tx })
            .await
            .is_err()
        {
            return Ok(());
        }
        let _ = ack_rx.await;
        Ok(())
    }

    /// Redirect (or silence) the actor's per-message trace output.
    pub async fn set_debug(&self, sink: DebugSink) -> Result<()> {
        self.commands
            .send(Command::SetDebug { sink })
            .await
            .map_err(|_| transport_down())
    }

    /// Snapshot the actor's internals.
    pub async fn info(&self) -> Result<ConnectionInfo> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::Info { reply: reply_tx })
            .await
            .map_err(|_| transport_down())?;
        reply_rx.await.map_err(|_| transport_down())
    }

    /// The API version ranges negotiated with this broker, fetched once
    /// and cached on the handle.
    pub async fn get_api_versions(&self) -> Result<Arc<VersionRanges>> {
        self.api_versions
            .get_or_try_init(|| async { versions::negotiate(self).await.map(Arc::new) })
            .await
            .cloned()
    }

    /// The negotiated `(min, max)` for one API, or `ApiNotSupported`.
    pub async fn api_version_range(&self, api: ApiKey) -> Result<(i16, i16)> {
        let versions = self.get_api_versions().await?;
        versions
            .get(&api)
            .copied()
            .ok_or(Error::ApiNotSupported(api))
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("addr", &self.addr)
            .finish_non_exhaustive()
    }
}

fn transport_down() -> Error {
    Error::TransportDown("connection task exited".into())
}

enum Exit {
    Stopped,
    Dead(Error),
}

struct ConnectionActor {
    client_id: String,
    addr: BrokerAddress,
    kind: TransportKind,
    local_addr: Option<SocketAddr>,
    peer_addr: Option<SocketAddr>,
    reader: ReadHalf<BoxedStream>,
    writer: WriteHalf<BoxedStream>,
    commands: mpsc::Receiver<Command>,
    accumulator: FrameAccumulator,
    pending: PendingRequests,
    request_timeout: Duration,
    debug: DebugWriter,
    shutdown: CancellationToken,
}

impl ConnectionActor {
    async fn run(mut self) {
        let exit = self.run_loop().await;

        let reason = match &exit {
            Exit::Stopped => {
                tracing::debug!("Connection to {} stopped", self.addr);
                "connection stopped".to_owned()
            }
            Exit::Dead(error) => {
                tracing::error!("Connection to {} died: {}", self.addr, error);
                error.to_string()
            }
        };

        if !self.accumulator.is_empty() {
            tracing::debug!(
                "Discarding {} buffered bytes of a partial frame from {}",
                self.accumulator.accumulated(),
                self.addr
            );
        }
        for pending in self.pending.drain() {
            let _ = pending.waiter.send(Err(Error::TransportDown(reason.clone())));
        }
        // dropping the halves closes the socket
    }

    async fn run_loop(&mut self) -> Exit {
        let period = (self.request_timeout / 2).min(MAX_LIVENESS_PERIOD);
        let mut liveness = interval(period);
        liveness.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut read_buf = BytesMut::with_capacity(READ_BUFFER);
        let mut commands_open = true;

        loop {
            tokio::select! {
                command = self.commands.recv(), if commands_open => match command {
                    Some(command) => {
                        if let Some(exit) = self.handle_command(command).await {
                            return exit;
                        }
                    }
                    // every handle is gone; a nolink connection keeps
                    // serving reads for detached waiters until the
                    // socket goes away
                    None => commands_open = false,
                },
                read = self.reader.read_buf(&mut read_buf) => match read {
                    Ok(0) => return Exit::Dead(Error::TransportClosed),
                    Ok(_) => {
                        let chunk = read_buf.split().freeze();
                        if let Err(error) = self.handle_bytes(chunk) {
                            return Exit::Dead(error);
                        }
                    }
                    Err(error) => return Exit::Dead(Error::TransportError(error.kind())),
                },
                _ = liveness.tick() => {
                    if self.pending.oldest_age() > self.request_timeout {
                        return Exit::Dead(Error::RequestTimeout);
                    }
                },
                _ = self.shutdown.cancelled() => return Exit::Stopped,
            }
        }
    }

    async fn handle_command(&mut self, command: Command) -> Option<Exit> {
        match command {
            Command::Request {
                request,
                waiter,
                ack,
            } => match self.handle_request(request, waiter).await {
                Ok(()) => {
                    let _ = ack.send(Ok(()));
                    None
                }
                Err(error) => {
                    let fatal = error.is_fatal();
                    let _ = ack.send(Err(error.clone()));
                    fatal.then_some(Exit::Dead(error))
                }
            },
            Command::Stop { ack } => {
                let _ = ack.send(());
                Some(Exit::Stopped)
            }
            Command::SetDebug { sink } => {
                self.debug = DebugWriter::open(sink);
                None
            }
            Command::Info { reply } => {
                let info = ConnectionInfo {
                    addr: self.addr.clone(),
                    transport: self.kind,
                    local_addr: self.local_addr,
                    peer_addr: self.peer_addr,
                    pending_requests: self.pending.len(),
                    last_correlation_id: self.pending.last_corr_id(),
                    oldest_pending_age: self.pending.oldest_age(),
                    buffered_bytes: self.accumulator.accumulated(),
                };
                let _ = reply.send(info);
                None
            }
        }
    }

    async fn handle_request(
        &mut self,
        request: KafkaRequest,
        waiter: Option<oneshot::Sender<Result<Bytes>>>,
    ) -> Result<()> {
        // a no_ack request still consumes its id on the wire
        let corr_id = match waiter {
            None => self.pending.increment(),
            Some(waiter) => self.pending.add(request.api, request.version, waiter)?,
        };

        let header = HeaderRequest::new(request.api, request.version, corr_id, &self.client_id);
        let frame = match frame_request(&header, &request.body) {
            Ok(frame) => frame,
            Err(error) => {
                // per-request failure; drop the never-sent waiter
                self.pending.remove(corr_id);
                return Err(error);
            }
        };

        self.debug.log(format_args!(
            "corr_id={corr_id} -> {:?} v{} ({} bytes)",
            request.api,
            request.version,
            frame.len(),
        ));
        tracing::trace!(
            "Sending {:?} v{} corr_id={} to {}",
            request.api,
            request.version,
            corr_id,
            self.addr
        );

        self.writer
            .write_all(&frame)
            .await
            .map_err(|error| Error::SendError(error.kind()))
    }

    fn handle_bytes(&mut self, chunk: Bytes) -> Result<()> {
        for frame in self.accumulator.feed(chunk)? {
            let frame_len = frame.len();
            let (corr_id, body) = split_correlation_id(frame)
                .map_err(|_| Error::ProtocolError("response frame too short".into()))?;

            match self.pending.remove(corr_id) {
                Some(pending) => {
                    self.debug.log(format_args!(
                        "corr_id={corr_id} <- {:?} v{} ({frame_len} bytes)",
                        pending.api, pending.version,
                    ));
                    tracing::trace!(
                        "Received {:?} corr_id={} from {}",
                        pending.api,
                        corr_id,
                        self.addr
                    );
                    // a closed waiter means the caller stopped caring;
                    // the response just evaporates
                    let _ = pending.waiter.send(Ok(body));
                }
                None => {
                    // no_ack ids and timed-out strays land here
                    tracing::trace!(
                        "Dropping response with unknown corr_id={} from {}",
                        corr_id,
                        self.addr
                    );
                }
            }
        }
        Ok(())
    }
}

/// Sink for the per-message debug trace.
enum DebugWriter {
    Off,
    Stdout,
    File(std::fs::File),
}

impl DebugWriter {
    fn open(sink: DebugSink) -> Self {
        match sink {
            DebugSink::Off => DebugWriter::Off,
            DebugSink::Stdout => DebugWriter::Stdout,
            DebugSink::File(path) => match std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
            {
                Ok(file) => DebugWriter::File(file),
                Err(error) => {
                    tracing::warn!(
                        "unable to open debug file {}: {}; tracing disabled",
                        path.display(),
                        error
                    );
                    DebugWriter::Off
                }
            },
        }
    }

    fn log(&mut self, line: std::fmt::Arguments<'_>) {
        match self {
            DebugWriter::Off => {}
            DebugWriter::Stdout => println!("[{}] {line}", now_millis()),
            DebugWriter::File(file) => {
                let _ = writeln!(file, "[{}] {line}", now_millis());
            }
        }
    }
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}
