//! Client-side connection management.
//!
//! A [`ClientConnection`] owns one transport stream, the framer scanning
//! its inbound bytes, and the per-connection [`ExchangeQueue`]. Lifecycle
//! transitions (`will`/`did`/`didNot` × resolve/connect/disconnect) surface
//! through the [`EventSink`]; inbound reports - both exchange completions
//! and unsolicited notifications - are delivered synchronously to the
//! injected report handler before any awaiting exchange resumes, so an
//! observer that wakes on a completed exchange always sees the model the
//! response produced.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{lookup_host, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::error::{ConnectionError, ConnectionResult, HlxResult, ProtocolError};
use crate::events::{ConnectionEvent, ConnectionStage, EventSink};
use crate::exchange::{Completion, Exchange, ExchangeQueue};
use crate::protocol::framer::{Framer, FramerEvent, FRAME_MAX};
use crate::protocol::parse::{parse_report, Report};
use crate::transport::{HostAddress, Stream};

/// Synchronous consumer of every inbound report.
pub type ReportHandler = Box<dyn Fn(Report) + Send>;

/// Tunables for one connection.
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    /// Default per-exchange timeout.
    pub default_timeout: Duration,
    /// Capacity of the exchange submission channel.
    pub submit_capacity: usize,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(10),
            submit_capacity: 64,
        }
    }
}

/// One live client connection to a controller (or to a proxy posing as
/// one).
///
/// Dropping the handle disconnects: queued exchanges complete with
/// `Cancelled` and the task exits.
pub struct ClientConnection {
    submit_tx: mpsc::Sender<(Exchange, Completion)>,
    cancel: CancellationToken,
}

impl ClientConnection {
    /// Resolves `address`, connects TCP, and spawns the connection task.
    ///
    /// Lifecycle events for the resolve and connect stages are emitted on
    /// `sink` as they happen.
    pub async fn connect(
        address: &HostAddress,
        options: ConnectionOptions,
        sink: Arc<dyn EventSink>,
        handler: ReportHandler,
    ) -> ConnectionResult<Self> {
        sink.connection_event(ConnectionEvent::Will {
            stage: ConnectionStage::Resolve,
        });
        let addrs: Vec<std::net::SocketAddr> = match lookup_host(address.authority()).await {
            Ok(addrs) => addrs.collect(),
            Err(e) => {
                let error = ConnectionError::Resolve(format!("{}: {e}", address.host));
                sink.connection_event(ConnectionEvent::DidNot {
                    stage: ConnectionStage::Resolve,
                    error: error.clone(),
                });
                return Err(error);
            }
        };
        if addrs.is_empty() {
            let error = ConnectionError::Resolve(format!("{}: no addresses", address.host));
            sink.connection_event(ConnectionEvent::DidNot {
                stage: ConnectionStage::Resolve,
                error: error.clone(),
            });
            return Err(error);
        }
        sink.connection_event(ConnectionEvent::Did {
            stage: ConnectionStage::Resolve,
        });

        sink.connection_event(ConnectionEvent::Will {
            stage: ConnectionStage::Connect,
        });
        let mut last_err = ConnectionError::Disconnected;
        let mut stream = None;
        for addr in addrs {
            match TcpStream::connect(addr).await {
                Ok(s) => {
                    // Frames are tiny; latency beats throughput here.
                    let _ = s.set_nodelay(true);
                    stream = Some(s);
                    break;
                }
                Err(e) => last_err = e.into(),
            }
        }
        let Some(stream) = stream else {
            sink.connection_event(ConnectionEvent::DidNot {
                stage: ConnectionStage::Connect,
                error: last_err.clone(),
            });
            return Err(last_err);
        };
        sink.connection_event(ConnectionEvent::Did {
            stage: ConnectionStage::Connect,
        });

        Ok(Self::spawn(stream, options, sink, handler))
    }

    /// Spawns the connection task over an already-open transport.
    ///
    /// This is the injection point for non-TCP transports and for the
    /// in-memory pipes the tests use.
    pub fn spawn<S: Stream + 'static>(
        stream: S,
        options: ConnectionOptions,
        sink: Arc<dyn EventSink>,
        handler: ReportHandler,
    ) -> Self {
        let (submit_tx, submit_rx) = mpsc::channel(options.submit_capacity);
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            run(stream, options, submit_rx, task_cancel, sink, handler).await;
        });
        Self { submit_tx, cancel }
    }

    /// Submits an exchange and awaits its completion.
    ///
    /// Completion order follows submission order; a response matching the
    /// predicate resolves it, a timeout or disconnect fails it. No retry
    /// is attempted on timeout - resubmitting is the caller's call.
    pub async fn exchange(&self, exchange: Exchange) -> HlxResult<Report> {
        let (tx, rx) = oneshot::channel();
        self.submit_tx
            .send((exchange, tx))
            .await
            .map_err(|_| ConnectionError::Disconnected)?;
        rx.await.map_err(|_| ConnectionError::Cancelled)?
    }

    /// Tears the connection down. Every queued and in-flight exchange
    /// completes with `Cancelled`.
    pub fn disconnect(&self) {
        self.cancel.cancel();
    }

    /// True once a disconnect was requested or the task died.
    #[must_use]
    pub fn is_disconnected(&self) -> bool {
        self.cancel.is_cancelled() || self.submit_tx.is_closed()
    }
}

impl Drop for ClientConnection {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run<S: Stream>(
    stream: S,
    options: ConnectionOptions,
    mut submit_rx: mpsc::Receiver<(Exchange, Completion)>,
    cancel: CancellationToken,
    sink: Arc<dyn EventSink>,
    handler: ReportHandler,
) {
    let (mut reader, mut writer) = tokio::io::split(stream);
    let mut framer = Framer::new();
    let mut queue = ExchangeQueue::new(options.default_timeout);
    let mut buf = [0u8; 1024];

    let teardown = loop {
        // Put the head frame on the wire when it becomes current.
        if let Some(frame) = queue.take_sendable() {
            let wire = format!("[{frame}]");
            if let Err(e) = writer.write_all(wire.as_bytes()).await {
                break Teardown::Transport(e.into());
            }
        }

        let deadline = queue.head_deadline();

        tokio::select! {
            _ = cancel.cancelled() => break Teardown::Requested,

            read = reader.read(&mut buf) => match read {
                Ok(0) => break Teardown::Transport(ConnectionError::Transport(
                    "connection closed by peer".to_string(),
                )),
                Ok(n) => {
                    for event in framer.push(&buf[..n]) {
                        handle_frame(event, &mut queue, &sink, &handler);
                    }
                }
                Err(e) => break Teardown::Transport(e.into()),
            },

            Some((exchange, done)) = submit_rx.recv() => {
                queue.push(exchange, done);
            }

            _ = tokio::time::sleep_until(deadline.unwrap_or_else(far_future)),
                if deadline.is_some() =>
            {
                tracing::warn!("exchange timed out");
                queue.fail_head(ConnectionError::Timeout.into());
            }
        }
    };

    match teardown {
        Teardown::Requested => {
            sink.connection_event(ConnectionEvent::Will {
                stage: ConnectionStage::Disconnect,
            });
            queue.drain(&ConnectionError::Cancelled);
            sink.connection_event(ConnectionEvent::Did {
                stage: ConnectionStage::Disconnect,
            });
        }
        Teardown::Transport(error) => {
            tracing::warn!(%error, "connection failed");
            queue.drain(&error);
            sink.connection_event(ConnectionEvent::DidNot {
                stage: ConnectionStage::Disconnect,
                error,
            });
        }
    }
}

enum Teardown {
    /// `disconnect()` was called.
    Requested,
    /// The transport failed underneath us.
    Transport(ConnectionError),
}

fn far_future() -> tokio::time::Instant {
    tokio::time::Instant::now() + Duration::from_secs(86_400)
}

fn handle_frame(
    event: FramerEvent,
    queue: &mut ExchangeQueue,
    sink: &Arc<dyn EventSink>,
    handler: &ReportHandler,
) {
    match event {
        FramerEvent::Frame(payload) => match parse_report(&payload) {
            Ok(Report::Error) => {
                // The controller only ever addresses ERROR at the peer
                // that earned it, so it belongs to the in-flight exchange.
                handler(Report::Error);
                let error = ProtocolError::UnexpectedResponse(payload);
                sink.protocol_error(error.clone());
                queue.fail_head(error.into());
            }
            Ok(report) => {
                // Model application runs before the exchange resolves so a
                // caller resuming from `exchange()` reads current state.
                handler(report.clone());
                queue.on_report(&report);
            }
            Err(error @ ProtocolError::Malformed { .. }) => {
                sink.protocol_error(error.clone());
                queue.fail_head(error.into());
            }
            Err(error) => {
                tracing::debug!(%error, "discarding unrecognized frame");
                sink.protocol_error(error);
            }
        },
        FramerEvent::Overflow => {
            sink.protocol_error(ProtocolError::FrameOverflow(FRAME_MAX));
        }
    }
}
