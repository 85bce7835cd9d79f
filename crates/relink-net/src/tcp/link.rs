//! The public face of a self-healing TCP link.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use relink_core::logging::{span_names, targets};
use relink_core::{PerfSpan, Signal};
use tokio::task::JoinHandle;
use tracing::Instrument;

use super::config::{LinkConfig, LinkRole};
use super::events::{EventSender, LinkSignals, spawn_dispatcher};
use super::state::LinkStatus;
use super::supervisor::{LinkShared, Supervisor};
use super::transport::TransportHandle;
use crate::Result;
use crate::error::LinkError;

/// Background tasks owned by a started link.
struct Tasks {
    supervisor: Option<JoinHandle<()>>,
    dispatcher: Option<JoinHandle<()>>,
    events: Option<EventSender>,
}

/// A point-to-point TCP link that keeps itself connected.
///
/// A listener link binds its endpoint and serves one peer at a time; a
/// connector link dials the endpoint. Either way a background supervisor
/// re-establishes the connection whenever it is lost, and closes the link
/// for good once it has gone longer than the configured timeout without one.
///
/// # Signals
///
/// - [`connection_changed`](Self::connection_changed): Emitted when the observed
///   connection state flips, and once with `false` when the link closes
/// - [`data_received`](Self::data_received): Emitted with the bytes of each read
/// - [`error`](Self::error): Emitted for transient failures the supervisor absorbed
/// - [`closed`](Self::closed): Emitted once when the link closes
///
/// Signals are delivered from a dispatcher task, never from the supervisor
/// itself. Connect slots before calling [`start`](Self::start) to observe
/// every event.
///
/// # Example
///
/// ```ignore
/// let config = LinkConfig::connector("127.0.0.1", 9000)
///     .reconnect_interval(Duration::from_millis(500))
///     .build()?;
///
/// let link = TcpLink::new(config);
/// link.connection_changed.connect(|&up| println!("connected: {up}"));
/// link.data_received.connect(|data| println!("received {} bytes", data.len()));
///
/// link.start().await?;
/// link.send(b"hello").await?;
/// link.close().await;
/// ```
pub struct TcpLink {
    shared: Arc<LinkShared>,
    started: AtomicBool,
    tasks: Mutex<Tasks>,
    local_addr: Mutex<Option<SocketAddr>>,

    /// Signal emitted when the connection state changes.
    pub connection_changed: Signal<bool>,
    /// Signal emitted when data is received.
    pub data_received: Signal<Vec<u8>>,
    /// Signal emitted for transient failures.
    pub error: Signal<LinkError>,
    /// Signal emitted when the link closes.
    pub closed: Signal<()>,
}

impl TcpLink {
    /// Create a link without touching the network.
    pub fn new(config: LinkConfig) -> Self {
        Self {
            shared: Arc::new(LinkShared::new(config)),
            started: AtomicBool::new(false),
            tasks: Mutex::new(Tasks {
                supervisor: None,
                dispatcher: None,
                events: None,
            }),
            local_addr: Mutex::new(None),
            connection_changed: Signal::new(),
            data_received: Signal::new(),
            error: Signal::new(),
            closed: Signal::new(),
        }
    }

    /// Create a link and start it.
    pub async fn open(config: LinkConfig) -> Result<Self> {
        let link = Self::new(config);
        link.start().await?;
        Ok(link)
    }

    /// Bring the link up and start supervising it.
    ///
    /// A listener binds its listening socket here; a bind failure is
    /// returned and the link stays unstarted. A connector makes one
    /// best-effort connection attempt; its failure is only reported on
    /// [`error`](Self::error), since the peer may simply not be up yet.
    ///
    /// Calling `start` on a running link is a no-op.
    pub async fn start(&self) -> Result<()> {
        if !self.shared.state.is_open() {
            return Err(LinkError::Closed);
        }
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let config = &self.shared.config;
        let mut transport = TransportHandle::new(config.clone(), self.shared.slot.clone());
        let signals = LinkSignals {
            connection_changed: self.connection_changed.clone(),
            data_received: self.data_received.clone(),
            error: self.error.clone(),
            closed: self.closed.clone(),
        };

        let (events, dispatcher) = spawn_dispatcher(signals);

        match config.role() {
            LinkRole::Listener => match transport.bind().await {
                Ok(local) => *self.local_addr.lock() = Some(local),
                Err(e) => {
                    self.started.store(false, Ordering::SeqCst);
                    return Err(e);
                }
            },
            LinkRole::Connector => {
                let first = tokio::time::timeout(config.timeout(), transport.connect()).await;
                match first {
                    Ok(Ok(peer)) => {
                        tracing::info!(target: targets::LINK, %peer, "initial connection up");
                    }
                    Ok(Err(e)) => {
                        tracing::debug!(target: targets::LINK, error = %e, "connect failed");
                        events.error(e);
                    }
                    Err(_) => {
                        tracing::debug!(target: targets::LINK, "initial connection timed out");
                        events.error(LinkError::Timeout);
                    }
                }
            }
        }

        let supervisor = Supervisor::new(self.shared.clone(), transport, events.clone());
        let span = tracing::debug_span!(
            target: targets::SUPERVISOR,
            span_names::SUPERVISOR,
            role = %config.role(),
            endpoint = %config.socket_addr()
        );
        let handle = tokio::spawn(supervisor.run().instrument(span));

        let mut tasks = self.tasks.lock();
        tasks.supervisor = Some(handle);
        tasks.dispatcher = Some(dispatcher);
        tasks.events = Some(events);
        Ok(())
    }

    /// Write `data` to the current stream.
    ///
    /// Empty input is a no-op. Fails with [`LinkError::NotConnected`] when no
    /// stream is established and with [`LinkError::Io`] when the write itself
    /// fails; failed writes are not retried.
    pub async fn send(&self, data: impl AsRef<[u8]>) -> Result<()> {
        let data = data.as_ref();
        if data.is_empty() {
            return Ok(());
        }
        if !self.shared.state.is_open() {
            return Err(LinkError::Closed);
        }
        self.shared.slot.write_all(data).await
    }

    /// Close the link.
    ///
    /// Stops and joins the supervisor (releasing the stream and any listening
    /// socket), emits `connection_changed(false)` and `closed`, and returns
    /// once every queued signal has been delivered. The link closes once:
    /// after the first close, or after the supervisor closed it on timeout,
    /// further calls emit nothing.
    pub async fn close(&self) {
        let perf = PerfSpan::new(span_names::CLOSE);
        let span = perf.span().clone();
        async {
            let (supervisor, dispatcher, events) = {
                let mut tasks = self.tasks.lock();
                (
                    tasks.supervisor.take(),
                    tasks.dispatcher.take(),
                    tasks.events.take(),
                )
            };

            let performed = self.shared.begin_close();
            if performed {
                tracing::info!(target: targets::LINK, "closing link");
            }
            if let Some(handle) = supervisor
                && let Err(e) = handle.await
            {
                tracing::warn!(target: targets::LINK, error = %e, "supervisor task failed");
            }
            match events {
                Some(events) => {
                    if performed {
                        self.shared.announce_closed(&events);
                    }
                    // The dispatcher only finishes once the last sender is gone.
                    drop(events);
                }
                None if performed => {
                    // Never started: no dispatcher to queue on.
                    self.shared.state.set_connected(false);
                    self.connection_changed.emit(false);
                    self.closed.emit(());
                }
                None => {}
            }
            if let Some(handle) = dispatcher
                && let Err(e) = handle.await
            {
                tracing::warn!(target: targets::LINK, error = %e, "signal dispatcher failed");
            }
        }
        .instrument(span)
        .await;
        tracing::debug!(
            target: targets::LINK,
            elapsed_ms = perf.elapsed().as_millis() as u64,
            "link closed"
        );
    }

    /// Whether the link was last observed connected.
    pub fn is_connected(&self) -> bool {
        self.shared.state.is_connected()
    }

    /// Whether the link is still open.
    pub fn is_open(&self) -> bool {
        self.shared.state.is_open()
    }

    /// Current link status.
    pub fn status(&self) -> LinkStatus {
        self.shared.state.status()
    }

    /// The role this link plays.
    pub fn role(&self) -> LinkRole {
        self.shared.config.role()
    }

    /// The configuration the link was created with.
    pub fn config(&self) -> &LinkConfig {
        &self.shared.config
    }

    /// The bound listening address (listener role, once started).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }

    /// The peer of the current stream, if any.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.shared.slot.peer_addr()
    }

    /// Number of streams established since the link started.
    pub fn connections_established(&self) -> u64 {
        self.shared.slot.established()
    }
}

impl Drop for TcpLink {
    fn drop(&mut self) {
        self.shared.begin_close();
    }
}

impl std::fmt::Debug for TcpLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpLink")
            .field("role", &self.role())
            .field("endpoint", &self.shared.config.socket_addr())
            .field("status", &self.status())
            .finish()
    }
}
