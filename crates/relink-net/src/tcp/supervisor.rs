//! The connection supervisor: the background loop behind every link.
//!
//! One supervisor task runs per link for as long as the link is open. It
//! owns the [`TransportHandle`], observes liveliness, drives reads, replaces
//! lost streams, and closes the link when it has been unable to connect for
//! longer than the configured timeout.
//!
//! # Listener role
//!
//! While a stream exists the loop refreshes the connected flag, reads if the
//! stream is live (or drops it if not), then pauses for [`POLL_INTERVAL`].
//! Without a stream it waits for one peer on the listening socket; a failed
//! or timed-out accept pauses for the reconnect interval, unless the deadline
//! has passed, in which case the link closes.
//!
//! # Connector role
//!
//! Each pass of [`Supervisor::check_server`] either reads from a live stream,
//! replaces a dead one (then pauses for the reconnect interval), or connects
//! immediately when there is no stream at all, pausing only if that attempt
//! fails. After every pass the deadline is checked.
//!
//! # Deadline
//!
//! The deadline timer restarts whenever the link is observed connected, so
//! it measures how long the link has gone without a usable connection.
//! Closing is latched: however the loop gets there, the link closes once.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use relink_core::logging::targets;
use tokio::sync::watch;
use tokio::time::{Instant, sleep, timeout};

use super::config::{LinkConfig, LinkRole};
use super::events::EventSender;
use super::state::LinkState;
use super::transport::{TransportHandle, WriteSlot};
use crate::error::LinkError;

/// Pause between listener-role polls of an established stream.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Lower bound for a single accept/connect attempt near the deadline.
const MIN_ATTEMPT: Duration = Duration::from_millis(10);

/// State shared between the supervisor task and the link façade.
pub(crate) struct LinkShared {
    pub(crate) config: LinkConfig,
    pub(crate) state: LinkState,
    pub(crate) slot: Arc<WriteSlot>,
    pub(crate) shutdown: watch::Sender<bool>,
}

impl LinkShared {
    pub(crate) fn new(config: LinkConfig) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            state: LinkState::new(),
            slot: Arc::new(WriteSlot::new()),
            shutdown,
        }
    }

    /// Latch the link closed and wake the supervisor.
    ///
    /// Returns `true` for the first caller only.
    pub(crate) fn begin_close(&self) -> bool {
        let _ = self.shutdown.send_replace(true);
        self.state.begin_close()
    }

    /// Queue the final disconnected and closed notifications.
    pub(crate) fn announce_closed(&self, events: &EventSender) {
        self.state.set_connected(false);
        events.connection_changed(false);
        events.closed();
    }
}

/// Outcome of waiting on something while watching for shutdown.
enum Wait<T> {
    Done(T),
    Shutdown,
}

pub(crate) struct Supervisor {
    shared: Arc<LinkShared>,
    transport: TransportHandle,
    events: EventSender,
    shutdown: watch::Receiver<bool>,
    timer: Instant,
    buffer: Vec<u8>,
}

impl Supervisor {
    pub(crate) fn new(
        shared: Arc<LinkShared>,
        transport: TransportHandle,
        events: EventSender,
    ) -> Self {
        let shutdown = shared.shutdown.subscribe();
        let buffer = vec![0u8; shared.config.buffer_size()];
        Self {
            shared,
            transport,
            events,
            shutdown,
            timer: Instant::now(),
            buffer,
        }
    }

    /// Run the role-specific loop until the link closes.
    pub(crate) async fn run(mut self) {
        let role = self.shared.config.role();
        tracing::debug!(
            target: targets::SUPERVISOR,
            %role,
            endpoint = %self.shared.config.socket_addr(),
            "supervisor started"
        );
        self.timer = Instant::now();

        match role {
            LinkRole::Listener => self.run_listener().await,
            LinkRole::Connector => self.run_connector().await,
        }

        self.transport.shutdown().await;
        tracing::debug!(target: targets::SUPERVISOR, %role, "supervisor stopped");
    }

    async fn run_listener(&mut self) {
        while self.is_running() {
            if self.transport.has_stream() {
                let live = self.transport.is_live();
                self.observe(live);
                if live {
                    self.read_once().await;
                } else {
                    self.transport.reset().await;
                }
                self.pause(POLL_INTERVAL).await;
                continue;
            }

            let budget = self.remaining().max(MIN_ATTEMPT);
            let accept = timeout(budget, self.transport.accept());
            let attempt = match until_shutdown(&mut self.shutdown, accept).await {
                Wait::Done(result) => result,
                Wait::Shutdown => break,
            };
            match attempt {
                Ok(Ok(peer)) => {
                    tracing::info!(target: targets::SUPERVISOR, %peer, "peer accepted");
                    continue;
                }
                Ok(Err(e)) => self.transient(e),
                Err(_) => tracing::trace!(target: targets::SUPERVISOR, "no peer in accept window"),
            }

            if self.deadline_passed() {
                self.expire();
                break;
            }
            self.pause(self.shared.config.reconnect_interval()).await;
        }
    }

    async fn run_connector(&mut self) {
        while self.is_running() {
            self.check_server().await;
            if !self.is_running() {
                break;
            }
            if self.deadline_passed() {
                self.expire();
                break;
            }
        }
    }

    /// One connector-role pass: read, replace a dead stream, or connect.
    ///
    /// A failed connect with no stream is followed by the reconnect interval
    /// rather than retried at once, so a refused endpoint is not spun on.
    async fn check_server(&mut self) {
        if self.transport.has_stream() {
            let live = self.transport.is_live();
            self.observe(live);
            if live {
                self.read_once().await;
            } else {
                if self.reconnect().await.is_err() {
                    self.transport.reset().await;
                }
                self.pause_within_deadline(self.shared.config.reconnect_interval())
                    .await;
            }
        } else {
            self.observe(false);
            if self.reconnect().await.is_err() {
                self.pause_within_deadline(self.shared.config.reconnect_interval())
                    .await;
            }
        }
    }

    /// Connect a fresh stream, replacing the current one on success.
    async fn reconnect(&mut self) -> Result<(), LinkError> {
        let budget = self.remaining().max(MIN_ATTEMPT);
        let connect = timeout(budget, self.transport.connect());
        let attempt = match until_shutdown(&mut self.shutdown, connect).await {
            Wait::Done(result) => result,
            Wait::Shutdown => return Err(LinkError::Closed),
        };
        match attempt {
            Ok(Ok(peer)) => {
                tracing::info!(target: targets::SUPERVISOR, %peer, "connected");
                Ok(())
            }
            Ok(Err(e)) => {
                self.transient(e.clone());
                Err(e)
            }
            Err(_) => {
                self.transient(LinkError::Timeout);
                Err(LinkError::Timeout)
            }
        }
    }

    /// Perform one read and deliver what arrived.
    async fn read_once(&mut self) {
        let read_timeout = self.shared.config.timeout();
        let outcome = {
            let read = timeout(read_timeout, self.transport.read(&mut self.buffer));
            tokio::select! {
                biased;
                _ = self.shutdown.changed() => return,
                outcome = read => outcome,
            }
        };

        match outcome {
            Ok(Ok(0)) => {
                tracing::debug!(target: targets::SUPERVISOR, "peer closed the stream");
                self.transport.mark_dead();
            }
            Ok(Ok(n)) => {
                self.timer = Instant::now();
                let data = if self.shared.config.pad_reads() {
                    let mut data = self.buffer.clone();
                    data[n..].fill(0);
                    data
                } else {
                    self.buffer[..n].to_vec()
                };
                tracing::trace!(target: targets::SUPERVISOR, bytes = n, "data received");
                self.events.data_received(data);
            }
            Ok(Err(e)) => {
                tracing::debug!(target: targets::SUPERVISOR, error = %e, "read failed");
                self.transport.mark_dead();
            }
            Err(_) => {
                tracing::trace!(target: targets::SUPERVISOR, "read timed out");
                self.timer = Instant::now();
            }
        }
    }

    /// Record observed liveliness, firing the signal only on change.
    fn observe(&mut self, live: bool) {
        if live {
            self.timer = Instant::now();
        }
        if self.shared.state.set_connected(live) {
            tracing::info!(
                target: targets::SUPERVISOR,
                connected = live,
                "connection state changed"
            );
            self.events.connection_changed(live);
        }
    }

    fn transient(&self, err: LinkError) {
        tracing::debug!(target: targets::SUPERVISOR, error = %err, "transient failure");
        self.events.error(err);
    }

    fn expire(&mut self) {
        tracing::warn!(
            target: targets::SUPERVISOR,
            timeout_ms = self.shared.config.timeout().as_millis() as u64,
            "no connection within timeout, closing link"
        );
        if self.shared.begin_close() {
            self.shared.announce_closed(&self.events);
        }
    }

    fn is_running(&self) -> bool {
        self.shared.state.is_open() && !*self.shutdown.borrow()
    }

    fn remaining(&self) -> Duration {
        self.shared.config.timeout().saturating_sub(self.timer.elapsed())
    }

    fn deadline_passed(&self) -> bool {
        self.timer.elapsed() >= self.shared.config.timeout()
    }

    /// Sleep for `duration` or until shutdown, whichever comes first.
    async fn pause(&mut self, duration: Duration) {
        let _ = until_shutdown(&mut self.shutdown, sleep(duration)).await;
    }

    /// Like [`pause`](Self::pause), but never past the deadline.
    async fn pause_within_deadline(&mut self, duration: Duration) {
        let duration = duration.min(self.remaining());
        self.pause(duration).await;
    }
}

/// Drive `future` to completion unless shutdown is requested first.
async fn until_shutdown<F: Future>(
    shutdown: &mut watch::Receiver<bool>,
    future: F,
) -> Wait<F::Output> {
    if *shutdown.borrow() {
        return Wait::Shutdown;
    }
    tokio::select! {
        biased;
        _ = shutdown.changed() => Wait::Shutdown,
        output = future => Wait::Done(output),
    }
}
