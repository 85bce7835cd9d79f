//! Event delivery from the supervisor to signal subscribers.
//!
//! The supervisor never invokes slots itself. It queues [`LinkEvent`]s on an
//! unbounded channel, and a dispatcher task emits them on the link's signals
//! in order. A slow or misbehaving subscriber therefore delays other
//! subscribers but never the supervision loop.

use relink_core::Signal;
use relink_core::logging::targets;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::LinkError;

/// A notification produced by a link.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkEvent {
    /// The observed connection state changed.
    ConnectionChanged(bool),
    /// Bytes arrived from the peer.
    DataReceived(Vec<u8>),
    /// A transient failure that the supervisor swallowed.
    Error(LinkError),
    /// The link closed for good.
    Closed,
}

/// The signal set of a link. Cloning shares the connected slots.
#[derive(Clone, Debug, Default)]
pub(crate) struct LinkSignals {
    pub(crate) connection_changed: Signal<bool>,
    pub(crate) data_received: Signal<Vec<u8>>,
    pub(crate) error: Signal<LinkError>,
    pub(crate) closed: Signal<()>,
}

impl LinkSignals {
    fn dispatch(&self, event: LinkEvent) {
        match event {
            LinkEvent::ConnectionChanged(connected) => self.connection_changed.emit(connected),
            LinkEvent::DataReceived(data) => self.data_received.emit(data),
            LinkEvent::Error(err) => self.error.emit(err),
            LinkEvent::Closed => self.closed.emit(()),
        }
    }
}

/// Producer side of the event channel.
#[derive(Clone, Debug)]
pub(crate) struct EventSender {
    tx: mpsc::UnboundedSender<LinkEvent>,
}

impl EventSender {
    pub(crate) fn send(&self, event: LinkEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!(target: targets::EVENTS, "dispatcher gone, event dropped");
        }
    }

    pub(crate) fn connection_changed(&self, connected: bool) {
        self.send(LinkEvent::ConnectionChanged(connected));
    }

    pub(crate) fn data_received(&self, data: Vec<u8>) {
        self.send(LinkEvent::DataReceived(data));
    }

    pub(crate) fn error(&self, err: LinkError) {
        self.send(LinkEvent::Error(err));
    }

    pub(crate) fn closed(&self) {
        self.send(LinkEvent::Closed);
    }
}

/// Start the dispatcher task for `signals`.
///
/// The task delivers everything queued and ends once every [`EventSender`]
/// clone has been dropped, so awaiting its handle after dropping the senders
/// waits for delivery to finish.
pub(crate) fn spawn_dispatcher(signals: LinkSignals) -> (EventSender, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<LinkEvent>();
    let handle = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            tracing::trace!(target: targets::EVENTS, ?event, "dispatching");
            signals.dispatch(event);
        }
        tracing::trace!(target: targets::EVENTS, "dispatcher finished");
    });
    (EventSender { tx }, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_events_delivered_in_order() {
        let signals = LinkSignals::default();
        let log = Arc::new(Mutex::new(Vec::new()));

        let log_clone = log.clone();
        signals.connection_changed.connect(move |&c| {
            log_clone.lock().push(format!("conn:{c}"));
        });
        let log_clone = log.clone();
        signals.data_received.connect(move |data| {
            log_clone.lock().push(format!("data:{}", data.len()));
        });
        let log_clone = log.clone();
        signals.closed.connect(move |_| {
            log_clone.lock().push("closed".to_string());
        });

        let (events, handle) = spawn_dispatcher(signals);
        events.connection_changed(true);
        events.data_received(vec![1, 2, 3]);
        events.connection_changed(false);
        events.closed();
        drop(events);
        handle.await.unwrap();

        assert_eq!(
            *log.lock(),
            vec!["conn:true", "data:3", "conn:false", "closed"]
        );
    }

    #[tokio::test]
    async fn test_dispatcher_stops_when_senders_dropped() {
        let (events, handle) = spawn_dispatcher(LinkSignals::default());
        let clone = events.clone();
        drop(events);
        clone.error(LinkError::Timeout);
        drop(clone);

        tokio::time::timeout(std::time::Duration::from_secs(1), handle)
            .await
            .expect("dispatcher should exit")
            .unwrap();
    }
}
