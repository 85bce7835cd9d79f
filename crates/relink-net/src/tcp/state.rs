//! Connection state shared between the supervisor and the link façade.

use std::sync::atomic::{AtomicBool, Ordering};

/// Observable status of a TCP link.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LinkStatus {
    /// Open, never connected yet.
    #[default]
    Connecting,
    /// Connected and ready to send/receive data.
    Connected,
    /// Open, connection lost, supervisor is re-establishing it.
    Reconnecting,
    /// Closed by the caller or by the timeout; terminal.
    Closed,
}

impl std::fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Reconnecting => write!(f, "Reconnecting"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

/// The `open`/`connected` flags of a link.
///
/// Only the supervisor changes `connected`; `open` goes from true to false
/// exactly once.
#[derive(Debug)]
pub(crate) struct LinkState {
    open: AtomicBool,
    connected: AtomicBool,
    ever_connected: AtomicBool,
}

impl LinkState {
    pub(crate) fn new() -> Self {
        Self {
            open: AtomicBool::new(true),
            connected: AtomicBool::new(false),
            ever_connected: AtomicBool::new(false),
        }
    }

    pub(crate) fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Record the observed liveliness. Returns `true` only when the value
    /// differs from the previous observation.
    pub(crate) fn set_connected(&self, connected: bool) -> bool {
        if connected {
            self.ever_connected.store(true, Ordering::SeqCst);
        }
        self.connected.swap(connected, Ordering::SeqCst) != connected
    }

    /// Latch the link closed. Returns `true` for the first caller only.
    pub(crate) fn begin_close(&self) -> bool {
        self.open.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn status(&self) -> LinkStatus {
        if !self.is_open() {
            LinkStatus::Closed
        } else if self.is_connected() {
            LinkStatus::Connected
        } else if self.ever_connected.load(Ordering::SeqCst) {
            LinkStatus::Reconnecting
        } else {
            LinkStatus::Connecting
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connected_fires_only_on_change() {
        let state = LinkState::new();
        let observed = [false, true, true, true, false, false, true, false];
        let changes: Vec<bool> = observed
            .iter()
            .filter(|&&live| state.set_connected(live))
            .copied()
            .collect();

        assert_eq!(changes, vec![true, false, true, false]);
    }

    #[test]
    fn test_close_latches_once() {
        let state = LinkState::new();
        assert!(state.is_open());
        assert!(state.begin_close());
        assert!(!state.begin_close());
        assert!(!state.begin_close());
        assert!(!state.is_open());
    }

    #[test]
    fn test_status_progression() {
        let state = LinkState::new();
        assert_eq!(state.status(), LinkStatus::Connecting);
        state.set_connected(true);
        assert_eq!(state.status(), LinkStatus::Connected);
        state.set_connected(false);
        assert_eq!(state.status(), LinkStatus::Reconnecting);
        state.begin_close();
        assert_eq!(state.status(), LinkStatus::Closed);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(LinkStatus::Connecting.to_string(), "Connecting");
        assert_eq!(LinkStatus::Connected.to_string(), "Connected");
        assert_eq!(LinkStatus::Reconnecting.to_string(), "Reconnecting");
        assert_eq!(LinkStatus::Closed.to_string(), "Closed");
    }
}
