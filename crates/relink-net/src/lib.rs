//! Self-healing point-to-point TCP links for relink.
//!
//! This crate keeps a single TCP connection between two endpoints alive:
//!
//! - **Listener links**: Bind an endpoint and accept one peer at a time
//! - **Connector links**: Dial an endpoint and redial when the stream dies
//! - **Signals**: Connection changes, received data, transient errors and
//!   closure are all delivered as [`relink_core::Signal`] emissions
//!
//! # Example
//!
//! ```ignore
//! use relink_net::{LinkConfig, TcpLink};
//!
//! let config = LinkConfig::connector("127.0.0.1", 9000).build()?;
//! let link = TcpLink::open(config).await?;
//!
//! link.data_received.connect(|data| println!("{} bytes", data.len()));
//! link.send(b"hello").await?;
//! link.close().await;
//! ```
//!
//! # Error Handling
//!
//! Operations invoked by the caller return [`Result`]. Failures the
//! supervisor absorbs while healing the link (refused connects, timed-out
//! accepts) are never returned; they are emitted on
//! [`TcpLink::error`](tcp::TcpLink::error) instead.

mod error;
pub mod tcp;

pub use error::{LinkError, Result};

// Re-export commonly used types at the crate root
pub use tcp::{
    DEFAULT_BUFFER_SIZE, DEFAULT_RECONNECT_INTERVAL, DEFAULT_TIMEOUT, LinkConfig,
    LinkConfigBuilder, LinkEvent, LinkRole, LinkSettings, LinkStatus, TcpLink,
};
