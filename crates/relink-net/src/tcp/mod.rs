//! Self-healing point-to-point TCP links.
//!
//! A [`TcpLink`] plays one of two roles against a single endpoint:
//!
//! - **Listener**: binds the endpoint and serves one peer at a time. When the
//!   peer goes away it waits for the next one on the same listening socket.
//! - **Connector**: dials the endpoint and redials whenever the stream dies.
//!
//! Either way a background supervisor keeps the link connected and closes it
//! once it has gone longer than the configured timeout without a usable
//! connection. Everything the supervisor observes is reported through
//! signals.
//!
//! # Example
//!
//! ```ignore
//! use relink_net::tcp::{LinkConfig, TcpLink};
//!
//! let config = LinkConfig::listener("0.0.0.0", 9000)
//!     .timeout(Duration::from_secs(60))
//!     .build()?;
//!
//! let link = TcpLink::new(config);
//! link.data_received.connect(|data| {
//!     println!("Received: {:?}", data);
//! });
//! link.closed.connect(|()| println!("link closed"));
//!
//! link.start().await?;
//! ```
//!
//! # Settings files
//!
//! A link configuration can also be loaded from TOML:
//!
//! ```toml
//! role = "connector"
//! address = "10.0.0.5"
//! port = 9000
//! reconnect_interval_ms = 250
//! timeout_ms = 10000
//! ```
//!
//! ```ignore
//! let config = LinkSettings::from_file("link.toml")?.into_config()?;
//! ```

mod config;
mod events;
mod link;
mod settings;
mod state;
mod supervisor;
mod transport;

pub use config::{
    DEFAULT_BUFFER_SIZE, DEFAULT_RECONNECT_INTERVAL, DEFAULT_TIMEOUT, LinkConfig,
    LinkConfigBuilder, LinkRole,
};
pub use events::LinkEvent;
pub use link::TcpLink;
pub use settings::LinkSettings;
pub use state::LinkStatus;
