//! Configuration types for TCP links.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use serde::Deserialize;

use crate::Result;
use crate::error::LinkError;

/// Default send/receive buffer size: 1 MiB.
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;
/// Default pause between reconnect attempts.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(1);
/// Default time a link may spend unable to (re)establish a connection.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Which side of the point-to-point link this end plays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkRole {
    /// Binds a local address and accepts one peer at a time.
    Listener,
    /// Connects out to a known remote endpoint.
    Connector,
}

impl fmt::Display for LinkRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Listener => write!(f, "listener"),
            Self::Connector => write!(f, "connector"),
        }
    }
}

/// Validated, immutable configuration for a [`TcpLink`](super::TcpLink).
///
/// Build one with [`LinkConfig::builder`], [`LinkConfig::listener`] or
/// [`LinkConfig::connector`]; every value is checked by
/// [`LinkConfigBuilder::build`] before any socket is touched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkConfig {
    role: LinkRole,
    address: IpAddr,
    port: u16,
    buffer_size: usize,
    reconnect_interval: Duration,
    timeout: Duration,
    no_delay: bool,
    pad_reads: bool,
}

impl LinkConfig {
    /// Start building a configuration for the given role and endpoint.
    pub fn builder(role: LinkRole, address: impl Into<String>, port: u16) -> LinkConfigBuilder {
        LinkConfigBuilder {
            role,
            address: address.into(),
            port,
            buffer_size: DEFAULT_BUFFER_SIZE,
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            no_delay: false,
            pad_reads: false,
        }
    }

    /// Start building a listener configuration bound to `address:port`.
    pub fn listener(address: impl Into<String>, port: u16) -> LinkConfigBuilder {
        Self::builder(LinkRole::Listener, address, port)
    }

    /// Start building a connector configuration targeting `address:port`.
    pub fn connector(address: impl Into<String>, port: u16) -> LinkConfigBuilder {
        Self::builder(LinkRole::Connector, address, port)
    }

    /// The role this link plays.
    pub fn role(&self) -> LinkRole {
        self.role
    }

    /// Bind address (listener) or remote address (connector).
    pub fn address(&self) -> IpAddr {
        self.address
    }

    /// The configured port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The endpoint as a socket address.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }

    /// Socket send/receive buffer size, also the size of each read.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Pause between reconnect attempts.
    pub fn reconnect_interval(&self) -> Duration {
        self.reconnect_interval
    }

    /// How long the link may stay unable to (re)establish a connection
    /// before it closes itself. Also bounds each accept, connect and read.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether TCP_NODELAY is set on established streams.
    pub fn no_delay(&self) -> bool {
        self.no_delay
    }

    /// Whether reads deliver the whole buffer instead of only the bytes read.
    pub fn pad_reads(&self) -> bool {
        self.pad_reads
    }
}

/// Builder for [`LinkConfig`].
#[derive(Clone, Debug)]
pub struct LinkConfigBuilder {
    role: LinkRole,
    address: String,
    port: u16,
    buffer_size: usize,
    reconnect_interval: Duration,
    timeout: Duration,
    no_delay: bool,
    pad_reads: bool,
}

impl LinkConfigBuilder {
    /// Set the socket buffer size in bytes.
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Set the pause between reconnect attempts.
    pub fn reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    /// Set the overall timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable or disable TCP_NODELAY.
    pub fn no_delay(mut self, enabled: bool) -> Self {
        self.no_delay = enabled;
        self
    }

    /// Deliver the full read buffer on every read, zero-padded past the
    /// bytes actually received.
    pub fn pad_reads(mut self, enabled: bool) -> Self {
        self.pad_reads = enabled;
        self
    }

    /// Validate the values and produce an immutable [`LinkConfig`].
    pub fn build(self) -> Result<LinkConfig> {
        if self.port == 0 {
            return Err(LinkError::InvalidConfig("port must be in 1..=65535".into()));
        }
        let address: IpAddr = self
            .address
            .trim()
            .parse()
            .map_err(|_| LinkError::InvalidAddress(self.address.clone()))?;
        if self.buffer_size == 0 {
            return Err(LinkError::InvalidConfig("buffer size must be positive".into()));
        }
        if self.reconnect_interval.is_zero() {
            return Err(LinkError::InvalidConfig(
                "reconnect interval must be positive".into(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(LinkError::InvalidConfig("timeout must be positive".into()));
        }

        Ok(LinkConfig {
            role: self.role,
            address,
            port: self.port,
            buffer_size: self.buffer_size,
            reconnect_interval: self.reconnect_interval,
            timeout: self.timeout,
            no_delay: self.no_delay,
            pad_reads: self.pad_reads,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LinkConfig::connector("127.0.0.1", 9000).build().unwrap();

        assert_eq!(config.role(), LinkRole::Connector);
        assert_eq!(config.socket_addr(), "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.buffer_size(), DEFAULT_BUFFER_SIZE);
        assert_eq!(config.reconnect_interval(), Duration::from_secs(1));
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(!config.no_delay());
        assert!(!config.pad_reads());
    }

    #[test]
    fn test_builder_overrides() {
        let config = LinkConfig::listener("::1", 9001)
            .buffer_size(4096)
            .reconnect_interval(Duration::from_millis(250))
            .timeout(Duration::from_secs(5))
            .no_delay(true)
            .pad_reads(true)
            .build()
            .unwrap();

        assert_eq!(config.role(), LinkRole::Listener);
        assert!(config.address().is_ipv6());
        assert_eq!(config.buffer_size(), 4096);
        assert_eq!(config.reconnect_interval(), Duration::from_millis(250));
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert!(config.no_delay());
        assert!(config.pad_reads());
    }

    #[test]
    fn test_port_zero_rejected() {
        let err = LinkConfig::listener("0.0.0.0", 0).build().unwrap_err();
        assert!(matches!(err, LinkError::InvalidConfig(_)));
    }

    #[test]
    fn test_unparsable_address_rejected() {
        let err = LinkConfig::connector("not-an-ip", 80).build().unwrap_err();
        assert_eq!(err, LinkError::InvalidAddress("not-an-ip".into()));
    }

    #[test]
    fn test_zero_values_rejected() {
        assert!(LinkConfig::connector("127.0.0.1", 1).buffer_size(0).build().is_err());
        assert!(
            LinkConfig::connector("127.0.0.1", 1)
                .reconnect_interval(Duration::ZERO)
                .build()
                .is_err()
        );
        assert!(
            LinkConfig::connector("127.0.0.1", 1)
                .timeout(Duration::ZERO)
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_role_display() {
        assert_eq!(LinkRole::Listener.to_string(), "listener");
        assert_eq!(LinkRole::Connector.to_string(), "connector");
    }
}
