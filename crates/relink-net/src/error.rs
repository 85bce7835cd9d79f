//! Error types for the networking module.

/// Link-specific errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    /// A configuration value was rejected before any socket work began.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// The address could not be parsed as an IP address.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    /// The listening socket could not be created.
    #[error("Failed to bind listener: {0}")]
    Bind(String),
    /// No stream is currently established.
    #[error("Not connected")]
    NotConnected,
    /// The link has been closed.
    #[error("Link is closed")]
    Closed,
    /// An accept, connect, read or write failed.
    #[error("TCP socket error: {0}")]
    Io(String),
    /// An accept or connect attempt ran out of time.
    #[error("Operation timed out")]
    Timeout,
    /// A settings file could not be read or parsed.
    #[error("Settings error: {0}")]
    Settings(String),
}

impl From<std::io::Error> for LinkError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<toml::de::Error> for LinkError {
    fn from(err: toml::de::Error) -> Self {
        Self::Settings(err.to_string())
    }
}

impl From<std::net::AddrParseError> for LinkError {
    fn from(err: std::net::AddrParseError) -> Self {
        Self::InvalidAddress(err.to_string())
    }
}

/// A specialized Result type for link operations.
pub type Result<T> = std::result::Result<T, LinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let err: LinkError =
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused").into();
        assert!(matches!(err, LinkError::Io(ref msg) if msg.contains("refused")));
    }

    #[test]
    fn test_display() {
        assert_eq!(LinkError::NotConnected.to_string(), "Not connected");
        assert_eq!(
            LinkError::InvalidConfig("port must be non-zero".into()).to_string(),
            "Invalid configuration: port must be non-zero"
        );
    }
}
