//! Loading link configuration from TOML settings.
//!
//! ```toml
//! role = "connector"
//! address = "127.0.0.1"
//! port = 9000
//! buffer_size = 65536
//! reconnect_interval_ms = 500
//! timeout_ms = 10000
//! ```
//!
//! Omitted optional keys fall back to the [`LinkConfig`] defaults.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use super::config::{LinkConfig, LinkRole};
use crate::Result;
use crate::error::LinkError;

/// Raw, unvalidated link settings as read from a file.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkSettings {
    /// Listener or connector.
    pub role: LinkRole,
    /// IP address to bind or connect to.
    pub address: String,
    /// Port to bind or connect to.
    pub port: u16,
    /// Socket buffer size in bytes.
    #[serde(default)]
    pub buffer_size: Option<usize>,
    /// Pause between reconnect attempts, in milliseconds.
    #[serde(default)]
    pub reconnect_interval_ms: Option<u64>,
    /// Overall timeout, in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Enable TCP_NODELAY.
    #[serde(default)]
    pub no_delay: bool,
    /// Deliver whole read buffers.
    #[serde(default)]
    pub pad_reads: bool,
}

impl LinkSettings {
    /// Parse settings from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML settings file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| LinkError::Settings(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Validate into a [`LinkConfig`].
    pub fn into_config(self) -> Result<LinkConfig> {
        LinkConfig::try_from(self)
    }
}

impl TryFrom<LinkSettings> for LinkConfig {
    type Error = LinkError;

    fn try_from(settings: LinkSettings) -> Result<Self> {
        let mut builder = LinkConfig::builder(settings.role, settings.address, settings.port)
            .no_delay(settings.no_delay)
            .pad_reads(settings.pad_reads);
        if let Some(size) = settings.buffer_size {
            builder = builder.buffer_size(size);
        }
        if let Some(ms) = settings.reconnect_interval_ms {
            builder = builder.reconnect_interval(Duration::from_millis(ms));
        }
        if let Some(ms) = settings.timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_settings_use_defaults() {
        let settings = LinkSettings::from_toml_str(
            r#"
            role = "listener"
            address = "0.0.0.0"
            port = 9001
            "#,
        )
        .unwrap();
        let config = settings.into_config().unwrap();

        assert_eq!(config.role(), LinkRole::Listener);
        assert_eq!(config.port(), 9001);
        assert_eq!(config.buffer_size(), super::super::config::DEFAULT_BUFFER_SIZE);
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_full_settings() {
        let config = LinkSettings::from_toml_str(
            r#"
            role = "connector"
            address = "10.0.0.7"
            port = 7000
            buffer_size = 2048
            reconnect_interval_ms = 250
            timeout_ms = 1500
            no_delay = true
            "#,
        )
        .unwrap()
        .into_config()
        .unwrap();

        assert_eq!(config.buffer_size(), 2048);
        assert_eq!(config.reconnect_interval(), Duration::from_millis(250));
        assert_eq!(config.timeout(), Duration::from_millis(1500));
        assert!(config.no_delay());
    }

    #[test]
    fn test_out_of_range_port_is_settings_error() {
        let err = LinkSettings::from_toml_str(
            r#"
            role = "connector"
            address = "127.0.0.1"
            port = 70000
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, LinkError::Settings(_)));
    }

    #[test]
    fn test_unknown_role_rejected() {
        let err = LinkSettings::from_toml_str(
            r#"
            role = "relay"
            address = "127.0.0.1"
            port = 1
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, LinkError::Settings(_)));
    }

    #[test]
    fn test_validation_runs_on_conversion() {
        let settings = LinkSettings::from_toml_str(
            r#"
            role = "connector"
            address = "127.0.0.1"
            port = 0
            "#,
        )
        .unwrap();
        assert!(matches!(
            settings.into_config(),
            Err(LinkError::InvalidConfig(_))
        ));
    }
}
