//! Server configuration

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

/// Well-known multicast group peers join by default
pub const DEFAULT_MULTICAST_ADDRESS: &str = "239.255.42.42";

/// Port of the default multicast group
pub const DEFAULT_MULTICAST_PORT: u16 = 5001;

/// Heartbeat period in update ticks
pub const DEFAULT_HEARTBEAT_FREQUENCY: u32 = 30;

/// Upper bound on the network clock handshake
pub const DEFAULT_CLOCK_TIMEOUT_MS: u64 = 100;

/// Network player server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the network time provider binds to
    pub clock_address: String,
    /// Port the network time provider listens on
    pub clock_port: u16,
    /// Heartbeat period in update ticks
    pub heartbeat_frequency: u32,
    /// Clock timeout in milliseconds
    pub clock_timeout_ms: u64,
    /// Join the default multicast group at construction
    pub multicast_enabled: bool,
    /// Multicast group (or unicast peer) for heartbeats and commands
    pub multicast_address: String,
    /// Port of the multicast group
    pub multicast_port: u16,
    /// Give up on a pending seek after this many stop requests (unbounded when unset)
    pub max_seek_retries: Option<u32>,
    /// Apply inbound command records to this server
    pub accept_commands: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            clock_address: "0.0.0.0".to_string(),
            clock_port: 5000,
            heartbeat_frequency: DEFAULT_HEARTBEAT_FREQUENCY,
            clock_timeout_ms: DEFAULT_CLOCK_TIMEOUT_MS,
            multicast_enabled: true,
            multicast_address: DEFAULT_MULTICAST_ADDRESS.to_string(),
            multicast_port: DEFAULT_MULTICAST_PORT,
            max_seek_retries: None,
            accept_commands: false,
        }
    }
}

impl ServerConfig {
    /// Configuration with the clock provider on the given address
    pub fn new(clock_address: impl Into<String>, clock_port: u16) -> Self {
        Self {
            clock_address: clock_address.into(),
            clock_port,
            ..Default::default()
        }
    }

    /// Same configuration without the multicast auto-join
    pub fn local_only(mut self) -> Self {
        self.multicast_enabled = false;
        self
    }

    /// Parse from a JSON document; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Clock timeout as a duration
    pub fn clock_timeout(&self) -> Duration {
        Duration::from_millis(self.clock_timeout_ms)
    }

    /// Check addresses and ports
    pub fn validate(&self) -> Result<()> {
        self.clock_address.parse::<IpAddr>().map_err(|_| {
            Error::InvalidConfig(format!("clock_address '{}' is not an IP address", self.clock_address))
        })?;

        self.multicast_address.parse::<IpAddr>().map_err(|_| {
            Error::InvalidConfig(format!(
                "multicast_address '{}' is not an IP address",
                self.multicast_address
            ))
        })?;

        if self.multicast_enabled && self.multicast_port == 0 {
            return Err(Error::InvalidConfig("multicast_port must be non-zero".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.heartbeat_frequency, 30);
        assert_eq!(config.clock_timeout(), Duration::from_millis(100));
        assert!(config.multicast_enabled);
        assert!(config.max_seek_retries.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ServerConfig::from_json_str(r#"{ "clock_port": 6000, "heartbeat_frequency": 10 }"#).unwrap();
        assert_eq!(config.clock_port, 6000);
        assert_eq!(config.heartbeat_frequency, 10);
        assert_eq!(config.multicast_address, DEFAULT_MULTICAST_ADDRESS);
    }

    #[test]
    fn test_invalid_address_rejected() {
        let err = ServerConfig::from_json_str(r#"{ "clock_address": "not-an-ip" }"#).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "clock_address": "127.0.0.1", "multicast_enabled": false }}"#).unwrap();

        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.clock_address, "127.0.0.1");
        assert!(!config.multicast_enabled);
    }
}
