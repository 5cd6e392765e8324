use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use serde::Deserialize;

use super::types::{LimitsConfig, StreamingConfig, SweepConfig};
use crate::error_handling::types::ConfigError;

/// Application configuration structure that defines all runtime parameters.
///
/// Every field has a default, so an empty TOML file (or no file at all) yields
/// a working server on `0.0.0.0:5000`. A file only needs the keys it wants to
/// change; `--host` and `--port` on the command line win over the file.
///
/// # Fields Overview
///
/// The configuration contains the following attributes:
/// - `bind_address`: IP address the UDP socket binds to
/// - `port`: UDP port to listen on
/// - `limits`: concurrent session cap, idle timeout and reaper cadence
/// - `sweep`: which capture executable to spawn and how long a stop may take
/// - `streaming`: datagram sizing and per-stream backlog bounds
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// IP address the UDP socket binds to.
    pub bind_address: String,
    /// UDP port to listen on.
    pub port: u16,
    /// Session limits and reaper cadence.
    pub limits: LimitsConfig,
    /// Capture process settings.
    pub sweep: SweepConfig,
    /// Output batching and backpressure.
    pub streaming: StreamingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 5000,
            limits: LimitsConfig::default(),
            sweep: SweepConfig::default(),
            streaming: StreamingConfig::default(),
        }
    }
}

impl Config {
    /// Loads a configuration from a TOML file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the TOML file
    ///
    /// # Returns
    ///
    /// The parsed configuration, or a [`ConfigError`] when the file cannot be
    /// read or does not parse. Missing keys fall back to their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&raw)?;
        Ok(config)
    }

    /// Checks the configuration for values the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_address
            .parse::<IpAddr>()
            .map_err(|_| ConfigError::BadBindAddress(self.bind_address.clone()))?;
        if self.port == 0 {
            return Err(ConfigError::NotInRange("port must not be 0".to_string()));
        }
        if self.limits.max_sessions == 0 {
            return Err(ConfigError::NotInRange(
                "limits.max_sessions must be at least 1".to_string(),
            ));
        }
        if self.limits.reap_interval_secs == 0 {
            return Err(ConfigError::NotInRange(
                "limits.reap_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.streaming.max_datagram_bytes < 128 {
            return Err(ConfigError::NotInRange(
                "streaming.max_datagram_bytes must be at least 128".to_string(),
            ));
        }
        if self.streaming.max_batch_lines == 0 {
            return Err(ConfigError::NotInRange(
                "streaming.max_batch_lines must be at least 1".to_string(),
            ));
        }
        if self.streaming.outbound_queue_lines == 0 {
            return Err(ConfigError::NotInRange(
                "streaming.outbound_queue_lines must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The socket address the server should bind, combining `bind_address`
    /// and `port`.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .bind_address
            .parse()
            .map_err(|_| ConfigError::BadBindAddress(self.bind_address.clone()))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}
