//! Configuration for TELEPIPE

use crate::channel::{ResilientChannel, TcpChannel, UdpChannel};
use crate::error::{Result, TelepipeError};
use std::env;

/// Main configuration for TELEPIPE
#[derive(Debug, Clone)]
pub struct Config {
    /// Collector address ("host:port")
    pub endpoint: String,

    /// Transport used by the underlying channel
    pub transport: Transport,

    /// Consecutive send failures before the active channel is replaced
    pub replace_threshold: u32,
}

/// Transport kind for the underlying channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Tcp,
    Udp,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: "127.0.0.1:2003".to_string(),
            transport: Transport::Tcp,
            replace_threshold: 3,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(endpoint) = env::var("TELEPIPE_ENDPOINT") {
            config.endpoint = endpoint;
        }

        if let Ok(transport) = env::var("TELEPIPE_TRANSPORT") {
            config.transport = match transport.to_lowercase().as_str() {
                "tcp" => Transport::Tcp,
                "udp" => Transport::Udp,
                other => {
                    return Err(TelepipeError::Config(format!(
                        "invalid TELEPIPE_TRANSPORT: {other} (expected 'tcp' or 'udp')"
                    )))
                }
            };
        }

        if let Ok(threshold) = env::var("TELEPIPE_REPLACE_THRESHOLD") {
            config.replace_threshold = threshold.parse().map_err(|e| {
                TelepipeError::Config(format!("invalid TELEPIPE_REPLACE_THRESHOLD: {e}"))
            })?;
        }

        Ok(config)
    }

    /// Build a [`ResilientChannel`] over the configured transport
    ///
    /// The returned channel reconstructs its transport from this
    /// configuration on every replacement.
    pub fn channel(&self) -> ResilientChannel {
        let endpoint = self.endpoint.clone();
        match self.transport {
            Transport::Tcp => ResilientChannel::new(
                move || Box::new(TcpChannel::new(endpoint.clone())),
                self.replace_threshold,
            ),
            Transport::Udp => ResilientChannel::new(
                move || Box::new(UdpChannel::new(endpoint.clone())),
                self.replace_threshold,
            ),
        }
    }
}
