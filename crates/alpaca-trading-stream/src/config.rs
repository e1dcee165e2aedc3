/*
[INPUT]:  YAML configuration file and APCA_* environment variables
[OUTPUT]: Validated runner configuration and trading stream settings
[POS]:    Configuration layer - stream setup
[UPDATE]: When adding new configuration options
*/

use std::time::Duration;

use alpaca_trading_adapter::{Credentials, Environment, StreamConfig, TransportOptions};
use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

/// Top-level configuration for the trade stream runner
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RunnerConfig {
    /// API key pair; falls back to APCA_API_KEY_ID / APCA_API_SECRET_KEY
    #[serde(default)]
    pub credentials: Option<CredentialsConfig>,
    /// "paper" or "live"
    #[serde(default)]
    pub environment: Environment,
    /// Explicit stream URL, overrides `environment`
    #[serde(default)]
    pub url_override: Option<String>,
    /// Log raw `data` documents instead of typed updates
    #[serde(default)]
    pub raw_data: bool,
    #[serde(default)]
    pub transport: TransportConfig,
    /// Bounded wait of a single read, in seconds
    #[serde(default = "default_recv_timeout_secs")]
    pub recv_timeout_secs: u64,
}

/// API key pair
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CredentialsConfig {
    pub api_key: String,
    pub secret_key: String,
}

/// WebSocket keepalive and queue settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransportConfig {
    /// Seconds between keepalive pings; 0 disables keepalive
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,
    #[serde(default = "default_ping_timeout_secs")]
    pub ping_timeout_secs: u64,
    #[serde(default = "default_max_queue")]
    pub max_queue: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ping_interval_secs: default_ping_interval_secs(),
            ping_timeout_secs: default_ping_timeout_secs(),
            max_queue: default_max_queue(),
        }
    }
}

fn default_ping_interval_secs() -> u64 {
    10
}

fn default_ping_timeout_secs() -> u64 {
    180
}

fn default_max_queue() -> usize {
    1024
}

fn default_recv_timeout_secs() -> u64 {
    5
}

impl RunnerConfig {
    /// Load configuration from YAML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(url) = &self.url_override
            && !(url.starts_with("ws://") || url.starts_with("wss://"))
        {
            bail!("url_override must be a ws:// or wss:// URL, got {url}");
        }
        if self.transport.ping_timeout_secs == 0 {
            bail!("transport.ping_timeout_secs must be positive");
        }
        if self.transport.max_queue == 0 {
            bail!("transport.max_queue must be positive");
        }
        if self.recv_timeout_secs == 0 {
            bail!("recv_timeout_secs must be positive");
        }
        Ok(())
    }

    /// Credentials from the file, else from the environment
    pub fn resolve_credentials(&self) -> anyhow::Result<Credentials> {
        match &self.credentials {
            Some(credentials) => {
                Credentials::new(credentials.api_key.clone(), credentials.secret_key.clone())
                    .context("credentials in config file")
            }
            None => Credentials::from_env().context("credentials from environment"),
        }
    }

    pub fn transport_options(&self) -> TransportOptions {
        TransportOptions {
            ping_interval: match self.transport.ping_interval_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            ping_timeout: Duration::from_secs(self.transport.ping_timeout_secs),
            max_queue: self.transport.max_queue,
        }
    }

    pub fn to_stream_config(&self, credentials: Credentials) -> StreamConfig {
        let config = StreamConfig::new(credentials)
            .with_environment(self.environment)
            .with_raw_data(self.raw_data)
            .with_transport_options(self.transport_options())
            .with_recv_timeout(Duration::from_secs(self.recv_timeout_secs));
        match &self.url_override {
            Some(url) => config.with_url_override(url.clone()),
            None => config,
        }
    }
}
