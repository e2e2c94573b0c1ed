use serde::Deserialize;
use disgordian_core::error::{DisgordianError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub version: u32,

    pub gateway: GatewaySection,

    pub identity: IdentitySection,
}

impl ClientConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(DisgordianError::Config(format!(
                "unsupported config version {}",
                self.version
            )));
        }

        self.gateway.validate()?;
        self.identity.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    /// Resolved gateway endpoint (`wss://...`), without query.
    pub url: String,

    #[serde(default = "default_protocol_version")]
    pub protocol_version: u32,

    #[serde(default = "default_encoding")]
    pub encoding: String,

    /// Capacity of the internal heartbeat/housekeeping queue.
    #[serde(default = "default_outbound_capacity")]
    pub outbound_capacity: usize,

    /// How long queued application frames may take to flush on shutdown.
    #[serde(default = "default_drain_timeout_ms")]
    pub drain_timeout_ms: u64,
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(DisgordianError::Config(
                "gateway.url must start with ws:// or wss://".into(),
            ));
        }
        if !(1..=10).contains(&self.protocol_version) {
            return Err(DisgordianError::Config(
                "gateway.protocol_version must be between 1 and 10".into(),
            ));
        }
        if self.encoding != "json" {
            return Err(DisgordianError::Config(
                "gateway.encoding must be \"json\"".into(),
            ));
        }
        if self.outbound_capacity == 0 {
            return Err(DisgordianError::Config(
                "gateway.outbound_capacity must be at least 1".into(),
            ));
        }
        if self.drain_timeout_ms > 30_000 {
            return Err(DisgordianError::Config(
                "gateway.drain_timeout_ms must be at most 30000".into(),
            ));
        }
        Ok(())
    }

    /// Endpoint with the protocol-version query appended.
    pub fn connect_url(&self) -> String {
        let sep = if self.url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}v={}&encoding={}",
            self.url, sep, self.protocol_version, self.encoding
        )
    }
}

fn default_protocol_version() -> u32 {
    5
}
fn default_encoding() -> String {
    "json".into()
}
fn default_outbound_capacity() -> usize {
    64
}
fn default_drain_timeout_ms() -> u64 {
    2000
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentitySection {
    pub token: String,

    #[serde(default = "default_os")]
    pub os: String,

    #[serde(default = "default_client_name")]
    pub browser: String,

    #[serde(default = "default_client_name")]
    pub device: String,

    #[serde(default)]
    pub compress: bool,

    #[serde(default = "default_large_threshold")]
    pub large_threshold: u32,

    #[serde(default = "default_shard")]
    pub shard: [u32; 2],
}

impl IdentitySection {
    pub fn validate(&self) -> Result<()> {
        if self.token.trim().is_empty() {
            return Err(DisgordianError::Config("identity.token must not be empty".into()));
        }
        // payload compression is not decoded by the session
        if self.compress {
            return Err(DisgordianError::Config(
                "identity.compress is not supported".into(),
            ));
        }
        if !(50..=250).contains(&self.large_threshold) {
            return Err(DisgordianError::Config(
                "identity.large_threshold must be between 50 and 250".into(),
            ));
        }
        let [index, count] = self.shard;
        if count == 0 || index >= count {
            return Err(DisgordianError::Config(
                "identity.shard must be [index, count] with index < count".into(),
            ));
        }
        Ok(())
    }
}

fn default_os() -> String {
    "linux".into()
}
fn default_client_name() -> String {
    "disgordian".into()
}
fn default_large_threshold() -> u32 {
    250
}
fn default_shard() -> [u32; 2] {
    [0, 1]
}
