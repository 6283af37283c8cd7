use std::time::Duration;

use serde::Deserialize;

/// Broker configuration, parsed from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    /// Listen address, e.g. `0.0.0.0:7654`.
    #[serde(default)]
    pub listen: String,

    /// Replica brokers every produced message is forwarded to.
    /// Empty disables replication.
    #[serde(default)]
    pub replicas: Vec<String>,

    /// Deadline for one replication fan-out.
    #[serde(default = "default_replication_timeout_ms")]
    pub replication_timeout_ms: u64,

    /// Largest frame body accepted or sent, in bytes.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,

    /// When this broker acts as a replica, also append forwarded messages
    /// to its own store. Off by default: replicas only acknowledge.
    #[serde(default)]
    pub replica_store_writes: bool,

    /// Dial every replica before accepting connections and fail startup if
    /// one is unreachable. Otherwise replicas are dialed on first use.
    #[serde(default)]
    pub dial_replicas_at_startup: bool,
}

fn default_replication_timeout_ms() -> u64 {
    2000
}

fn default_max_frame_bytes() -> usize {
    wire::DEFAULT_MAX_FRAME_LEN
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("read '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("parse: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("'{0}' is required")]
    Missing(&'static str),

    #[error("'{field}': {detail}")]
    Invalid { field: &'static str, detail: String },
}

impl BrokerConfig {
    /// Configuration with defaults for everything except the listen address.
    pub fn new(listen: impl Into<String>) -> Self {
        Self {
            listen: listen.into(),
            replicas: Vec::new(),
            replication_timeout_ms: default_replication_timeout_ms(),
            max_frame_bytes: default_max_frame_bytes(),
            replica_store_writes: false,
            dial_replicas_at_startup: false,
        }
    }

    /// Load and validate configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listen.trim().is_empty() {
            return Err(ConfigError::Missing("listen"));
        }
        if let Some(index) = self.replicas.iter().position(|r| r.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                field: "replicas",
                detail: format!("address [{index}] is empty"),
            });
        }
        if self.replication_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "replication_timeout_ms",
                detail: "must be greater than zero".into(),
            });
        }
        if self.max_frame_bytes == 0 {
            return Err(ConfigError::Invalid {
                field: "max_frame_bytes",
                detail: "must be greater than zero".into(),
            });
        }
        Ok(())
    }

    pub fn replication_timeout(&self) -> Duration {
        Duration::from_millis(self.replication_timeout_ms)
    }
}
