use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use admit_engine::{EngineConfig, HeaderRule};
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Write-ahead log location. `None` keeps records in memory only.
    pub data_path: Option<PathBuf>,
    /// `fsync` the log after every write.
    pub sync_every_write: bool,
    /// Header rule for imports that do not name one.
    pub header_rule: HeaderRule,
    /// Largest accepted request body, in bytes.
    pub max_body_bytes: usize,
    pub engine: EngineConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)),
            data_path: None,
            sync_every_write: false,
            header_rule: HeaderRule::default(),
            max_body_bytes: 8 * 1024 * 1024,
            engine: EngineConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Load a TOML config file.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }
}
