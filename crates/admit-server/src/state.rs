use std::sync::Arc;

use admit_engine::{EngineConfig, HeaderRule, LifecycleEngine};
use admit_store::{CodeStore, InMemoryCodeStore, SyncMode, WalCodeStore, WalConfig};

use crate::clock::{Clock, SystemClock};
use crate::config::ServerConfig;
use crate::error::ServerResult;

/// Shared request state.
#[derive(Clone)]
pub struct AppState {
    pub engine: LifecycleEngine<dyn CodeStore>,
    pub clock: Arc<dyn Clock>,
    pub header_rule: HeaderRule,
}

impl AppState {
    pub fn new(
        store: Arc<dyn CodeStore>,
        engine: EngineConfig,
        clock: Arc<dyn Clock>,
        header_rule: HeaderRule,
    ) -> Self {
        Self {
            engine: LifecycleEngine::new(store, engine),
            clock,
            header_rule,
        }
    }

    /// Build state from config: open the configured store, use wall-clock time.
    pub fn from_config(config: &ServerConfig) -> ServerResult<Self> {
        let store: Arc<dyn CodeStore> = match &config.data_path {
            Some(path) => {
                let sync_mode = if config.sync_every_write {
                    SyncMode::EveryWrite
                } else {
                    SyncMode::OsDefault
                };
                Arc::new(WalCodeStore::open(path, WalConfig { sync_mode })?)
            }
            None => {
                tracing::warn!("no data_path configured; records live in memory only");
                Arc::new(InMemoryCodeStore::new())
            }
        };
        Ok(Self::new(
            store,
            config.engine.clone(),
            Arc::new(SystemClock),
            config.header_rule,
        ))
    }
}
