pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod monitor;
pub mod utils;
pub mod web;

#[cfg(test)]
pub(crate) mod test_support;

pub use api::*;
pub use config::*;
pub use error::*;
pub use models::*;
pub use monitor::*;
pub use utils::*;

use std::sync::Arc;
use tracing::info;

/// Everything a binary needs to track games: the registry of running
/// monitors and the scheduler that fills it.
pub struct Tracker {
    pub registry: Arc<MonitorRegistry>,
    pub scheduler: Arc<CollectionScheduler>,
}

impl Tracker {
    /// Wire up a tracker against any game source.
    pub fn new(config: TrackerConfig, source: Arc<dyn GameSource>) -> Result<Self> {
        let dispatcher = Dispatcher::from_config(&config)?;
        let registry = Arc::new(MonitorRegistry::new(
            Arc::new(config),
            source.clone(),
            Arc::new(dispatcher),
        ));
        let scheduler = Arc::new(CollectionScheduler::new(source, registry.clone()));

        Ok(Self {
            registry,
            scheduler,
        })
    }

    /// Tracker backed by the public ESPN scoreboard, configured from the
    /// process environment. Binaries load `.env` before calling this.
    pub fn from_env() -> Result<Self> {
        let config = TrackerConfig::from_env()?;
        info!(
            categories = ?config.categories,
            channels = ?config.channels,
            poll_interval = ?config.poll_interval,
            horizon = ?config.monitoring_horizon,
            "loaded tracker configuration"
        );
        Self::new(config, Arc::new(EspnApiClient::new()))
    }
}
