// Application state module
// Everything a request handler needs, shared by all connections

use std::sync::Arc;

use super::types::Config;
use crate::relay::{RelaySettings, StreamStats};
use crate::source::RemoteObjectSource;

/// Application state
#[derive(Debug)]
pub struct AppState {
    pub config: Config,
    pub source: Arc<dyn RemoteObjectSource>,
    pub relay: RelaySettings,
    pub stats: Arc<StreamStats>,
}

impl AppState {
    pub fn new(config: Config, source: Arc<dyn RemoteObjectSource>) -> Self {
        let relay = RelaySettings::from(&config.stream);
        Self {
            config,
            source,
            relay,
            stats: Arc::new(StreamStats::new()),
        }
    }
}
