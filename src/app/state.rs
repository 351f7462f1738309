//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::relay::{IdGenerator, Relay, RelayHandle};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub relay: RelayHandle,
}

impl AppState {
    /// Build the state and the relay task that must be spawned alongside it
    pub fn new(config: Config) -> (Self, Relay) {
        Self::with_ids(config, IdGenerator::new())
    }

    pub fn with_ids(config: Config, ids: IdGenerator) -> (Self, Relay) {
        let (relay, handle) = Relay::new(ids);

        let state = Self {
            config: Arc::new(config),
            relay: handle,
        };

        (state, relay)
    }
}
