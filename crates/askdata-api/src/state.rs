use askdata_adaptor::{AnalyticsAi, QueryEngine, TaskPoller};
use askdata_persist::ThreadStore;
use std::sync::Arc;

use crate::config::Config;

/// Shared application state passed to all handlers
///
/// The store and the upstream clients sit behind traits so tests can
/// swap in in-memory and fake implementations.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn ThreadStore>,
    pub ai: Arc<dyn AnalyticsAi>,
    pub engine: Arc<dyn QueryEngine>,
    pub poller: TaskPoller,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn ThreadStore>,
        ai: Arc<dyn AnalyticsAi>,
        engine: Arc<dyn QueryEngine>,
    ) -> Self {
        let poller = config.polling.poller();
        Self {
            config: Arc::new(config),
            store,
            ai,
            engine,
            poller,
        }
    }
}
