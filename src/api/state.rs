use std::sync::Arc;

use crate::bundle::Bundler;
use crate::config::Config;
use crate::retrieval::Retriever;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub bundler: Arc<Bundler>,
    pub retriever: Arc<dyn Retriever>,
}

impl AppState {
    pub fn new(config: Config, retriever: Arc<dyn Retriever>) -> Self {
        let bundler = Bundler::from_config(&config, retriever.clone());
        Self::with_bundler(config, bundler, retriever)
    }

    /// State around a custom bundler, e.g. one with a different archive builder
    pub fn with_bundler(config: Config, bundler: Bundler, retriever: Arc<dyn Retriever>) -> Self {
        Self {
            config: Arc::new(config),
            bundler: Arc::new(bundler),
            retriever,
        }
    }
}
