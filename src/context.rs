use std::sync::Arc;

use crate::adapters;
use crate::config::AppConfig;
use crate::core::{CommandRunner, HostRegistry, MessageSender};

/// Everything a job needs from the outside world.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub registry: Arc<dyn HostRegistry>,
    /// `None` when no message transport is reachable.
    pub sender: Option<Arc<dyn MessageSender>>,
    pub runner: Arc<dyn CommandRunner>,
}

impl AppContext {
    /// Build the context with the adapters selected by `config`.
    pub fn new(config: AppConfig) -> Self {
        let registry = adapters::get_registry(&config.host, config.simulation);
        let sender = adapters::get_sender(&config.host, config.simulation);
        let runner = adapters::get_runner(config.simulation);
        Self::with_adapters(config, registry, sender, runner)
    }

    pub fn with_adapters(
        config: AppConfig,
        registry: Arc<dyn HostRegistry>,
        sender: Option<Arc<dyn MessageSender>>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            registry,
            sender,
            runner,
        }
    }
}
