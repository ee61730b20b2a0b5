use crate::config::AppConfig;
use crate::core::JobRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub registry: Arc<JobRegistry>,
}

impl AppContext {
    pub fn new(config: AppConfig, registry: JobRegistry) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
        }
    }
}
