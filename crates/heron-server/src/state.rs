use crate::configuration::Settings;
use std::sync::Arc;

/// Shared application state. Only immutable configuration is shared between requests.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Arc::new(settings),
        }
    }
}
