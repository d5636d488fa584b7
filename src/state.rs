use crate::config::Config;
use crate::store::LinkStore;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LinkStore>,
    pub config: Arc<Config>,
}
