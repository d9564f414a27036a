//! HTTP API for call control and live updates

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;

use crate::config::CallConfig;
use crate::runtime::CallManager;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub calls: Arc<CallManager>,
}

impl AppState {
    pub fn new(config: CallConfig) -> Self {
        Self {
            calls: Arc::new(CallManager::new(config)),
        }
    }
}
