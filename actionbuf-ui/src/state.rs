//! Shared application state for the action server.

use std::sync::Arc;

use anyhow::Result;

use actionbuf::core::ActionCoordinator;
use actionbuf::io::config::ActionConfig;

use crate::render::PageRenderer;

/// Shared state accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Single authority over which action is current.
    pub coordinator: ActionCoordinator,
    pub config: Arc<ActionConfig>,
    pub pages: Arc<PageRenderer>,
}

impl AppState {
    pub fn new(config: ActionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            coordinator: ActionCoordinator::new(),
            config: Arc::new(config),
            pages: Arc::new(PageRenderer::new()?),
        })
    }
}
