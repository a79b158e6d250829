//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the resolver and the
//! settings every WebSocket session controller is created with.

use std::sync::Arc;
use tutor_core::{controller::ControllerConfig, resolver::CommandResolver};

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<dyn CommandResolver>,
    pub controller_config: ControllerConfig,
}

impl AppState {
    pub fn credential(&self) -> &str {
        &self.controller_config.credential
    }
}
