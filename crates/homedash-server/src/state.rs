//! Shared application state for the homedash server.
//!
//! A single [`AppState`] is constructed at startup and shared across all
//! Axum handlers via `Arc`.

use homedash_core::engine::ConfigEngine;

use crate::config::PrincipalHeaders;

/// Shared application state passed to all HTTP handlers.
pub struct AppState {
    /// Every read and write of the dashboard configuration goes through here.
    pub engine: ConfigEngine,
    /// Where the authenticating proxy puts the caller's identity.
    pub principal: PrincipalHeaders,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("engine", &self.engine)
            .field("principal", &self.principal)
            .finish()
    }
}
