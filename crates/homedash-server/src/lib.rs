//! homedash HTTP server.
//!
//! Wires the config engine, the document store, and the HTTP routes into a
//! running Axum server. Serves the JSON API at `/api/*`.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
