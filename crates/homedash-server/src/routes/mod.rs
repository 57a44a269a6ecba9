//! HTTP route handlers for homedash.
//!
//! Routes are organized by subsystem:
//! - `config`: Dashboard configuration read, save, export, and import
//! - `sys`: Health check

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, header};
use axum::middleware as axum_mw;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::principal_middleware;
use crate::state::AppState;

pub mod config;
pub mod sys;

/// Maximum in-flight requests on the admin config routes.
const ADMIN_CONCURRENCY: usize = 8;

/// Build the full application router with all routes and middleware.
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .merge(config::router())
        .merge(config::admin_router().layer(ConcurrencyLimitLayer::new(ADMIN_CONCURRENCY)))
        .merge(sys::router())
        .layer(axum_mw::from_fn_with_state(
            Arc::clone(&state),
            principal_middleware,
        ));

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .with_state(state)
}
