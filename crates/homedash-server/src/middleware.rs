//! Principal extraction for homedash.
//!
//! Authentication happens upstream: a reverse proxy authenticates the user and
//! forwards their name and role in trusted headers. This middleware turns
//! those headers into a [`Principal`] in the request extensions. Requests
//! without the headers get an anonymous, non-admin principal.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::config::PrincipalHeaders;
use crate::error::AppError;
use crate::state::AppState;

/// The caller as established by the authenticating proxy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Principal {
    pub username: Option<String>,
    pub is_admin: bool,
}

impl Principal {
    /// Read the principal from trusted proxy headers.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap, config: &PrincipalHeaders) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
        };
        let is_admin = header(&config.role_header).is_some_and(|role| role == config.admin_role);
        Self {
            username: header(&config.user_header),
            is_admin,
        }
    }
}

/// Attach a [`Principal`] to every request.
pub async fn principal_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let principal = Principal::from_headers(req.headers(), &state.principal);
    req.extensions_mut().insert(principal);
    next.run(req).await
}

/// Reject non-admin principals with 403.
///
/// Must run inside [`principal_middleware`].
pub async fn require_admin(req: Request, next: Next) -> Response {
    let is_admin = req
        .extensions()
        .get::<Principal>()
        .is_some_and(|p| p.is_admin);
    if !is_admin {
        tracing::warn!(path = %req.uri().path(), "non-admin request to admin route rejected");
        return AppError::Forbidden("admin access required".to_owned()).into_response();
    }
    next.run(req).await
}
