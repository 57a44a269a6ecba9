//! Configuration routes: `/api/config/*`
//!
//! Every principal may read the redacted configuration. Saving, exporting,
//! and importing require an admin principal.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::middleware as axum_mw;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use homedash_core::document::Document;
use homedash_core::reconcile::ReconcileWarning;

use crate::error::AppError;
use crate::middleware::{Principal, require_admin};
use crate::state::AppState;

/// Routes open to every principal.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/config", get(read_config))
}

/// Routes that require an admin principal.
pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/config", post(save_config))
        .route("/config/export", get(export_config))
        .route("/config/import", post(import_config))
        .route_layer(axum_mw::from_fn(require_admin))
}

// ── Response types ───────────────────────────────────────────────────

/// Response body for `POST /api/config`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResponse {
    pub message: &'static str,
    /// The redacted form of what was persisted.
    pub updated_config: Document,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ReconcileWarning>,
}

/// Response body for `POST /api/config/import`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    pub message: &'static str,
    pub updated_config: Document,
}

// ── Handlers ─────────────────────────────────────────────────────────

/// Redacted configuration, admin-only content removed for non-admins.
async fn read_config(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Json<Document> {
    Json(state.engine.read(principal.is_admin).await)
}

async fn save_config(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<Value>,
) -> Result<Json<SaveResponse>, AppError> {
    let outcome = state.engine.save(body).await?;
    info!(
        user = principal.username.as_deref().unwrap_or("-"),
        warnings = outcome.warnings.len(),
        "config updated"
    );
    Ok(Json(SaveResponse {
        message: "Configuration saved successfully",
        updated_config: outcome.document,
        warnings: outcome.warnings,
    }))
}

/// Full configuration with real secret values, as a file download.
async fn export_config(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> impl IntoResponse {
    let doc = state.engine.export().await;
    let filename = export_filename(chrono::Utc::now());
    info!(
        user = principal.username.as_deref().unwrap_or("-"),
        %filename,
        "config exported"
    );
    (
        [(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )],
        Json(doc),
    )
}

async fn import_config(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<Value>,
) -> Result<Json<ImportResponse>, AppError> {
    let doc = state.engine.import(body).await?;
    info!(
        user = principal.username.as_deref().unwrap_or("-"),
        "config imported"
    );
    Ok(Json(ImportResponse {
        message: "Configuration imported successfully",
        updated_config: doc,
    }))
}

fn export_filename(now: chrono::DateTime<chrono::Utc>) -> String {
    format!("homedash-config-{}.json", now.format("%Y-%m-%dT%H-%M-%SZ"))
}
