//! Extension catalog route handlers.

use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use bf_core::ExtensionManifest;

use crate::context::AppContext;
use crate::error::AppError;

/// Extension listing entry.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ExtensionSummary {
    pub id: String,
    pub name: String,
    pub actions: usize,
    pub profiles: usize,
}

/// Full extension detail.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ExtensionResponse {
    pub id: String,
    pub name: String,
    pub actions: Vec<ActionResponse>,
    pub profiles: Vec<ProfileResponse>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ActionResponse {
    pub id: String,
    pub name: String,
    /// Executor kind: `exec` or `ffmpeg`.
    pub kind: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ProfileResponse {
    pub id: String,
    pub action: String,
    pub name: String,
    pub params: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ReloadResponse {
    pub loaded: usize,
}

impl ExtensionSummary {
    fn from_manifest(m: &ExtensionManifest) -> Self {
        Self {
            id: m.id.clone(),
            name: m.name.clone(),
            actions: m.actions.len(),
            profiles: m.profiles.len(),
        }
    }
}

impl ExtensionResponse {
    fn from_manifest(m: &ExtensionManifest) -> Self {
        Self {
            id: m.id.clone(),
            name: m.name.clone(),
            actions: m
                .actions
                .iter()
                .map(|a| ActionResponse {
                    id: a.id.clone(),
                    name: a.name.clone(),
                    kind: a.kind.as_str().to_string(),
                })
                .collect(),
            profiles: m
                .profiles
                .iter()
                .map(|p| ProfileResponse {
                    id: p.id.clone(),
                    action: p.action.clone(),
                    name: p.name.clone(),
                    params: p.params.clone(),
                })
                .collect(),
        }
    }
}

/// GET /api/extensions
#[utoipa::path(
    get,
    path = "/api/extensions",
    responses(
        (status = 200, description = "List installed extensions", body = Vec<ExtensionSummary>)
    )
)]
pub async fn list_extensions(State(ctx): State<AppContext>) -> Json<Vec<ExtensionSummary>> {
    Json(
        ctx.catalog
            .list()
            .iter()
            .map(|m| ExtensionSummary::from_manifest(m))
            .collect(),
    )
}

/// GET /api/extensions/{id}
#[utoipa::path(
    get,
    path = "/api/extensions/{id}",
    params(("id" = String, Path, description = "Extension ID")),
    responses(
        (status = 200, description = "Extension details", body = ExtensionResponse),
        (status = 404, description = "Extension not found")
    )
)]
pub async fn get_extension(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<ExtensionResponse>, AppError> {
    let manifest = ctx.catalog.get(&id)?;
    Ok(Json(ExtensionResponse::from_manifest(&manifest)))
}

/// POST /api/extensions/reload
#[utoipa::path(
    post,
    path = "/api/extensions/reload",
    responses(
        (status = 200, description = "Extension directory re-scanned", body = ReloadResponse)
    )
)]
pub async fn reload_extensions(State(ctx): State<AppContext>) -> Json<ReloadResponse> {
    let catalog = ctx.catalog.clone();
    let loaded = tokio::task::spawn_blocking(move || catalog.reload())
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Extension reload task failed: {e}");
            0
        });
    Json(ReloadResponse { loaded })
}
