//! Admin route handlers.

use axum::extract::State;
use axum::Json;

use crate::context::AppContext;

/// GET /api/admin/tools
#[utoipa::path(
    get,
    path = "/api/admin/tools",
    responses(
        (status = 200, description = "List external tool availability", body = Vec<ToolInfoResponse>)
    )
)]
pub async fn tools(State(ctx): State<AppContext>) -> Json<Vec<ToolInfoResponse>> {
    let tools = ctx.tools.clone();
    // Version probing spawns processes; keep it off the async workers.
    let infos = tokio::task::spawn_blocking(move || tools.check_all())
        .await
        .unwrap_or_default();
    Json(infos.into_iter().map(ToolInfoResponse::from).collect())
}

/// Availability of one external tool.
#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct ToolInfoResponse {
    pub name: String,
    pub available: bool,
    pub version: Option<String>,
    pub path: Option<String>,
}

impl From<bf_av::ToolInfo> for ToolInfoResponse {
    fn from(info: bf_av::ToolInfo) -> Self {
        Self {
            name: info.name,
            available: info.available,
            version: info.version,
            path: info.path.map(|p| p.to_string_lossy().into_owned()),
        }
    }
}
