//! Runner management route handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use bf_core::{Profile, RunnerId};
use bf_pipeline::{EntrySource, Runner, StartRequest};

use crate::context::AppContext;
use crate::error::AppError;

/// Request body for starting a runner.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct StartRunnerRequest {
    pub extension_id: String,
    pub action_id: String,
    /// Inline profile: `{ "name": ..., "params": { ... } }`.
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub profile: Option<Profile>,
    /// Id of a profile saved in the extension manifest.
    #[serde(default)]
    pub profile_id: Option<String>,
    /// Worklist source, tagged by `mode` (`directory` or `list`).
    #[schema(value_type = Object)]
    pub source: EntrySource,
}

impl StartRunnerRequest {
    fn into_start_request(self) -> bf_core::Result<StartRequest> {
        if self.extension_id.trim().is_empty() {
            return Err(bf_core::Error::Validation("extension_id is required".into()));
        }
        if self.action_id.trim().is_empty() {
            return Err(bf_core::Error::Validation("action_id is required".into()));
        }
        Ok(StartRequest {
            extension_id: self.extension_id,
            action_id: self.action_id,
            profile: self.profile,
            profile_id: self.profile_id,
            source: self.source,
        })
    }
}

/// Response to a successful start.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct StartRunnerResponse {
    pub runner_id: u64,
    pub amount: usize,
}

/// Live progress of one runner.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RunnerProgressResponse {
    pub runner_id: u64,
    pub finished: usize,
    /// Sum of in-flight entry progress as reported by each controller. Not clamped.
    pub running: f64,
    pub amount: usize,
    pub failed: usize,
    pub skipped: usize,
    pub state: String,
}

/// Listing entry.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RunnerSummaryResponse {
    pub runner_id: u64,
    pub extension_id: String,
    pub action_id: String,
    pub state: String,
    pub finished: usize,
    pub amount: usize,
    pub failed: usize,
    pub created_at: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct StopRunnerResponse {
    pub runner_id: u64,
    pub state: String,
}

impl RunnerProgressResponse {
    fn from_runner(runner: &Runner) -> Self {
        let p = runner.progress();
        Self {
            runner_id: runner.id().as_u64(),
            finished: p.finished,
            running: p.running,
            amount: p.amount,
            failed: p.failed,
            skipped: p.skipped,
            state: p.state.as_str().to_string(),
        }
    }
}

impl RunnerSummaryResponse {
    fn from_runner(runner: &Runner) -> Self {
        let s = runner.summary();
        Self {
            runner_id: s.runner_id.as_u64(),
            extension_id: s.extension_id,
            action_id: s.action_id,
            state: s.state.as_str().to_string(),
            finished: s.finished,
            amount: s.amount,
            failed: s.failed,
            created_at: s.created_at.to_rfc3339(),
        }
    }
}

fn parse_runner_id(raw: &str) -> Result<RunnerId, AppError> {
    raw.parse::<RunnerId>()
        .map_err(|_| bf_core::Error::Validation("Invalid runner ID".into()).into())
}

/// GET /api/runners
#[utoipa::path(
    get,
    path = "/api/runners",
    responses(
        (status = 200, description = "List runners", body = Vec<RunnerSummaryResponse>)
    )
)]
pub async fn list_runners(State(ctx): State<AppContext>) -> Json<Vec<RunnerSummaryResponse>> {
    Json(
        ctx.registry
            .list()
            .iter()
            .map(|r| RunnerSummaryResponse::from_runner(r))
            .collect(),
    )
}

/// POST /api/runners
#[utoipa::path(
    post,
    path = "/api/runners",
    request_body = StartRunnerRequest,
    responses(
        (status = 201, description = "Runner started", body = StartRunnerResponse),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Unknown extension, action or profile"),
        (status = 422, description = "Entry generation failed")
    )
)]
pub async fn start_runner(
    State(ctx): State<AppContext>,
    Json(payload): Json<StartRunnerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let request = payload.into_start_request()?;

    // Directory generation walks the filesystem.
    let launch_ctx = ctx.clone();
    let runner = tokio::task::spawn_blocking(move || launch_ctx.launch(request))
        .await
        .map_err(|e| bf_core::Error::Internal(format!("Launch task failed: {e}")))??;

    Ok((
        StatusCode::CREATED,
        Json(StartRunnerResponse {
            runner_id: runner.id().as_u64(),
            amount: runner.amount(),
        }),
    ))
}

/// GET /api/runners/{id}
#[utoipa::path(
    get,
    path = "/api/runners/{id}",
    params(("id" = u64, Path, description = "Runner ID")),
    responses(
        (status = 200, description = "Runner progress", body = RunnerProgressResponse),
        (status = 404, description = "Runner not found")
    )
)]
pub async fn get_runner(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<RunnerProgressResponse>, AppError> {
    let runner_id = parse_runner_id(&id)?;
    let runner = ctx.registry.lookup(runner_id)?;
    Ok(Json(RunnerProgressResponse::from_runner(&runner)))
}

/// POST /api/runners/{id}/stop
#[utoipa::path(
    post,
    path = "/api/runners/{id}/stop",
    params(("id" = u64, Path, description = "Runner ID")),
    responses(
        (status = 200, description = "Stop requested", body = StopRunnerResponse),
        (status = 404, description = "Runner not found")
    )
)]
pub async fn stop_runner(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<StopRunnerResponse>, AppError> {
    let runner_id = parse_runner_id(&id)?;
    let runner = ctx.registry.lookup(runner_id)?;
    runner.stop();
    Ok(Json(StopRunnerResponse {
        runner_id: runner_id.as_u64(),
        state: runner.state().as_str().to_string(),
    }))
}
