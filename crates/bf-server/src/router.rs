//! Axum router construction.
//!
//! Builds the full application router with all route groups and middleware
//! layers.

use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::context::AppContext;
use crate::routes;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::health::health_check,
        routes::extensions::list_extensions,
        routes::extensions::get_extension,
        routes::extensions::reload_extensions,
        routes::runners::list_runners,
        routes::runners::start_runner,
        routes::runners::get_runner,
        routes::runners::stop_runner,
        routes::admin::tools,
    ),
    components(schemas(
        routes::health::HealthResponse,
        routes::extensions::ExtensionSummary,
        routes::extensions::ExtensionResponse,
        routes::extensions::ActionResponse,
        routes::extensions::ProfileResponse,
        routes::extensions::ReloadResponse,
        routes::runners::StartRunnerRequest,
        routes::runners::StartRunnerResponse,
        routes::runners::RunnerProgressResponse,
        routes::runners::RunnerSummaryResponse,
        routes::runners::StopRunnerResponse,
        routes::admin::ToolInfoResponse,
    ))
)]
struct ApiDoc;

/// Build the complete Axum router.
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Extensions
        .route("/extensions", get(routes::extensions::list_extensions))
        .route(
            "/extensions/reload",
            post(routes::extensions::reload_extensions),
        )
        .route("/extensions/{id}", get(routes::extensions::get_extension))
        // Runners
        .route(
            "/runners",
            get(routes::runners::list_runners).post(routes::runners::start_runner),
        )
        .route("/runners/{id}", get(routes::runners::get_runner))
        .route("/runners/{id}/stop", post(routes::runners::stop_runner))
        // Admin
        .route("/admin/tools", get(routes::admin::tools))
        // SSE Events
        .route("/events", get(routes::events::events_handler));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use bf_core::config::Config;
    use tower::ServiceExt;

    fn test_ctx() -> (tempfile::TempDir, AppContext) {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.extensions.dir = tmp.path().join("extensions");
        let ctx = AppContext::with_tools(config, bf_av::ToolRegistry::default());
        (tmp, ctx)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let (_tmp, ctx) = test_ctx();
        let response = build_router(ctx)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn openapi_document_lists_runner_paths() {
        let (_tmp, ctx) = test_ctx();
        let response = build_router(ctx)
            .oneshot(
                Request::get("/api-docs/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let doc = body_json(response).await;
        assert!(doc["paths"]["/api/runners"].is_object());
        assert!(doc["paths"]["/api/runners/{id}/stop"].is_object());
    }

    #[tokio::test]
    async fn unknown_runner_is_404() {
        let (_tmp, ctx) = test_ctx();
        let response = build_router(ctx)
            .oneshot(Request::get("/api/runners/42").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["code"], "not_found");
    }

    #[tokio::test]
    async fn malformed_runner_id_is_400() {
        let (_tmp, ctx) = test_ctx();
        let response = build_router(ctx)
            .oneshot(
                Request::post("/api/runners/abc/stop")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn start_with_unknown_extension_is_404() {
        let (tmp, ctx) = test_ctx();
        let body = serde_json::json!({
            "extension_id": "nope",
            "action_id": "copy",
            "source": {
                "mode": "directory",
                "input_dir": tmp.path(),
                "output_dir": tmp.path().join("out"),
                "output_extension": "txt"
            }
        });
        let response = build_router(ctx.clone())
            .oneshot(
                Request::post("/api/runners")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(ctx.registry.is_empty());
    }

    #[tokio::test]
    async fn empty_extension_id_is_400() {
        let (_tmp, ctx) = test_ctx();
        let body = serde_json::json!({
            "extension_id": "",
            "action_id": "copy",
            "source": { "mode": "list", "entries": [] }
        });
        let response = build_router(ctx)
            .oneshot(
                Request::post("/api/runners")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "validation_error");
    }
}
