//! Application context shared by all route handlers via Axum state.

use std::sync::Arc;

use bf_av::ToolRegistry;
use bf_core::config::Config;
use bf_core::events::EventBus;
use bf_core::Result;
use bf_pipeline::{ExtensionCatalog, Runner, RunnerRegistry, StartRequest};

/// Application context shared by all request handlers (via Axum state).
///
/// This is cheaply cloneable because it only holds `Arc`s.
#[derive(Clone)]
pub struct AppContext {
    /// Immutable application configuration snapshot.
    pub config: Arc<Config>,
    /// Installed extensions.
    pub catalog: Arc<ExtensionCatalog>,
    /// External tool registry.
    pub tools: Arc<ToolRegistry>,
    /// Live and recently finished runners.
    pub registry: Arc<RunnerRegistry>,
    /// Broadcast event bus for SSE.
    pub event_bus: Arc<EventBus>,
}

impl AppContext {
    /// Build a context from configuration: discover tools and load the
    /// extension catalog.
    pub fn new(config: Config) -> Self {
        let tools = ToolRegistry::discover(&config.tools);
        Self::with_tools(config, tools)
    }

    /// Build a context with an explicit tool registry.
    pub fn with_tools(config: Config, tools: ToolRegistry) -> Self {
        let catalog = ExtensionCatalog::load(&config.extensions.dir);
        Self {
            config: Arc::new(config),
            catalog: Arc::new(catalog),
            tools: Arc::new(tools),
            registry: Arc::new(RunnerRegistry::new()),
            event_bus: Arc::new(EventBus::default()),
        }
    }

    /// Start a runner for `request` with the configured parallelism.
    pub fn launch(&self, request: StartRequest) -> Result<Arc<Runner>> {
        bf_pipeline::launch(
            request,
            &self.catalog,
            &self.tools,
            &self.registry,
            Some(Arc::clone(&self.event_bus)),
            self.config.runner.effective_parallelism(),
        )
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("extensions", &self.catalog.len())
            .field("runners", &self.registry.len())
            .finish_non_exhaustive()
    }
}
