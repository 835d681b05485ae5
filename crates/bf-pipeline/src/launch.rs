//! Turning a start request into a registered, running [`Runner`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use bf_core::events::EventBus;
use bf_core::{Profile, Result};

use crate::catalog::{resolve_profile, ExtensionCatalog};
use crate::generator::EntrySource;
use crate::registry::RunnerRegistry;
use crate::runner::Runner;

/// Everything needed to start a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRequest {
    pub extension_id: String,
    pub action_id: String,
    /// Inline profile; takes precedence over `profile_id`.
    #[serde(default)]
    pub profile: Option<Profile>,
    /// Id of one of the extension's saved profiles.
    #[serde(default)]
    pub profile_id: Option<String>,
    /// How the worklist is produced.
    pub source: EntrySource,
}

/// Resolve, generate, register and start.
///
/// All failures (unknown extension or action, bad profile, missing tool,
/// generation error) are returned before any runner is registered.
pub fn launch(
    request: StartRequest,
    catalog: &ExtensionCatalog,
    tools: &bf_av::ToolRegistry,
    registry: &RunnerRegistry,
    events: Option<Arc<EventBus>>,
    parallelism: usize,
) -> Result<Arc<Runner>> {
    let manifest = catalog.get(&request.extension_id)?;
    let action = catalog.resolve_action(&request.extension_id, &request.action_id, tools)?;
    let profile = resolve_profile(
        &manifest,
        &request.action_id,
        request.profile,
        request.profile_id.as_deref(),
    )?;
    let entries = request.source.materialize()?;

    let runner = registry.register(|id| {
        let runner = Runner::new(id, &request.extension_id, &request.action_id, entries);
        match events {
            Some(bus) => runner.with_events(bus),
            None => runner,
        }
    });
    runner.start(action, profile, parallelism)?;
    Ok(runner)
}
