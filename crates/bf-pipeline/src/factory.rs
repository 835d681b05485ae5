//! Action factory: construct [`Action`] objects from manifest declarations.

use std::sync::Arc;

use bf_core::{ActionKind, ActionSpec};

use crate::action::Action;
use crate::actions::{ExecAction, FfmpegAction};

/// Build the executor for one manifest action.
///
/// Tool availability is validated eagerly so that a missing tool is reported
/// before any runner is created.
///
/// # Errors
///
/// - [`bf_core::Error::Tool`] if a required tool is not in the registry.
/// - [`bf_core::Error::Validation`] if an exec action has no program.
pub fn create_action(
    spec: &ActionSpec,
    tools: &bf_av::ToolRegistry,
) -> bf_core::Result<Arc<dyn Action>> {
    let name = if spec.name.is_empty() {
        spec.id.clone()
    } else {
        spec.name.clone()
    };

    match &spec.kind {
        ActionKind::Exec { program, args } => {
            if program.trim().is_empty() {
                return Err(bf_core::Error::Validation(format!(
                    "action '{}' has an empty program",
                    spec.id
                )));
            }
            Ok(Arc::new(ExecAction::new(
                &spec.id,
                name,
                program.clone(),
                args.clone(),
            )))
        }
        ActionKind::Ffmpeg { args } => {
            let ffmpeg = tools.require("ffmpeg")?;
            Ok(Arc::new(FfmpegAction::new(
                &spec.id,
                name,
                ffmpeg.path.clone(),
                args.clone(),
            )))
        }
    }
}
