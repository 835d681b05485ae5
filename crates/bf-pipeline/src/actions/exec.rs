//! Arbitrary external command action.

use std::path::PathBuf;
use std::sync::Arc;

use bf_av::ToolCommand;
use bf_core::{Entry, Profile};

use crate::action::{Action, Placeholders};
use crate::controller::{EntryError, ExecutionController, TaskController};

/// Run an external program once per entry with placeholder substitution.
///
/// The program reports no progress: it reads `0.0` while running and `1.0`
/// once it exits successfully.
#[derive(Debug, Clone)]
pub struct ExecAction {
    id: String,
    name: String,
    program: String,
    args: Vec<String>,
}

impl ExecAction {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        program: impl Into<String>,
        args: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            program: program.into(),
            args,
        }
    }
}

impl Action for ExecAction {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, profile: &Profile, entry: &Entry) -> Arc<dyn ExecutionController> {
        let vars = Placeholders::new(profile, entry);
        let program = PathBuf::from(vars.expand(&self.program));
        let args = vars.expand_all(&self.args);
        let output = entry.output_path().map(|p| p.to_path_buf());

        tracing::debug!(action = %self.id, "exec {} {:?}", program.display(), args);

        TaskController::spawn(move |cancel, progress| async move {
            if let Some(ref output) = output {
                super::ensure_parent(output).await?;
            }
            ToolCommand::new(program)
                .args(args)
                .run(&cancel, |_| {})
                .await?;
            progress.set(1.0);
            Ok::<(), EntryError>(())
        })
    }
}
