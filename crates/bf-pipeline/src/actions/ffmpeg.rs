//! ffmpeg transcode action with progress reporting.

use std::path::PathBuf;
use std::sync::Arc;

use bf_av::{FfmpegProgress, ToolCommand};
use bf_core::{Entry, Profile};

use crate::action::{Action, Placeholders};
use crate::controller::{EntryError, ExecutionController, TaskController};

/// Transcode an entry's input into its output with ffmpeg.
///
/// Runs `ffmpeg -y -progress pipe:2 -nostats -i <input> <args...> <output>`
/// and derives progress from the `-progress` stream.
#[derive(Debug, Clone)]
pub struct FfmpegAction {
    id: String,
    name: String,
    ffmpeg: PathBuf,
    args: Vec<String>,
}

impl FfmpegAction {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        ffmpeg: PathBuf,
        args: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ffmpeg,
            args,
        }
    }

    /// Build the command line for one entry.
    fn command(&self, vars: &Placeholders, input: &str, output: &str) -> ToolCommand {
        let mut cmd = ToolCommand::new(self.ffmpeg.clone());
        cmd.args(["-y", "-progress", "pipe:2", "-nostats", "-i", input]);
        cmd.args(vars.expand_all(&self.args));
        cmd.arg(output);
        cmd
    }
}

impl Action for FfmpegAction {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, profile: &Profile, entry: &Entry) -> Arc<dyn ExecutionController> {
        let (Some(input), Some(output)) = (entry.input_path(), entry.output_path()) else {
            return TaskController::failed("entry has no input or output path");
        };
        let output = output.to_path_buf();
        let vars = Placeholders::new(profile, entry);
        let cmd = self.command(
            &vars,
            &input.to_string_lossy(),
            &output.to_string_lossy(),
        );

        tracing::debug!(action = %self.id, "ffmpeg {:?}", cmd.arguments());

        TaskController::spawn(move |cancel, progress| async move {
            super::ensure_parent(&output).await?;
            let mut parser = FfmpegProgress::new();
            cmd.run(&cancel, |line| {
                if let Some(fraction) = parser.feed(line) {
                    progress.set(fraction);
                }
            })
            .await?;
            progress.set(1.0);
            Ok::<(), EntryError>(())
        })
    }
}
