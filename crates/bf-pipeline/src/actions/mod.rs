//! Built-in actions.
//!
//! Each action wraps an external tool invocation (via [`bf_av::ToolCommand`])
//! behind the unified [`Action`](crate::action::Action) trait.

mod exec;
mod ffmpeg;

pub use exec::ExecAction;
pub use ffmpeg::FfmpegAction;

use std::path::Path;

/// Create the parent directory of `output` if it does not exist yet.
async fn ensure_parent(output: &Path) -> bf_core::Result<()> {
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}
