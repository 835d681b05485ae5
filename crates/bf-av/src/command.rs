//! Builder for executing external tool commands with cancellation support.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Number of trailing stderr lines kept for error messages.
const STDERR_TAIL_LINES: usize = 20;

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// The last lines written to standard error.
    pub stderr_tail: String,
}

/// A builder for constructing and executing external tool invocations.
///
/// There is no timeout: a command runs until it exits or its
/// [`CancellationToken`] fires, in which case the child is killed.
///
/// # Example
///
/// ```no_run
/// use bf_av::ToolCommand;
/// use std::path::PathBuf;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> bf_core::Result<()> {
/// let cancel = CancellationToken::new();
/// ToolCommand::new(PathBuf::from("ffmpeg"))
///     .args(["-y", "-i", "in.wav", "out.flac"])
///     .run(&cancel, |line| println!("{line}"))
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// The arguments passed to the program.
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    fn tool_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Execute the command, feeding every stderr line to `on_stderr`.
    ///
    /// Stdout is discarded. The child is killed when `cancel` fires or when
    /// the returned future is dropped.
    ///
    /// # Errors
    ///
    /// - [`bf_core::Error::Cancelled`] if `cancel` fired before the child
    ///   exited.
    /// - [`bf_core::Error::Tool`] if spawning fails or the process exits with
    ///   a non-zero status (message includes the stderr tail).
    pub async fn run(
        &self,
        cancel: &CancellationToken,
        mut on_stderr: impl FnMut(&str),
    ) -> bf_core::Result<ToolOutput> {
        let tool = self.tool_name();

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!("Spawning {} {:?}", self.program.display(), self.args);

        let mut child = cmd
            .spawn()
            .map_err(|e| bf_core::Error::tool(&tool, format!("failed to spawn: {e}")))?;

        let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);

        if let Some(stderr) = child.stderr.take() {
            let mut lines = BufReader::new(stderr).lines();
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        let _ = child.kill().await;
                        return Err(bf_core::Error::Cancelled);
                    }
                    line = lines.next_line() => match line {
                        Ok(Some(line)) => {
                            on_stderr(&line);
                            if tail.len() == STDERR_TAIL_LINES {
                                tail.pop_front();
                            }
                            tail.push_back(line);
                        }
                        Ok(None) => break,
                        Err(e) => {
                            tracing::warn!("Failed reading {tool} stderr: {e}");
                            break;
                        }
                    },
                }
            }
        }

        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                let _ = child.kill().await;
                return Err(bf_core::Error::Cancelled);
            }
            status = child.wait() => status.map_err(|e| {
                bf_core::Error::tool(&tool, format!("I/O error waiting for process: {e}"))
            })?,
        };

        let stderr_tail = tail.into_iter().collect::<Vec<_>>().join("\n");

        if !status.success() {
            return Err(bf_core::Error::tool(
                tool,
                format!("exited with status {status}: {}", stderr_tail.trim()),
            ));
        }

        Ok(ToolOutput {
            status,
            stderr_tail,
        })
    }
}
