//! # bf-av
//!
//! External tool management for batchforge actions.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find and cache paths to ffmpeg
//!   and ffprobe.
//! - **Command execution** ([`ToolCommand`]) -- async builder that streams a
//!   child's stderr line by line and kills the child on cancellation.
//! - **Progress parsing** ([`FfmpegProgress`]) -- turn ffmpeg's `-progress`
//!   key/value stream into a completion fraction.

pub mod command;
pub mod progress;
pub mod tools;

pub use command::{ToolCommand, ToolOutput};
pub use progress::{parse_duration, FfmpegProgress};
pub use tools::{ToolConfig, ToolInfo, ToolRegistry};
