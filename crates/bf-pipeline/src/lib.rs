//! # bf-pipeline
//!
//! The batch job-execution core.
//!
//! This crate provides:
//!
//! - **[`generate`]** -- turn an input/output directory pair into an ordered
//!   worklist of [`Entry`](bf_core::Entry) values, and [`EntrySource`] for the
//!   other ways a worklist can be supplied.
//! - **[`ExecutionController`]** -- the per-entry handle an action returns:
//!   a progress probe, a stop signal and a completion signal.
//! - **[`Action`]** trait and the built-in [`actions`] (exec, ffmpeg), built
//!   from manifest declarations by [`create_action`].
//! - **[`Runner`]** -- a bounded-concurrency scheduler that drives a worklist
//!   through a fixed pool of workers with live aggregate progress and
//!   mid-flight cancellation.
//! - **[`RunnerRegistry`]** -- process-wide handle table for live runners.
//! - **[`ExtensionCatalog`]** -- extension manifests loaded from disk.
//! - **[`launch`]** -- resolve a [`StartRequest`] into a started runner.

pub mod action;
pub mod actions;
pub mod catalog;
pub mod controller;
pub mod factory;
pub mod generator;
pub mod launch;
pub mod registry;
pub mod runner;

pub use action::Action;
pub use catalog::{resolve_profile, ExtensionCatalog};
pub use controller::{EntryError, ExecutionController, ProgressCell, TaskController};
pub use factory::create_action;
pub use generator::{generate, EntrySource};
pub use launch::{launch, StartRequest};
pub use registry::RunnerRegistry;
pub use runner::{EntryFailure, RunOutcome, Runner, RunnerProgress, RunnerState, RunnerSummary};
