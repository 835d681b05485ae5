//! bf-core: shared types, IDs, errors, configuration, and event system.
//!
//! This crate is the foundational dependency for all other bf-* crates,
//! providing the runner handle type, a unified error type, the work-entry and
//! extension-manifest domain types, application configuration, and a
//! broadcast event bus.

pub mod config;
pub mod entry;
pub mod error;
pub mod events;
pub mod extension;
pub mod ids;

// Re-export the most commonly used items at the crate root.
pub use entry::{Entry, PathGroup};
pub use error::{Error, Result};
pub use extension::{ActionKind, ActionSpec, ExtensionManifest, Profile, ProfileSpec};
pub use ids::RunnerId;
