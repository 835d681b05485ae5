//! Runner handles.
//!
//! A [`RunnerId`] is an opaque, process-unique integer handed out by the
//! runner registry. Handles are allocated from a monotonically increasing
//! counter and never reused, so a stale handle can only ever resolve to
//! "not found", never to a different runner.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque handle identifying a registered runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunnerId(u64);

impl RunnerId {
    /// Wrap a raw handle value.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Return the raw handle value.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RunnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RunnerId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.parse::<u64>().map(Self)
    }
}

impl From<u64> for RunnerId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}
