//! Work entries: one unit of work handed to an action.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// An ordered group of paths.
///
/// `main` holds the primary paths; input and output groups of one entry are
/// matched positionally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathGroup {
    pub main: Vec<PathBuf>,
}

impl PathGroup {
    /// Group holding exactly one path.
    pub fn single(path: impl Into<PathBuf>) -> Self {
        Self {
            main: vec![path.into()],
        }
    }

    /// First path of the group, if any.
    pub fn first(&self) -> Option<&Path> {
        self.main.first().map(PathBuf::as_path)
    }
}

/// One unit of work: input paths and the destination paths they map to.
///
/// Entries are immutable once generated and never reference each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub input: PathGroup,
    pub output: PathGroup,
}

impl Entry {
    /// Entry mapping a single input file to a single output file.
    pub fn single(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: PathGroup::single(input),
            output: PathGroup::single(output),
        }
    }

    /// Primary input path.
    pub fn input_path(&self) -> Option<&Path> {
        self.input.first()
    }

    /// Primary output path.
    pub fn output_path(&self) -> Option<&Path> {
        self.output.first()
    }

    /// Whether input and output groups have matching, non-zero lengths.
    pub fn is_well_formed(&self) -> bool {
        !self.input.main.is_empty() && self.input.main.len() == self.output.main.len()
    }
}
