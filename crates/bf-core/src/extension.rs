//! Extension manifest types.
//!
//! An extension contributes a list of actions and a list of saved profiles.
//! Only the fields the runner needs are modelled here; everything else in a
//! manifest file is ignored on deserialization.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::error::{Error, Result};

/// Parsed `manifest.json` of one extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionManifest {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub actions: Vec<ActionSpec>,
    #[serde(default)]
    pub profiles: Vec<ProfileSpec>,
}

/// Declaration of one action provided by an extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSpec {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub kind: ActionKind,
}

/// Which built-in executor drives an action, with its parameters.
///
/// Argument strings may contain `{input}`, `{output}`, `{input_dir}`,
/// `{output_dir}`, `{input_stem}` and `{param}` placeholders where `param` is
/// any key of the selected profile's params.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionKind {
    /// Run an arbitrary program once per entry.
    Exec {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
    /// Run ffmpeg on the entry's input, writing to its output.
    ///
    /// `args` are inserted between the input and the output path.
    Ffmpeg {
        #[serde(default)]
        args: Vec<String>,
    },
}

impl ActionKind {
    /// Short name of the executor kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Exec { .. } => "exec",
            ActionKind::Ffmpeg { .. } => "ffmpeg",
        }
    }
}

/// A saved, user-editable configuration for one action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSpec {
    pub id: String,
    /// Id of the action this profile configures.
    pub action: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

/// The profile an action is invoked with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl Profile {
    /// Look up a parameter by key.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

impl From<&ProfileSpec> for Profile {
    fn from(spec: &ProfileSpec) -> Self {
        Self {
            name: spec.name.clone(),
            params: spec.params.clone(),
        }
    }
}

impl ExtensionManifest {
    /// Deserialize a manifest from a JSON string.
    pub fn from_json(json_str: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }

    /// Find an action by id.
    pub fn action(&self, id: &str) -> Option<&ActionSpec> {
        self.actions.iter().find(|a| a.id == id)
    }

    /// Find a profile by id.
    pub fn profile(&self, id: &str) -> Option<&ProfileSpec> {
        self.profiles.iter().find(|p| p.id == id)
    }

    /// Check structural consistency: non-empty ids, unique action ids and
    /// profiles that point at declared actions.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::Validation("extension id is empty".into()));
        }

        let mut seen = HashSet::new();
        for action in &self.actions {
            if action.id.trim().is_empty() {
                return Err(Error::Validation(format!(
                    "extension '{}' declares an action with an empty id",
                    self.id
                )));
            }
            if !seen.insert(action.id.as_str()) {
                return Err(Error::Validation(format!(
                    "extension '{}' declares action '{}' twice",
                    self.id, action.id
                )));
            }
            if let ActionKind::Exec { program, .. } = &action.kind {
                if program.trim().is_empty() {
                    return Err(Error::Validation(format!(
                        "action '{}' of extension '{}' has an empty program",
                        action.id, self.id
                    )));
                }
            }
        }

        for profile in &self.profiles {
            if !seen.contains(profile.action.as_str()) {
                return Err(Error::Validation(format!(
                    "profile '{}' of extension '{}' references unknown action '{}'",
                    profile.id, self.id, profile.action
                )));
            }
        }

        Ok(())
    }
}
