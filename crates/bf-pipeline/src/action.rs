//! The [`Action`] trait: an executor bound to one manifest action.
//!
//! Invoking [`Action::execute`] starts work on a single entry and returns
//! immediately with the [`ExecutionController`] for that work.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use bf_core::{Entry, Profile};

use crate::controller::ExecutionController;

/// One named operation an extension offers (transcode, copy, dump, ...).
pub trait Action: Send + Sync {
    /// The action id as declared in its manifest.
    fn id(&self) -> &str;

    /// Human-readable name.
    fn name(&self) -> &str;

    /// Begin processing `entry` with `profile` and return its controller.
    ///
    /// Side effects start before this returns. Failures are reported through
    /// the controller, never by panicking.
    fn execute(&self, profile: &Profile, entry: &Entry) -> Arc<dyn ExecutionController>;
}

/// Placeholder values available to argument templates for one entry.
///
/// Entry-derived keys (`input`, `output`, `input_dir`, `output_dir`,
/// `input_stem`) take precedence over profile params of the same name.
#[derive(Debug, Clone, Default)]
pub struct Placeholders {
    vars: BTreeMap<String, String>,
}

impl Placeholders {
    pub fn new(profile: &Profile, entry: &Entry) -> Self {
        let mut vars = profile.params.clone();

        if let Some(input) = entry.input_path() {
            vars.insert("input".into(), path_str(input));
            if let Some(dir) = input.parent() {
                vars.insert("input_dir".into(), path_str(dir));
            }
            if let Some(stem) = input.file_stem() {
                vars.insert("input_stem".into(), stem.to_string_lossy().into_owned());
            }
        }
        if let Some(output) = entry.output_path() {
            vars.insert("output".into(), path_str(output));
            if let Some(dir) = output.parent() {
                vars.insert("output_dir".into(), path_str(dir));
            }
        }

        Self { vars }
    }

    /// Replace every `{name}` with its value. Unknown names are left as-is.
    pub fn expand(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('}') {
                Some(close) => {
                    let name = &after[..close];
                    match self.vars.get(name) {
                        Some(value) => out.push_str(value),
                        None => {
                            out.push('{');
                            out.push_str(name);
                            out.push('}');
                        }
                    }
                    rest = &after[close + 1..];
                }
                None => {
                    out.push_str(&rest[open..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }

    pub fn expand_all(&self, templates: &[String]) -> Vec<String> {
        templates.iter().map(|t| self.expand(t)).collect()
    }
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
