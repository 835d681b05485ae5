//! Extension catalog loaded from `<dir>/*/manifest.json`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use bf_core::{Error, ExtensionManifest, Profile, Result};

use crate::action::Action;
use crate::factory::create_action;

/// File name of an extension manifest inside its directory.
const MANIFEST_FILE: &str = "manifest.json";

/// In-memory view of the installed extensions.
#[derive(Debug)]
pub struct ExtensionCatalog {
    dir: PathBuf,
    extensions: RwLock<BTreeMap<String, Arc<ExtensionManifest>>>,
}

impl ExtensionCatalog {
    /// Scan `dir` for extensions.
    ///
    /// A missing directory yields an empty catalog. Manifests that cannot be
    /// read, parsed or validated are logged and skipped.
    pub fn load(dir: impl AsRef<Path>) -> Self {
        let catalog = Self {
            dir: dir.as_ref().to_path_buf(),
            extensions: RwLock::new(BTreeMap::new()),
        };
        catalog.reload();
        catalog
    }

    /// Directory this catalog reads from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Re-scan the extension directory, replacing the current contents.
    ///
    /// Returns the number of extensions loaded.
    pub fn reload(&self) -> usize {
        let scanned = scan(&self.dir);
        let count = scanned.len();
        *self.extensions.write() = scanned;
        tracing::info!("Loaded {count} extension(s) from {}", self.dir.display());
        count
    }

    /// Look up an extension by id.
    pub fn get(&self, id: &str) -> Result<Arc<ExtensionManifest>> {
        self.extensions
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found("extension", id))
    }

    /// All extensions, ordered by id.
    pub fn list(&self) -> Vec<Arc<ExtensionManifest>> {
        self.extensions.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.extensions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.read().is_empty()
    }

    /// Build the executor for `action_id` of `extension_id`.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] for an unknown extension or action.
    /// - [`Error::Tool`] if the action needs a tool that is not installed.
    pub fn resolve_action(
        &self,
        extension_id: &str,
        action_id: &str,
        tools: &bf_av::ToolRegistry,
    ) -> Result<Arc<dyn Action>> {
        let manifest = self.get(extension_id)?;
        let spec = manifest
            .action(action_id)
            .ok_or_else(|| Error::not_found("action", format!("{extension_id}/{action_id}")))?;
        create_action(spec, tools)
    }
}

/// Pick the profile for a start request.
///
/// An inline profile wins; otherwise `profile_id` must name one of the
/// extension's profiles configuring `action_id`; otherwise the empty default
/// profile is used.
pub fn resolve_profile(
    manifest: &ExtensionManifest,
    action_id: &str,
    inline: Option<Profile>,
    profile_id: Option<&str>,
) -> Result<Profile> {
    if let Some(profile) = inline {
        return Ok(profile);
    }
    let Some(profile_id) = profile_id else {
        return Ok(Profile::default());
    };

    let spec = manifest
        .profile(profile_id)
        .ok_or_else(|| Error::not_found("profile", format!("{}/{profile_id}", manifest.id)))?;
    if spec.action != action_id {
        return Err(Error::Validation(format!(
            "profile '{profile_id}' configures action '{}', not '{action_id}'",
            spec.action
        )));
    }
    Ok(Profile::from(spec))
}

fn scan(dir: &Path) -> BTreeMap<String, Arc<ExtensionManifest>> {
    let mut extensions = BTreeMap::new();

    let read_dir = match std::fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!("Extension directory {} does not exist", dir.display());
            return extensions;
        }
        Err(e) => {
            tracing::warn!("Failed to read extension directory {}: {e}", dir.display());
            return extensions;
        }
    };

    let mut manifests: Vec<PathBuf> = read_dir
        .filter_map(|e| e.ok())
        .map(|e| e.path().join(MANIFEST_FILE))
        .filter(|p| p.is_file())
        .collect();
    manifests.sort();

    for path in manifests {
        match load_manifest(&path) {
            Ok(manifest) => {
                if extensions.contains_key(&manifest.id) {
                    tracing::warn!(
                        "Duplicate extension id '{}' in {}; keeping the first",
                        manifest.id,
                        path.display()
                    );
                    continue;
                }
                tracing::debug!(
                    "Loaded extension '{}' ({} actions, {} profiles)",
                    manifest.id,
                    manifest.actions.len(),
                    manifest.profiles.len()
                );
                extensions.insert(manifest.id.clone(), Arc::new(manifest));
            }
            Err(e) => tracing::warn!("Skipping extension: {e}"),
        }
    }

    extensions
}

fn load_manifest(path: &Path) -> Result<ExtensionManifest> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| Error::manifest(path, e.to_string()))?;
    let manifest =
        ExtensionManifest::from_json(&contents).map_err(|e| Error::manifest(path, e.to_string()))?;
    manifest
        .validate()
        .map_err(|e| Error::manifest(path, e.to_string()))?;
    Ok(manifest)
}
