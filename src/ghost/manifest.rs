use crate::ghost::shell::DEFAULT_SHELL_ID;
use log::warn;
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const MANIFEST_FILE: &str = "manifest.json";

/// Per-ghost package manifest. Only `name` is required; everything else
/// has a sensible default so sparse packages still load.
#[derive(Debug, Clone, Deserialize)]
pub struct GhostManifest {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub entry: EntrySpec,
    #[serde(default)]
    pub shell: ShellSpec,
    #[serde(default)]
    pub balloon: BalloonSpec,
    #[serde(default)]
    pub storage: StorageSpec,
}

impl GhostManifest {
    /// The ghost's identifier: the manifest field when present, otherwise
    /// the package directory name.
    pub fn resolved_id(&self, dir_name: &str) -> String {
        self.id
            .as_deref()
            .filter(|id| !id.is_empty())
            .unwrap_or(dir_name)
            .to_string()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntrySpec {
    #[serde(rename = "type", default)]
    pub kind: EntryKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Event scripts under `ghost/events/` drive the responses.
    #[default]
    Script,
    /// Built-in canned responses; useful while authoring a package.
    Stub,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShellSpec {
    #[serde(default = "default_shell_id")]
    pub default: String,
}

impl Default for ShellSpec {
    fn default() -> Self {
        Self {
            default: default_shell_id(),
        }
    }
}

fn default_shell_id() -> String {
    DEFAULT_SHELL_ID.to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BalloonSpec {
    #[serde(default)]
    pub default: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSpec {
    #[serde(default = "default_storage_path")]
    pub path: String,
}

impl Default for StorageSpec {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

fn default_storage_path() -> String {
    "save.json".to_string()
}

/// Reads `manifest.json` from a ghost directory. Missing or unreadable
/// manifests exclude the ghost from use; the reason is logged once here.
pub fn load_manifest(ghost_dir: &Path) -> Option<GhostManifest> {
    let path = ghost_dir.join(MANIFEST_FILE);
    let text = fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&text) {
        Ok(manifest) => Some(manifest),
        Err(e) => {
            warn!("{}: unreadable manifest: {e}", path.display());
            None
        }
    }
}
