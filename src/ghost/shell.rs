use crate::ghost::parsing::surfaces::{self, RawSurface};
use log::warn;
use rustc_hash::FxHashMap;
use serde::Serialize;
use smallvec::SmallVec;
use std::fs;
use std::path::{Path, PathBuf};

pub const MODERN_SURFACES_FILE: &str = "surfaces.json";
pub const LEGACY_SURFACES_FILE: &str = "surfaces.txt";

/// Shell directory name used when the manifest does not pick one.
pub const DEFAULT_SHELL_ID: &str = "master";

/// Surface id used whenever a descriptor does not name one.
pub const DEFAULT_SURFACE_ID: &str = "0";

/// A named clickable rectangle in surface-local pixels, stored as two
/// corner points `[x1, y1, x2, y2]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hitbox {
    pub id: String,
    pub rect: [i32; 4],
}

/// One selectable image of a shell. `file` is an absolute path that was
/// confirmed to exist at normalization time; a dangling reference in the
/// descriptor degrades to `None` rather than failing the load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Surface {
    pub file: Option<PathBuf>,
    pub hitboxes: SmallVec<[Hitbox; 4]>,
}

/// The normalized view of one shell directory, independent of which
/// descriptor format was found on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ShellModel {
    pub default_surface: String,
    pub surfaces: FxHashMap<String, Surface>,
}

impl ShellModel {
    pub fn surface(&self, id: &str) -> Option<&Surface> {
        self.surfaces.get(id)
    }
}

/// Reads whichever surface descriptor the shell directory carries and
/// normalizes it. The modern JSON descriptor is authoritative when it
/// parses; otherwise the legacy line format is consulted; otherwise the
/// result is an empty model. Every call rebuilds the table from disk, so
/// two loads of an unchanged directory produce identical models.
pub fn normalize_shell(shell_dir: &Path) -> ShellModel {
    let (default_surface, raw) = read_descriptor(shell_dir);
    // Descriptor file references are relative to the directory that
    // contains the shell directories, not the shell directory itself.
    let base = shell_dir.parent().unwrap_or(shell_dir);
    let surfaces = raw
        .into_iter()
        .map(|(id, surface)| {
            let RawSurface { file, hitboxes } = surface;
            let file = file.as_deref().and_then(|reference| resolve_file(base, reference));
            (id, Surface { file, hitboxes })
        })
        .collect();
    ShellModel {
        default_surface,
        surfaces,
    }
}

fn read_descriptor(shell_dir: &Path) -> (String, FxHashMap<String, RawSurface>) {
    if let Ok(text) = fs::read_to_string(shell_dir.join(MODERN_SURFACES_FILE)) {
        if let Some(parsed) = surfaces::parse_modern(&text) {
            return parsed;
        }
        warn!(
            "{}: malformed {MODERN_SURFACES_FILE}, falling back to {LEGACY_SURFACES_FILE}",
            shell_dir.display()
        );
    }
    if let Ok(text) = fs::read_to_string(shell_dir.join(LEGACY_SURFACES_FILE)) {
        return surfaces::parse_legacy(&text);
    }
    (DEFAULT_SURFACE_ID.to_string(), FxHashMap::default())
}

fn resolve_file(base: &Path, reference: &str) -> Option<PathBuf> {
    let path = base.join(reference);
    if path.is_file() {
        Some(path)
    } else {
        warn!("surface image {} does not exist, surface loads without one", path.display());
        None
    }
}
