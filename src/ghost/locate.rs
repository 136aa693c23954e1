use crate::ghost::manifest::MANIFEST_FILE;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory name of a portable or checked-out package root.
pub const ROOT_DIR_NAME: &str = "nanika_root";

const GHOSTS_DIR: &str = "ghosts";
const BALLOONS_DIR: &str = "balloons";

/// The root of the installed package collection. Resolved once at startup
/// and treated as immutable for the life of the process.
#[derive(Debug, Clone)]
pub struct PackageRoot {
    dir: PathBuf,
}

impl PackageRoot {
    /// Tries, in order: a root next to the executable (portable installs),
    /// the platform data directory (regular installs), then the working
    /// directory convention (dev runs). The first existing directory wins;
    /// when none exists the working-directory candidate is kept anyway and
    /// every listing below degrades to empty.
    pub fn resolve() -> Self {
        for candidate in candidates() {
            if candidate.is_dir() {
                info!("package root: {}", candidate.display());
                return Self { dir: candidate };
            }
        }
        let fallback = cwd_candidate();
        info!(
            "no package root found, treating {} as an empty collection",
            fallback.display()
        );
        Self { dir: fallback }
    }

    /// A root at an explicit directory, bypassing the search order.
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ghost_dir(&self, ghost_id: &str) -> PathBuf {
        self.dir.join(GHOSTS_DIR).join(ghost_id)
    }

    pub fn balloon_dir(&self, balloon_id: &str) -> PathBuf {
        self.dir.join(BALLOONS_DIR).join(balloon_id)
    }

    /// Installed ghost package directories, sorted by name. A directory
    /// only counts as a ghost when it carries a manifest.
    pub fn list_ghosts(&self) -> Vec<String> {
        list_subdirs(&self.dir.join(GHOSTS_DIR))
            .into_iter()
            .filter(|name| self.ghost_dir(name).join(MANIFEST_FILE).is_file())
            .collect()
    }

    /// Shell candidates of a ghost: every immediate subdirectory, sorted.
    /// Whether a candidate actually holds a surface descriptor is checked
    /// lazily by normalization, not here.
    pub fn list_shells(&self, ghost_id: &str) -> Vec<String> {
        list_subdirs(&self.ghost_dir(ghost_id))
    }
}

fn list_subdirs(parent: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(parent) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|entry| {
            let entry = entry.ok()?;
            if !entry.file_type().ok()?.is_dir() {
                return None;
            }
            entry.file_name().to_str().map(str::to_string)
        })
        .collect();
    names.sort();
    names
}

fn candidates() -> Vec<PathBuf> {
    let mut out = Vec::with_capacity(3);
    if let Ok(exe) = std::env::current_exe()
        && let Some(dir) = exe.parent()
    {
        out.push(dir.join(ROOT_DIR_NAME));
    }
    if let Some(dirs) = directories::ProjectDirs::from("", "", "nanika") {
        out.push(dirs.data_dir().to_path_buf());
    }
    out.push(cwd_candidate());
    out
}

fn cwd_candidate() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(ROOT_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::PackageRoot;
    use std::fs;

    #[test]
    fn ghosts_without_manifests_are_not_listed() {
        let tmp = tempfile::TempDir::new().unwrap();
        let ghosts = tmp.path().join("ghosts");
        fs::create_dir_all(ghosts.join("beta")).unwrap();
        fs::create_dir_all(ghosts.join("alpha")).unwrap();
        fs::write(ghosts.join("alpha/manifest.json"), r#"{ "name": "Alpha" }"#).unwrap();

        let root = PackageRoot::at(tmp.path());
        assert_eq!(root.list_ghosts(), ["alpha"]);
    }

    #[test]
    fn shell_candidates_do_not_require_descriptors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let ghost = tmp.path().join("ghosts/hina");
        fs::create_dir_all(ghost.join("winter")).unwrap();
        fs::create_dir_all(ghost.join("master")).unwrap();
        fs::create_dir_all(ghost.join("ghost")).unwrap();
        fs::write(ghost.join("notes.txt"), "not a dir").unwrap();

        let root = PackageRoot::at(tmp.path());
        assert_eq!(root.list_shells("hina"), ["ghost", "master", "winter"]);
    }

    #[test]
    fn absent_parents_list_empty() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = PackageRoot::at(tmp.path().join("nowhere"));
        assert!(root.list_ghosts().is_empty());
        assert!(root.list_shells("hina").is_empty());
    }
}
