use crate::ghost::anchor::{self, BubbleOffset};
use crate::ghost::locate::PackageRoot;
use crate::ghost::manifest::{self, GhostManifest};
use crate::ghost::shell::{self, Hitbox, ShellModel};
use serde::Serialize;
use std::path::PathBuf;

/// What the caller asks for. Both ids are optional; the engine picks the
/// first installed ghost and the manifest's default shell when they are
/// absent. Passed explicitly on every call so the engine stays a pure
/// function of its inputs.
#[derive(Debug, Clone, Default)]
pub struct LoadRequest {
    pub ghost_id: Option<String>,
    pub shell_id: Option<String>,
}

/// The canonical snapshot handed to the rendering collaborator. Built
/// fresh on every load, switch and reload; never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GhostPayload {
    pub ghost_id: String,
    pub name: String,
    pub shell_id: String,
    pub surface_id: String,
    pub surface_file: Option<PathBuf>,
    pub hitboxes: Vec<Hitbox>,
    pub bubble_offset: Option<BubbleOffset>,
}

/// A fully resolved ghost: the normalized shell plus everything needed to
/// cut payload snapshots for any of its surfaces.
#[derive(Debug)]
pub struct LoadedGhost {
    pub ghost_id: String,
    pub dir_name: String,
    pub ghost_dir: PathBuf,
    pub shell_id: String,
    pub shell_dir: PathBuf,
    pub manifest: GhostManifest,
    pub shell: ShellModel,
    pub bubble_offset: Option<BubbleOffset>,
}

impl LoadedGhost {
    pub fn payload_for(&self, surface_id: &str) -> GhostPayload {
        let surface = self.shell.surface(surface_id);
        GhostPayload {
            ghost_id: self.ghost_id.clone(),
            name: self.manifest.name.clone(),
            shell_id: self.shell_id.clone(),
            surface_id: surface_id.to_string(),
            surface_file: surface.and_then(|s| s.file.clone()),
            hitboxes: surface
                .map(|s| s.hitboxes.clone().into_vec())
                .unwrap_or_default(),
            bubble_offset: self.bubble_offset,
        }
    }

    pub fn initial_payload(&self) -> GhostPayload {
        self.payload_for(&self.shell.default_surface)
    }
}

/// Resolves a load request into a ghost. The only hard failures are "no
/// ghosts installed" and "no manifest for the requested ghost"; everything
/// below that degrades per descriptor (missing shell directory, dangling
/// surface files, absent anchor metadata) into an emptier but valid model.
pub fn load_ghost(root: &PackageRoot, request: &LoadRequest) -> Result<LoadedGhost, String> {
    let dir_name = match &request.ghost_id {
        Some(id) => id.clone(),
        None => root
            .list_ghosts()
            .into_iter()
            .next()
            .ok_or_else(|| "no ghosts installed".to_string())?,
    };
    let ghost_dir = root.ghost_dir(&dir_name);
    let manifest = manifest::load_manifest(&ghost_dir)
        .ok_or_else(|| format!("ghost '{dir_name}' has no readable manifest"))?;
    let shell_id = request
        .shell_id
        .clone()
        .unwrap_or_else(|| manifest.shell.default.clone());
    let shell_dir = ghost_dir.join(&shell_id);
    let shell = shell::normalize_shell(&shell_dir);
    let bubble_offset = anchor::resolve_anchor(&shell_dir);
    Ok(LoadedGhost {
        ghost_id: manifest.resolved_id(&dir_name),
        dir_name,
        ghost_dir,
        shell_id,
        shell_dir,
        manifest,
        shell,
        bubble_offset,
    })
}

#[cfg(test)]
mod tests {
    use super::{LoadRequest, load_ghost};
    use crate::ghost::anchor::BubbleOffset;
    use crate::ghost::locate::PackageRoot;
    use std::fs;
    use std::path::Path;

    fn write(path: &Path, text: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    fn sample_root(tmp: &tempfile::TempDir) -> PackageRoot {
        let ghost = tmp.path().join("ghosts/hina");
        write(
            &ghost.join("manifest.json"),
            r#"{ "name": "Hina", "shell": { "default": "master" } }"#,
        );
        write(
            &ghost.join("master/surfaces.json"),
            r#"{
                "default": "0",
                "surfaces": {
                    "0": {
                        "file": "master/idle.png",
                        "hitboxes": [ { "id": "head", "rect": [20, 0, 80, 30] } ]
                    },
                    "smile": { "file": "master/smile.png" }
                }
            }"#,
        );
        write(&ghost.join("master/idle.png"), "png");
        write(
            &ghost.join("master/meta.json"),
            r#"{ "descript": { "balloon.offset": "10,20" } }"#,
        );
        PackageRoot::at(tmp.path())
    }

    #[test]
    fn load_produces_the_canonical_snapshot() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = sample_root(&tmp);

        let loaded = load_ghost(&root, &LoadRequest::default()).unwrap();
        let payload = loaded.initial_payload();
        assert_eq!(payload.ghost_id, "hina");
        assert_eq!(payload.name, "Hina");
        assert_eq!(payload.shell_id, "master");
        assert_eq!(payload.surface_id, "0");
        assert_eq!(
            payload.surface_file.as_deref(),
            Some(tmp.path().join("ghosts/hina/master/idle.png").as_path())
        );
        assert_eq!(payload.hitboxes.len(), 1);
        assert_eq!(payload.bubble_offset, Some(BubbleOffset { x: 10, y: 20 }));
    }

    #[test]
    fn dangling_surface_file_degrades_to_none() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = sample_root(&tmp);

        let loaded = load_ghost(&root, &LoadRequest::default()).unwrap();
        // smile.png was never written.
        assert_eq!(loaded.payload_for("smile").surface_file, None);
    }

    #[test]
    fn unknown_surface_produces_an_empty_but_valid_payload() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = sample_root(&tmp);

        let loaded = load_ghost(&root, &LoadRequest::default()).unwrap();
        let payload = loaded.payload_for("ninety-nine");
        assert_eq!(payload.surface_file, None);
        assert!(payload.hitboxes.is_empty());
    }

    #[test]
    fn explicit_shell_request_overrides_the_manifest_default() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = sample_root(&tmp);
        write(
            &tmp.path().join("ghosts/hina/winter/surfaces.txt"),
            "5: winter/5.png\n",
        );

        let request = LoadRequest {
            ghost_id: None,
            shell_id: Some("winter".to_string()),
        };
        let loaded = load_ghost(&root, &request).unwrap();
        assert_eq!(loaded.shell_id, "winter");
        assert_eq!(loaded.shell.default_surface, "5");
    }

    #[test]
    fn missing_shell_directory_still_loads() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = sample_root(&tmp);

        let request = LoadRequest {
            ghost_id: None,
            shell_id: Some("no-such-shell".to_string()),
        };
        let loaded = load_ghost(&root, &request).unwrap();
        assert_eq!(loaded.shell.default_surface, "0");
        assert!(loaded.shell.surfaces.is_empty());
        let payload = loaded.initial_payload();
        assert_eq!(payload.surface_file, None);
    }

    #[test]
    fn empty_root_is_a_hard_miss_only_at_the_top() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = PackageRoot::at(tmp.path());
        assert!(load_ghost(&root, &LoadRequest::default()).is_err());
    }

    #[test]
    fn repeated_loads_are_identical() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = sample_root(&tmp);

        let first = load_ghost(&root, &LoadRequest::default()).unwrap();
        let second = load_ghost(&root, &LoadRequest::default()).unwrap();
        assert_eq!(first.initial_payload(), second.initial_payload());
        assert_eq!(first.shell, second.shell);
    }
}
