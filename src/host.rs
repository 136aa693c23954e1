//! Console-backed stand-ins for the rendering collaborators.
//!
//! The real character and balloon windows live outside this process; these
//! views hold the same state and log what a window would draw, which keeps
//! the engine exercisable end to end from a terminal.

use crate::ghost::anchor::BubbleOffset;
use crate::ghost::hit;
use crate::ghost::payload::{GhostPayload, LoadedGhost};
use log::{debug, info, warn};
use serde_json::{Map, Value};

/// The character window's model: a loaded ghost plus the currently shown
/// surface. Pointer coordinates arrive window-local and are divided by the
/// display scale before hit-testing.
pub struct CharacterView {
    ghost: LoadedGhost,
    current_surface: String,
    scale_percent: u32,
}

impl CharacterView {
    pub fn new(ghost: LoadedGhost, scale_percent: u32, log_hitboxes: bool) -> Self {
        let current_surface = ghost.shell.default_surface.clone();
        let view = Self {
            ghost,
            current_surface,
            scale_percent,
        };
        let payload = view.payload();
        match &payload.surface_file {
            Some(file) => info!(
                "[{}] showing surface {} ({})",
                payload.ghost_id,
                payload.surface_id,
                file.display()
            ),
            None => info!(
                "[{}] surface {} has no image, showing placeholder",
                payload.ghost_id, payload.surface_id
            ),
        }
        if log_hitboxes {
            for hitbox in &payload.hitboxes {
                debug!("[{}] hitbox {} {:?}", payload.ghost_id, hitbox.id, hitbox.rect);
            }
        }
        view
    }

    pub fn ghost(&self) -> &LoadedGhost {
        &self.ghost
    }

    /// A fresh canonical snapshot of what the window shows right now.
    pub fn payload(&self) -> GhostPayload {
        self.ghost.payload_for(&self.current_surface)
    }

    pub fn set_surface(&mut self, surface_id: &str) {
        if self.ghost.shell.surface(surface_id).is_none() {
            warn!("[{}] unknown surface: {surface_id}", self.ghost.ghost_id);
            return;
        }
        self.current_surface = surface_id.to_string();
        info!("[{}] surface -> {surface_id}", self.ghost.ghost_id);
    }

    pub fn set_scale(&mut self, percent: u32) {
        self.scale_percent = percent.max(1);
    }

    pub fn current_surface(&self) -> &str {
        &self.current_surface
    }

    /// Scale-corrects a window-local click and returns the hitbox it
    /// lands in, if any.
    pub fn click(&self, x: f32, y: f32) -> Option<String> {
        let scale = self.scale_percent.max(1) as f32 / 100.0;
        let (sx, sy) = (x / scale, y / scale);
        let surface = self.ghost.shell.surface(&self.current_surface)?;
        let hit = hit::hit_test(&surface.hitboxes, sx, sy);
        match hit {
            Some(id) => info!("[{}] click hits {id} at ({sx}, {sy})", self.ghost.ghost_id),
            None => info!("[{}] click misses at ({sx}, {sy})", self.ghost.ghost_id),
        }
        hit.map(str::to_string)
    }
}

/// The speech-bubble window's model.
pub struct BalloonView {
    ghost_id: String,
    style: Option<Map<String, Value>>,
    offset: Option<BubbleOffset>,
    scale_percent: u32,
}

impl BalloonView {
    pub fn new(
        ghost_id: &str,
        style: Option<Map<String, Value>>,
        offset: Option<BubbleOffset>,
        scale_percent: u32,
    ) -> Self {
        if let Some(offset) = &offset {
            debug!("[{ghost_id}] balloon anchored at ({}, {})", offset.x, offset.y);
        }
        Self {
            ghost_id: ghost_id.to_string(),
            style,
            offset,
            scale_percent,
        }
    }

    pub fn say(&self, text: &str) {
        info!("[{}] says: {text}", self.ghost_id);
        println!("{}> {text}", self.ghost_id);
    }

    pub fn style(&self) -> Option<&Map<String, Value>> {
        self.style.as_ref()
    }

    pub fn offset(&self) -> Option<BubbleOffset> {
        self.offset
    }

    pub fn scale_percent(&self) -> u32 {
        self.scale_percent
    }
}

#[cfg(test)]
mod tests {
    use super::CharacterView;
    use crate::ghost::locate::PackageRoot;
    use crate::ghost::payload::{LoadRequest, load_ghost};
    use std::fs;

    fn loaded_ghost(tmp: &tempfile::TempDir) -> crate::ghost::payload::LoadedGhost {
        let shell = tmp.path().join("ghosts/hina/master");
        fs::create_dir_all(&shell).unwrap();
        fs::write(
            tmp.path().join("ghosts/hina/manifest.json"),
            r#"{ "name": "Hina" }"#,
        )
        .unwrap();
        fs::write(
            shell.join("surfaces.json"),
            r#"{ "default": "0", "surfaces": {
                "0": { "hitboxes": [ { "id": "head", "rect": [20, 0, 80, 30] } ] },
                "smile": {}
            } }"#,
        )
        .unwrap();
        load_ghost(&PackageRoot::at(tmp.path()), &LoadRequest::default()).unwrap()
    }

    #[test]
    fn clicks_are_scale_corrected_before_hit_testing() {
        let tmp = tempfile::TempDir::new().unwrap();
        // At 200% scale a window-local (100, 20) is a surface-local (50, 10).
        let view = CharacterView::new(loaded_ghost(&tmp), 200, false);
        assert_eq!(view.click(100.0, 20.0).as_deref(), Some("head"));
        assert_eq!(view.click(100.0, 90.0), None);
    }

    #[test]
    fn unknown_surface_switch_is_ignored() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut view = CharacterView::new(loaded_ghost(&tmp), 100, false);
        view.set_surface("nope");
        assert_eq!(view.current_surface(), "0");
        view.set_surface("smile");
        assert_eq!(view.current_surface(), "smile");
    }
}
