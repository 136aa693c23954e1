use chrono::Local;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::PathBuf;

/// Per-ghost persistent state: a creation timestamp plus a free-form
/// variable bag the runner reads and writes. All I/O failures degrade to
/// in-memory defaults; losing a save must never stop a ghost from loading.
#[derive(Debug, Clone)]
pub struct SaveStore {
    path: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct SaveFile {
    created_at: String,
    #[serde(default)]
    vars: Map<String, Value>,
}

impl SaveFile {
    fn fresh() -> Self {
        Self {
            created_at: Local::now().to_rfc3339(),
            vars: Map::new(),
        }
    }
}

impl SaveStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Creates the save file (and its parent directories) on first run.
    pub fn ensure_initialized(&self) {
        if self.path.exists() {
            return;
        }
        if let Some(parent) = self.path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        self.write(&SaveFile::fresh());
    }

    pub fn load_vars(&self) -> Map<String, Value> {
        self.read().map(|save| save.vars).unwrap_or_default()
    }

    pub fn save_vars(&self, vars: &Map<String, Value>) {
        let mut save = self.read().unwrap_or_else(SaveFile::fresh);
        save.vars = vars.clone();
        self.write(&save);
    }

    fn read(&self) -> Option<SaveFile> {
        let text = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&text) {
            Ok(save) => Some(save),
            Err(e) => {
                warn!("{}: unreadable save file: {e}", self.path.display());
                None
            }
        }
    }

    fn write(&self, save: &SaveFile) {
        match serde_json::to_string_pretty(save) {
            Ok(text) => {
                if let Err(e) = fs::write(&self.path, text) {
                    warn!("{}: failed to write save file: {e}", self.path.display());
                }
            }
            Err(e) => warn!("{}: failed to encode save file: {e}", self.path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SaveStore;
    use serde_json::{Map, Value, json};

    #[test]
    fn initializes_once_and_keeps_existing_state() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = SaveStore::new(tmp.path().join("state/save.json"));
        store.ensure_initialized();

        let mut vars = Map::new();
        vars.insert("pats".to_string(), json!(3));
        store.save_vars(&vars);

        // A second init must not wipe the stored vars.
        store.ensure_initialized();
        assert_eq!(store.load_vars().get("pats"), Some(&json!(3)));
    }

    #[test]
    fn missing_file_loads_empty_vars() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = SaveStore::new(tmp.path().join("save.json"));
        assert!(store.load_vars().is_empty());
    }

    #[test]
    fn corrupt_file_degrades_to_empty_vars() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("save.json");
        std::fs::write(&path, "{ truncated").unwrap();
        let store = SaveStore::new(path);
        assert_eq!(store.load_vars(), Map::<String, Value>::new());
    }
}
