use crate::ghost::locate::PackageRoot;
use log::warn;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;

pub const BALLOON_STYLE_FILE: &str = "balloon.json";

#[derive(Debug, Default, Deserialize)]
struct BalloonFile {
    #[serde(default)]
    style: Option<Map<String, Value>>,
}

/// Loads the free-form style bag of an installed balloon, if any. The
/// style keys are opaque to the engine; the rendering collaborator
/// interprets them.
pub fn load_balloon_style(root: &PackageRoot, balloon_id: &str) -> Option<Map<String, Value>> {
    let path = root.balloon_dir(balloon_id).join(BALLOON_STYLE_FILE);
    let text = fs::read_to_string(&path).ok()?;
    match serde_json::from_str::<BalloonFile>(&text) {
        Ok(parsed) => parsed.style,
        Err(e) => {
            warn!("{}: unreadable balloon style: {e}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::load_balloon_style;
    use crate::ghost::locate::PackageRoot;
    use std::fs;

    #[test]
    fn loads_the_style_bag() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().join("balloons/plain");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("balloon.json"),
            r##"{ "style": { "font_size": 14, "background": "#fffaf0" } }"##,
        )
        .unwrap();

        let root = PackageRoot::at(tmp.path());
        let style = load_balloon_style(&root, "plain").unwrap();
        assert_eq!(style["font_size"], 14);
    }

    #[test]
    fn missing_balloon_is_none() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = PackageRoot::at(tmp.path());
        assert!(load_balloon_style(&root, "plain").is_none());
    }
}
