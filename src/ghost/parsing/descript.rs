use rustc_hash::FxHashMap;

/// Flat `key=value` reader for the legacy per-shell metadata descriptor.
/// `#` starts a comment, whole-line or trailing; lines without `=` or with
/// an empty key are noise and skipped. Later duplicates overwrite earlier
/// ones.
#[derive(Debug, Default)]
pub struct DescriptFile {
    entries: FxHashMap<String, String>,
}

impl DescriptFile {
    pub fn parse(text: &str) -> Self {
        let mut entries = FxHashMap::default();
        for raw_line in text.lines() {
            let line = raw_line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            entries.insert(key.to_string(), value.trim().to_string());
        }
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}
