//! Speech-bubble anchor resolution.
//!
//! The offset can live in three places, tried in order: the modern
//! metadata file's combined `"x,y"` field, the same file's split numeric
//! fields, then the legacy `key=value` descriptor. The first candidate
//! whose numbers are all finite wins; when none qualifies the caller keeps
//! its own default rather than receiving a fabricated `(0,0)`.

use crate::ghost::parsing::descript::DescriptFile;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

pub const MODERN_META_FILE: &str = "meta.json";
pub const LEGACY_DESCRIPT_FILE: &str = "descript.txt";

const COMBINED_OFFSET_KEY: &str = "balloon.offset";
const OFFSET_X_KEY: &str = "balloon.offsetx";
const OFFSET_Y_KEY: &str = "balloon.offsety";
const LEGACY_OFFSET_X_KEY: &str = "sakura.balloon.offsetx";
const LEGACY_OFFSET_Y_KEY: &str = "sakura.balloon.offsety";

/// Pixel offset of the speech bubble in surface-local space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BubbleOffset {
    pub x: i32,
    pub y: i32,
}

pub fn resolve_anchor(shell_dir: &Path) -> Option<BubbleOffset> {
    modern_anchor(shell_dir).or_else(|| legacy_anchor(shell_dir))
}

fn modern_anchor(shell_dir: &Path) -> Option<BubbleOffset> {
    let text = fs::read_to_string(shell_dir.join(MODERN_META_FILE)).ok()?;
    let meta: Value = serde_json::from_str(&text).ok()?;
    let bag = meta.get("descript")?.as_object()?;
    combined_offset(bag).or_else(|| split_offset(bag))
}

fn combined_offset(bag: &serde_json::Map<String, Value>) -> Option<BubbleOffset> {
    let raw = bag.get(COMBINED_OFFSET_KEY)?.as_str()?;
    let (x, y) = raw.split_once(',')?;
    Some(BubbleOffset {
        x: finite_component(x)?,
        y: finite_component(y)?,
    })
}

fn split_offset(bag: &serde_json::Map<String, Value>) -> Option<BubbleOffset> {
    let x = bag.get(OFFSET_X_KEY).and_then(finite_number)?;
    let y = bag.get(OFFSET_Y_KEY).and_then(finite_number)?;
    Some(BubbleOffset { x, y })
}

fn legacy_anchor(shell_dir: &Path) -> Option<BubbleOffset> {
    let text = fs::read_to_string(shell_dir.join(LEGACY_DESCRIPT_FILE)).ok()?;
    let descript = DescriptFile::parse(&text);
    let x = descript.get(LEGACY_OFFSET_X_KEY).and_then(finite_component)?;
    let y = descript.get(LEGACY_OFFSET_Y_KEY).and_then(finite_component)?;
    Some(BubbleOffset { x, y })
}

fn finite_component(raw: &str) -> Option<i32> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(|n| n as i32)
}

fn finite_number(value: &Value) -> Option<i32> {
    value.as_f64().filter(|n| n.is_finite()).map(|n| n as i32)
}
