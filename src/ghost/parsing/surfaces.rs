//! Surface descriptor parsers.
//!
//! Two formats coexist in the wild: a structured JSON descriptor and a
//! line-oriented text format from older packages. Both are pure text-in,
//! table-out functions; the caller decides which file to feed them and
//! resolves file references afterwards. Legacy files are expected to be
//! noisy, so unrecognizable records are skipped, never reported.

use crate::ghost::shell::{DEFAULT_SURFACE_ID, Hitbox};
use rustc_hash::FxHashMap;
use serde_json::Value;
use smallvec::SmallVec;

/// A surface as declared by a descriptor, before file references are
/// resolved against the package directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSurface {
    pub file: Option<String>,
    pub hitboxes: SmallVec<[Hitbox; 4]>,
}

/// Parses the modern JSON descriptor. Returns `None` when the text is not
/// a JSON object at all; inside an object, individual records that do not
/// have the expected shape are dropped without failing their siblings.
pub fn parse_modern(text: &str) -> Option<(String, FxHashMap<String, RawSurface>)> {
    let root: Value = serde_json::from_str(text).ok()?;
    let root = root.as_object()?;
    let default_surface = root
        .get("default_surface")
        .or_else(|| root.get("default"))
        .and_then(surface_id)
        .unwrap_or_else(|| DEFAULT_SURFACE_ID.to_string());

    let mut table = FxHashMap::default();
    if let Some(entries) = root.get("surfaces").and_then(Value::as_object) {
        for (id, entry) in entries {
            let Some(entry) = entry.as_object() else { continue };
            let file = entry
                .get("file")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|reference| !reference.is_empty())
                .map(str::to_string);
            table.insert(
                id.clone(),
                RawSurface {
                    file,
                    hitboxes: parse_hitboxes(entry),
                },
            );
        }
    }
    Some((default_surface, table))
}

/// Hitbox precedence: a present, non-empty corner-rect `hitboxes` array is
/// authoritative even when every record in it turns out to be malformed.
/// Only an absent or empty array falls back to the origin+size `hitbox`
/// form, which is converted to corner points.
fn parse_hitboxes(entry: &serde_json::Map<String, Value>) -> SmallVec<[Hitbox; 4]> {
    if let Some(modern) = entry.get("hitboxes").and_then(Value::as_array)
        && !modern.is_empty()
    {
        return modern.iter().filter_map(corner_hitbox).collect();
    }
    entry
        .get("hitbox")
        .and_then(Value::as_array)
        .map(|legacy| legacy.iter().filter_map(extent_hitbox).collect())
        .unwrap_or_default()
}

fn corner_hitbox(value: &Value) -> Option<Hitbox> {
    let id = region_id(value)?;
    let rect = value.get("rect")?.as_array()?;
    if rect.len() != 4 {
        return None;
    }
    let mut corners = [0i32; 4];
    for (corner, number) in corners.iter_mut().zip(rect) {
        *corner = finite_i32(number)?;
    }
    Some(Hitbox { id, rect: corners })
}

fn extent_hitbox(value: &Value) -> Option<Hitbox> {
    let id = region_id(value)?;
    let x = finite_i32(value.get("x")?)?;
    let y = finite_i32(value.get("y")?)?;
    let w = finite_i32(value.get("w")?)?;
    let h = finite_i32(value.get("h")?)?;
    Some(Hitbox {
        id,
        rect: [x, y, x + w, y + h],
    })
}

fn region_id(value: &Value) -> Option<String> {
    value
        .get("id")?
        .as_str()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

fn finite_i32(value: &Value) -> Option<i32> {
    let number = value.as_f64()?;
    number.is_finite().then(|| number as i32)
}

fn surface_id(value: &Value) -> Option<String> {
    match value {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

/// Parses the legacy line format: one `id<sep>file` record per line, with
/// `:` preferred over `,` over whitespace as the separator, `#` comments
/// and blank lines skipped. The first record fixes the default surface id.
/// A separatorless `surfaceNNN` token declares surface `NNN` with no file;
/// any other separatorless token is a bare file reference attached to the
/// running default id, which starts out as `"0"`.
pub fn parse_legacy(text: &str) -> (String, FxHashMap<String, RawSurface>) {
    let mut default_surface: Option<String> = None;
    let mut table: FxHashMap<String, RawSurface> = FxHashMap::default();

    for raw_line in text.lines() {
        let line = raw_line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let running = default_surface.as_deref().unwrap_or(DEFAULT_SURFACE_ID);
        let Some((id, file)) = split_record(line, running) else {
            continue;
        };
        if default_surface.is_none() {
            default_surface = Some(id.clone());
        }
        table.insert(
            id,
            RawSurface {
                file,
                hitboxes: SmallVec::new(),
            },
        );
    }

    (
        default_surface.unwrap_or_else(|| DEFAULT_SURFACE_ID.to_string()),
        table,
    )
}

fn split_record(line: &str, running_default: &str) -> Option<(String, Option<String>)> {
    for separator in [':', ','] {
        if let Some((left, right)) = line.split_once(separator) {
            return record_tokens(left, right);
        }
    }
    if let Some((left, right)) = line.split_once(|c: char| c.is_whitespace()) {
        return record_tokens(left, right);
    }
    if let Some(numeric) = bare_surface_id(line) {
        return Some((numeric.to_string(), None));
    }
    Some((running_default.to_string(), Some(line.to_string())))
}

fn record_tokens(left: &str, right: &str) -> Option<(String, Option<String>)> {
    let id = left.trim();
    if id.is_empty() {
        return None;
    }
    let file = right.trim();
    Some((
        id.to_string(),
        (!file.is_empty()).then(|| file.to_string()),
    ))
}

fn bare_surface_id(token: &str) -> Option<&str> {
    let digits = token
        .get(..7)
        .filter(|prefix| prefix.eq_ignore_ascii_case("surface"))
        .map(|_| &token[7..])?;
    (!digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())).then_some(digits)
}
