//! Ghost behavior: turning world signals into actions.
//!
//! A ghost package either ships TOML event rules under `ghost/events/` or
//! falls back to a canned stub. Rules are matched by signal kind, gated by
//! conditions over the signal payload and the persistent variable bag, and
//! produce actions for the host to apply. Malformed rule files are skipped
//! with a warning; authoring mistakes must never take the host down.

use crate::core::signals::WorldSignal;
use crate::ghost::manifest::{EntryKind, GhostManifest};
use crate::ghost::save::SaveStore;
use log::warn;
use rand::prelude::IndexedRandom;
use serde::Deserialize;
use serde_json::{Map, Number, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub const EVENTS_DIR: &str = "ghost/events";
pub const STATE_FILE: &str = "ghost/state.toml";
pub const STRINGS_FILE: &str = "ghost/strings.toml";

/// What a runner asks the host to do in response to a signal.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Say(String),
    SetSurface(String),
    Noop,
}

pub trait GhostRunner {
    fn handle_signal(&mut self, signal: &WorldSignal) -> Vec<Action>;
}

/// Picks the runner the manifest asks for.
pub fn runner_for(
    manifest: &GhostManifest,
    ghost_id: &str,
    ghost_dir: &Path,
    save: SaveStore,
) -> Box<dyn GhostRunner> {
    match manifest.entry.kind {
        EntryKind::Script => Box::new(ScriptRunner::load(ghost_id, ghost_dir, save)),
        EntryKind::Stub => Box::new(StubRunner),
    }
}

/// Canned acknowledgement of every signal; handy while a package has no
/// event scripts yet.
pub struct StubRunner;

impl GhostRunner for StubRunner {
    fn handle_signal(&mut self, signal: &WorldSignal) -> Vec<Action> {
        vec![
            Action::Say(format!("(stub) heard {}", signal.kind)),
            Action::SetSurface("smile".to_string()),
        ]
    }
}

// --- Scripted runner ---

#[derive(Debug, Deserialize)]
struct EventRule {
    event: String,
    #[serde(default)]
    when: Vec<Condition>,
    #[serde(default)]
    actions: Vec<ActionSpec>,
}

/// One condition clause. A clause with no recognized key passes, matching
/// the permissiveness of the rest of the package formats.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Condition {
    eq: Option<[String; 2]>,
    lt: Option<[String; 2]>,
    gt: Option<[String; 2]>,
    all: Option<Vec<Condition>>,
    any: Option<Vec<Condition>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ActionSpec {
    say: Option<String>,
    say_one_of: Option<Vec<String>>,
    set_surface: Option<String>,
    set_var: Option<VarSpec>,
    add_var: Option<VarSpec>,
    noop: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct VarSpec {
    key: String,
    value: String,
}

/// Read-only lookup context for one signal dispatch.
struct EvalInput<'a> {
    kind: &'a str,
    payload: &'a Value,
    strings: &'a Value,
}

pub struct ScriptRunner {
    events: Vec<EventRule>,
    strings: Value,
    vars: Map<String, Value>,
    save: SaveStore,
}

impl ScriptRunner {
    pub fn load(ghost_id: &str, ghost_dir: &Path, save: SaveStore) -> Self {
        let events = load_events(&ghost_dir.join(EVENTS_DIR));
        let strings = load_toml_value(&ghost_dir.join(STRINGS_FILE));
        let mut vars = save.load_vars();
        seed_initial_vars(&mut vars, &load_toml_value(&ghost_dir.join(STATE_FILE)));
        save.save_vars(&vars);
        if events.is_empty() {
            warn!("{ghost_id}: no event rules found under {EVENTS_DIR}");
        }
        Self {
            events,
            strings,
            vars,
            save,
        }
    }
}

impl GhostRunner for ScriptRunner {
    fn handle_signal(&mut self, signal: &WorldSignal) -> Vec<Action> {
        let ctx = EvalInput {
            kind: &signal.kind,
            payload: &signal.payload,
            strings: &self.strings,
        };
        let mut out = Vec::new();
        let mut dirty = false;
        for rule in &self.events {
            if !event_matches(&rule.event, ctx.kind) {
                continue;
            }
            if !rule.when.iter().all(|c| condition_met(c, &ctx, &self.vars)) {
                continue;
            }
            for spec in &rule.actions {
                apply_action(spec, &ctx, &mut self.vars, &mut dirty, &mut out);
            }
        }
        if dirty {
            self.save.save_vars(&self.vars);
        }
        out
    }
}

/// An event name targets a signal kind exactly, or refines it with a
/// dotted suffix (`world.input.click.head` fires on `world.input.click`).
fn event_matches(event: &str, kind: &str) -> bool {
    event == kind
        || event
            .strip_prefix(kind)
            .is_some_and(|rest| rest.starts_with('.'))
}

fn condition_met(condition: &Condition, ctx: &EvalInput, vars: &Map<String, Value>) -> bool {
    if let Some([left, right]) = &condition.eq {
        return values_equal(&interpolate(left, ctx, vars), &interpolate(right, ctx, vars));
    }
    if let Some([left, right]) = &condition.lt {
        return numeric_pair(left, right, ctx, vars).is_some_and(|(a, b)| a < b);
    }
    if let Some([left, right]) = &condition.gt {
        return numeric_pair(left, right, ctx, vars).is_some_and(|(a, b)| a > b);
    }
    if let Some(clauses) = &condition.all {
        return clauses.iter().all(|c| condition_met(c, ctx, vars));
    }
    if let Some(clauses) = &condition.any {
        return clauses.iter().any(|c| condition_met(c, ctx, vars));
    }
    true
}

fn values_equal(left: &str, right: &str) -> bool {
    if let (Ok(a), Ok(b)) = (left.parse::<f64>(), right.parse::<f64>()) {
        return a == b;
    }
    left == right
}

fn numeric_pair(
    left: &str,
    right: &str,
    ctx: &EvalInput,
    vars: &Map<String, Value>,
) -> Option<(f64, f64)> {
    let a = interpolate(left, ctx, vars).parse::<f64>().ok()?;
    let b = interpolate(right, ctx, vars).parse::<f64>().ok()?;
    Some((a, b))
}

fn apply_action(
    spec: &ActionSpec,
    ctx: &EvalInput,
    vars: &mut Map<String, Value>,
    dirty: &mut bool,
    out: &mut Vec<Action>,
) {
    if let Some(template) = &spec.say {
        out.push(Action::Say(interpolate(template, ctx, vars)));
    }
    if let Some(choices) = &spec.say_one_of
        && let Some(pick) = choices.choose(&mut rand::rng())
    {
        out.push(Action::Say(interpolate(pick, ctx, vars)));
    }
    if let Some(surface_id) = &spec.set_surface {
        out.push(Action::SetSurface(surface_id.clone()));
    }
    if let Some(var) = &spec.set_var {
        let value = parse_scalar(&interpolate(&var.value, ctx, vars));
        vars.insert(var.key.clone(), value);
        *dirty = true;
    }
    if let Some(var) = &spec.add_var {
        let current = vars.get(&var.key).and_then(Value::as_f64).unwrap_or(0.0);
        let delta = interpolate(&var.value, ctx, vars)
            .parse::<f64>()
            .unwrap_or(0.0);
        vars.insert(var.key.clone(), number_value(current + delta));
        *dirty = true;
    }
    if spec.noop.unwrap_or(false) {
        out.push(Action::Noop);
    }
}

/// Replaces `${path}` placeholders. Paths resolve through `type`, `vars.`,
/// `strings.` or a field of the signal payload; unresolvable paths become
/// the empty string.
fn interpolate(template: &str, ctx: &EvalInput, vars: &Map<String, Value>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        if let Some(value) = lookup(&after[..end], ctx, vars) {
            out.push_str(&display_value(&value));
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}

fn lookup(path: &str, ctx: &EvalInput, vars: &Map<String, Value>) -> Option<Value> {
    let mut parts = path.split('.');
    let head = parts.next()?;
    let mut current = match head {
        "type" => Value::String(ctx.kind.to_string()),
        "vars" => Value::Object(vars.clone()),
        "strings" => ctx.strings.clone(),
        field => ctx.payload.get(field)?.clone(),
    };
    for part in parts {
        current = current.get(part)?.clone();
    }
    Some(current)
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn parse_scalar(raw: &str) -> Value {
    if let Ok(n) = raw.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Ok(n) = raw.parse::<f64>()
        && let Some(n) = Number::from_f64(n)
    {
        return Value::Number(n);
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}

fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
        Value::Number((n as i64).into())
    } else {
        Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

fn load_events(dir: &Path) -> Vec<EventRule> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    paths.sort();

    let mut rules = Vec::new();
    for path in paths {
        let Ok(text) = fs::read_to_string(&path) else {
            continue;
        };
        match toml::from_str::<EventRule>(&text) {
            Ok(rule) => rules.push(rule),
            Err(e) => warn!("{}: skipping malformed event rule: {e}", path.display()),
        }
    }
    rules
}

fn load_toml_value(path: &Path) -> Value {
    let Ok(text) = fs::read_to_string(path) else {
        return Value::Null;
    };
    match toml::from_str(&text) {
        Ok(value) => value,
        Err(e) => {
            warn!("{}: unreadable table: {e}", path.display());
            Value::Null
        }
    }
}

/// Vars already present in the save win over the package's initial state.
fn seed_initial_vars(vars: &mut Map<String, Value>, state: &Value) {
    let Some(initial) = state.as_object() else {
        return;
    };
    for (key, value) in initial {
        vars.entry(key.clone()).or_insert_with(|| value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::{Action, GhostRunner, ScriptRunner, StubRunner, event_matches};
    use crate::core::signals::WorldSignal;
    use crate::ghost::save::SaveStore;
    use serde_json::json;
    use std::fs;

    fn ghost_with_rules(rules: &[(&str, &str)]) -> tempfile::TempDir {
        let tmp = tempfile::TempDir::new().unwrap();
        let events = tmp.path().join("ghost/events");
        fs::create_dir_all(&events).unwrap();
        for (name, body) in rules {
            fs::write(events.join(name), body).unwrap();
        }
        tmp
    }

    fn runner_in(tmp: &tempfile::TempDir) -> ScriptRunner {
        let save = SaveStore::new(tmp.path().join("save.json"));
        save.ensure_initialized();
        ScriptRunner::load("test", tmp.path(), save)
    }

    #[test]
    fn stub_acknowledges_any_signal() {
        let actions = StubRunner.handle_signal(&WorldSignal::boot());
        assert!(matches!(&actions[0], Action::Say(text) if text.contains("world.boot")));
    }

    #[test]
    fn event_name_matching_allows_dotted_refinements() {
        assert!(event_matches("world.boot", "world.boot"));
        assert!(event_matches("world.input.click.head", "world.input.click"));
        assert!(!event_matches("world.input.clicked", "world.input.click"));
        assert!(!event_matches("world.boot", "world.clock"));
    }

    #[test]
    fn conditions_gate_on_payload_fields() {
        let tmp = ghost_with_rules(&[(
            "10_click.toml",
            r#"
event = "world.input.click"

[[when]]
eq = ["${hitbox}", "head"]

[[actions]]
say = "you found ${hitbox}"

[[actions]]
set_surface = "smile"
"#,
        )]);
        let mut runner = runner_in(&tmp);

        let hit = WorldSignal::new("world.input.click", json!({ "hitbox": "head" }));
        assert_eq!(
            runner.handle_signal(&hit),
            vec![
                Action::Say("you found head".to_string()),
                Action::SetSurface("smile".to_string()),
            ]
        );

        let miss = WorldSignal::new("world.input.click", json!({ "hitbox": "body" }));
        assert!(runner.handle_signal(&miss).is_empty());
    }

    #[test]
    fn counters_persist_through_the_save_store() {
        let tmp = ghost_with_rules(&[(
            "20_count.toml",
            r#"
event = "world.input.click"

[[actions]]
add_var = { key = "pats", value = "1" }
"#,
        )]);
        {
            let mut runner = runner_in(&tmp);
            let click = WorldSignal::new("world.input.click", json!({}));
            runner.handle_signal(&click);
            runner.handle_signal(&click);
        }
        // A fresh runner sees the persisted counter.
        let store = SaveStore::new(tmp.path().join("save.json"));
        assert_eq!(store.load_vars().get("pats"), Some(&json!(2)));
    }

    #[test]
    fn initial_state_seeds_vars_without_clobbering_saved_ones() {
        let tmp = ghost_with_rules(&[(
            "30_mood.toml",
            r#"
event = "world.boot"

[[when]]
eq = ["${vars.mood}", "sleepy"]

[[actions]]
say = "still ${vars.mood}"
"#,
        )]);
        fs::write(tmp.path().join("ghost/state.toml"), "mood = \"sleepy\"\n").unwrap();

        let mut runner = runner_in(&tmp);
        assert_eq!(
            runner.handle_signal(&WorldSignal::boot()),
            vec![Action::Say("still sleepy".to_string())]
        );
    }

    #[test]
    fn strings_table_resolves_in_interpolation() {
        let tmp = ghost_with_rules(&[(
            "40_greet.toml",
            r#"
event = "world.boot"

[[actions]]
say = "${strings.greeting}"
"#,
        )]);
        fs::write(
            tmp.path().join("ghost/strings.toml"),
            "greeting = \"good morning\"\n",
        )
        .unwrap();

        let mut runner = runner_in(&tmp);
        assert_eq!(
            runner.handle_signal(&WorldSignal::boot()),
            vec![Action::Say("good morning".to_string())]
        );
    }

    #[test]
    fn malformed_rule_files_are_skipped() {
        let tmp = ghost_with_rules(&[
            ("00_broken.toml", "event = [this is not toml"),
            (
                "10_ok.toml",
                "event = \"world.boot\"\n\n[[actions]]\nsay = \"ok\"\n",
            ),
        ]);
        let mut runner = runner_in(&tmp);
        assert_eq!(
            runner.handle_signal(&WorldSignal::boot()),
            vec![Action::Say("ok".to_string())]
        );
    }

    #[test]
    fn numeric_comparisons_read_saved_vars() {
        let tmp = ghost_with_rules(&[(
            "50_grumpy.toml",
            r#"
event = "world.input.click"

[[when]]
gt = ["${vars.pats}", "2"]

[[actions]]
say = "enough"
"#,
        )]);
        fs::write(tmp.path().join("ghost/state.toml"), "pats = 3\n").unwrap();

        let mut runner = runner_in(&tmp);
        let click = WorldSignal::new("world.input.click", json!({}));
        assert_eq!(
            runner.handle_signal(&click),
            vec![Action::Say("enough".to_string())]
        );
    }
}
