use crate::config;
use crate::core::clock::Scheduler;
use crate::core::signals::{HostEvent, SignalBus, WorldSignal};
use crate::ghost::balloon;
use crate::ghost::locate::PackageRoot;
use crate::ghost::manifest;
use crate::ghost::payload::{self, LoadRequest};
use crate::ghost::runner::{self, Action, GhostRunner};
use crate::ghost::save::SaveStore;
use crate::host::{BalloonView, CharacterView};
use log::{debug, info, warn};
use std::io::BufRead;
use std::sync::mpsc;

/* -------------------- running ghosts -------------------- */

struct GhostInstance {
    character: CharacterView,
    balloon: BalloonView,
    runner: Box<dyn GhostRunner>,
}

pub struct App {
    root: PackageRoot,
    bus: SignalBus,
    running: Vec<(String, GhostInstance)>,
    active: Option<String>,
}

impl App {
    pub fn new(root: PackageRoot) -> Self {
        Self {
            root,
            bus: SignalBus::default(),
            running: Vec::new(),
            active: None,
        }
    }

    /// Scans the collection, announces the world and launches the boot
    /// ghost: the configured default when it exists, otherwise the first
    /// installed one.
    pub fn boot(&mut self) {
        let installed = self.root.list_ghosts();
        info!(
            "{} ghost(s) installed under {}",
            installed.len(),
            self.root.dir().display()
        );

        self.bus.publish(WorldSignal::boot());
        self.bus.publish(WorldSignal::power());
        self.bus.publish(WorldSignal::network());

        let boot_ghost = config::get()
            .default_ghost
            .filter(|id| installed.iter().any(|have| have == id))
            .or_else(|| installed.into_iter().next());
        match boot_ghost {
            Some(id) => self.launch(LoadRequest {
                ghost_id: Some(id),
                shell_id: None,
            }),
            None => {
                println!("no ghosts installed; drop a package into the collection and `reload`")
            }
        }
        self.drain();
    }

    pub fn shutdown(&mut self) {
        self.bus.publish(WorldSignal::shutdown());
        self.drain();
        self.running.clear();
        info!("host shut down");
    }

    fn launch(&mut self, request: LoadRequest) {
        let loaded = match payload::load_ghost(&self.root, &request) {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!("{e}");
                println!("{e}");
                return;
            }
        };
        let cfg = config::get();

        let save = SaveStore::new(loaded.ghost_dir.join(&loaded.manifest.storage.path));
        save.ensure_initialized();
        let runner =
            runner::runner_for(&loaded.manifest, &loaded.ghost_id, &loaded.ghost_dir, save);
        let style = loaded
            .manifest
            .balloon
            .default
            .as_deref()
            .and_then(|balloon_id| balloon::load_balloon_style(&self.root, balloon_id));
        let balloon_view =
            BalloonView::new(&loaded.ghost_id, style, loaded.bubble_offset, cfg.balloon_scale);
        debug!(
            "[{}] balloon: scale {}%, offset {:?}, styled: {}",
            loaded.ghost_id,
            balloon_view.scale_percent(),
            balloon_view.offset(),
            balloon_view.style().is_some()
        );

        debug!("[{}] shell dir: {}", loaded.ghost_id, loaded.shell_dir.display());
        if let Ok(encoded) = serde_json::to_string(&loaded.initial_payload()) {
            debug!("payload: {encoded}");
        }

        let ghost_id = loaded.ghost_id.clone();
        let character = CharacterView::new(loaded, cfg.shell_scale, cfg.hitbox_overlay);
        let instance = GhostInstance {
            character,
            balloon: balloon_view,
            runner,
        };

        self.running.retain(|(id, _)| id != &ghost_id);
        self.running.push((ghost_id.clone(), instance));
        self.active = Some(ghost_id);
        self.publish_presence();
    }

    fn close(&mut self, ghost_id: &str) {
        let before = self.running.len();
        self.running.retain(|(id, _)| id != ghost_id);
        if self.running.len() == before {
            println!("{ghost_id} is not running");
            return;
        }
        if self.active.as_deref() == Some(ghost_id) {
            self.active = self.running.last().map(|(id, _)| id.clone());
        }
        self.publish_presence();
    }

    fn publish_presence(&mut self) {
        let mut entries: Vec<(String, String)> = self
            .running
            .iter()
            .map(|(id, instance)| (id.clone(), instance.character.ghost().manifest.name.clone()))
            .collect();
        entries.sort();
        self.bus.publish(WorldSignal::presence(&entries));
    }

    /// Empties the signal queue, handing every signal to every running
    /// ghost and applying whatever actions come back. Signals published
    /// while routing are picked up by the same drain.
    fn drain(&mut self) {
        while let Some(signal) = self.bus.next() {
            for (_, instance) in &mut self.running {
                let actions = instance.runner.handle_signal(&signal);
                for action in actions {
                    match action {
                        Action::Say(text) => instance.balloon.say(&text),
                        Action::SetSurface(surface_id) => {
                            instance.character.set_surface(&surface_id);
                        }
                        Action::Noop => {}
                    }
                }
            }
        }
    }

    fn active_instance(&mut self) -> Option<&mut GhostInstance> {
        let active = self.active.clone()?;
        self.running
            .iter_mut()
            .find(|(id, _)| id == &active)
            .map(|(_, instance)| instance)
    }

    /// One console command; returns false when the host should exit.
    fn handle_command(&mut self, line: &str) -> bool {
        if line.is_empty() {
            return true;
        }
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();
        match command {
            "quit" | "exit" => return false,
            "list" => self.print_collection(),
            "ghost" => {
                if rest.is_empty() {
                    println!("usage: ghost <id>");
                } else {
                    self.launch(LoadRequest {
                        ghost_id: Some(rest.to_string()),
                        shell_id: None,
                    });
                }
            }
            "shell" => self.switch_shell(rest),
            "close" => {
                if rest.is_empty() {
                    println!("usage: close <id>");
                } else {
                    self.close(rest);
                }
            }
            "reload" => self.reload_active(),
            "click" => self.click(rest),
            "scale" => self.rescale(rest),
            _ => self.bus.publish(WorldSignal::bare(line)),
        }
        true
    }

    fn print_collection(&mut self) {
        let installed = self.root.list_ghosts();
        if installed.is_empty() {
            println!("no ghosts installed");
            return;
        }
        for dir_name in installed {
            let running = self
                .running
                .iter()
                .any(|(_, i)| i.character.ghost().dir_name == dir_name);
            let marker = if running { "*" } else { " " };
            let shells = self.root.list_shells(&dir_name).join(", ");
            let about = manifest::load_manifest(&self.root.ghost_dir(&dir_name))
                .map(|m| {
                    let mut about = m.name;
                    if let Some(version) = &m.version {
                        about.push_str(&format!(" v{version}"));
                    }
                    if let Some(author) = &m.author {
                        about.push_str(&format!(" by {author}"));
                    }
                    about
                })
                .unwrap_or_default();
            println!("{marker} {dir_name} ({about}) [{shells}]");
        }
    }

    fn switch_shell(&mut self, shell_id: &str) {
        if shell_id.is_empty() {
            println!("usage: shell <id>");
            return;
        }
        let Some(instance) = self.active_instance() else {
            println!("no ghost is running");
            return;
        };
        let request = LoadRequest {
            ghost_id: Some(instance.character.ghost().dir_name.clone()),
            shell_id: Some(shell_id.to_string()),
        };
        self.launch(request);
    }

    fn reload_active(&mut self) {
        let Some(instance) = self.active_instance() else {
            println!("no ghost is running");
            return;
        };
        let ghost = instance.character.ghost();
        let request = LoadRequest {
            ghost_id: Some(ghost.dir_name.clone()),
            shell_id: Some(ghost.shell_id.clone()),
        };
        self.launch(request);
    }

    fn click(&mut self, rest: &str) {
        let mut numbers = rest.split_whitespace().filter_map(|n| n.parse::<f32>().ok());
        let (x, y) = (numbers.next().unwrap_or(10.0), numbers.next().unwrap_or(10.0));
        let Some(instance) = self.active_instance() else {
            println!("no ghost is running");
            return;
        };
        let hit = instance.character.click(x, y);
        let snapshot = instance.character.payload();
        self.bus.publish(WorldSignal::click(
            &snapshot.ghost_id,
            &snapshot.surface_id,
            hit.as_deref(),
            x,
            y,
            "left",
        ));
    }

    fn rescale(&mut self, rest: &str) {
        let Ok(percent) = rest.parse::<u32>() else {
            println!("usage: scale <percent>");
            return;
        };
        config::set_shell_scale(percent);
        let applied = config::get().shell_scale;
        for (_, instance) in &mut self.running {
            instance.character.set_scale(applied);
        }
        println!("shell scale: {applied}%");
    }
}

/* -------------------- host loop -------------------- */

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let root = PackageRoot::resolve();
    let mut app = App::new(root);
    app.boot();

    let (tx, rx) = mpsc::channel();
    let mut scheduler = Scheduler::start(tx.clone());
    spawn_stdin_reader(tx);

    println!(
        "commands: list, ghost <id>, shell <id>, close <id>, reload, click [x y], scale <pct>, quit"
    );
    println!("anything else is published as a raw world signal");

    while let Ok(event) = rx.recv() {
        match event {
            HostEvent::Input(line) => {
                if !app.handle_command(line.trim()) {
                    break;
                }
            }
            HostEvent::Signal(signal) => app.bus.publish(signal),
        }
        app.drain();
    }

    scheduler.stop();
    app.shutdown();
    Ok(())
}

fn spawn_stdin_reader(tx: mpsc::Sender<HostEvent>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(HostEvent::Input(line)).is_err() {
                return;
            }
        }
        let _ = tx.send(HostEvent::Input("quit".to_string()));
    });
}

#[cfg(test)]
mod tests {
    use super::App;
    use crate::ghost::locate::PackageRoot;
    use crate::ghost::payload::LoadRequest;
    use std::fs;
    use std::path::Path;

    fn write(path: &Path, text: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    fn sample_collection(tmp: &tempfile::TempDir) -> PackageRoot {
        let ghost = tmp.path().join("ghosts/hina");
        write(&ghost.join("manifest.json"), r#"{ "name": "Hina" }"#);
        write(
            &ghost.join("master/surfaces.json"),
            r#"{ "default": "0", "surfaces": {
                "0": { "hitboxes": [ { "id": "head", "rect": [0, 0, 50, 50] } ] },
                "smile": {}
            } }"#,
        );
        write(
            &ghost.join("ghost/events/click.toml"),
            r#"
event = "world.input.click"

[[when]]
eq = ["${hitbox}", "head"]

[[actions]]
say = "pat received"

[[actions]]
set_surface = "smile"
"#,
        );
        PackageRoot::at(tmp.path())
    }

    #[test]
    fn click_routing_switches_the_surface() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut app = App::new(sample_collection(&tmp));
        app.launch(LoadRequest::default());
        app.drain();

        assert!(app.handle_command("click 10 10"));
        app.drain();

        let instance = app.active_instance().unwrap();
        assert_eq!(instance.character.current_surface(), "smile");
    }

    #[test]
    fn closing_the_last_ghost_clears_the_active_slot() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut app = App::new(sample_collection(&tmp));
        app.launch(LoadRequest::default());
        assert!(app.active.is_some());
        app.close("hina");
        assert!(app.active.is_none());
        assert!(app.running.is_empty());
    }

    #[test]
    fn quit_stops_the_command_loop() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut app = App::new(PackageRoot::at(tmp.path()));
        assert!(!app.handle_command("quit"));
        assert!(app.handle_command("list"));
    }
}
