use chrono::{DateTime, Datelike, Local, Timelike};
use log::debug;
use serde_json::{Value, json};
use std::collections::VecDeque;

pub const SIG_BOOT: &str = "world.boot";
pub const SIG_SHUTDOWN: &str = "world.shutdown";
pub const SIG_CLOCK: &str = "world.clock";
pub const SIG_UPTIME: &str = "world.uptime";
pub const SIG_POWER: &str = "world.power";
pub const SIG_NETWORK: &str = "world.network";
pub const SIG_CLICK: &str = "world.input.click";
pub const SIG_PRESENCE: &str = "world.presence.changed";

/// One broadcast event in the host world: a dotted kind plus a JSON
/// payload the runners can dig into.
#[derive(Debug, Clone)]
pub struct WorldSignal {
    pub kind: String,
    pub payload: Value,
}

impl WorldSignal {
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// An arbitrary kind with no payload, for signals typed at the prompt.
    pub fn bare(kind: &str) -> Self {
        Self::new(kind, json!({}))
    }

    pub fn boot() -> Self {
        Self::bare(SIG_BOOT)
    }

    pub fn shutdown() -> Self {
        Self::bare(SIG_SHUTDOWN)
    }

    pub fn clock(now: &DateTime<Local>) -> Self {
        Self::new(
            SIG_CLOCK,
            json!({
                "time": now.to_rfc3339(),
                "timezone": now.offset().to_string(),
                "hour": now.hour(),
                "minute": now.minute(),
                "weekday": now.weekday().num_days_from_monday(),
            }),
        )
    }

    pub fn uptime(seconds: u64) -> Self {
        Self::new(SIG_UPTIME, json!({ "seconds": seconds }))
    }

    /// Battery state is reported once at boot. There is no probing backend
    /// yet, so both fields are null; the shape exists for scripts to hook.
    pub fn power() -> Self {
        Self::new(SIG_POWER, json!({ "level": null, "charging": null }))
    }

    pub fn network() -> Self {
        Self::new(SIG_NETWORK, json!({ "online": null, "connection_type": null }))
    }

    pub fn click(
        ghost_id: &str,
        surface_id: &str,
        hitbox: Option<&str>,
        x: f32,
        y: f32,
        button: &str,
    ) -> Self {
        Self::new(
            SIG_CLICK,
            json!({
                "ghost_id": ghost_id,
                "surface_id": surface_id,
                "hitbox": hitbox,
                "x": x,
                "y": y,
                "button": button,
            }),
        )
    }

    pub fn presence(running: &[(String, String)]) -> Self {
        let entries: Vec<Value> = running
            .iter()
            .map(|(id, name)| json!({ "id": id, "name": name }))
            .collect();
        Self::new(SIG_PRESENCE, json!({ "running": entries }))
    }
}

/// Events the host loop multiplexes over one channel: typed console input
/// and world signals produced by background threads.
#[derive(Debug)]
pub enum HostEvent {
    Input(String),
    Signal(WorldSignal),
}

/// Synchronous broadcast queue. Publishing enqueues; the host loop drains
/// and routes. Keeping routing out of `publish` means a signal raised
/// while another is being handled is processed afterwards instead of
/// re-entering the handlers.
#[derive(Debug, Default)]
pub struct SignalBus {
    queue: VecDeque<WorldSignal>,
}

impl SignalBus {
    pub fn publish(&mut self, signal: WorldSignal) {
        debug!("signal: {}", signal.kind);
        self.queue.push_back(signal);
    }

    pub fn next(&mut self) -> Option<WorldSignal> {
        self.queue.pop_front()
    }
}
