use crate::core::signals::{HostEvent, WorldSignal};
use chrono::{DateTime, Local, Timelike};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Background ticker: publishes a clock signal immediately and then once
/// per minute, aligned to minute boundaries, plus the host uptime. Stops
/// when asked or when the receiving side goes away.
pub struct Scheduler {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    pub fn start(events: Sender<HostEvent>) -> Self {
        let (stop_tx, stop_rx) = mpsc::channel();
        let handle = std::thread::spawn(move || run_loop(&events, &stop_rx));
        Self {
            stop_tx,
            handle: Some(handle),
        }
    }

    pub fn stop(&mut self) {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run_loop(events: &Sender<HostEvent>, stop: &Receiver<()>) {
    let booted = Instant::now();
    loop {
        let now = Local::now();
        if events
            .send(HostEvent::Signal(WorldSignal::clock(&now)))
            .is_err()
        {
            return;
        }
        let _ = events.send(HostEvent::Signal(WorldSignal::uptime(
            booted.elapsed().as_secs(),
        )));
        match stop.recv_timeout(until_next_minute(&now)) {
            Err(RecvTimeoutError::Timeout) => {}
            _ => return,
        }
    }
}

fn until_next_minute(now: &DateTime<Local>) -> Duration {
    let into_minute = Duration::new(u64::from(now.second()), now.nanosecond().min(999_999_999));
    Duration::from_secs(60)
        .saturating_sub(into_minute)
        .max(Duration::from_secs(1))
}
