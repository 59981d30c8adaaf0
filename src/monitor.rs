use std::time::{Duration, Instant};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::backend::BackendClient;

pub const PROBE_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unknown,
    Connected,
    Disconnected,
}

/// Tracks backend reachability. Probes run as spawned tasks and report back
/// over a channel, so the controller loop never blocks on network I/O; the
/// state itself is only mutated from `tick`. Probing stops once the backend
/// is healthy and resumes only if it is marked unreachable again.
pub struct ConnectionMonitor {
    state: ConnectionState,
    next_probe_at: Instant,
    inflight: Option<JoinHandle<()>>,
    tx: UnboundedSender<bool>,
    rx: UnboundedReceiver<bool>,
}

impl ConnectionMonitor {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            state: ConnectionState::Unknown,
            next_probe_at: Instant::now(),
            inflight: None,
            tx,
            rx,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn allows_navigation(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Drains probe results and schedules the next probe when due. Returns
    /// the new state if it changed.
    pub fn tick(&mut self, backend: &BackendClient, now: Instant) -> Option<ConnectionState> {
        let mut changed = None;

        while let Ok(healthy) = self.rx.try_recv() {
            self.inflight = None;
            self.next_probe_at = now + PROBE_INTERVAL;
            let next = if healthy {
                ConnectionState::Connected
            } else {
                ConnectionState::Disconnected
            };
            if next != self.state {
                log::info!("backend {} is {:?}", backend.origin(), next);
                self.state = next;
                changed = Some(next);
            }
        }

        if self.state != ConnectionState::Connected
            && self.inflight.is_none()
            && now >= self.next_probe_at
        {
            self.spawn_probe(backend);
        }

        changed
    }

    /// Drops any probe still in flight so a late failure cannot land after
    /// the user has already navigated.
    pub fn abort_inflight(&mut self) {
        if let Some(task) = self.inflight.take() {
            task.abort();
        }
    }

    fn spawn_probe(&mut self, backend: &BackendClient) {
        let backend = backend.clone();
        let tx = self.tx.clone();
        self.inflight = Some(tokio::spawn(async move {
            let _ = tx.send(backend.probe().await);
        }));
    }

    #[cfg(test)]
    pub(crate) fn force_state(&mut self, state: ConnectionState) {
        self.state = state;
    }

    #[cfg(test)]
    pub(crate) fn inject_probe_result(&mut self, healthy: bool) {
        let _ = self.tx.send(healthy);
    }
}

impl Drop for ConnectionMonitor {
    fn drop(&mut self) {
        self.abort_inflight();
    }
}
