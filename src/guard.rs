use std::time::{Duration, Instant};

/// How long a navigation may sit in the loading screen before the content
/// view is revealed anyway.
pub const LOAD_DEADLINE: Duration = Duration::from_secs(8);

/// Single-deadline safety valve for loads that never signal completion.
/// At most one deadline is outstanding; arming again replaces the previous
/// one. Must be disarmed on load-complete, load-error and go-home so a stale
/// force-reveal cannot fire after the user moved on.
#[derive(Debug, Default)]
pub struct LoadGuard {
    deadline: Option<Instant>,
}

impl LoadGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, timeout: Duration) {
        self.deadline = Some(Instant::now() + timeout);
    }

    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Consumes the deadline if it has passed. Returns true at most once per
    /// arming.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
