use std::time::{Duration, Instant};

pub(super) const DEBOUNCE_MS: u64 = 200;

/// Single resettable deadline. Arming again pushes the deadline out; nothing
/// queues up behind it.
pub(super) struct Debouncer {
    quantum: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub(super) fn new(quantum: Duration) -> Self {
        Self {
            quantum,
            deadline: None,
        }
    }

    pub(super) fn set_quantum(&mut self, quantum: Duration) {
        self.quantum = quantum;
    }

    pub(super) fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.quantum);
    }

    pub(super) fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub(super) fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Disarm and return `true` if the deadline has passed.
    pub(super) fn take_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEBOUNCE_MS))
    }
}
