use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;

/// An absolute point in time after which a wait is considered expired.
///
/// A deadline is one-shot: once elapsed it stays elapsed, and waiting on it
/// again resolves immediately. A timeout too large to represent never
/// elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    /// Constructs a deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        Deadline {
            at: Instant::now().checked_add(timeout),
        }
    }

    /// Time left before expiry, zero once elapsed.
    pub fn remaining(&self) -> Duration {
        match self.at {
            Some(at) => at.saturating_duration_since(Instant::now()),
            None => Duration::MAX,
        }
    }

    pub fn is_elapsed(&self) -> bool {
        self.at.is_some_and(|at| Instant::now() >= at)
    }

    /// Returns a channel that delivers a single message once the deadline passes.
    pub(crate) fn elapsed(&self) -> Receiver<Instant> {
        match self.at {
            Some(at) => crossbeam_channel::at(at),
            None => crossbeam_channel::never(),
        }
    }
}
