use std::time::{Duration, Instant};

/// Per-sentence time budget. An unlimited deadline never reads the clock,
/// which keeps it usable on targets without one.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    expires: Option<Instant>,
}

impl Deadline {
    pub fn after(budget: Option<Duration>) -> Self {
        Self { expires: budget.map(|b| Instant::now() + b) }
    }

    pub fn unlimited() -> Self {
        Self { expires: None }
    }

    pub fn expired(&self) -> bool {
        self.expires.map_or(false, |at| Instant::now() >= at)
    }
}
