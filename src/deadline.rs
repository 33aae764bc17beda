//! Caller-supplied time budget.
//!
//! Every expensive operation takes a `&Deadline` and calls [`Deadline::check`]
//! between steps, so a runaway determinization or bisimulation fails fast
//! with [`Error::Timeout`] instead of running unbounded.

use std::time::{Duration, Instant};

use crate::error::{Error, Result};

#[derive(Debug, Copy, Clone)]
pub struct Deadline {
    start: Instant,
    budget: Option<Duration>,
}

impl Deadline {
    /// Budget that never expires.
    pub fn unlimited() -> Self {
        Self {
            start: Instant::now(),
            budget: None,
        }
    }

    /// Budget that expires `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self {
            start: Instant::now(),
            budget: Some(budget),
        }
    }

    pub fn budget(&self) -> Option<Duration> {
        self.budget
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn is_expired(&self) -> bool {
        match self.budget {
            Some(budget) => self.start.elapsed() >= budget,
            None => false,
        }
    }

    /// Fail with [`Error::Timeout`] if the budget is spent.
    pub fn check(&self) -> Result<()> {
        match self.budget {
            Some(budget) if self.start.elapsed() >= budget => Err(Error::Timeout { budget }),
            _ => Ok(()),
        }
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::unlimited()
    }
}
