#![forbid(unsafe_code)]

//! Async ordering guard.
//!
//! Every validation pass takes a [`Ticket`] before it starts. When the pass
//! settles it may commit only if its ticket is still the latest one issued;
//! otherwise a newer pass owns the result and the old one is discarded.
//!
//! # Invariants
//!
//! 1. Tickets are strictly increasing per guard.
//! 2. Exactly one ticket (the last issued) is current at any time.

use std::cell::Cell;

/// Identity of one validation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Issues tickets and answers "is this pass still the latest?".
#[derive(Debug, Default)]
pub struct SessionGuard {
    latest: Cell<u64>,
}

impl SessionGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new pass. Every earlier ticket becomes stale.
    pub fn issue(&self) -> Ticket {
        let next = self.latest.get() + 1;
        self.latest.set(next);
        Ticket(next)
    }

    #[must_use]
    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.get() == ticket.0
    }

    /// The latest ticket, `None` before the first pass.
    #[must_use]
    pub fn current(&self) -> Option<Ticket> {
        match self.latest.get() {
            0 => None,
            n => Some(Ticket(n)),
        }
    }
}
