//! Cancellation and deadline carrier passed to every operation.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::{KvError, Result};

/// An execution context bearing an optional deadline and a cancellation token.
///
/// Clones share the same cancellation state. Derived contexts observe the
/// cancellation of their parent, never the other way around. The client
/// facade only carries the context through; honoring it is the adapter's job.
#[derive(Debug, Clone, Default)]
pub struct Context {
    deadline: Option<Instant>,
    token: CancellationToken,
}

impl Context {
    /// A context that is never canceled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    fn child(&self, deadline: Option<Instant>) -> Self {
        Context {
            deadline,
            token: self.token.child_token(),
        }
    }

    /// Derives a context that can be canceled independently of its parent.
    pub fn with_cancel(&self) -> Self {
        self.child(self.deadline)
    }

    /// Derives a context expiring at `deadline`, or earlier if the parent does.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        };
        self.child(Some(deadline))
    }

    /// Derives a context expiring after `timeout`.
    ///
    /// A timeout past what `Instant` can represent adds no deadline.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self.with_cancel(),
        }
    }

    /// Cancels this context and every context derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns the deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left until the deadline; `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Returns true once canceled or past the deadline.
    pub fn is_done(&self) -> bool {
        self.check().is_err()
    }

    /// Returns the reason this context is done, if it is.
    pub fn check(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(KvError::Canceled);
        }
        match self.deadline {
            Some(d) if Instant::now() >= d => Err(KvError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}
