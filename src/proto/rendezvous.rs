//! One-shot rendezvous between a command caller and the event lane that
//! eventually reports the outcome.
//!
//! ```text
//!  caller:  (waiter, resolver) = rendezvous()
//!           hand resolver to the handler ─┐
//!           send command                  │
//!           waiter.wait(timeout, cancel)  │      lane: resolver.resolve(v)
//!                  ▲──────────────────────┴────────────────┘
//! ```
//!
//! Exactly one side wins. A value resolved after the waiter gave up is
//! reported back to the resolver as [`ResolveError::Abandoned`] so the
//! handler can log it instead of writing into stale state.

use core::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Poll interval used while watching a [`CancelToken`].
const CANCEL_POLL: Duration = Duration::from_millis(25);

// ───────────────────────────────────────────────────────────────
// Cancellation
// ───────────────────────────────────────────────────────────────

/// Cooperative cancellation flag shared between a waiter and whoever
/// wants to abort it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// ───────────────────────────────────────────────────────────────
// Errors
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitError {
    Timeout,
    Cancelled,
}

impl fmt::Display for WaitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timed out waiting for result"),
            Self::Cancelled => write!(f, "wait cancelled"),
        }
    }
}

impl std::error::Error for WaitError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveError {
    /// Already resolved once; the second value was discarded.
    AlreadyResolved,
    /// The waiter timed out, was cancelled, or was dropped.
    Abandoned,
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyResolved => write!(f, "rendezvous already resolved"),
            Self::Abandoned => write!(f, "waiter no longer listening"),
        }
    }
}

impl std::error::Error for ResolveError {}

// ───────────────────────────────────────────────────────────────
// Shared slot
// ───────────────────────────────────────────────────────────────

enum Slot<T> {
    Pending,
    Resolved(T),
    Taken,
    Abandoned,
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    ready: Condvar,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Create a connected waiter/resolver pair.
pub fn rendezvous<T>() -> (Rendezvous<T>, Resolver<T>) {
    let shared = Arc::new(Shared {
        slot: Mutex::new(Slot::Pending),
        ready: Condvar::new(),
    });
    (
        Rendezvous {
            shared: shared.clone(),
        },
        Resolver { shared },
    )
}

/// Waiting half. Consumed by [`Rendezvous::wait`].
pub struct Rendezvous<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Rendezvous<T> {
    /// Block until resolved, `timeout` elapses, or `cancel` fires. A
    /// timeout too large to represent as an instant never expires.
    pub fn wait(self, timeout: Duration, cancel: Option<&CancelToken>) -> Result<T, WaitError> {
        let deadline = Instant::now().checked_add(timeout);
        let mut slot = self.shared.lock();
        loop {
            if matches!(*slot, Slot::Resolved(_)) {
                if let Slot::Resolved(value) = std::mem::replace(&mut *slot, Slot::Taken) {
                    return Ok(value);
                }
            }
            if cancel.is_some_and(CancelToken::is_cancelled) {
                *slot = Slot::Abandoned;
                return Err(WaitError::Cancelled);
            }
            let remaining = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        *slot = Slot::Abandoned;
                        return Err(WaitError::Timeout);
                    }
                    Some(deadline - now)
                }
                None => None,
            };
            let step = match (remaining, cancel.is_some()) {
                (Some(r), true) => Some(r.min(CANCEL_POLL)),
                (None, true) => Some(CANCEL_POLL),
                (r, false) => r,
            };
            slot = match step {
                Some(step) => {
                    self.shared
                        .ready
                        .wait_timeout(slot, step)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => self
                    .shared
                    .ready
                    .wait(slot)
                    .unwrap_or_else(PoisonError::into_inner),
            };
        }
    }
}

impl<T> Drop for Rendezvous<T> {
    fn drop(&mut self) {
        let mut slot = self.shared.lock();
        if matches!(*slot, Slot::Pending) {
            *slot = Slot::Abandoned;
        }
    }
}

/// Resolving half. Can be cloned; only the first `resolve` wins.
pub struct Resolver<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Resolver<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> Resolver<T> {
    pub fn resolve(&self, value: T) -> Result<(), ResolveError> {
        let mut slot = self.shared.lock();
        if matches!(*slot, Slot::Abandoned) {
            return Err(ResolveError::Abandoned);
        }
        if !matches!(*slot, Slot::Pending) {
            return Err(ResolveError::AlreadyResolved);
        }
        *slot = Slot::Resolved(value);
        self.shared.ready.notify_all();
        Ok(())
    }

    /// Whether the waiter is still listening.
    pub fn is_pending(&self) -> bool {
        matches!(*self.shared.lock(), Slot::Pending)
    }
}
