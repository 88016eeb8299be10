//! Blocking primitives for the producer/consumer simulation.
//!
//! [`Semaphore`] is a counting semaphore built on `Mutex` + `Condvar` that
//! can be closed to wake every waiter with [`Cancelled`]. [`Shutdown`] is
//! the shared cancellation token that interrupts simulated delays.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// A blocking wait was interrupted by a shutdown request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("wait cancelled by shutdown")
    }
}

impl std::error::Error for Cancelled {}

/// Failure of a bounded-wait buffer operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    /// Shutdown was requested while waiting.
    Cancelled,
    /// The deadline passed before a slot or item became available.
    Timeout,
}

impl fmt::Display for BufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferError::Cancelled => fmt::Display::fmt(&Cancelled, f),
            BufferError::Timeout => f.write_str("timed out waiting on buffer"),
        }
    }
}

impl std::error::Error for BufferError {}

impl From<Cancelled> for BufferError {
    fn from(_: Cancelled) -> Self {
        BufferError::Cancelled
    }
}

/// Lock a mutex, recovering the guard if a panicking thread poisoned it.
///
/// Every critical section in this crate leaves its data consistent before
/// any point that can panic, so the inner value is always usable.
pub(crate) fn lock<T>(mu: &Mutex<T>) -> MutexGuard<'_, T> {
    mu.lock().unwrap_or_else(PoisonError::into_inner)
}

struct SemState {
    permits: usize,
    /// Every wait fails, even if permits are available.
    closed: bool,
    /// Waits that would block fail; available permits are still handed out.
    no_wait: bool,
}

/// Counting semaphore with close-to-cancel semantics.
pub struct Semaphore {
    mu: Mutex<SemState>,
    cv: Condvar,
}

impl Semaphore {
    pub fn new(permits: usize) -> Self {
        Semaphore {
            mu: Mutex::new(SemState {
                permits,
                closed: false,
                no_wait: false,
            }),
            cv: Condvar::new(),
        }
    }

    /// Block until a permit is available and take it.
    ///
    /// Returns `Err(Cancelled)` without taking a permit once the semaphore
    /// is closed.
    pub fn acquire(&self) -> Result<(), Cancelled> {
        let mut state = lock(&self.mu);
        loop {
            if state.closed {
                return Err(Cancelled);
            }
            if state.permits > 0 {
                state.permits -= 1;
                return Ok(());
            }
            if state.no_wait {
                return Err(Cancelled);
            }
            state = self.cv.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Like [`acquire`](Self::acquire) but gives up after `timeout`.
    pub fn acquire_timeout(&self, timeout: Duration) -> Result<(), BufferError> {
        let deadline = Instant::now() + timeout;
        let mut state = lock(&self.mu);
        loop {
            if state.closed {
                return Err(BufferError::Cancelled);
            }
            if state.permits > 0 {
                state.permits -= 1;
                return Ok(());
            }
            if state.no_wait {
                return Err(BufferError::Cancelled);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(BufferError::Timeout);
            }
            state = self
                .cv
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Take a permit if one is immediately available.
    pub fn try_acquire(&self) -> Result<bool, Cancelled> {
        let mut state = lock(&self.mu);
        if state.closed {
            return Err(Cancelled);
        }
        if state.permits > 0 {
            state.permits -= 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Return a permit and wake one waiter.
    pub fn release(&self) {
        lock(&self.mu).permits += 1;
        self.cv.notify_one();
    }

    /// Fail all current and future waits with `Cancelled`.
    pub fn close(&self) {
        lock(&self.mu).closed = true;
        self.cv.notify_all();
    }

    /// Fail waits that would block from now on, waking current waiters.
    ///
    /// Used once nobody is left to release permits.
    pub fn stop_waiting(&self) {
        lock(&self.mu).no_wait = true;
        self.cv.notify_all();
    }

    #[cfg(test)]
    pub(crate) fn is_closed(&self) -> bool {
        lock(&self.mu).closed
    }

    /// Permits currently available.
    #[cfg(test)]
    fn available(&self) -> usize {
        lock(&self.mu).permits
    }
}

/// Cloneable shutdown token.
///
/// Cloning shares the same flag. Once requested it stays requested.
#[derive(Clone, Default)]
pub struct Shutdown {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        let (mu, cv) = &*self.inner;
        *lock(mu) = true;
        cv.notify_all();
    }

    pub fn is_requested(&self) -> bool {
        *lock(&self.inner.0)
    }

    /// Sleep for `dur` unless shutdown is requested first.
    pub fn sleep(&self, dur: Duration) -> Result<(), Cancelled> {
        let (mu, cv) = &*self.inner;
        let guard = lock(mu);
        let (guard, _) = cv
            .wait_timeout_while(guard, dur, |requested| !*requested)
            .unwrap_or_else(PoisonError::into_inner);
        if *guard {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

impl fmt::Debug for Shutdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shutdown")
            .field("requested", &self.is_requested())
            .finish()
    }
}
