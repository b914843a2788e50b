//! Expiry timer binding.
//!
//! The cache registers one single-fire timer per entry and cancels it when
//! the entry is destroyed. Timers are registered and cancelled while the
//! endpoint lock is held, so an implementation must never invoke a callback
//! while holding its own internal lock.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::trace;

use crate::error::{Error, Result};

/// Registration of one scheduled callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Callback run once when a timer fires.
pub type ExpiryCallback = Box<dyn FnOnce() + Send + 'static>;

/// Scheduler capability consumed by the cache.
///
/// Timers are monotonic and fire at most once. `cancel` must be idempotent
/// and a cancelled timer must not run its callback afterwards.
pub trait ExpiryScheduler: Send + Sync {
    /// Run `callback` once after `delay`.
    fn schedule(&self, delay: Duration, callback: ExpiryCallback) -> TimerHandle;

    /// Cancel a pending timer. Unknown or already fired handles are ignored.
    fn cancel(&self, handle: TimerHandle);
}

impl<T: ExpiryScheduler + ?Sized> ExpiryScheduler for Arc<T> {
    fn schedule(&self, delay: Duration, callback: ExpiryCallback) -> TimerHandle {
        (**self).schedule(delay, callback)
    }

    fn cancel(&self, handle: TimerHandle) {
        (**self).cancel(handle)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tokio
// ─────────────────────────────────────────────────────────────────────────────

/// Timers backed by tasks on a tokio runtime.
///
/// Each timer is a task that sleeps for the delay and then claims its own
/// registration. Whoever removes the registration first wins: the task runs
/// the callback, `cancel` aborts the task.
#[derive(Debug)]
pub struct TokioScheduler {
    handle: Handle,
    next_id: AtomicU64,
    timers: Arc<Mutex<HashMap<TimerHandle, AbortHandle>>>,
}

impl TokioScheduler {
    /// Drive timers on the given runtime.
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            next_id: AtomicU64::new(1),
            timers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Drive timers on the runtime the caller is running in.
    pub fn try_current() -> Result<Self> {
        let handle = Handle::try_current().map_err(|e| Error::Runtime(e.to_string()))?;
        Ok(Self::new(handle))
    }

    /// Number of timers that have neither fired nor been cancelled.
    pub fn pending(&self) -> usize {
        self.timers.lock().len()
    }
}

impl ExpiryScheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, callback: ExpiryCallback) -> TimerHandle {
        let id = TimerHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        let timers = Arc::clone(&self.timers);

        // Held across spawn so the task cannot claim `id` before it is registered.
        let mut guard = self.timers.lock();
        let task = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            let claimed = timers.lock().remove(&id).is_some();
            if claimed {
                trace!(timer = id.0, "Expiry timer fired");
                callback();
            }
        });
        guard.insert(id, task.abort_handle());

        id
    }

    fn cancel(&self, handle: TimerHandle) {
        if let Some(task) = self.timers.lock().remove(&handle) {
            task.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, task) in self.timers.lock().drain() {
            task.abort();
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Manual clock
// ─────────────────────────────────────────────────────────────────────────────

struct PendingTimer {
    deadline: Duration,
    callback: ExpiryCallback,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    next_id: u64,
    timers: BTreeMap<TimerHandle, PendingTimer>,
    cancelled: usize,
}

/// Scheduler with an explicitly advanced clock.
///
/// Nothing fires until [`ManualScheduler::advance`] moves the clock past a
/// deadline. Useful for deterministic tests and for embedders that drive
/// expiry from their own event loop.
#[derive(Default)]
pub struct ManualScheduler {
    state: Mutex<ManualState>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time elapsed on the manual clock.
    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    /// Number of timers still waiting to fire.
    pub fn pending(&self) -> usize {
        self.state.lock().timers.len()
    }

    /// Number of successful cancellations so far.
    pub fn cancelled(&self) -> usize {
        self.state.lock().cancelled
    }

    /// Absolute deadline of a pending timer.
    pub fn deadline(&self, handle: TimerHandle) -> Option<Duration> {
        self.state.lock().timers.get(&handle).map(|t| t.deadline)
    }

    /// Handles of all pending timers, oldest registration first.
    pub fn handles(&self) -> Vec<TimerHandle> {
        self.state.lock().timers.keys().copied().collect()
    }

    /// Advance the clock and run every callback whose deadline has passed,
    /// in deadline order. Returns the number of callbacks run.
    pub fn advance(&self, by: Duration) -> usize {
        let due = {
            let mut state = self.state.lock();
            state.now += by;
            let now = state.now;
            let ids: Vec<TimerHandle> = state
                .timers
                .iter()
                .filter(|(_, t)| t.deadline <= now)
                .map(|(id, _)| *id)
                .collect();
            let mut due: Vec<PendingTimer> = ids
                .into_iter()
                .filter_map(|id| state.timers.remove(&id))
                .collect();
            due.sort_by_key(|t| t.deadline);
            due
        };

        let count = due.len();
        for timer in due {
            (timer.callback)();
        }
        count
    }

    /// Remove a pending timer and hand back its callback without running it,
    /// as if the timer fired but its callback has not been dispatched yet.
    pub fn take(&self, handle: TimerHandle) -> Option<ExpiryCallback> {
        self.state
            .lock()
            .timers
            .remove(&handle)
            .map(|t| t.callback)
    }
}

impl ExpiryScheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, callback: ExpiryCallback) -> TimerHandle {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = TimerHandle(state.next_id);
        let deadline = state.now + delay;
        state.timers.insert(id, PendingTimer { deadline, callback });
        id
    }

    fn cancel(&self, handle: TimerHandle) {
        let mut state = self.state.lock();
        if state.timers.remove(&handle).is_some() {
            state.cancelled += 1;
        }
    }
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ManualScheduler")
            .field("now", &state.now)
            .field("pending", &state.timers.len())
            .finish()
    }
}
