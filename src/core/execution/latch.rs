use log::warn;
use parking_lot::{Condvar, Mutex};
use std::time::Duration;

/// Countdown completion signal shared between a dispatcher and its tasks
///
/// The dispatcher increments once per submitted task, each task counts down
/// exactly once when it finishes, and the dispatcher blocks in `wait` until
/// the count reaches zero.
pub struct CompletionLatch {
    count: Mutex<usize>,
    released: Condvar,
}

impl CompletionLatch {
    pub fn new(count: usize) -> Self {
        Self {
            count: Mutex::new(count),
            released: Condvar::new(),
        }
    }

    /// Register one more pending task
    pub fn increment(&self) {
        *self.count.lock() += 1;
    }

    /// Mark one task as finished
    pub fn count_down(&self) {
        let mut count = self.count.lock();
        if *count > 0 {
            *count -= 1;
        }
        if *count == 0 {
            self.released.notify_all();
        }
    }

    pub fn count(&self) -> usize {
        *self.count.lock()
    }

    /// Block until every pending task has counted down
    pub fn wait(&self) {
        let mut count = self.count.lock();
        while *count > 0 {
            self.released.wait(&mut count);
        }
    }

    /// Like `wait`, but log a warning every time `timeout` elapses
    ///
    /// The wait itself is unbounded; the warning only helps spot deadlocked
    /// tasks.
    pub fn wait_with_diagnostic(&self, timeout: Duration, label: &str) {
        let mut count = self.count.lock();
        while *count > 0 {
            if self.released.wait_for(&mut count, timeout).timed_out() && *count > 0 {
                warn!(
                    "{}: still waiting on {} task(s) after {:?}",
                    label, *count, timeout
                );
            }
        }
    }
}

impl Default for CompletionLatch {
    fn default() -> Self {
        Self::new(0)
    }
}
