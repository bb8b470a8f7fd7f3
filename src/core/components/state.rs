use std::sync::atomic::{AtomicBool, Ordering};

/// Lifecycle flags shared by every workspace component
///
/// Flags are atomics so they can be flipped from update threads while the
/// front end polls them.
#[derive(Debug)]
pub struct ComponentState {
    changed_since_last_save: AtomicBool,
    running: AtomicBool,
    update_on: AtomicBool,
}

impl ComponentState {
    pub fn new() -> Self {
        Self {
            changed_since_last_save: AtomicBool::new(false),
            running: AtomicBool::new(false),
            update_on: AtomicBool::new(true),
        }
    }

    pub fn has_changed_since_last_save(&self) -> bool {
        self.changed_since_last_save.load(Ordering::Acquire)
    }

    pub fn set_changed_since_last_save(&self, changed: bool) {
        self.changed_since_last_save.store(changed, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }

    /// Whether the updater should call this component at all
    pub fn is_update_on(&self) -> bool {
        self.update_on.load(Ordering::Acquire)
    }

    pub fn set_update_on(&self, update_on: bool) {
        self.update_on.store(update_on, Ordering::Release);
    }
}

impl Default for ComponentState {
    fn default() -> Self {
        Self::new()
    }
}
