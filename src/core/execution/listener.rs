use crate::core::types::ComponentId;

/// Observer trait for updater events
///
/// All methods default to doing nothing so listeners only implement what they
/// need. Component notifications arrive on worker threads.
pub trait UpdaterListener: Send + Sync {
    /// A run (or a batch of iterations) started
    fn updating_started(&self) {}

    /// A run (or a batch of iterations) finished
    fn updating_finished(&self) {}

    /// One iteration finished; `time` is the iteration count
    fn workspace_updated(&self, _time: u64) {}

    /// Couplings were propagated during iteration `time`
    fn couplings_updated(&self, _time: u64) {}

    /// A component part started on worker `thread`
    fn component_update_started(&self, _component: &ComponentId, _time: u64, _thread: usize) {}

    /// A component part finished on worker `thread`
    fn component_update_finished(&self, _component: &ComponentId, _time: u64, _thread: usize) {}

    /// The component update pool was rebuilt
    fn thread_count_changed(&self, _threads: usize) {}
}
