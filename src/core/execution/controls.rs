use crate::core::components::{ComponentRegistry, UpdatePart, WorkspaceComponent};
use crate::core::couplings::{CouplingManager, CouplingUpdateReport};
use crate::core::errors::{panic_message, ComponentError, UpdateError, WorkspaceError};
use crate::core::execution::config::{ConcurrencyMode, UpdaterConfig};
use crate::core::execution::latch::CompletionLatch;
use crate::core::execution::listener::UpdaterListener;
use crate::core::execution::report::{ComponentUpdateReport, IterationReport};
use crate::core::types::ComponentId;
use log::{info, warn};
use parking_lot::{Mutex, RwLock};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// What an update action may ask the updater to do
///
/// Every call blocks until the requested work is complete. Failures are
/// returned in the reports and also recorded against the running iteration.
pub trait UpdateControls: Send + Sync {
    /// Buffered propagation of every coupling
    fn update_couplings(&self) -> CouplingUpdateReport;

    /// Buffered propagation of the couplings feeding one component
    fn update_incoming_couplings(&self, component: &ComponentId) -> CouplingUpdateReport;

    /// Buffered propagation of the couplings fed by one component
    fn update_outgoing_couplings(&self, component: &ComponentId) -> CouplingUpdateReport;

    /// Update every component once
    fn update_all_components(&self) -> ComponentUpdateReport;

    /// Update a set of components together
    fn update_components(&self, components: &[ComponentId]) -> Result<ComponentUpdateReport, UpdateError>;

    /// Update a single component
    fn update_component(&self, component: &ComponentId) -> Result<ComponentUpdateReport, UpdateError>;

    /// Ids of the live components in insertion order
    fn component_ids(&self) -> Vec<ComponentId>;

    /// Component-level data-flow edges derived from the couplings
    fn component_dependencies(&self) -> Vec<(ComponentId, ComponentId)>;

    /// Completed iteration count
    fn time(&self) -> u64;

    /// Ask a continuous run to stop at the next iteration boundary
    fn request_stop(&self);
}

/// Shared state behind the workspace updater
///
/// Held in an `Arc` so the continuous run thread and synchronous callers see
/// the same pool, listeners and clock.
pub struct UpdateContext {
    registry: Arc<ComponentRegistry>,
    couplings: Arc<CouplingManager>,
    config: RwLock<UpdaterConfig>,
    pool: RwLock<Arc<ThreadPool>>,
    pool_size: RwLock<usize>,
    requested_threads: Mutex<Option<usize>>,
    listeners: RwLock<Vec<Arc<dyn UpdaterListener>>>,
    time: AtomicU64,
    stop_requested: AtomicBool,
    current: Mutex<IterationReport>,
}

impl UpdateContext {
    pub fn new(
        registry: Arc<ComponentRegistry>,
        couplings: Arc<CouplingManager>,
        config: UpdaterConfig,
    ) -> Result<Self, WorkspaceError> {
        let threads = config.effective_threads();
        let pool = Self::build_pool(threads)?;
        Ok(Self {
            registry,
            couplings,
            config: RwLock::new(config),
            pool: RwLock::new(Arc::new(pool)),
            pool_size: RwLock::new(threads),
            requested_threads: Mutex::new(None),
            listeners: RwLock::new(Vec::new()),
            time: AtomicU64::new(0),
            stop_requested: AtomicBool::new(false),
            current: Mutex::new(IterationReport::default()),
        })
    }

    fn build_pool(threads: usize) -> Result<ThreadPool, WorkspaceError> {
        ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("component-update-{}", index + 1))
            .build()
            .map_err(|e| WorkspaceError::ThreadPool(e.to_string()))
    }

    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    pub fn coupling_manager(&self) -> &Arc<CouplingManager> {
        &self.couplings
    }

    pub fn config(&self) -> UpdaterConfig {
        self.config.read().clone()
    }

    pub fn set_concurrency_mode(&self, mode: ConcurrencyMode) {
        self.config.write().concurrency_mode = mode;
    }

    pub fn num_threads(&self) -> usize {
        *self.pool_size.read()
    }

    /// Record a thread count change to apply at the next iteration boundary
    pub fn request_thread_count(&self, threads: usize) {
        let threads = threads.max(1);
        self.config.write().thread_pool_size = Some(threads);
        *self.requested_threads.lock() = Some(threads);
    }

    /// Replace the whole configuration; the pool follows at the next boundary
    pub fn apply_config(&self, config: UpdaterConfig) {
        let threads = config.effective_threads();
        *self.config.write() = config;
        *self.requested_threads.lock() = Some(threads);
    }

    /// Rebuild the pool if a new thread count was requested
    pub(crate) fn apply_pending_thread_count(&self) -> Result<(), WorkspaceError> {
        let requested = match self.requested_threads.lock().take() {
            Some(threads) => threads,
            None => return Ok(()),
        };
        if requested == *self.pool_size.read() {
            return Ok(());
        }

        let pool = Self::build_pool(requested)?;
        *self.pool.write() = Arc::new(pool);
        *self.pool_size.write() = requested;
        info!("Component update pool resized to {} threads", requested);
        for listener in self.listeners() {
            listener.thread_count_changed(requested);
        }
        Ok(())
    }

    pub fn add_listener(&self, listener: Arc<dyn UpdaterListener>) {
        self.listeners.write().push(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn UpdaterListener>) {
        self.listeners
            .write()
            .retain(|existing| !Arc::ptr_eq(existing, listener));
    }

    pub(crate) fn listeners(&self) -> Vec<Arc<dyn UpdaterListener>> {
        self.listeners.read().clone()
    }

    pub(crate) fn advance_time(&self) -> u64 {
        self.time.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn reset_time(&self) {
        self.time.store(0, Ordering::SeqCst);
    }

    pub(crate) fn take_stop_request(&self) -> bool {
        self.stop_requested.swap(false, Ordering::SeqCst)
    }

    /// Start collecting failures for a new iteration
    pub(crate) fn begin_iteration(&self, time: u64) {
        *self.current.lock() = IterationReport {
            time,
            ..IterationReport::default()
        };
    }

    /// Hand back everything recorded since `begin_iteration`
    pub(crate) fn finish_iteration(&self) -> IterationReport {
        std::mem::take(&mut *self.current.lock())
    }

    pub(crate) fn record_action_failure(&self, error: UpdateError) {
        self.current.lock().action_failures.push(error);
    }

    pub(crate) fn record_action_invoked(&self) {
        self.current.lock().actions_invoked += 1;
    }

    fn record_couplings(&self, report: &CouplingUpdateReport) {
        self.current.lock().record_couplings(report.clone());
        let time = self.time();
        for listener in self.listeners() {
            listener.couplings_updated(time);
        }
    }

    fn record_components(&self, report: &ComponentUpdateReport) {
        self.current.lock().record_components(report.clone());
    }

    fn resolve(&self, ids: &[ComponentId]) -> Result<Vec<Arc<dyn WorkspaceComponent>>, UpdateError> {
        ids.iter()
            .map(|id| {
                self.registry
                    .get_by_id(id)
                    .ok_or_else(|| UpdateError::ComponentNotFound(id.clone()))
            })
            .collect()
    }

    /// Update the given components according to the configured concurrency mode
    pub fn run_component_updates(&self, components: &[Arc<dyn WorkspaceComponent>]) -> ComponentUpdateReport {
        let mode = self.config.read().concurrency_mode;
        let report = match mode {
            ConcurrencyMode::Sequential => self.update_sequential(components),
            ConcurrencyMode::Parallel => self.update_parallel(components),
        };
        self.record_components(&report);
        report
    }

    fn update_sequential(&self, components: &[Arc<dyn WorkspaceComponent>]) -> ComponentUpdateReport {
        let time = self.time();
        let listeners = self.listeners();
        let mut report = ComponentUpdateReport::default();

        for component in components {
            if !component.is_update_on() {
                report.skipped += 1;
                continue;
            }
            report.updated += 1;
            for part in parts_of(component) {
                if let Err(error) = run_part(component, &part, &listeners, time, 0) {
                    report.failures.push(error);
                }
            }
            report.halt_requested |= component.halt_requested();
        }
        report
    }

    /// Fan every part out to the pool and block on a latch until all are done
    fn update_parallel(&self, components: &[Arc<dyn WorkspaceComponent>]) -> ComponentUpdateReport {
        let pool = Arc::clone(&*self.pool.read());
        let time = self.time();
        let listeners = Arc::new(self.listeners());
        let latch = Arc::new(CompletionLatch::new(0));
        let failures: Arc<Mutex<Vec<ComponentError>>> = Arc::new(Mutex::new(Vec::new()));
        let mut report = ComponentUpdateReport::default();

        for component in components {
            if !component.is_update_on() {
                report.skipped += 1;
                continue;
            }
            report.updated += 1;
            for part in parts_of(component) {
                latch.increment();
                let latch = Arc::clone(&latch);
                let failures = Arc::clone(&failures);
                let listeners = Arc::clone(&listeners);
                let component = Arc::clone(component);
                pool.spawn(move || {
                    let thread = rayon::current_thread_index().map_or(0, |index| index + 1);
                    if let Err(error) = run_part(&component, &part, &listeners, time, thread) {
                        failures.lock().push(error);
                    }
                    latch.count_down();
                });
            }
        }

        match self.config.read().latch_diagnostic_timeout {
            Some(timeout) => latch.wait_with_diagnostic(timeout, "component update"),
            None => latch.wait(),
        }

        report.failures = std::mem::take(&mut *failures.lock());
        report.halt_requested = components
            .iter()
            .any(|component| component.is_update_on() && component.halt_requested());
        report
    }
}

/// The parts to schedule for a component; a single whole-update part if it
/// declares none
fn parts_of(component: &Arc<dyn WorkspaceComponent>) -> Vec<UpdatePart> {
    let parts = component.update_parts();
    if !parts.is_empty() {
        return parts;
    }
    let whole = Arc::clone(component);
    vec![UpdatePart::new("update", move || whole.update())]
}

/// Run one part with listener notifications, turning panics into failures
fn run_part(
    component: &Arc<dyn WorkspaceComponent>,
    part: &UpdatePart,
    listeners: &[Arc<dyn UpdaterListener>],
    time: u64,
    thread: usize,
) -> Result<(), ComponentError> {
    let id = component.id();
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        for listener in listeners {
            listener.component_update_started(id, time, thread);
        }
        let result = part.run();
        for listener in listeners {
            listener.component_update_finished(id, time, thread);
        }
        result
    }));

    let result = match outcome {
        Ok(result) => result,
        Err(payload) => Err(ComponentError::Panicked {
            component: id.clone(),
            message: panic_message(payload.as_ref()),
        }),
    };
    if let Err(error) = &result {
        warn!("{} (part '{}')", error, part.description());
    }
    result
}

impl UpdateControls for UpdateContext {
    fn update_couplings(&self) -> CouplingUpdateReport {
        let report = self.couplings.update_all_couplings();
        self.record_couplings(&report);
        report
    }

    fn update_incoming_couplings(&self, component: &ComponentId) -> CouplingUpdateReport {
        let report = self.couplings.update_incoming_couplings(component);
        self.record_couplings(&report);
        report
    }

    fn update_outgoing_couplings(&self, component: &ComponentId) -> CouplingUpdateReport {
        let report = self.couplings.update_outgoing_couplings(component);
        self.record_couplings(&report);
        report
    }

    fn update_all_components(&self) -> ComponentUpdateReport {
        let components = self.registry.components();
        self.run_component_updates(&components)
    }

    fn update_components(&self, components: &[ComponentId]) -> Result<ComponentUpdateReport, UpdateError> {
        let resolved = self.resolve(components)?;
        Ok(self.run_component_updates(&resolved))
    }

    fn update_component(&self, component: &ComponentId) -> Result<ComponentUpdateReport, UpdateError> {
        self.update_components(std::slice::from_ref(component))
    }

    fn component_ids(&self) -> Vec<ComponentId> {
        self.registry.component_ids()
    }

    fn component_dependencies(&self) -> Vec<(ComponentId, ComponentId)> {
        self.couplings.component_dependencies()
    }

    fn time(&self) -> u64 {
        self.time.load(Ordering::SeqCst)
    }

    fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }
}
