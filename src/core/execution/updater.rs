use crate::core::components::{ComponentRegistry, WorkspaceComponent};
use crate::core::couplings::CouplingManager;
use crate::core::errors::{panic_message, UpdateError, WorkspaceError};
use crate::core::execution::action_manager::UpdateActionManager;
use crate::core::execution::config::{ConcurrencyMode, UpdaterConfig};
use crate::core::execution::controls::{UpdateContext, UpdateControls};
use crate::core::execution::listener::UpdaterListener;
use crate::core::execution::report::IterationReport;
use log::{error, info, trace, warn};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Drives workspace iterations
///
/// An iteration runs every action of the action manager in order. Iterations
/// never overlap: synchronous `iterate` calls are serialized with each other
/// and refused while a continuous run is active.
pub struct WorkspaceUpdater {
    context: Arc<UpdateContext>,
    actions: Arc<UpdateActionManager>,
    iteration_lock: Arc<Mutex<()>>,
    running: Arc<AtomicBool>,
    run_handle: Mutex<Option<JoinHandle<u64>>>,
}

impl WorkspaceUpdater {
    pub fn new(
        registry: Arc<ComponentRegistry>,
        couplings: Arc<CouplingManager>,
        config: UpdaterConfig,
    ) -> Result<Self, WorkspaceError> {
        let context = UpdateContext::new(registry, couplings, config)?;
        Ok(Self {
            context: Arc::new(context),
            actions: Arc::new(UpdateActionManager::new()),
            iteration_lock: Arc::new(Mutex::new(())),
            running: Arc::new(AtomicBool::new(false)),
            run_handle: Mutex::new(None),
        })
    }

    pub fn action_manager(&self) -> &UpdateActionManager {
        &self.actions
    }

    /// Direct access to the update primitives, outside any iteration
    pub fn controls(&self) -> &dyn UpdateControls {
        self.context.as_ref()
    }

    pub fn config(&self) -> UpdaterConfig {
        self.context.config()
    }

    pub fn apply_config(&self, config: UpdaterConfig) {
        self.context.apply_config(config);
    }

    pub fn set_concurrency_mode(&self, mode: ConcurrencyMode) {
        self.context.set_concurrency_mode(mode);
    }

    /// Completed iteration count
    pub fn time(&self) -> u64 {
        self.context.time()
    }

    pub fn reset_time(&self) {
        self.context.reset_time();
    }

    /// Resize the component update pool at the next iteration boundary
    pub fn set_num_threads(&self, threads: usize) {
        self.context.request_thread_count(threads);
    }

    /// Threads in the pool currently in use
    pub fn num_threads(&self) -> usize {
        self.context.num_threads()
    }

    pub fn add_listener(&self, listener: Arc<dyn UpdaterListener>) {
        self.context.add_listener(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn UpdaterListener>) {
        self.context.remove_listener(listener);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run exactly one iteration on the calling thread
    pub fn iterate(&self) -> Result<IterationReport, WorkspaceError> {
        if self.is_running() {
            return Err(WorkspaceError::AlreadyRunning);
        }
        let _guard = self.iteration_lock.lock();
        notify_started(&self.context);
        let result = run_iteration(&self.context, &self.actions);
        notify_finished(&self.context);
        result
    }

    /// Run up to `count` iterations, stopping early if a component asks to halt
    pub fn iterate_n(&self, count: usize) -> Result<Vec<IterationReport>, WorkspaceError> {
        if self.is_running() {
            return Err(WorkspaceError::AlreadyRunning);
        }
        let _guard = self.iteration_lock.lock();
        notify_started(&self.context);

        let mut reports = Vec::with_capacity(count);
        let mut outcome = Ok(());
        for _ in 0..count {
            match run_iteration(&self.context, &self.actions) {
                Ok(report) => {
                    let halt = report.halt_requested;
                    reports.push(report);
                    if halt {
                        info!("Component requested a halt after iteration {}", self.time());
                        break;
                    }
                }
                Err(error) => {
                    outcome = Err(error);
                    break;
                }
            }
        }

        notify_finished(&self.context);
        outcome.map(|()| reports)
    }

    /// Start iterating continuously on a dedicated thread
    ///
    /// The loop ends at an iteration boundary after `stop`, after an action
    /// calls `request_stop`, or after a component asks to halt.
    pub fn run(&self) -> Result<(), WorkspaceError> {
        if self.is_running() {
            return Err(WorkspaceError::AlreadyRunning);
        }
        // A stopped run may still be finishing its last iteration
        if let Some(previous) = self.run_handle.lock().take() {
            if previous.join().is_err() {
                error!("Previous workspace run thread panicked");
            }
        }
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(WorkspaceError::AlreadyRunning);
        }
        self.context.take_stop_request();

        let context = Arc::clone(&self.context);
        let actions = Arc::clone(&self.actions);
        let running = Arc::clone(&self.running);
        let iteration_lock = Arc::clone(&self.iteration_lock);

        let spawned = thread::Builder::new()
            .name("workspace-updater".to_string())
            .spawn(move || {
                let _reset = RunningReset(Arc::clone(&running));
                info!("Workspace run started");
                notify_started(&context);
                let mut iterations = 0;

                while running.load(Ordering::SeqCst) {
                    if context.take_stop_request() {
                        break;
                    }
                    let _guard = iteration_lock.lock();
                    // Also picks up components added since the last iteration
                    set_components_running(&context, true);
                    match run_iteration(&context, &actions) {
                        Ok(report) => {
                            iterations += 1;
                            if report.halt_requested {
                                info!("Component requested a halt at iteration {}", report.time);
                                break;
                            }
                        }
                        Err(e) => {
                            error!("Workspace run aborted: {}", e);
                            break;
                        }
                    }
                }

                set_components_running(&context, false);
                running.store(false, Ordering::SeqCst);
                notify_finished(&context);
                info!("Workspace run stopped after {} iterations", iterations);
                iterations
            });

        match spawned {
            Ok(handle) => {
                *self.run_handle.lock() = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                Err(WorkspaceError::Spawn(e.to_string()))
            }
        }
    }

    /// Ask a continuous run to stop at the next iteration boundary
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Wait for the run thread to exit; returns the iterations it ran
    pub fn join(&self) -> Result<u64, WorkspaceError> {
        let handle = self.run_handle.lock().take();
        match handle {
            Some(handle) => handle.join().map_err(|_| WorkspaceError::UpdaterPanicked),
            None => Ok(0),
        }
    }
}

impl Drop for WorkspaceUpdater {
    fn drop(&mut self) {
        self.stop();
        if let Some(handle) = self.run_handle.get_mut().take() {
            let _ = handle.join();
        }
    }
}

/// Clears the running flag even if the run thread unwinds
struct RunningReset(Arc<AtomicBool>);

impl Drop for RunningReset {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn set_components_running(context: &UpdateContext, running: bool) {
    let components: Vec<Arc<dyn WorkspaceComponent>> = context.registry().components();
    for component in components {
        component.state().set_running(running);
    }
}

fn notify_started(context: &UpdateContext) {
    for listener in context.listeners() {
        listener.updating_started();
    }
}

fn notify_finished(context: &UpdateContext) {
    for listener in context.listeners() {
        listener.updating_finished();
    }
}

/// One iteration: apply pending pool changes, run every action, advance time
fn run_iteration(
    context: &Arc<UpdateContext>,
    actions: &UpdateActionManager,
) -> Result<IterationReport, WorkspaceError> {
    context.apply_pending_thread_count()?;

    let delay = context.config().update_delay;
    if !delay.is_zero() {
        thread::sleep(delay);
    }

    context.begin_iteration(context.time() + 1);
    for action in actions.actions() {
        context.record_action_invoked();
        let outcome = catch_unwind(AssertUnwindSafe(|| action.invoke(context.as_ref())));
        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(error)) => Some(error),
            Err(payload) => Some(UpdateError::Panicked {
                action: action.description(),
                message: panic_message(payload.as_ref()),
            }),
        };
        if let Some(error) = failure {
            warn!("Update action '{}': {}", action.description(), error);
            context.record_action_failure(error);
        }
    }

    let time = context.advance_time();
    let mut report = context.finish_iteration();
    report.time = time;

    for listener in context.listeners() {
        listener.workspace_updated(time);
    }
    trace!("Iteration {} finished ({} actions)", time, report.actions_invoked);
    Ok(report)
}
