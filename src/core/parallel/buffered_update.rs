use crate::core::errors::{panic_message, ElementError, UpdateError, WorkspaceError};
use crate::core::execution::actions::UpdateAction;
use crate::core::execution::config::available_threads;
use crate::core::execution::controls::UpdateControls;
use crate::core::parallel::element::{BufferedElement, ElementId};
use crate::core::parallel::task_list::{chunk_size, TaskList, WorkItem, BASE_CHUNK_SIZE};
use log::{debug, info, trace, warn};
use parking_lot::{Condvar, Mutex, RwLock};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

/// Configuration for the parallel buffered update engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferedUpdateConfig {
    /// Worker threads computing blocks
    pub workers: usize,
    /// Elements per block before scaling
    pub base_chunk_size: usize,
}

impl BufferedUpdateConfig {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            base_chunk_size: BASE_CHUNK_SIZE,
        }
    }

    pub fn with_base_chunk_size(mut self, size: usize) -> Self {
        self.base_chunk_size = size.max(1);
        self
    }
}

impl Default for BufferedUpdateConfig {
    fn default() -> Self {
        Self::new(available_threads())
    }
}

/// Outcome of one parallel pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassReport {
    /// Elements in the pass snapshot
    pub elements: usize,
    pub blocks: usize,
    pub chunk_size: usize,
    pub workers: usize,
    pub failures: Vec<ElementError>,
}

impl PassReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

type ElementSnapshot = Vec<(ElementId, Arc<dyn BufferedElement>)>;

struct WorkerPool {
    workers: usize,
    pool: Arc<ThreadPool>,
}

/// Parallel two-phase update of a large, changing set of elements
///
/// Each pass snapshots the element set, lets a fixed set of workers drain
/// blocks of the snapshot from a queue while computing buffered values, meets
/// them at a barrier, and then commits every buffered value. Elements may be
/// added or removed at any time; a pass only ever touches the elements of its
/// own snapshot, and removals take effect from the next pass.
pub struct ConcurrentBufferedUpdate {
    elements: Mutex<BTreeMap<ElementId, Arc<dyn BufferedElement>>>,
    next_id: AtomicU64,
    base_chunk_size: usize,
    pool: RwLock<WorkerPool>,
    requested_workers: Mutex<Option<usize>>,
    pending_operations: AtomicUsize,
    monitor: Mutex<()>,
    drained: Condvar,
    pass_lock: Mutex<()>,
}

impl ConcurrentBufferedUpdate {
    pub fn new(config: BufferedUpdateConfig) -> Result<Self, WorkspaceError> {
        let workers = config.workers.max(1);
        Ok(Self {
            elements: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(0),
            base_chunk_size: config.base_chunk_size.max(1),
            pool: RwLock::new(WorkerPool {
                workers,
                pool: Arc::new(Self::build_pool(workers)?),
            }),
            requested_workers: Mutex::new(None),
            pending_operations: AtomicUsize::new(0),
            monitor: Mutex::new(()),
            drained: Condvar::new(),
            pass_lock: Mutex::new(()),
        })
    }

    fn build_pool(workers: usize) -> Result<ThreadPool, WorkspaceError> {
        ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|index| format!("buffered-update-{}", index + 1))
            .build()
            .map_err(|e| WorkspaceError::ThreadPool(e.to_string()))
    }

    /// Track a structural mutation for the lifetime of `operation`
    fn mutate<R>(&self, operation: impl FnOnce(&mut BTreeMap<ElementId, Arc<dyn BufferedElement>>) -> R) -> R {
        self.pending_operations.fetch_add(1, Ordering::SeqCst);
        let result = {
            let mut elements = self.elements.lock();
            operation(&mut elements)
        };
        if self.pending_operations.fetch_sub(1, Ordering::SeqCst) == 1 {
            let _monitor = self.monitor.lock();
            self.drained.notify_all();
        }
        result
    }

    fn allocate_id(&self) -> ElementId {
        ElementId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn add_element(&self, element: Arc<dyn BufferedElement>) -> ElementId {
        let id = self.allocate_id();
        self.mutate(|elements| {
            elements.insert(id, element);
        });
        id
    }

    /// Add every member of a group as an individual element
    pub fn add_group<I>(&self, group: I) -> Vec<ElementId>
    where
        I: IntoIterator<Item = Arc<dyn BufferedElement>>,
    {
        let members: Vec<(ElementId, Arc<dyn BufferedElement>)> = group
            .into_iter()
            .map(|element| (self.allocate_id(), element))
            .collect();
        let ids: Vec<ElementId> = members.iter().map(|(id, _)| *id).collect();
        self.mutate(|elements| elements.extend(members));
        debug!("Added group of {} elements", ids.len());
        ids
    }

    pub fn remove_element(&self, id: ElementId) -> Option<Arc<dyn BufferedElement>> {
        self.mutate(|elements| elements.remove(&id))
    }

    /// Remove several elements; returns how many were present
    pub fn remove_group(&self, ids: &[ElementId]) -> usize {
        let removed = self.mutate(|elements| ids.iter().filter(|id| elements.remove(*id).is_some()).count());
        debug!("Removed group of {} elements", removed);
        removed
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.elements.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Structural mutations currently in progress
    pub fn pending_operations(&self) -> usize {
        self.pending_operations.load(Ordering::SeqCst)
    }

    /// Resize the worker pool before the next pass
    pub fn set_worker_count(&self, workers: usize) {
        *self.requested_workers.lock() = Some(workers.max(1));
    }

    /// Workers used by the current (or next, if none running) pass
    pub fn worker_count(&self) -> usize {
        self.pool.read().workers
    }

    fn apply_pending_worker_count(&self) -> Result<(), WorkspaceError> {
        let requested = match self.requested_workers.lock().take() {
            Some(workers) => workers,
            None => return Ok(()),
        };
        if requested == self.worker_count() {
            return Ok(());
        }
        let pool = Self::build_pool(requested)?;
        *self.pool.write() = WorkerPool {
            workers: requested,
            pool: Arc::new(pool),
        };
        info!("Buffered update pool resized to {} workers", requested);
        Ok(())
    }

    fn wait_for_pending_operations(&self) {
        let mut monitor = self.monitor.lock();
        while self.pending_operations.load(Ordering::SeqCst) > 0 {
            self.drained.wait(&mut monitor);
        }
    }

    /// Run one compute/commit pass over the current elements
    pub fn update_pass(&self) -> Result<PassReport, WorkspaceError> {
        let _pass = self.pass_lock.lock();
        self.apply_pending_worker_count()?;

        let snapshot: Arc<ElementSnapshot> = Arc::new(
            self.elements
                .lock()
                .iter()
                .map(|(id, element)| (*id, Arc::clone(element)))
                .collect(),
        );
        if snapshot.is_empty() {
            trace!("Buffered update pass skipped: no elements");
            return Ok(PassReport::default());
        }

        let (workers, pool) = {
            let current = self.pool.read();
            (current.workers, Arc::clone(&current.pool))
        };
        let chunk = chunk_size(snapshot.len(), workers, self.base_chunk_size);
        let tasks = Arc::new(TaskList::new(snapshot.len(), chunk, workers));
        let barrier = Arc::new(Barrier::new(workers + 1));
        let failures: Arc<Mutex<Vec<ElementError>>> = Arc::new(Mutex::new(Vec::new()));

        // Phase 1: compute, one consumer per worker thread
        for _ in 0..workers {
            let tasks = Arc::clone(&tasks);
            let snapshot = Arc::clone(&snapshot);
            let barrier = Arc::clone(&barrier);
            let failures = Arc::clone(&failures);
            pool.spawn(move || {
                compute_blocks(&tasks, &snapshot, &failures);
                barrier.wait();
            });
        }
        barrier.wait();

        // Phase 2: commit
        pool.install(|| {
            snapshot.par_iter().for_each(|(id, element)| {
                if let Err(payload) = catch_unwind(AssertUnwindSafe(|| element.commit())) {
                    failures.lock().push(ElementError::CommitPanicked {
                        element: *id,
                        message: panic_message(payload.as_ref()),
                    });
                }
            });
        });

        self.wait_for_pending_operations();

        let failures = std::mem::take(&mut *failures.lock());
        for failure in &failures {
            warn!("{}", failure);
        }
        trace!(
            "Buffered update pass: {} elements in {} blocks of {} on {} workers",
            snapshot.len(),
            tasks.blocks(),
            chunk,
            workers
        );
        Ok(PassReport {
            elements: snapshot.len(),
            blocks: tasks.blocks(),
            chunk_size: chunk,
            workers,
            failures,
        })
    }
}

/// Drain blocks until this worker receives its poison
fn compute_blocks(tasks: &TaskList, snapshot: &ElementSnapshot, failures: &Mutex<Vec<ElementError>>) {
    while let Some(WorkItem::Block(range)) = tasks.next() {
        for (id, element) in &snapshot[range] {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| element.compute())) {
                failures.lock().push(ElementError::ComputePanicked {
                    element: *id,
                    message: panic_message(payload.as_ref()),
                });
            }
        }
    }
}

impl UpdateAction for ConcurrentBufferedUpdate {
    fn description(&self) -> String {
        "Parallel buffered update".to_string()
    }

    fn long_description(&self) -> String {
        format!(
            "Compute then commit {} elements on {} workers",
            self.len(),
            self.worker_count()
        )
    }

    fn invoke(&self, _controls: &dyn UpdateControls) -> Result<(), UpdateError> {
        let report = self.update_pass().map_err(|e| UpdateError::ActionFailed {
            action: self.description(),
            message: e.to_string(),
        })?;
        match report.failures.first() {
            None => Ok(()),
            Some(first) => Err(UpdateError::ActionFailed {
                action: self.description(),
                message: format!("{} element failures, first: {}", report.failures.len(), first),
            }),
        }
    }
}
