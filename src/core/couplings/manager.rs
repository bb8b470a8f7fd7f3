use crate::core::attributes::{Consumer, Producer};
use crate::core::couplings::coupling::{Coupling, CouplingId};
use crate::core::couplings::validator::CouplingValidator;
use crate::core::errors::{panic_message, AttributeError, CouplingError, PropagationError};
use crate::core::types::{AttributeRef, ComponentId, ContainerKey};
use crate::core::values::AttributeValue;
use log::{debug, trace, warn};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Mutable coupling membership, always accessed under the manager's lock
#[derive(Default)]
struct CouplingSet {
    /// Couplings in creation order
    couplings: Vec<Arc<Coupling>>,
    /// (producer, consumer) pairs currently coupled
    pairs: HashSet<(AttributeRef, AttributeRef)>,
    /// Couplings touching each container, for fast removal
    by_container: HashMap<ContainerKey, HashSet<CouplingId>>,
}

impl CouplingSet {
    fn insert(&mut self, coupling: Arc<Coupling>) {
        let id = coupling.id();
        self.pairs.insert((
            coupling.producer().reference().clone(),
            coupling.consumer().reference().clone(),
        ));
        self.by_container
            .entry(coupling.producer().container().clone())
            .or_default()
            .insert(id);
        self.by_container
            .entry(coupling.consumer().container().clone())
            .or_default()
            .insert(id);
        self.couplings.push(coupling);
    }

    fn remove_where<F>(&mut self, predicate: F) -> Vec<Arc<Coupling>>
    where
        F: Fn(&Coupling) -> bool,
    {
        let (removed, kept): (Vec<_>, Vec<_>) = self
            .couplings
            .drain(..)
            .partition(|coupling| predicate(&**coupling));
        self.couplings = kept;

        for coupling in &removed {
            self.pairs.remove(&(
                coupling.producer().reference().clone(),
                coupling.consumer().reference().clone(),
            ));
            for key in [coupling.producer().container(), coupling.consumer().container()] {
                if let Some(ids) = self.by_container.get_mut(key) {
                    ids.remove(&coupling.id());
                    if ids.is_empty() {
                        self.by_container.remove(key);
                    }
                }
            }
        }
        removed
    }
}

/// Outcome of one buffered propagation cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CouplingUpdateReport {
    /// Couplings included in the cycle
    pub attempted: usize,
    /// Consumers that received a value
    pub written: usize,
    /// Per-coupling failures; other couplings still propagated
    pub failures: Vec<PropagationError>,
}

impl CouplingUpdateReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Coupling statistics for debugging
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouplingStats {
    pub couplings: usize,
    pub containers: usize,
    pub components: usize,
}

/// Owns the workspace's coupling set and propagates values along it
///
/// The set is guarded by a lock; propagation always works on a snapshot so
/// consumers may create or remove couplings without deadlocking.
pub struct CouplingManager {
    set: RwLock<CouplingSet>,
}

impl CouplingManager {
    /// Create a new coupling manager
    pub fn new() -> Self {
        Self {
            set: RwLock::new(CouplingSet::default()),
        }
    }

    /// Couple one producer to one consumer
    pub fn create_coupling(&self, producer: Producer, consumer: Consumer) -> Result<Arc<Coupling>, CouplingError> {
        let mut set = self.set.write();
        CouplingValidator::check_duplicate(&set.pairs, &producer, &consumer)?;
        let coupling = Arc::new(Coupling::new(producer, consumer)?);
        debug!("Created coupling {}", coupling);
        set.insert(Arc::clone(&coupling));
        Ok(coupling)
    }

    /// Pair producers and consumers by position
    ///
    /// When the lists differ in length only the first `min(len)` positions are
    /// paired and the excess entries are ignored. The request is atomic: if
    /// any pair is rejected no coupling is created.
    pub fn create_one_to_one_couplings(
        &self,
        producers: &[Producer],
        consumers: &[Consumer],
    ) -> Result<Vec<Arc<Coupling>>, CouplingError> {
        if producers.len() != consumers.len() {
            debug!(
                "One-to-one coupling of {} producers and {} consumers; pairing the first {}",
                producers.len(),
                consumers.len(),
                producers.len().min(consumers.len())
            );
        }
        let pairs: Vec<(&Producer, &Consumer)> = producers.iter().zip(consumers.iter()).collect();
        self.create_batch(&pairs)
    }

    /// Couple every producer to every consumer
    ///
    /// Yields `producers.len() * consumers.len()` couplings, or none if any
    /// pair is rejected.
    pub fn create_one_to_many_couplings(
        &self,
        producers: &[Producer],
        consumers: &[Consumer],
    ) -> Result<Vec<Arc<Coupling>>, CouplingError> {
        let pairs: Vec<(&Producer, &Consumer)> = producers
            .iter()
            .flat_map(|producer| consumers.iter().map(move |consumer| (producer, consumer)))
            .collect();
        self.create_batch(&pairs)
    }

    fn create_batch(&self, pairs: &[(&Producer, &Consumer)]) -> Result<Vec<Arc<Coupling>>, CouplingError> {
        let mut set = self.set.write();
        CouplingValidator::validate_batch(&set.pairs, pairs)?;

        let mut created = Vec::with_capacity(pairs.len());
        for (producer, consumer) in pairs {
            let coupling = Arc::new(Coupling::new((*producer).clone(), (*consumer).clone())?);
            set.insert(Arc::clone(&coupling));
            created.push(coupling);
        }
        debug!("Created {} couplings", created.len());
        Ok(created)
    }

    /// Remove a specific coupling
    pub fn remove_coupling(&self, id: CouplingId) -> Result<Arc<Coupling>, CouplingError> {
        let mut set = self.set.write();
        set.remove_where(|coupling| coupling.id() == id)
            .pop()
            .ok_or(CouplingError::CouplingNotFound(id))
    }

    /// Remove several couplings, ignoring ids that are not present
    pub fn remove_couplings(&self, ids: &[CouplingId]) -> Vec<Arc<Coupling>> {
        let ids: HashSet<CouplingId> = ids.iter().copied().collect();
        self.set.write().remove_where(|coupling| ids.contains(&coupling.id()))
    }

    /// Remove every coupling with an endpoint in the given container
    pub fn remove_attribute_container(&self, key: &ContainerKey) -> Vec<Arc<Coupling>> {
        let mut set = self.set.write();
        let ids = match set.by_container.get(key) {
            Some(ids) => ids.clone(),
            None => return Vec::new(),
        };
        let removed = set.remove_where(|coupling| ids.contains(&coupling.id()));
        debug!("Removed {} couplings of container {}", removed.len(), key);
        removed
    }

    /// Remove every coupling with an endpoint in the given component
    pub fn remove_component(&self, component: &ComponentId) -> Vec<Arc<Coupling>> {
        let removed = self
            .set
            .write()
            .remove_where(|coupling| coupling.touches_component(component));
        debug!("Removed {} couplings of component {}", removed.len(), component);
        removed
    }

    /// Remove all couplings
    pub fn clear(&self) {
        *self.set.write() = CouplingSet::default();
    }

    /// Find a coupling by id
    pub fn coupling(&self, id: CouplingId) -> Option<Arc<Coupling>> {
        self.set.read().couplings.iter().find(|c| c.id() == id).cloned()
    }

    /// Snapshot of all couplings in creation order
    pub fn couplings(&self) -> Vec<Arc<Coupling>> {
        self.set.read().couplings.clone()
    }

    /// Couplings whose consumer belongs to the component
    pub fn incoming_couplings(&self, component: &ComponentId) -> Vec<Arc<Coupling>> {
        self.filtered(|coupling| coupling.consumer().component() == component)
    }

    /// Couplings whose producer belongs to the component
    pub fn outgoing_couplings(&self, component: &ComponentId) -> Vec<Arc<Coupling>> {
        self.filtered(|coupling| coupling.producer().component() == component)
    }

    /// Couplings touching one container
    pub fn couplings_for_container(&self, key: &ContainerKey) -> Vec<Arc<Coupling>> {
        self.filtered(|coupling| coupling.touches_container(key))
    }

    fn filtered<F>(&self, predicate: F) -> Vec<Arc<Coupling>>
    where
        F: Fn(&Coupling) -> bool,
    {
        self.set
            .read()
            .couplings
            .iter()
            .filter(|coupling| predicate(&***coupling))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.set.read().couplings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Component-level data-flow edges (producer component, consumer component)
    ///
    /// Self edges are dropped and each edge appears once, in first-seen order.
    pub fn component_dependencies(&self) -> Vec<(ComponentId, ComponentId)> {
        let mut seen = HashSet::new();
        let mut edges = Vec::new();
        for coupling in self.set.read().couplings.iter() {
            let source = coupling.producer().component();
            let target = coupling.consumer().component();
            if source == target {
                continue;
            }
            if seen.insert((source.clone(), target.clone())) {
                edges.push((source.clone(), target.clone()));
            }
        }
        edges
    }

    /// Get coupling statistics
    pub fn stats(&self) -> CouplingStats {
        let set = self.set.read();
        let components: HashSet<&ComponentId> = set.by_container.keys().map(|key| key.component()).collect();
        CouplingStats {
            couplings: set.couplings.len(),
            containers: set.by_container.len(),
            components: components.len(),
        }
    }

    /// Propagate every producer value to its consumer in two phases
    pub fn update_all_couplings(&self) -> CouplingUpdateReport {
        let snapshot = self.couplings();
        Self::update_couplings(&snapshot)
    }

    /// Propagate only the couplings feeding the component
    pub fn update_incoming_couplings(&self, component: &ComponentId) -> CouplingUpdateReport {
        let snapshot = self.incoming_couplings(component);
        Self::update_couplings(&snapshot)
    }

    /// Propagate only the couplings fed by the component
    pub fn update_outgoing_couplings(&self, component: &ComponentId) -> CouplingUpdateReport {
        let snapshot = self.outgoing_couplings(component);
        Self::update_couplings(&snapshot)
    }

    /// Buffered update of an arbitrary list of couplings
    ///
    /// Every producer is read before any consumer is written. A failing or
    /// panicking read drops that coupling from the write phase; a failing or
    /// panicking write affects only its own coupling.
    pub fn update_couplings(couplings: &[Arc<Coupling>]) -> CouplingUpdateReport {
        let mut report = CouplingUpdateReport {
            attempted: couplings.len(),
            ..CouplingUpdateReport::default()
        };

        // Phase 1: collect
        let mut buffer: Vec<(&Coupling, AttributeValue)> = Vec::with_capacity(couplings.len());
        for coupling in couplings {
            let read = catch_unwind(AssertUnwindSafe(|| coupling.producer().read()))
                .unwrap_or_else(|payload| Err(AttributeError::Panicked(panic_message(payload.as_ref()))));
            match read {
                Ok(value) => buffer.push((coupling.as_ref(), value)),
                Err(source) => report.failures.push(PropagationError::ProducerReadFailure {
                    coupling: coupling.id(),
                    producer: coupling.producer().reference().clone(),
                    source,
                }),
            }
        }

        // Phase 2: apply
        for (coupling, value) in buffer {
            let written = catch_unwind(AssertUnwindSafe(|| coupling.consumer().write(value)))
                .unwrap_or_else(|payload| Err(AttributeError::Panicked(panic_message(payload.as_ref()))));
            match written {
                Ok(()) => report.written += 1,
                Err(source) => report.failures.push(PropagationError::ConsumerWriteFailure {
                    coupling: coupling.id(),
                    consumer: coupling.consumer().reference().clone(),
                    source,
                }),
            }
        }

        for failure in &report.failures {
            warn!("{}", failure);
        }
        trace!("Propagated {}/{} couplings", report.written, report.attempted);
        report
    }
}

impl Default for CouplingManager {
    fn default() -> Self {
        Self::new()
    }
}
