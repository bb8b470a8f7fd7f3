use crate::core::attributes::{Consumer, Producer};
use crate::core::components::{ComponentRegistry, WorkspaceComponent};
use crate::core::couplings::{Coupling, CouplingManager};
use crate::core::errors::{CouplingError, WorkspaceError};
use crate::core::execution::{
    ActionSpec, IterationReport, ScriptEngine, ScriptedUpdateAction, UpdateAction, UpdaterConfig,
    WorkspaceUpdater,
};
use crate::core::persistence::{ArchivedCoupling, RestoreReport, WorkspaceState};
use crate::core::types::{AttributeRef, ComponentId, ContainerKey};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Top-level container of components, couplings and the updater
///
/// The workspace is passed explicitly to whoever needs it; components only
/// hold their own state and never reach back into it.
pub struct Workspace {
    registry: Arc<ComponentRegistry>,
    couplings: Arc<CouplingManager>,
    updater: WorkspaceUpdater,
    changed: AtomicBool,
    /// Serializes component removal against coupling creation
    structure: Mutex<()>,
}

impl Workspace {
    pub fn new() -> Result<Self, WorkspaceError> {
        Self::with_config(UpdaterConfig::default())
    }

    pub fn with_config(config: UpdaterConfig) -> Result<Self, WorkspaceError> {
        let registry = Arc::new(ComponentRegistry::new());
        let couplings = Arc::new(CouplingManager::new());
        let updater = WorkspaceUpdater::new(Arc::clone(&registry), Arc::clone(&couplings), config)?;
        Ok(Self {
            registry,
            couplings,
            updater,
            changed: AtomicBool::new(false),
            structure: Mutex::new(()),
        })
    }

    pub fn updater(&self) -> &WorkspaceUpdater {
        &self.updater
    }

    pub fn coupling_manager(&self) -> &CouplingManager {
        &self.couplings
    }

    pub fn add_component(&self, component: Arc<dyn WorkspaceComponent>) -> Result<(), WorkspaceError> {
        let id = component.id().clone();
        self.registry.register_component(component)?;
        self.changed.store(true, Ordering::SeqCst);
        debug!("Added component {} ({})", id, id.component_type());
        Ok(())
    }

    /// Remove a component after removing every coupling that touches it
    pub fn remove_component(&self, name: &str) -> Result<Arc<dyn WorkspaceComponent>, WorkspaceError> {
        let _structure = self.structure.lock();
        let component = self
            .registry
            .get_component(name)
            .ok_or_else(|| WorkspaceError::ComponentNotFound(name.to_string()))?;
        let removed_couplings = self.couplings.remove_component(component.id());
        let component = self.registry.remove_component(name)?;
        self.changed.store(true, Ordering::SeqCst);
        debug!(
            "Removed component {} and {} couplings",
            component.id(),
            removed_couplings.len()
        );
        Ok(component)
    }

    /// Drop the couplings of a container that is going away
    pub fn remove_attribute_container(&self, key: &ContainerKey) -> Vec<Arc<Coupling>> {
        let _structure = self.structure.lock();
        let removed = self.couplings.remove_attribute_container(key);
        if !removed.is_empty() {
            self.changed.store(true, Ordering::SeqCst);
        }
        removed
    }

    pub fn component(&self, name: &str) -> Option<Arc<dyn WorkspaceComponent>> {
        self.registry.get_component(name)
    }

    pub fn components(&self) -> Vec<Arc<dyn WorkspaceComponent>> {
        self.registry.components()
    }

    pub fn component_ids(&self) -> Vec<ComponentId> {
        self.registry.component_ids()
    }

    /// Find the live producer an attribute reference points at
    pub fn resolve_producer(&self, reference: &AttributeRef) -> Result<Producer, CouplingError> {
        let component = self
            .registry
            .get_component(reference.component().name())
            .ok_or_else(|| CouplingError::ComponentNotFound(reference.component().name().to_string()))?;
        let container = component
            .attribute_container(reference.container().key())
            .ok_or_else(|| CouplingError::ContainerNotFound(reference.container().clone()))?;
        container
            .producer(reference.member())
            .cloned()
            .ok_or_else(|| CouplingError::ProducerNotFound(reference.clone()))
    }

    /// Find the live consumer an attribute reference points at
    pub fn resolve_consumer(&self, reference: &AttributeRef) -> Result<Consumer, CouplingError> {
        let component = self
            .registry
            .get_component(reference.component().name())
            .ok_or_else(|| CouplingError::ComponentNotFound(reference.component().name().to_string()))?;
        let container = component
            .attribute_container(reference.container().key())
            .ok_or_else(|| CouplingError::ContainerNotFound(reference.container().clone()))?;
        container
            .consumer(reference.member())
            .cloned()
            .ok_or_else(|| CouplingError::ConsumerNotFound(reference.clone()))
    }

    /// Resolve both endpoints and couple them
    pub fn couple(&self, producer: &AttributeRef, consumer: &AttributeRef) -> Result<Arc<Coupling>, CouplingError> {
        let _structure = self.structure.lock();
        let producer = self.resolve_producer(producer)?;
        let consumer = self.resolve_consumer(consumer)?;
        let coupling = self.couplings.create_coupling(producer, consumer)?;
        self.changed.store(true, Ordering::SeqCst);
        Ok(coupling)
    }

    pub fn iterate(&self) -> Result<IterationReport, WorkspaceError> {
        self.updater.iterate()
    }

    pub fn iterate_n(&self, count: usize) -> Result<Vec<IterationReport>, WorkspaceError> {
        self.updater.iterate_n(count)
    }

    pub fn run(&self) -> Result<(), WorkspaceError> {
        self.updater.run()
    }

    pub fn stop(&self) {
        self.updater.stop();
    }

    pub fn join(&self) -> Result<u64, WorkspaceError> {
        self.updater.join()
    }

    pub fn time(&self) -> u64 {
        self.updater.time()
    }

    /// Whether anything changed since the last `mark_saved`
    pub fn changes_exist(&self) -> bool {
        self.changed.load(Ordering::SeqCst)
            || self
                .registry
                .components()
                .iter()
                .any(|component| component.state().has_changed_since_last_save())
    }

    pub fn mark_saved(&self) {
        self.changed.store(false, Ordering::SeqCst);
        for component in self.registry.components() {
            component.state().set_changed_since_last_save(false);
        }
    }

    /// Stop any run and drop every component, coupling and custom action
    pub fn clear(&self) -> Result<(), WorkspaceError> {
        self.updater.stop();
        self.updater.join()?;
        let _structure = self.structure.lock();
        self.couplings.clear();
        let removed = self.registry.drain();
        self.updater.action_manager().reset_to_default();
        self.updater.reset_time();
        self.changed.store(false, Ordering::SeqCst);
        info!("Cleared workspace ({} components)", removed.len());
        Ok(())
    }

    pub fn save_state(&self) -> WorkspaceState {
        WorkspaceState {
            config: self.updater.config(),
            update_actions: self.updater.action_manager().specs(),
            couplings: self
                .couplings
                .couplings()
                .iter()
                .map(|coupling| ArchivedCoupling {
                    producer: coupling.producer().reference().clone(),
                    consumer: coupling.consumer().reference().clone(),
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, WorkspaceError> {
        self.save_state().to_json()
    }

    /// Replace configuration, actions and couplings with a saved state
    ///
    /// Components must already be present. Couplings whose endpoints cannot
    /// be resolved are skipped and listed in the report.
    pub fn restore_state(
        &self,
        state: &WorkspaceState,
        engine: &Arc<dyn ScriptEngine>,
    ) -> Result<RestoreReport, WorkspaceError> {
        if self.updater.is_running() {
            return Err(WorkspaceError::AlreadyRunning);
        }
        let _structure = self.structure.lock();
        let mut report = RestoreReport::default();

        self.updater.apply_config(state.config.clone());

        let mut actions: Vec<Arc<dyn UpdateAction>> = Vec::with_capacity(state.update_actions.len());
        for spec in &state.update_actions {
            match spec {
                ActionSpec::Scripted { description, source } => {
                    let action = ScriptedUpdateAction::new(description.clone(), source.clone(), Arc::clone(engine));
                    if let Some(error) = action.evaluation_error() {
                        report.script_failures.push(error);
                    }
                    actions.push(Arc::new(action));
                }
                other => actions.push(other.build(engine)),
            }
        }
        self.updater.action_manager().set_actions(actions);

        self.couplings.clear();
        for archived in &state.couplings {
            let restored = self.resolve_producer(&archived.producer).and_then(|producer| {
                let consumer = self.resolve_consumer(&archived.consumer)?;
                self.couplings.create_coupling(producer, consumer)
            });
            match restored {
                Ok(_) => report.couplings_restored += 1,
                Err(error) => {
                    warn!(
                        "Skipped coupling {} -> {}: {}",
                        archived.producer, archived.consumer, error
                    );
                    report.unresolved.push((archived.clone(), error));
                }
            }
        }

        info!(
            "Restored {} update actions and {}/{} couplings",
            state.update_actions.len(),
            report.couplings_restored,
            state.couplings.len()
        );
        Ok(report)
    }

    pub fn from_json(&self, json: &str, engine: &Arc<dyn ScriptEngine>) -> Result<RestoreReport, WorkspaceError> {
        let state = WorkspaceState::from_json(json)?;
        self.restore_state(&state, engine)
    }
}
