use crate::core::components::traits::WorkspaceComponent;
use crate::core::errors::WorkspaceError;
use crate::core::types::ComponentId;
use log::debug;
use parking_lot::RwLock;
use std::sync::Arc;

/// Manages the live set of workspace components
///
/// Components keep their insertion order, which is also the order used by
/// sequential updates.
pub struct ComponentRegistry {
    components: RwLock<Vec<Arc<dyn WorkspaceComponent>>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self {
            components: RwLock::new(Vec::new()),
        }
    }

    /// Register a component; names must be unique
    pub fn register_component(&self, component: Arc<dyn WorkspaceComponent>) -> Result<(), WorkspaceError> {
        let mut components = self.components.write();
        let id = component.id().clone();
        if components.iter().any(|existing| existing.id().name() == id.name()) {
            return Err(WorkspaceError::DuplicateComponent(id));
        }
        debug!("Registered component {}", id);
        components.push(component);
        Ok(())
    }

    /// Remove a component by name
    pub fn remove_component(&self, name: &str) -> Result<Arc<dyn WorkspaceComponent>, WorkspaceError> {
        let mut components = self.components.write();
        let index = components
            .iter()
            .position(|component| component.id().name() == name)
            .ok_or_else(|| WorkspaceError::ComponentNotFound(name.to_string()))?;
        let removed = components.remove(index);
        debug!("Removed component {}", removed.id());
        Ok(removed)
    }

    /// Get a component by name
    pub fn get_component(&self, name: &str) -> Option<Arc<dyn WorkspaceComponent>> {
        self.components
            .read()
            .iter()
            .find(|component| component.id().name() == name)
            .cloned()
    }

    /// Get a component by full id
    pub fn get_by_id(&self, id: &ComponentId) -> Option<Arc<dyn WorkspaceComponent>> {
        self.components
            .read()
            .iter()
            .find(|component| component.id() == id)
            .cloned()
    }

    /// Snapshot of all components in insertion order
    pub fn components(&self) -> Vec<Arc<dyn WorkspaceComponent>> {
        self.components.read().clone()
    }

    pub fn component_ids(&self) -> Vec<ComponentId> {
        self.components
            .read()
            .iter()
            .map(|component| component.id().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.components.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove and return every component
    pub fn drain(&self) -> Vec<Arc<dyn WorkspaceComponent>> {
        std::mem::take(&mut *self.components.write())
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}
