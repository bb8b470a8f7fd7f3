use crate::core::execution::actions::{ActionSpec, BufferedUpdate, UpdateAction};
use crate::core::execution::script::ScriptEngine;
use log::{debug, warn};
use parking_lot::RwLock;
use std::sync::Arc;

/// Ordered, editable list of the actions run every iteration
///
/// Edits take effect at the next iteration; an iteration in progress keeps
/// the list it started with.
pub struct UpdateActionManager {
    actions: RwLock<Vec<Arc<dyn UpdateAction>>>,
}

impl UpdateActionManager {
    /// A manager holding the default list
    pub fn new() -> Self {
        Self {
            actions: RwLock::new(Self::default_actions()),
        }
    }

    fn default_actions() -> Vec<Arc<dyn UpdateAction>> {
        vec![Arc::new(BufferedUpdate)]
    }

    pub fn add(&self, action: Arc<dyn UpdateAction>) {
        debug!("Added update action '{}'", action.description());
        self.actions.write().push(action);
    }

    /// Insert at `index`, clamped to the end of the list
    pub fn insert(&self, index: usize, action: Arc<dyn UpdateAction>) {
        let mut actions = self.actions.write();
        let index = index.min(actions.len());
        debug!("Inserted update action '{}' at {}", action.description(), index);
        actions.insert(index, action);
    }

    pub fn remove(&self, index: usize) -> Option<Arc<dyn UpdateAction>> {
        let mut actions = self.actions.write();
        if index < actions.len() {
            Some(actions.remove(index))
        } else {
            None
        }
    }

    /// Swap two entries; returns false if either index is out of range
    pub fn swap(&self, first: usize, second: usize) -> bool {
        let mut actions = self.actions.write();
        if first >= actions.len() || second >= actions.len() {
            return false;
        }
        actions.swap(first, second);
        true
    }

    pub fn clear(&self) {
        self.actions.write().clear();
    }

    pub fn reset_to_default(&self) {
        *self.actions.write() = Self::default_actions();
    }

    /// Replace the whole list
    pub fn set_actions(&self, actions: Vec<Arc<dyn UpdateAction>>) {
        *self.actions.write() = actions;
    }

    /// Snapshot of the list in run order
    pub fn actions(&self) -> Vec<Arc<dyn UpdateAction>> {
        self.actions.read().clone()
    }

    pub fn descriptions(&self) -> Vec<String> {
        self.actions.read().iter().map(|action| action.description()).collect()
    }

    pub fn len(&self) -> usize {
        self.actions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Persistable form of the list; actions without a spec are skipped
    pub fn specs(&self) -> Vec<ActionSpec> {
        self.actions
            .read()
            .iter()
            .filter_map(|action| {
                let spec = action.spec();
                if spec.is_none() {
                    warn!(
                        "Update action '{}' cannot be persisted and was skipped",
                        action.description()
                    );
                }
                spec
            })
            .collect()
    }

    /// Replace the list with actions rebuilt from specs
    pub fn restore(&self, specs: &[ActionSpec], engine: &Arc<dyn ScriptEngine>) {
        let actions = specs.iter().map(|spec| spec.build(engine)).collect();
        self.set_actions(actions);
    }
}

impl Default for UpdateActionManager {
    fn default() -> Self {
        Self::new()
    }
}
