use crate::core::attributes::AttributeContainer;
use crate::core::components::state::ComponentState;
use crate::core::errors::ComponentError;
use crate::core::types::ComponentId;
use std::sync::Arc;

type PartFn = dyn Fn() -> Result<(), ComponentError> + Send + Sync;

/// An independently schedulable slice of a component's update
///
/// Parts of one component may run concurrently with each other, so each part
/// must only touch state it owns.
#[derive(Clone)]
pub struct UpdatePart {
    description: String,
    task: Arc<PartFn>,
}

impl UpdatePart {
    pub fn new<F>(description: impl Into<String>, task: F) -> Self
    where
        F: Fn() -> Result<(), ComponentError> + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            task: Arc::new(task),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn run(&self) -> Result<(), ComponentError> {
        (self.task)()
    }
}

impl std::fmt::Debug for UpdatePart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdatePart")
            .field("description", &self.description)
            .finish()
    }
}

/// A unit of simulation state hosted by the workspace
///
/// Components are shared between the workspace and update threads, so every
/// method takes `&self` and mutable state lives behind the component's own
/// locks.
pub trait WorkspaceComponent: Send + Sync {
    /// Unique id within the workspace
    fn id(&self) -> &ComponentId;

    /// Lifecycle flags
    fn state(&self) -> &ComponentState;

    /// Advance the component by one tick
    fn update(&self) -> Result<(), ComponentError>;

    /// Sub-updates that may be scheduled independently
    ///
    /// An empty list means the whole component is one part that calls
    /// `update()`.
    fn update_parts(&self) -> Vec<UpdatePart> {
        Vec::new()
    }

    /// Everything this component exposes to the coupling layer
    fn attribute_containers(&self) -> Vec<AttributeContainer>;

    /// Look up one attribute container by its owner-scoped key
    fn attribute_container(&self, key: &str) -> Option<AttributeContainer> {
        self.attribute_containers()
            .into_iter()
            .find(|container| container.key().key() == key)
    }

    /// Whether the updater should call this component this tick
    fn is_update_on(&self) -> bool {
        self.state().is_update_on()
    }

    /// Ask a continuous run to stop at the next iteration boundary
    fn halt_requested(&self) -> bool {
        false
    }
}
