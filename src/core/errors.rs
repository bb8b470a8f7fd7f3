use crate::core::couplings::CouplingId;
use crate::core::parallel::ElementId;
use crate::core::types::{AttributeRef, ComponentId, ContainerKey};
use crate::core::values::AttributeType;
use std::any::Any;
use thiserror::Error;

/// Errors raised by a single producer read or consumer write
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AttributeError {
    /// The container backing the attribute no longer exists
    #[error("attribute container '{0}' has been removed")]
    ContainerRemoved(ContainerKey),
    /// A value of the wrong type was produced or offered
    #[error("value type mismatch: expected {expected}, found {found}")]
    ValueTypeMismatch {
        expected: AttributeType,
        found: AttributeType,
    },
    /// The getter or setter rejected the operation
    #[error("{0}")]
    Failed(String),
    /// The getter or setter panicked
    #[error("attribute accessor panicked: {0}")]
    Panicked(String),
}

/// Errors raised while creating, removing or resolving couplings
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CouplingError {
    #[error(
        "mismatched attribute types: producer {producer} is {producer_type}, consumer {consumer} is {consumer_type}"
    )]
    MismatchedAttributeType {
        producer: AttributeRef,
        consumer: AttributeRef,
        producer_type: AttributeType,
        consumer_type: AttributeType,
    },
    #[error("coupling from {producer} to {consumer} already exists")]
    DuplicateCoupling {
        producer: AttributeRef,
        consumer: AttributeRef,
    },
    #[error("coupling '{0}' not found")]
    CouplingNotFound(CouplingId),
    #[error("component '{0}' not found")]
    ComponentNotFound(String),
    #[error("attribute container '{0}' not found")]
    ContainerNotFound(ContainerKey),
    #[error("producer '{0}' not found")]
    ProducerNotFound(AttributeRef),
    #[error("consumer '{0}' not found")]
    ConsumerNotFound(AttributeRef),
}

/// Per-coupling failures during a buffered propagation cycle
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PropagationError {
    #[error("coupling {coupling}: failed to read producer {producer}: {source}")]
    ProducerReadFailure {
        coupling: CouplingId,
        producer: AttributeRef,
        source: AttributeError,
    },
    #[error("coupling {coupling}: failed to write consumer {consumer}: {source}")]
    ConsumerWriteFailure {
        coupling: CouplingId,
        consumer: AttributeRef,
        source: AttributeError,
    },
}

impl PropagationError {
    pub fn coupling(&self) -> &CouplingId {
        match self {
            PropagationError::ProducerReadFailure { coupling, .. } => coupling,
            PropagationError::ConsumerWriteFailure { coupling, .. } => coupling,
        }
    }
}

/// Failures raised from inside a component's update
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComponentError {
    #[error("component '{component}' failed to update: {message}")]
    UpdateFailure {
        component: ComponentId,
        message: String,
    },
    #[error("component '{component}' panicked during update: {message}")]
    Panicked {
        component: ComponentId,
        message: String,
    },
}

impl ComponentError {
    pub fn update_failure(component: &ComponentId, message: impl Into<String>) -> Self {
        ComponentError::UpdateFailure {
            component: component.clone(),
            message: message.into(),
        }
    }

    pub fn component(&self) -> &ComponentId {
        match self {
            ComponentError::UpdateFailure { component, .. } => component,
            ComponentError::Panicked { component, .. } => component,
        }
    }
}

/// Failures of single elements during a parallel buffered pass
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ElementError {
    #[error("element {element} panicked while computing: {message}")]
    ComputePanicked { element: ElementId, message: String },
    #[error("element {element} panicked while committing: {message}")]
    CommitPanicked { element: ElementId, message: String },
}

/// Failures of scripted update actions
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    /// The script could not be compiled or bound; the action is inert
    #[error("script '{name}' failed to evaluate: {message}")]
    EvaluationFailure { name: String, message: String },
    /// The compiled script failed while running
    #[error("script '{name}' failed at runtime: {message}")]
    RuntimeFailure { name: String, message: String },
}

/// Failures of a single update action within an iteration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UpdateError {
    #[error("update action '{action}' failed: {message}")]
    ActionFailed { action: String, message: String },
    #[error("update action '{action}' panicked: {message}")]
    Panicked { action: String, message: String },
    #[error("cyclic dependencies between components: {0:?}")]
    CyclicDependencies(Vec<ComponentId>),
    #[error("component '{0}' not found")]
    ComponentNotFound(ComponentId),
    #[error(transparent)]
    Script(#[from] ScriptError),
}

/// Top-level workspace errors
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("component '{0}' already exists")]
    DuplicateComponent(ComponentId),
    #[error("component '{0}' not found")]
    ComponentNotFound(String),
    #[error(transparent)]
    Coupling(#[from] CouplingError),
    #[error(transparent)]
    Update(#[from] UpdateError),
    #[error("workspace is already running")]
    AlreadyRunning,
    #[error("failed to build thread pool: {0}")]
    ThreadPool(String),
    #[error("failed to spawn updater thread: {0}")]
    Spawn(String),
    #[error("updater thread panicked")]
    UpdaterPanicked,
    #[error("persistence error: {0}")]
    Persistence(#[from] serde_json::Error),
}

/// Extract a readable message from a caught panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
