pub mod core;

// Re-export commonly used types
pub use crate::core::attributes::{AttributeContainer, Consumer, Producer};
pub use crate::core::components::{
    ComponentRegistry, ComponentState, NetworkComponent, Neuron, TableComponent, UpdatePart, WorkspaceComponent,
};
pub use crate::core::couplings::{Coupling, CouplingId, CouplingManager, CouplingUpdateReport};
pub use crate::core::errors::{
    AttributeError, ComponentError, CouplingError, ElementError, PropagationError, ScriptError, UpdateError,
    WorkspaceError,
};
pub use crate::core::execution::{
    ActionSpec, ConcurrencyMode, IterationReport, RegisteredScripts, ScriptEngine, ScriptedUpdateAction, UpdateAction,
    UpdateControls, UpdaterConfig, UpdaterListener, WorkspaceUpdater,
};
pub use crate::core::parallel::{BufferedElement, BufferedUpdateConfig, ConcurrentBufferedUpdate, ElementId, PassReport};
pub use crate::core::persistence::{ArchivedCoupling, RestoreReport, WorkspaceState};
pub use crate::core::types::{AttributeRef, ComponentId, ContainerKey};
pub use crate::core::values::{AttributeType, AttributeValue};
pub use crate::core::workspace::Workspace;
