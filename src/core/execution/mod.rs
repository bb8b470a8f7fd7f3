pub mod action_manager;
pub mod actions;
pub mod config;
pub mod controls;
pub mod execution_order;
pub mod latch;
pub mod listener;
pub mod report;
pub mod script;
pub mod updater;

// Re-export commonly used types
pub use action_manager::UpdateActionManager;
pub use actions::{
    ActionSpec, BufferedUpdate, ClosureAction, PriorityUpdate, TopologicalUpdate, UpdateAction,
    UpdateAllComponents, UpdateComponent, UpdateCouplings, UpdateIncomingCouplings, UpdateOutgoingCouplings,
};
pub use config::{ConcurrencyMode, UpdaterConfig};
pub use controls::{UpdateContext, UpdateControls};
pub use execution_order::ExecutionOrderBuilder;
pub use latch::CompletionLatch;
pub use listener::UpdaterListener;
pub use report::{ComponentUpdateReport, IterationReport};
pub use script::{CompiledScript, RegisteredScripts, ScriptEngine, ScriptedUpdateAction};
pub use updater::WorkspaceUpdater;
