pub mod network;
pub mod registry;
pub mod state;
pub mod table;
pub mod traits;

// Re-export commonly used types
pub use network::{NetworkComponent, Neuron, ALL_NEURONS_CONTAINER, NETWORK_COMPONENT_TYPE};
pub use registry::ComponentRegistry;
pub use state::ComponentState;
pub use table::{TableComponent, ROW_CONTAINER, TABLE_COMPONENT_TYPE};
pub use traits::{UpdatePart, WorkspaceComponent};
